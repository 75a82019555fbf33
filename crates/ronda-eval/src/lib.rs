#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/ronda/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Temporal splitting and forecast evaluation for Ronda.
//!
//! - [`split`]: chronological train / validation / test partitioning
//! - [`metrics`]: MAE, RMSE, bounded SMAPE and R² on raw and log scales
//! - [`evaluator`]: per-pair results aggregated into an [`EvaluationReport`]
//!
//! # Example
//!
//! ```rust
//! use ronda_eval::RegressionMetrics;
//!
//! let metrics = RegressionMetrics::compute(&[120.0, 80.0, 0.0], &[100.0, 90.0, 3.0]).unwrap();
//! assert!(metrics.smape <= 200.0);
//! ```

pub mod evaluator;
pub mod metrics;
pub mod split;

// Re-export main types
pub use evaluator::{EvaluationReport, PairReport, PairStatus, SampleCounts};
pub use metrics::{RegressionMetrics, SMAPE_MAX};
pub use split::{Published, SliceSummary, SplitSummary, TemporalSplit, temporal_split};
