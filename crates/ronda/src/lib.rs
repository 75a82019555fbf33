#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/ronda/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! # ronda
//!
//! Engagement forecasting from daily view logs.
//!
//! ronda is an umbrella crate: it re-exports every ronda sub-crate and adds
//! the pieces that tie them together, the [`PipelineConfig`], the
//! per-pair [`Trainer`] and the end-to-end [`Pipeline`].
//!
//! ## Quick Start
//!
//! ```no_run
//! use ronda::{Pipeline, PipelineConfig};
//! use std::path::Path;
//!
//! # async fn example() -> ronda::Result<()> {
//! let pipeline = Pipeline::new(PipelineConfig::default())?;
//! let summary = pipeline
//!     .run(Path::new("data/videos.csv"), Path::new("out"))
//!     .await?;
//! println!("{} models written", summary.model_paths.len());
//! # Ok(())
//! # }
//! ```
//!
//! ## Crate Organization
//!
//! - [`traits`]: shared types, the error type and statistics helpers
//! - [`ingest`]: CSV loading, column normalization and the quality filter
//! - [`features`]: feature extractors and the leakage-safe feature catalog
//! - [`models`]: preprocessing, regressors and model artifacts
//! - [`eval`]: temporal splitting, metrics and the evaluation report
//!
//! ## Architecture
//!
//! 1. **Ingest** normalizes column names and drops rows that fail quality rules
//! 2. **Features** turn each surviving item into a feature row with targets
//! 3. **Split** orders rows by publish time into train, validation and test
//! 4. **Train** fits one model per (segment, horizon) pair concurrently
//! 5. **Evaluate** scores each model and writes reports and artifacts

/// Version information for the ronda crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod config;
pub mod output;
pub mod pipeline;
pub mod report;
pub mod trainer;

pub use config::{FeatureSetKind, PipelineConfig};
pub use output::{OutputWriter, StagedOutput};
pub use pipeline::{Pipeline, Prepared, RunSummary};
pub use report::{FeatureMetadata, ProcessingReport};
pub use trainer::{PairOutcome, Trainer};

// Re-export error types
pub use ronda_traits::{Result, RondaError};

// Re-export common types
pub use ronda_traits::{FeatureRow, FeatureValue, Horizon, Observation, Segment};

/// Shared types, errors and statistics helpers.
pub mod traits {
    pub use ronda_traits::*;
}

/// Loading, column normalization and quality filtering.
pub mod ingest {
    pub use ronda_ingest::*;
}

/// Feature extractors and the feature catalog.
///
/// # Example
///
/// ```
/// use ronda::features::registry::{at_publish_features, is_leakage_safe};
///
/// assert!(at_publish_features().iter().all(|f| is_leakage_safe(f)));
/// ```
pub mod features {
    pub use ronda_features::*;
}

/// Preprocessing, regressors and model artifacts.
pub mod models {
    pub use ronda_models::*;
}

/// Temporal splitting, metrics and evaluation reports.
pub mod eval {
    pub use ronda_eval::*;
}
