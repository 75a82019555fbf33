#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/ronda/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Core definitions for the Ronda engagement forecasting pipeline.
//!
//! This crate provides the shared vocabulary of every other Ronda crate: the
//! observation and feature-row types, the segment and horizon enumerations
//! that key trained models, the error type, and a few statistics helpers.

/// The version of the ronda-traits crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// Module declarations
pub mod error;
pub mod feature;
pub mod stats;
pub mod types;

// Re-exports
pub use error::{Result, RondaError};
pub use feature::FeatureExtractor;
pub use types::{
    DEFAULT_SHORT_FORM_THRESHOLD_SECONDS, DailyMetric, DailySeries, EngagementData, FeatureMap,
    FeatureRow, FeatureValue, Horizon, OBSERVATION_DAYS, Observation, RawObservation, Segment,
    daily_column,
};
