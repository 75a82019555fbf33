//! Error types for the Ronda pipeline.
//!
//! Fatal conditions (schema problems, an empty dataset after filtering, an
//! invalid configuration, a blown training budget) abort a run. The remaining
//! variants describe per-pair or per-row conditions that callers record and
//! recover from.

use crate::types::{Horizon, Segment};
use thiserror::Error;

/// The main error type for Ronda operations.
#[derive(Debug, Error)]
pub enum RondaError {
    /// A required column is absent or unusable after normalization.
    #[error("Schema error: {0}")]
    Schema(String),

    /// Every row was rejected by the quality filter.
    #[error("Empty dataset: all {input_rows} input rows were rejected by the quality filter")]
    EmptyDataset {
        /// Number of rows that entered the filter.
        input_rows: usize,
    },

    /// The pipeline configuration failed validation.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A (segment, horizon) pair does not have enough rows to train.
    #[error(
        "Insufficient samples for {segment}/{horizon}: train={train}, validation={validation}, required={required}"
    )]
    InsufficientSamples {
        /// Segment of the skipped pair.
        segment: Segment,
        /// Horizon of the skipped pair.
        horizon: Horizon,
        /// Usable training rows.
        train: usize,
        /// Usable validation rows.
        validation: usize,
        /// Minimum required in each slice.
        required: usize,
    },

    /// A single row's feature could not be computed.
    #[error("Feature computation failed: {0}")]
    FeatureComputation(String),

    /// Model fitting or prediction failed.
    #[error("Model error: {0}")]
    Model(String),

    /// A model artifact or report could not be serialized or persisted.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// The training step exceeded its wall-clock budget.
    #[error("Training exceeded the wall-clock budget of {secs}s")]
    TrainingTimeout {
        /// The configured budget in seconds.
        secs: u64,
    },

    /// Error from Polars operations.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// Filesystem error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding or decoding error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error for other cases.
    #[error("Error: {0}")]
    Other(String),
}

impl RondaError {
    /// Whether this error aborts a pipeline run.
    ///
    /// Per-pair and per-row conditions are recorded in the reports instead.
    pub const fn is_fatal(&self) -> bool {
        !matches!(
            self,
            Self::InsufficientSamples { .. }
                | Self::FeatureComputation(_)
                | Self::Model(_)
                | Self::Serialization(_)
        )
    }
}

impl From<String> for RondaError {
    fn from(s: String) -> Self {
        Self::Other(s)
    }
}

impl From<&str> for RondaError {
    fn from(s: &str) -> Self {
        Self::Other(s.to_string())
    }
}

/// A specialized Result type for Ronda operations.
pub type Result<T> = std::result::Result<T, RondaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = RondaError::Schema("missing column video_id".to_string());
        assert_eq!(err.to_string(), "Schema error: missing column video_id");

        let err = RondaError::EmptyDataset { input_rows: 12 };
        assert_eq!(
            err.to_string(),
            "Empty dataset: all 12 input rows were rejected by the quality filter"
        );
    }

    #[test]
    fn test_insufficient_samples_display() {
        let err = RondaError::InsufficientSamples {
            segment: Segment::LongForm,
            horizon: Horizon::Day7,
            train: 30,
            validation: 8,
            required: 50,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient samples for long_form/7d: train=30, validation=8, required=50"
        );
    }

    #[test]
    fn test_fatality() {
        assert!(RondaError::Schema("x".into()).is_fatal());
        assert!(RondaError::EmptyDataset { input_rows: 0 }.is_fatal());
        assert!(RondaError::TrainingTimeout { secs: 1 }.is_fatal());
        assert!(!RondaError::Serialization("disk full".into()).is_fatal());
        assert!(!RondaError::Model("singular".into()).is_fatal());
    }

    #[test]
    fn test_error_from_string() {
        let err: RondaError = "boom".into();
        assert!(matches!(err, RondaError::Other(_)));
    }
}
