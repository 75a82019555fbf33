//! Pipeline configuration.
//!
//! Every field has a documented default, so an empty JSON object is a valid
//! configuration. Unknown keys are rejected to surface typos early.

use ronda_eval::split::validate_fractions;
use ronda_features::registry::{all_features, at_publish_features, get_feature_info};
use ronda_ingest::QualityConfig;
use ronda_models::{FeatureColumn, HyperParameters, ModelConfig, RegressorKind};
use ronda_traits::{DEFAULT_SHORT_FORM_THRESHOLD_SECONDS, Result, RondaError};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Which features the models are trained on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureSetKind {
    /// Only features known at publish time. The production setting.
    #[default]
    AtPublish,
    /// Every feature, including post-publish aggregates and time-series
    /// derivatives. Useful for diagnostics only: the resulting models leak.
    Diagnostic,
}

/// Configuration of a pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Fraction of rows (latest by publish time) held out for testing.
    pub test_fraction: f64,
    /// Fraction of rows preceding the test slice used for validation.
    pub validation_fraction: f64,
    /// Seed for every random choice in model fitting.
    pub random_seed: u64,
    /// `view_count` quantile above which rows are dropped as outliers.
    pub outlier_quantile: f64,
    /// Longest accepted duration in seconds.
    pub max_duration_seconds: i64,
    /// Items at or below this duration are short-form.
    pub short_form_threshold_seconds: i64,
    /// Minimum usable rows in both training and validation for a pair to train.
    pub min_samples_per_pair: usize,
    /// Regressor family.
    pub regressor_kind: RegressorKind,
    /// Regressor hyperparameters.
    pub regressor_hyperparameters: HyperParameters,
    /// Feature selection for training.
    pub feature_set: FeatureSetKind,
    /// Refit the persisted model on train + validation after validation metrics
    /// are computed.
    pub refit_on_train_validation: bool,
    /// Wall-clock budget for the whole training step.
    pub training_timeout_secs: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            test_fraction: 0.15,
            validation_fraction: 0.15,
            random_seed: 42,
            outlier_quantile: 0.999,
            max_duration_seconds: 14_400,
            short_form_threshold_seconds: DEFAULT_SHORT_FORM_THRESHOLD_SECONDS,
            min_samples_per_pair: 50,
            regressor_kind: RegressorKind::default(),
            regressor_hyperparameters: HyperParameters::default(),
            feature_set: FeatureSetKind::default(),
            refit_on_train_validation: false,
            training_timeout_secs: 3_600,
        }
    }
}

impl PipelineConfig {
    /// Parse a configuration from JSON. Missing keys take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`RondaError::InvalidConfig`] if the JSON is malformed or
    /// contains an unknown key or a value of the wrong type.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| RondaError::InvalidConfig(e.to_string()))
    }

    /// Read a configuration file.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be read, or
    /// [`RondaError::InvalidConfig`] if it does not parse.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Check every field once, before any work starts.
    ///
    /// # Errors
    ///
    /// Returns [`RondaError::InvalidConfig`] naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        validate_fractions(self.validation_fraction, self.test_fraction)?;

        if !(self.outlier_quantile > 0.0 && self.outlier_quantile <= 1.0) {
            return Err(RondaError::InvalidConfig(format!(
                "outlier_quantile must be in (0, 1], got {}",
                self.outlier_quantile
            )));
        }
        if self.max_duration_seconds <= 0 {
            return Err(RondaError::InvalidConfig(format!(
                "max_duration_seconds must be positive, got {}",
                self.max_duration_seconds
            )));
        }
        if self.short_form_threshold_seconds <= 0 {
            return Err(RondaError::InvalidConfig(format!(
                "short_form_threshold_seconds must be positive, got {}",
                self.short_form_threshold_seconds
            )));
        }
        if self.min_samples_per_pair == 0 {
            return Err(RondaError::InvalidConfig(
                "min_samples_per_pair must be at least 1".into(),
            ));
        }
        if self.training_timeout_secs == 0 {
            return Err(RondaError::InvalidConfig(
                "training_timeout_secs must be positive".into(),
            ));
        }
        self.regressor_hyperparameters.validate()
    }

    /// Thresholds for the quality filter.
    pub const fn quality(&self) -> QualityConfig {
        QualityConfig {
            max_duration_seconds: self.max_duration_seconds,
            outlier_quantile: self.outlier_quantile,
        }
    }

    /// Settings for fitting one model.
    pub const fn model(&self) -> ModelConfig {
        ModelConfig {
            kind: self.regressor_kind,
            hyperparameters: self.regressor_hyperparameters,
            random_seed: self.random_seed,
        }
    }

    /// Names of the features models are trained on, in catalog order.
    pub fn selected_features(&self) -> Vec<&'static str> {
        match self.feature_set {
            FeatureSetKind::AtPublish => at_publish_features(),
            FeatureSetKind::Diagnostic => all_features(),
        }
    }

    /// Selected features with their value kinds.
    pub fn feature_columns(&self) -> Vec<FeatureColumn> {
        self.selected_features()
            .into_iter()
            .filter_map(get_feature_info)
            .map(|info| FeatureColumn::new(info.name, info.kind))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ronda_features::FeatureKind;
    use ronda_features::registry::is_leakage_safe;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.test_fraction, 0.15);
        assert_eq!(config.validation_fraction, 0.15);
        assert_eq!(config.random_seed, 42);
        assert_eq!(config.min_samples_per_pair, 50);
        assert_eq!(config.short_form_threshold_seconds, 60);
        assert_eq!(config.regressor_kind, RegressorKind::GradientBoosting);
        assert_eq!(config.regressor_hyperparameters.n_estimators, 200);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_json_is_default() {
        assert_eq!(PipelineConfig::from_json("{}").unwrap(), PipelineConfig::default());
    }

    #[test]
    fn test_partial_json_overrides() {
        let config = PipelineConfig::from_json(
            r#"{
                "test_fraction": 0.2,
                "regressor_kind": "random_forest",
                "regressor_hyperparameters": { "n_estimators": 50 },
                "feature_set": "diagnostic"
            }"#,
        )
        .unwrap();
        assert_eq!(config.test_fraction, 0.2);
        assert_eq!(config.regressor_kind, RegressorKind::RandomForest);
        assert_eq!(config.regressor_hyperparameters.n_estimators, 50);
        assert_eq!(config.regressor_hyperparameters.max_depth, 6);
        assert_eq!(config.feature_set, FeatureSetKind::Diagnostic);
        assert_eq!(config.validation_fraction, 0.15);
    }

    #[test]
    fn test_unknown_key_rejected() {
        let err = PipelineConfig::from_json(r#"{"tset_fraction": 0.2}"#).unwrap_err();
        assert!(matches!(err, RondaError::InvalidConfig(_)));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let bad = [
            PipelineConfig {
                test_fraction: 0.6,
                validation_fraction: 0.5,
                ..Default::default()
            },
            PipelineConfig {
                outlier_quantile: 0.0,
                ..Default::default()
            },
            PipelineConfig {
                max_duration_seconds: 0,
                ..Default::default()
            },
            PipelineConfig {
                min_samples_per_pair: 0,
                ..Default::default()
            },
            PipelineConfig {
                training_timeout_secs: 0,
                ..Default::default()
            },
        ];
        for config in bad {
            assert!(matches!(
                config.validate(),
                Err(RondaError::InvalidConfig(_))
            ));
        }
    }

    #[test]
    fn test_at_publish_columns_are_safe() {
        let columns = PipelineConfig::default().feature_columns();
        assert!(!columns.is_empty());
        assert!(columns.iter().all(|c| is_leakage_safe(&c.name)));
        assert!(
            columns
                .iter()
                .any(|c| c.name == "language" && c.kind == FeatureKind::Categorical)
        );
    }

    #[test]
    fn test_diagnostic_columns_include_time_series() {
        let config = PipelineConfig {
            feature_set: FeatureSetKind::Diagnostic,
            ..Default::default()
        };
        let names = config.selected_features();
        assert!(names.contains(&"growth_velocity"));
        assert_eq!(config.feature_columns().len(), names.len());
    }
}
