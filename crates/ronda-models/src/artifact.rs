//! Fitted preprocessing plus regressor, persisted per (segment, horizon).

use crate::preprocess::{FeatureColumn, Preprocessor};
use crate::regressor::{Estimator, HyperParameters, Regressor, RegressorKind};
use chrono::{DateTime, Utc};
use ronda_traits::stats::{inverse_log_transform, log_transform};
use ronda_traits::{FeatureMap, Horizon, Result, RondaError, Segment};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Name of the target transform recorded in every artifact.
pub const TARGET_TRANSFORM: &str = "log1p";

/// What to fit for one pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Regressor family.
    pub kind: RegressorKind,
    /// Hyperparameters.
    pub hyperparameters: HyperParameters,
    /// Seed for every random choice made while fitting.
    pub random_seed: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            kind: RegressorKind::default(),
            hyperparameters: HyperParameters::default(),
            random_seed: 42,
        }
    }
}

/// Descriptive fields stored alongside the fitted model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetadata {
    /// Segment the model serves.
    pub segment: Segment,
    /// Horizon the model forecasts.
    pub horizon: Horizon,
    /// Regressor family.
    pub regressor_kind: RegressorKind,
    /// Hyperparameters used.
    pub hyperparameters: HyperParameters,
    /// Seed used.
    pub random_seed: u64,
    /// Input features, in order.
    pub features: Vec<String>,
    /// Design-matrix columns after encoding.
    pub encoded_features: Vec<String>,
    /// Rows the model was fitted on.
    pub training_samples: usize,
    /// When fitting finished.
    pub trained_at: DateTime<Utc>,
    /// Transform applied to the target before fitting.
    pub target_transform: String,
    /// Normalized importance per input feature, when the regressor provides one.
    pub feature_importances: Option<BTreeMap<String, f64>>,
}

/// A trained model for one (segment, horizon) pair.
///
/// Predictions are returned on the original view scale: the regressor output
/// is inverted with `exp(x) - 1` and clamped at zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    /// Descriptive fields.
    pub metadata: ModelMetadata,
    preprocessor: Preprocessor,
    regressor: Regressor,
}

impl ModelArtifact {
    /// Fit preprocessing and regressor on raw-scale targets.
    ///
    /// # Errors
    ///
    /// Returns [`RondaError::Model`] if the inputs are empty, mismatched,
    /// contain a negative or non-finite target, or the regressor fails.
    pub fn fit(
        segment: Segment,
        horizon: Horizon,
        columns: &[FeatureColumn],
        rows: &[&FeatureMap],
        targets: &[f64],
        config: &ModelConfig,
    ) -> Result<Self> {
        if rows.len() != targets.len() {
            return Err(RondaError::Model(format!(
                "{} feature rows but {} targets",
                rows.len(),
                targets.len()
            )));
        }
        if let Some(bad) = targets.iter().find(|t| !(t.is_finite() && **t >= 0.0)) {
            return Err(RondaError::Model(format!("invalid target value {bad}")));
        }

        let preprocessor = Preprocessor::fit(columns, rows)?;
        let x = preprocessor.transform(rows);
        let y: Vec<f64> = targets.iter().map(|&t| log_transform(t)).collect();
        let regressor = Regressor::fit(
            config.kind,
            &config.hyperparameters,
            &x,
            &y,
            config.random_seed,
        )?;

        let feature_importances = regressor
            .feature_importances()
            .map(|raw| importances_by_feature(&preprocessor, &raw));

        let metadata = ModelMetadata {
            segment,
            horizon,
            regressor_kind: config.kind,
            hyperparameters: config.hyperparameters,
            random_seed: config.random_seed,
            features: columns.iter().map(|c| c.name.clone()).collect(),
            encoded_features: preprocessor.output_names(),
            training_samples: rows.len(),
            trained_at: Utc::now(),
            target_transform: TARGET_TRANSFORM.to_string(),
            feature_importances,
        };

        tracing::debug!(
            segment = %segment,
            horizon = %horizon,
            kind = %config.kind,
            rows = rows.len(),
            columns = x.ncols(),
            "fitted model"
        );

        Ok(Self {
            metadata,
            preprocessor,
            regressor,
        })
    }

    /// Predictions on the transformed (`ln(1 + y)`) scale.
    ///
    /// # Errors
    ///
    /// Returns [`RondaError::Model`] if the regressor rejects the design matrix.
    pub fn predict_log(&self, rows: &[&FeatureMap]) -> Result<Vec<f64>> {
        let x = self.preprocessor.transform(rows);
        self.regressor.predict(&x)
    }

    /// Predictions on the view scale, never negative.
    ///
    /// # Errors
    ///
    /// Returns [`RondaError::Model`] if the regressor rejects the design matrix.
    pub fn predict(&self, rows: &[&FeatureMap]) -> Result<Vec<f64>> {
        Ok(self
            .predict_log(rows)?
            .into_iter()
            .map(|p| inverse_log_transform(p).max(0.0))
            .collect())
    }

    /// The fitted regressor.
    pub const fn regressor(&self) -> &Regressor {
        &self.regressor
    }

    /// The fitted preprocessing.
    pub const fn preprocessor(&self) -> &Preprocessor {
        &self.preprocessor
    }

    /// File name for this artifact, `{segment}_{horizon}.json`.
    pub fn file_name(&self) -> String {
        artifact_file_name(self.metadata.segment, self.metadata.horizon)
    }

    /// Serialize to pretty JSON.
    ///
    /// # Errors
    ///
    /// Returns [`RondaError::Serialization`] if encoding fails.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| RondaError::Serialization(e.to_string()))
    }

    /// Deserialize from JSON.
    ///
    /// # Errors
    ///
    /// Returns [`RondaError::Serialization`] if the text is not a valid artifact.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| RondaError::Serialization(e.to_string()))
    }
}

/// `{segment}_{horizon}.json`, e.g. `short_form_24h.json`.
pub fn artifact_file_name(segment: Segment, horizon: Horizon) -> String {
    format!("{segment}_{horizon}.json")
}

/// Sum encoded-column importances back onto input features and normalize.
fn importances_by_feature(preprocessor: &Preprocessor, raw: &[f64]) -> BTreeMap<String, f64> {
    let mut by_feature: BTreeMap<String, f64> = preprocessor
        .columns()
        .iter()
        .map(|c| (c.name.clone(), 0.0))
        .collect();
    for (source, value) in preprocessor.output_sources().into_iter().zip(raw) {
        if let Some(total) = by_feature.get_mut(source) {
            *total += value;
        }
    }
    let sum: f64 = by_feature.values().sum();
    if sum > 0.0 {
        by_feature.values_mut().for_each(|v| *v /= sum);
    }
    by_feature
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ronda_features::FeatureKind;
    use ronda_traits::FeatureValue;

    fn rows(n: usize) -> (Vec<FeatureMap>, Vec<f64>) {
        let maps = (0..n)
            .map(|i| {
                let mut map = FeatureMap::new();
                map.insert("duration_seconds".into(), FeatureValue::from(i as f64));
                map.insert(
                    "language".into(),
                    FeatureValue::Categorical(if i % 2 == 0 { "en" } else { "es" }.into()),
                );
                map
            })
            .collect();
        let targets = (0..n).map(|i| (i * 100) as f64).collect();
        (maps, targets)
    }

    fn columns() -> Vec<FeatureColumn> {
        vec![
            FeatureColumn::new("duration_seconds", FeatureKind::Numeric),
            FeatureColumn::new("language", FeatureKind::Categorical),
        ]
    }

    fn small_config(kind: RegressorKind) -> ModelConfig {
        ModelConfig {
            kind,
            hyperparameters: HyperParameters {
                n_estimators: 20,
                min_samples_leaf: 2,
                ..Default::default()
            },
            random_seed: 42,
        }
    }

    #[test]
    fn test_fit_and_predict_non_negative() {
        let (maps, targets) = rows(60);
        let refs: Vec<&FeatureMap> = maps.iter().collect();
        let artifact = ModelArtifact::fit(
            Segment::ShortForm,
            Horizon::Day7,
            &columns(),
            &refs,
            &targets,
            &small_config(RegressorKind::GradientBoosting),
        )
        .unwrap();

        let predictions = artifact.predict(&refs).unwrap();
        assert_eq!(predictions.len(), 60);
        assert!(predictions.iter().all(|&p| p >= 0.0 && p.is_finite()));
        assert!(predictions[59] > predictions[1]);

        let meta = &artifact.metadata;
        assert_eq!(meta.training_samples, 60);
        assert_eq!(meta.target_transform, "log1p");
        assert_eq!(meta.features, vec!["duration_seconds", "language"]);
        assert_eq!(artifact.file_name(), "short_form_7d.json");

        let importances = meta.feature_importances.as_ref().unwrap();
        let total: f64 = importances.values().sum();
        assert_relative_eq!(total, 1.0, epsilon = 1e-9);
        assert!(importances["duration_seconds"] > importances["language"]);
    }

    #[test]
    fn test_linear_predictions_clamped() {
        let (maps, _) = rows(10);
        let refs: Vec<&FeatureMap> = maps.iter().collect();
        // Decreasing targets push extrapolation below zero on the log scale.
        let targets: Vec<f64> = (0..10).map(|i| if i < 5 { 1_000.0 } else { 0.0 }).collect();
        let artifact = ModelArtifact::fit(
            Segment::LongForm,
            Horizon::Day1,
            &columns(),
            &refs,
            &targets,
            &small_config(RegressorKind::Linear),
        )
        .unwrap();

        let mut far = FeatureMap::new();
        far.insert("duration_seconds".into(), FeatureValue::from(1_000.0));
        far.insert("language".into(), FeatureValue::Categorical("en".into()));
        let predictions = artifact.predict(&[&far]).unwrap();
        assert_eq!(predictions, vec![0.0]);
        assert!(artifact.predict_log(&[&far]).unwrap()[0] < 0.0);
    }

    #[test]
    fn test_json_round_trip_preserves_predictions() {
        let (maps, targets) = rows(30);
        let refs: Vec<&FeatureMap> = maps.iter().collect();
        let artifact = ModelArtifact::fit(
            Segment::ShortForm,
            Horizon::Day30,
            &columns(),
            &refs,
            &targets,
            &small_config(RegressorKind::RandomForest),
        )
        .unwrap();

        let restored = ModelArtifact::from_json(&artifact.to_json().unwrap()).unwrap();
        let before = artifact.predict(&refs).unwrap();
        let after = restored.predict(&refs).unwrap();
        for (a, b) in before.iter().zip(&after) {
            assert_relative_eq!(a, b, max_relative = 1e-9);
        }
        assert_eq!(restored.metadata.segment, Segment::ShortForm);
        assert_eq!(restored.regressor().kind(), RegressorKind::RandomForest);
    }

    #[test]
    fn test_negative_target_rejected() {
        let (maps, mut targets) = rows(5);
        targets[0] = -1.0;
        let refs: Vec<&FeatureMap> = maps.iter().collect();
        let err = ModelArtifact::fit(
            Segment::ShortForm,
            Horizon::Day1,
            &columns(),
            &refs,
            &targets,
            &ModelConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, RondaError::Model(_)));
    }

    #[test]
    fn test_artifact_file_names() {
        assert_eq!(artifact_file_name(Segment::LongForm, Horizon::Day1), "long_form_24h.json");
    }
}
