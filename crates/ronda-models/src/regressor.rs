//! The closed set of regressors and their shared configuration.

use crate::boosting::{BoostingParams, GradientBoosting};
use crate::forest::{ForestParams, RandomForest};
use crate::linear::RidgeRegression;
use crate::tree::TreeParams;
use ndarray::Array2;
use ronda_traits::{Result, RondaError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which regressor to train.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegressorKind {
    /// Squared-loss boosting over regression trees with row subsampling.
    #[default]
    GradientBoosting,
    /// Bootstrap-bagged trees with per-split feature subsampling.
    RandomForest,
    /// Ridge-regularized least squares.
    Linear,
}

impl RegressorKind {
    /// Stable identifier used in artifacts and reports.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::GradientBoosting => "gradient_boosting",
            Self::RandomForest => "random_forest",
            Self::Linear => "linear",
        }
    }
}

impl fmt::Display for RegressorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Hyperparameters shared by every regressor; each kind reads the subset it needs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HyperParameters {
    /// Trees in the ensemble (boosting rounds or forest size).
    pub n_estimators: usize,
    /// Boosting shrinkage.
    pub learning_rate: f64,
    /// Maximum tree depth.
    pub max_depth: usize,
    /// Minimum rows in a tree leaf.
    pub min_samples_leaf: usize,
    /// Boosting row-sampling fraction.
    pub subsample: f64,
    /// Forest per-split feature fraction.
    pub max_features: f64,
    /// Ridge penalty.
    pub l2_alpha: f64,
}

impl Default for HyperParameters {
    fn default() -> Self {
        Self {
            n_estimators: 200,
            learning_rate: 0.05,
            max_depth: 6,
            min_samples_leaf: 5,
            subsample: 0.8,
            max_features: 0.7,
            l2_alpha: 1.0,
        }
    }
}

/// Deepest tree accepted; keeps artifacts well inside JSON nesting limits.
pub const MAX_TREE_DEPTH: usize = 32;

impl HyperParameters {
    /// Check every value is in range.
    ///
    /// # Errors
    ///
    /// Returns [`RondaError::InvalidConfig`] naming the first bad field.
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(RondaError::InvalidConfig(msg));
        if self.n_estimators == 0 {
            return invalid("n_estimators must be at least 1".into());
        }
        if !(self.learning_rate > 0.0 && self.learning_rate <= 1.0) {
            return invalid(format!("learning_rate must be in (0, 1], got {}", self.learning_rate));
        }
        if self.max_depth == 0 || self.max_depth > MAX_TREE_DEPTH {
            return invalid(format!(
                "max_depth must be in 1..={MAX_TREE_DEPTH}, got {}",
                self.max_depth
            ));
        }
        if self.min_samples_leaf == 0 {
            return invalid("min_samples_leaf must be at least 1".into());
        }
        if !(self.subsample > 0.0 && self.subsample <= 1.0) {
            return invalid(format!("subsample must be in (0, 1], got {}", self.subsample));
        }
        if !(self.max_features > 0.0 && self.max_features <= 1.0) {
            return invalid(format!("max_features must be in (0, 1], got {}", self.max_features));
        }
        if !(self.l2_alpha >= 0.0 && self.l2_alpha.is_finite()) {
            return invalid(format!("l2_alpha must be finite and non-negative, got {}", self.l2_alpha));
        }
        Ok(())
    }

    const fn tree(&self) -> TreeParams {
        TreeParams {
            max_depth: self.max_depth,
            min_samples_leaf: self.min_samples_leaf,
            max_features: None,
        }
    }

    /// Parameters for [`GradientBoosting`].
    pub const fn boosting(&self) -> BoostingParams {
        BoostingParams {
            n_estimators: self.n_estimators,
            learning_rate: self.learning_rate,
            subsample: self.subsample,
            tree: self.tree(),
        }
    }

    /// Parameters for [`RandomForest`].
    pub const fn forest(&self) -> ForestParams {
        ForestParams {
            n_estimators: self.n_estimators,
            max_features: self.max_features,
            tree: self.tree(),
        }
    }
}

/// A fitted regressor on a dense design matrix.
///
/// Implementations must be thread-safe so fitted models can be shared across
/// evaluation tasks.
pub trait Estimator: Send + Sync {
    /// Predict every row of `x`.
    ///
    /// # Errors
    ///
    /// Returns [`RondaError::Model`] if `x` has the wrong width.
    fn predict(&self, x: &Array2<f64>) -> Result<Vec<f64>>;

    /// Number of input columns expected.
    fn n_features(&self) -> usize;

    /// Per-column importance, when the model provides one.
    fn feature_importances(&self) -> Option<Vec<f64>>;

    /// Name of the model, used in logs.
    fn name(&self) -> &str;
}

/// A fitted model of one of the supported kinds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Regressor {
    /// Gradient boosting ensemble.
    GradientBoosting {
        /// Design-matrix width.
        n_features: usize,
        /// The fitted ensemble.
        model: GradientBoosting,
    },
    /// Random forest.
    RandomForest {
        /// Design-matrix width.
        n_features: usize,
        /// The fitted forest.
        model: RandomForest,
    },
    /// Ridge regression.
    Linear {
        /// Design-matrix width.
        n_features: usize,
        /// The fitted linear model.
        model: RidgeRegression,
    },
}

impl Regressor {
    /// Fit a regressor of the given kind.
    ///
    /// # Errors
    ///
    /// Returns [`RondaError::Model`] on empty or mismatched input, or when
    /// the linear system cannot be solved.
    pub fn fit(
        kind: RegressorKind,
        params: &HyperParameters,
        x: &Array2<f64>,
        y: &[f64],
        seed: u64,
    ) -> Result<Self> {
        if x.nrows() == 0 || x.nrows() != y.len() {
            return Err(RondaError::Model(format!(
                "cannot fit {kind} on {} rows with {} targets",
                x.nrows(),
                y.len()
            )));
        }
        if let Some(bad) = y.iter().find(|v| !v.is_finite()) {
            return Err(RondaError::Model(format!("non-finite target value {bad}")));
        }

        let n_features = x.ncols();
        Ok(match kind {
            RegressorKind::GradientBoosting => Self::GradientBoosting {
                n_features,
                model: GradientBoosting::fit(x, y, params.boosting(), seed),
            },
            RegressorKind::RandomForest => Self::RandomForest {
                n_features,
                model: RandomForest::fit(x, y, params.forest(), seed),
            },
            RegressorKind::Linear => Self::Linear {
                n_features,
                model: RidgeRegression::fit(x, y, params.l2_alpha)?,
            },
        })
    }

    /// The kind of this regressor.
    pub const fn kind(&self) -> RegressorKind {
        match self {
            Self::GradientBoosting { .. } => RegressorKind::GradientBoosting,
            Self::RandomForest { .. } => RegressorKind::RandomForest,
            Self::Linear { .. } => RegressorKind::Linear,
        }
    }
}

impl Estimator for Regressor {
    fn predict(&self, x: &Array2<f64>) -> Result<Vec<f64>> {
        if x.ncols() != self.n_features() {
            return Err(RondaError::Model(format!(
                "expected {} columns, got {}",
                self.n_features(),
                x.ncols()
            )));
        }
        Ok(match self {
            Self::GradientBoosting { model, .. } => model.predict(x),
            Self::RandomForest { model, .. } => model.predict(x),
            Self::Linear { model, .. } => model.predict(x),
        })
    }

    fn n_features(&self) -> usize {
        match self {
            Self::GradientBoosting { n_features, .. }
            | Self::RandomForest { n_features, .. }
            | Self::Linear { n_features, .. } => *n_features,
        }
    }

    fn feature_importances(&self) -> Option<Vec<f64>> {
        match self {
            Self::GradientBoosting { model, .. } => Some(model.feature_importances()),
            Self::RandomForest { model, .. } => Some(model.feature_importances()),
            Self::Linear { model, .. } => {
                Some(model.coefficients().iter().map(|c| c.abs()).collect())
            }
        }
    }

    fn name(&self) -> &str {
        self.kind().as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    fn data() -> (Array2<f64>, Vec<f64>) {
        let x = Array2::from_shape_fn((40, 2), |(i, j)| (i * (j + 1)) as f64);
        let y = (0..40).map(|i| i as f64 * 0.5).collect();
        (x, y)
    }

    #[test]
    fn test_default_hyperparameters_valid() {
        let hp = HyperParameters::default();
        assert!(hp.validate().is_ok());
        assert_eq!(hp.n_estimators, 200);
        assert_eq!(hp.learning_rate, 0.05);
        assert_eq!(hp.max_depth, 6);
    }

    #[test]
    fn test_invalid_hyperparameters() {
        let bad = [
            HyperParameters { n_estimators: 0, ..Default::default() },
            HyperParameters { learning_rate: 0.0, ..Default::default() },
            HyperParameters { subsample: 1.5, ..Default::default() },
            HyperParameters { max_features: f64::NAN, ..Default::default() },
            HyperParameters { max_depth: 100, ..Default::default() },
            HyperParameters { l2_alpha: -1.0, ..Default::default() },
        ];
        for hp in bad {
            assert!(matches!(hp.validate(), Err(RondaError::InvalidConfig(_))), "{hp:?}");
        }
    }

    #[test]
    fn test_every_kind_fits_and_predicts() {
        let (x, y) = data();
        let hp = HyperParameters {
            n_estimators: 10,
            ..Default::default()
        };
        for kind in [
            RegressorKind::GradientBoosting,
            RegressorKind::RandomForest,
            RegressorKind::Linear,
        ] {
            let model = Regressor::fit(kind, &hp, &x, &y, 42).unwrap();
            assert_eq!(model.kind(), kind);
            assert_eq!(model.name(), kind.as_str());
            let predictions = model.predict(&x).unwrap();
            assert_eq!(predictions.len(), 40);
            assert!(predictions.iter().all(|p| p.is_finite()));
            assert_eq!(model.feature_importances().unwrap().len(), 2);
        }
    }

    #[test]
    fn test_width_mismatch_is_error() {
        let (x, y) = data();
        let model = Regressor::fit(RegressorKind::Linear, &HyperParameters::default(), &x, &y, 0).unwrap();
        let narrow = Array2::<f64>::zeros((3, 1));
        assert!(matches!(model.predict(&narrow), Err(RondaError::Model(_))));
    }

    #[test]
    fn test_serde_tagged_by_kind() {
        let (x, y) = data();
        let model = Regressor::fit(RegressorKind::Linear, &HyperParameters::default(), &x, &y, 0).unwrap();
        let json = serde_json::to_value(&model).unwrap();
        assert_eq!(json["kind"], "linear");
        let back: Regressor = serde_json::from_value(json).unwrap();
        assert_eq!(back, model);
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(
            serde_json::to_string(&RegressorKind::RandomForest).unwrap(),
            "\"random_forest\""
        );
        assert_eq!(RegressorKind::default(), RegressorKind::GradientBoosting);
    }
}
