//! Regression models for Ronda engagement forecasts.
//!
//! One [`ModelArtifact`] is trained per (segment, horizon) pair. An artifact
//! bundles the fitted [`Preprocessor`] (median imputation, standardization and
//! one-hot encoding) with a [`Regressor`] trained on `ln(1 + views)`.
//!
//! Three regressor families are available: gradient-boosted trees (default),
//! a random forest and ridge regression. All of them are deterministic for a
//! fixed seed.
//!
//! # Examples
//!
//! ```rust
//! use ronda_features::FeatureKind;
//! use ronda_models::{FeatureColumn, ModelArtifact, ModelConfig, RegressorKind};
//! use ronda_traits::{FeatureMap, FeatureValue, Horizon, Segment};
//!
//! let rows: Vec<FeatureMap> = (0..20)
//!     .map(|i| {
//!         let mut map = FeatureMap::new();
//!         map.insert("duration_seconds".into(), FeatureValue::from(f64::from(i)));
//!         map
//!     })
//!     .collect();
//! let refs: Vec<&FeatureMap> = rows.iter().collect();
//! let targets: Vec<f64> = (0..20).map(|i| f64::from(i) * 10.0).collect();
//!
//! let config = ModelConfig { kind: RegressorKind::Linear, ..Default::default() };
//! let columns = [FeatureColumn::new("duration_seconds", FeatureKind::Numeric)];
//! let artifact =
//!     ModelArtifact::fit(Segment::ShortForm, Horizon::Day1, &columns, &refs, &targets, &config)
//!         .unwrap();
//! assert!(artifact.predict(&refs).unwrap().iter().all(|p| *p >= 0.0));
//! ```

#![doc(issue_tracker_base_url = "https://github.com/factordynamics/ronda/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod artifact;
mod boosting;
mod forest;
mod linear;
mod preprocess;
mod regressor;
mod tree;

// Re-export main types
pub use artifact::{ModelArtifact, ModelConfig, ModelMetadata, TARGET_TRANSFORM, artifact_file_name};
pub use boosting::{BoostingParams, GradientBoosting};
pub use forest::{ForestParams, RandomForest};
pub use linear::RidgeRegression;
pub use preprocess::{FeatureColumn, Preprocessor, UNKNOWN_LEVEL};
pub use regressor::{Estimator, HyperParameters, MAX_TREE_DEPTH, Regressor, RegressorKind};
pub use tree::{RegressionTree, TreeNode, TreeParams};
