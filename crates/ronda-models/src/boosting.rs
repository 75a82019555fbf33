//! Squared-loss gradient boosting over regression trees.

use crate::tree::{RegressionTree, TreeParams};
use ndarray::Array2;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

/// Gradient boosting configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoostingParams {
    /// Number of boosting rounds.
    pub n_estimators: usize,
    /// Shrinkage applied to each tree.
    pub learning_rate: f64,
    /// Fraction of rows sampled (without replacement) per round.
    pub subsample: f64,
    /// Per-tree growth limits.
    pub tree: TreeParams,
}

impl Default for BoostingParams {
    fn default() -> Self {
        Self {
            n_estimators: 200,
            learning_rate: 0.05,
            subsample: 0.8,
            tree: TreeParams::default(),
        }
    }
}

/// A fitted gradient boosting ensemble.
///
/// Starts from the mean target and adds `learning_rate` times each tree's
/// prediction of the current residuals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradientBoosting {
    params: BoostingParams,
    initial_prediction: f64,
    trees: Vec<RegressionTree>,
}

impl GradientBoosting {
    /// Fit on every row of `x`.
    pub fn fit(x: &Array2<f64>, y: &[f64], params: BoostingParams, seed: u64) -> Self {
        let n_samples = x.nrows();
        let initial_prediction = if y.is_empty() {
            0.0
        } else {
            y.iter().sum::<f64>() / y.len() as f64
        };
        let mut predictions = vec![initial_prediction; n_samples];
        let mut rng = StdRng::seed_from_u64(seed);
        let mut trees = Vec::with_capacity(params.n_estimators);

        let sample_size = ((n_samples as f64 * params.subsample).ceil() as usize).clamp(1, n_samples.max(1));
        let mut all_rows: Vec<usize> = (0..n_samples).collect();

        for _ in 0..params.n_estimators {
            let residuals: Vec<f64> = y
                .iter()
                .zip(&predictions)
                .map(|(yi, pi)| yi - pi)
                .collect();

            all_rows.shuffle(&mut rng);
            let mut sampled = all_rows[..sample_size.min(n_samples)].to_vec();
            sampled.sort_unstable();

            let tree = RegressionTree::fit(x, &residuals, &sampled, &params.tree, &mut rng);
            for (p, update) in predictions.iter_mut().zip(tree.predict(x)) {
                *p += params.learning_rate * update;
            }
            trees.push(tree);
        }

        Self {
            params,
            initial_prediction,
            trees,
        }
    }

    /// Predict every row of `x`.
    pub fn predict(&self, x: &Array2<f64>) -> Vec<f64> {
        let mut predictions = vec![self.initial_prediction; x.nrows()];
        for tree in &self.trees {
            for (p, update) in predictions.iter_mut().zip(tree.predict(x)) {
                *p += self.params.learning_rate * update;
            }
        }
        predictions
    }

    /// Squared-error reduction per feature summed over all trees.
    pub fn feature_importances(&self) -> Vec<f64> {
        sum_importances(&self.trees)
    }

    /// Number of fitted trees.
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }
}

/// Column-wise sum of tree importances.
pub(crate) fn sum_importances(trees: &[RegressionTree]) -> Vec<f64> {
    let width = trees.first().map_or(0, RegressionTree::n_features);
    let mut total = vec![0.0; width];
    for tree in trees {
        for (t, v) in total.iter_mut().zip(tree.importances()) {
            *t += v;
        }
    }
    total
}
