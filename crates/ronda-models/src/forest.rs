//! Bagged regression trees with per-split feature subsampling.

use crate::boosting::sum_importances;
use crate::tree::{RegressionTree, TreeParams};
use ndarray::Array2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Random forest configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForestParams {
    /// Number of trees.
    pub n_estimators: usize,
    /// Fraction of features considered at each split.
    pub max_features: f64,
    /// Per-tree growth limits; `max_features` here is derived from the fraction.
    pub tree: TreeParams,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_estimators: 200,
            max_features: 0.7,
            tree: TreeParams::default(),
        }
    }
}

/// A fitted random forest; predictions average the trees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    trees: Vec<RegressionTree>,
}

impl RandomForest {
    /// Fit on every row of `x`.
    ///
    /// Trees are grown in parallel, each from its own RNG seeded with
    /// `seed + tree index`, so the result does not depend on thread count.
    pub fn fit(x: &Array2<f64>, y: &[f64], params: ForestParams, seed: u64) -> Self {
        let n_samples = x.nrows();
        let n_features = x.ncols();
        let per_split = ((n_features as f64 * params.max_features).ceil() as usize).clamp(1, n_features.max(1));
        let tree_params = TreeParams {
            max_features: Some(per_split),
            ..params.tree
        };

        let trees = (0..params.n_estimators)
            .into_par_iter()
            .map(|tree_idx| {
                let mut rng = StdRng::seed_from_u64(seed.wrapping_add(tree_idx as u64));
                let bootstrap: Vec<usize> = (0..n_samples)
                    .map(|_| rng.random_range(0..n_samples))
                    .collect();
                RegressionTree::fit(x, y, &bootstrap, &tree_params, &mut rng)
            })
            .collect();

        Self { trees }
    }

    /// Predict every row of `x`.
    pub fn predict(&self, x: &Array2<f64>) -> Vec<f64> {
        let mut predictions = vec![0.0; x.nrows()];
        if self.trees.is_empty() {
            return predictions;
        }
        for tree in &self.trees {
            for (p, v) in predictions.iter_mut().zip(tree.predict(x)) {
                *p += v;
            }
        }
        let n = self.trees.len() as f64;
        predictions.iter_mut().for_each(|p| *p /= n);
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

#[cfg(test)]
mod tests {
    use super::*;

    fn step_data(n: usize) -> (Array2<f64>, Vec<f64>) {
        let x = Array2::from_shape_fn((n, 3), |(i, j)| match j {
            0 => i as f64,
            1 => (i % 3) as f64,
            _ => 0.0,
        });
        let y = (0..n).map(|i| if i < n / 2 { 10.0 } else { 50.0 }).collect();
        (x, y)
    }

    #[test]
    fn test_forest_fits_step() {
        let (x, y) = step_data(60);
        let params = ForestParams {
            n_estimators: 30,
            max_features: 1.0,
            tree: TreeParams {
                max_depth: 4,
                min_samples_leaf: 2,
                max_features: None,
            },
        };
        let forest = RandomForest::fit(&x, &y, params, 42);
        let predictions = forest.predict(&x);

        assert_eq!(forest.n_trees(), 30);
        assert!(predictions[0] < 20.0);
        assert!(predictions[59] > 40.0);
    }

    #[test]
    fn test_seeded_fit_is_deterministic() {
        let (x, y) = step_data(40);
        let params = ForestParams {
            n_estimators: 10,
            ..ForestParams::default()
        };
        let a = RandomForest::fit(&x, &y, params, 3);
        let b = RandomForest::fit(&x, &y, params, 3);
        assert_eq!(a, b);
    }

    #[test]
    fn test_empty_forest_predicts_zero() {
        let (x, y) = step_data(10);
        let params = ForestParams {
            n_estimators: 0,
            ..ForestParams::default()
        };
        let forest = RandomForest::fit(&x, &y, params, 0);
        assert_eq!(forest.predict(&x), vec![0.0; 10]);
    }
}
