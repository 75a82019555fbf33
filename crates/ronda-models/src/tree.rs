//! Regression tree with squared-error splits.

use ndarray::{Array2, ArrayView1};
use rand::Rng;
use rand::seq::index;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Smallest variance reduction accepted as a split.
const MIN_GAIN: f64 = 1e-12;

/// Growth limits for a single tree.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TreeParams {
    /// Maximum depth; a depth of 0 is a single leaf.
    pub max_depth: usize,
    /// Minimum rows on each side of a split.
    pub min_samples_leaf: usize,
    /// Features considered per split; all when `None`.
    pub max_features: Option<usize>,
}

impl Default for TreeParams {
    fn default() -> Self {
        Self {
            max_depth: 6,
            min_samples_leaf: 5,
            max_features: None,
        }
    }
}

/// Tree node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TreeNode {
    /// Terminal node predicting the mean target of its rows.
    Leaf {
        /// Predicted value.
        value: f64,
        /// Training rows that reached the leaf.
        n_samples: usize,
    },
    /// Rows with `x[feature] <= threshold` go left.
    Split {
        /// Column index in the design matrix.
        feature: usize,
        /// Split point, midway between two observed values.
        threshold: f64,
        /// Subtree for values at or below the threshold.
        left: Box<TreeNode>,
        /// Subtree for values above the threshold.
        right: Box<TreeNode>,
        /// Training rows that reached the node.
        n_samples: usize,
    },
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    feature: usize,
    threshold: f64,
    gain: f64,
}

/// A fitted regression tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionTree {
    root: TreeNode,
    n_features: usize,
    importances: Vec<f64>,
}

impl RegressionTree {
    /// Grow a tree on the given rows of `x` (duplicates allowed, as in a
    /// bootstrap sample).
    ///
    /// `rng` is only consulted when `params.max_features` restricts the
    /// candidate features.
    pub fn fit<R: Rng + ?Sized>(
        x: &Array2<f64>,
        y: &[f64],
        rows: &[usize],
        params: &TreeParams,
        rng: &mut R,
    ) -> Self {
        let n_features = x.ncols();
        let mut importances = vec![0.0; n_features];
        let mut rows = rows.to_vec();
        let root = grow(x, y, &mut rows, 0, params, rng, &mut importances);
        Self {
            root,
            n_features,
            importances,
        }
    }

    /// Predict a single row.
    pub fn predict_row(&self, row: ArrayView1<'_, f64>) -> f64 {
        let mut node = &self.root;
        loop {
            match node {
                TreeNode::Leaf { value, .. } => return *value,
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                    ..
                } => {
                    node = if row[*feature] <= *threshold { left } else { right };
                }
            }
        }
    }

    /// Predict every row of `x`.
    pub fn predict(&self, x: &Array2<f64>) -> Vec<f64> {
        x.rows().into_iter().map(|row| self.predict_row(row)).collect()
    }

    /// Total squared-error reduction attributed to each feature.
    pub fn importances(&self) -> &[f64] {
        &self.importances
    }

    /// Number of columns the tree was fitted on.
    pub const fn n_features(&self) -> usize {
        self.n_features
    }

    /// Root node.
    pub const fn root(&self) -> &TreeNode {
        &self.root
    }

    /// Depth of the deepest leaf.
    pub fn depth(&self) -> usize {
        fn depth_of(node: &TreeNode) -> usize {
            match node {
                TreeNode::Leaf { .. } => 0,
                TreeNode::Split { left, right, .. } => 1 + depth_of(left).max(depth_of(right)),
            }
        }
        depth_of(&self.root)
    }
}

fn leaf(y: &[f64], rows: &[usize]) -> TreeNode {
    let sum: f64 = rows.iter().map(|&i| y[i]).sum();
    TreeNode::Leaf {
        value: if rows.is_empty() {
            0.0
        } else {
            sum / rows.len() as f64
        },
        n_samples: rows.len(),
    }
}

fn grow<R: Rng + ?Sized>(
    x: &Array2<f64>,
    y: &[f64],
    rows: &mut [usize],
    depth: usize,
    params: &TreeParams,
    rng: &mut R,
    importances: &mut [f64],
) -> TreeNode {
    let n = rows.len();
    let min_leaf = params.min_samples_leaf.max(1);
    if depth >= params.max_depth || n < 2 * min_leaf {
        return leaf(y, rows);
    }

    let n_features = x.ncols();
    let features: Vec<usize> = match params.max_features {
        Some(k) if k < n_features => {
            let mut chosen = index::sample(rng, n_features, k.max(1)).into_vec();
            chosen.sort_unstable();
            chosen
        }
        _ => (0..n_features).collect(),
    };

    let Some(best) = best_split(x, y, rows, &features, min_leaf) else {
        return leaf(y, rows);
    };
    importances[best.feature] += best.gain;

    // Partition in place: rows at or below the threshold first.
    let mut mid = 0;
    for i in 0..n {
        if x[[rows[i], best.feature]] <= best.threshold {
            rows.swap(i, mid);
            mid += 1;
        }
    }
    let (left_rows, right_rows) = rows.split_at_mut(mid);

    let left = grow(x, y, left_rows, depth + 1, params, rng, importances);
    let right = grow(x, y, right_rows, depth + 1, params, rng, importances);
    TreeNode::Split {
        feature: best.feature,
        threshold: best.threshold,
        left: Box::new(left),
        right: Box::new(right),
        n_samples: n,
    }
}

/// Best variance-reducing split over the candidate features.
///
/// Each feature is scanned in sorted order with running sums, so a scan is
/// `O(n log n)`. Ties keep the lowest feature index.
fn best_split(
    x: &Array2<f64>,
    y: &[f64],
    rows: &[usize],
    features: &[usize],
    min_leaf: usize,
) -> Option<Candidate> {
    let n = rows.len();
    let total: f64 = rows.iter().map(|&i| y[i]).sum();
    let parent_score = total * total / n as f64;

    let per_feature: Vec<Option<Candidate>> = features
        .par_iter()
        .map(|&feature| {
            let mut pairs: Vec<(f64, f64)> = rows.iter().map(|&i| (x[[i, feature]], y[i])).collect();
            pairs.sort_by(|a, b| a.0.total_cmp(&b.0));

            let mut best: Option<Candidate> = None;
            let mut left_sum = 0.0;
            for split in 1..n {
                left_sum += pairs[split - 1].1;
                let (lo, hi) = (pairs[split - 1].0, pairs[split].0);
                if split < min_leaf || n - split < min_leaf || lo >= hi {
                    continue;
                }
                let right_sum = total - left_sum;
                let n_left = split as f64;
                let n_right = (n - split) as f64;
                let gain = left_sum * left_sum / n_left + right_sum * right_sum / n_right
                    - parent_score;
                if gain > MIN_GAIN && best.is_none_or(|b| gain > b.gain) {
                    best = Some(Candidate {
                        feature,
                        threshold: lo + (hi - lo) / 2.0,
                        gain,
                    });
                }
            }
            best
        })
        .collect();

    per_feature
        .into_iter()
        .flatten()
        .fold(None, |acc: Option<Candidate>, c| match acc {
            Some(a) if a.gain >= c.gain => Some(a),
            _ => Some(c),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn step_data() -> (Array2<f64>, Vec<f64>) {
        let x = array![
            [1.0, 5.0],
            [2.0, 5.0],
            [3.0, 5.0],
            [4.0, 5.0],
            [10.0, 5.0],
            [11.0, 5.0],
            [12.0, 5.0],
            [13.0, 5.0]
        ];
        let y = vec![1.0, 1.0, 1.0, 1.0, 9.0, 9.0, 9.0, 9.0];
        (x, y)
    }

    #[test]
    fn test_learns_step_function() {
        let (x, y) = step_data();
        let rows: Vec<usize> = (0..8).collect();
        let params = TreeParams {
            max_depth: 3,
            min_samples_leaf: 1,
            max_features: None,
        };
        let tree = RegressionTree::fit(&x, &y, &rows, &params, &mut StdRng::seed_from_u64(0));

        assert_eq!(tree.predict(&x), y);
        assert_eq!(tree.depth(), 1);
        match tree.root() {
            TreeNode::Split {
                feature, threshold, ..
            } => {
                assert_eq!(*feature, 0);
                assert_eq!(*threshold, 7.0);
            }
            TreeNode::Leaf { .. } => panic!("expected a split"),
        }
        assert!(tree.importances()[0] > 0.0);
        assert_eq!(tree.importances()[1], 0.0);
    }

    #[test]
    fn test_depth_zero_is_mean() {
        let (x, y) = step_data();
        let rows: Vec<usize> = (0..8).collect();
        let params = TreeParams {
            max_depth: 0,
            ..TreeParams::default()
        };
        let tree = RegressionTree::fit(&x, &y, &rows, &params, &mut StdRng::seed_from_u64(0));
        assert!(tree.predict(&x).iter().all(|&p| (p - 5.0).abs() < 1e-12));
    }

    #[test]
    fn test_min_samples_leaf_respected() {
        let (x, y) = step_data();
        let rows: Vec<usize> = (0..8).collect();
        let params = TreeParams {
            max_depth: 10,
            min_samples_leaf: 5,
            max_features: None,
        };
        let tree = RegressionTree::fit(&x, &y, &rows, &params, &mut StdRng::seed_from_u64(0));
        assert_eq!(tree.depth(), 0);
    }

    #[test]
    fn test_constant_feature_never_splits() {
        let x = array![[1.0], [1.0], [1.0], [1.0]];
        let y = vec![1.0, 2.0, 3.0, 4.0];
        let params = TreeParams {
            max_depth: 4,
            min_samples_leaf: 1,
            max_features: None,
        };
        let tree = RegressionTree::fit(&x, &y, &[0, 1, 2, 3], &params, &mut StdRng::seed_from_u64(0));
        assert_eq!(tree.depth(), 0);
        assert_eq!(tree.predict(&x), vec![2.5; 4]);
    }

    #[test]
    fn test_bootstrap_rows_with_duplicates() {
        let (x, y) = step_data();
        let rows = vec![0, 0, 1, 4, 4, 5];
        let params = TreeParams {
            max_depth: 2,
            min_samples_leaf: 1,
            max_features: None,
        };
        let tree = RegressionTree::fit(&x, &y, &rows, &params, &mut StdRng::seed_from_u64(0));
        assert_eq!(tree.predict_row(x.row(7)), 9.0);
        assert_eq!(tree.predict_row(x.row(2)), 1.0);
    }

    #[test]
    fn test_serde_round_trip() {
        let (x, y) = step_data();
        let rows: Vec<usize> = (0..8).collect();
        let tree = RegressionTree::fit(&x, &y, &rows, &TreeParams::default(), &mut StdRng::seed_from_u64(0));
        let json = serde_json::to_string(&tree).unwrap();
        let back: RegressionTree = serde_json::from_str(&json).unwrap();
        assert_eq!(back, tree);
    }
}
