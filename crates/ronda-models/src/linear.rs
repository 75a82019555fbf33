//! Ridge-regularized least squares.

use ndarray::{Array1, Array2, Axis};
use ronda_traits::{Result, RondaError};
use serde::{Deserialize, Serialize};

/// A fitted ridge regression.
///
/// The intercept is not penalized: columns and target are centered before
/// solving `(XᵀX + αI) w = Xᵀy`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RidgeRegression {
    alpha: f64,
    intercept: f64,
    coefficients: Vec<f64>,
}

impl RidgeRegression {
    /// Fit on every row of `x`.
    ///
    /// # Errors
    ///
    /// Returns [`RondaError::Model`] if the regularized system is not
    /// positive definite (only possible with `alpha == 0` and collinear
    /// columns) or the input is empty.
    pub fn fit(x: &Array2<f64>, y: &[f64], alpha: f64) -> Result<Self> {
        let n = x.nrows();
        if n == 0 || n != y.len() {
            return Err(RondaError::Model(format!(
                "ridge fit needs matching non-empty inputs, got {n} rows and {} targets",
                y.len()
            )));
        }

        let x_mean = x
            .mean_axis(Axis(0))
            .unwrap_or_else(|| Array1::zeros(x.ncols()));
        let y_mean = y.iter().sum::<f64>() / n as f64;

        let xc = x - &x_mean;
        let yc: Array1<f64> = y.iter().map(|v| v - y_mean).collect();

        let mut gram = xc.t().dot(&xc);
        for i in 0..gram.nrows() {
            gram[[i, i]] += alpha;
        }
        let rhs = xc.t().dot(&yc);

        let coefficients = cholesky_solve(&gram, &rhs).ok_or_else(|| {
            RondaError::Model("ridge system is not positive definite".to_string())
        })?;
        let intercept = y_mean - x_mean.dot(&coefficients);

        Ok(Self {
            alpha,
            intercept,
            coefficients: coefficients.to_vec(),
        })
    }

    /// Predict every row of `x`.
    pub fn predict(&self, x: &Array2<f64>) -> Vec<f64> {
        let w = Array1::from_vec(self.coefficients.clone());
        (x.dot(&w) + self.intercept).to_vec()
    }

    /// Fitted coefficients, one per column.
    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }

    /// Fitted intercept.
    pub const fn intercept(&self) -> f64 {
        self.intercept
    }
}

/// Solve `a x = b` for symmetric positive-definite `a`.
fn cholesky_solve(a: &Array2<f64>, b: &Array1<f64>) -> Option<Array1<f64>> {
    let n = a.nrows();
    let mut l = Array2::<f64>::zeros((n, n));

    for i in 0..n {
        for j in 0..=i {
            let mut sum = a[[i, j]];
            for k in 0..j {
                sum -= l[[i, k]] * l[[j, k]];
            }
            if i == j {
                if sum <= 0.0 || !sum.is_finite() {
                    return None;
                }
                l[[i, i]] = sum.sqrt();
            } else {
                l[[i, j]] = sum / l[[j, j]];
            }
        }
    }

    // Forward substitution: L z = b.
    let mut z = Array1::<f64>::zeros(n);
    for i in 0..n {
        let mut sum = b[i];
        for k in 0..i {
            sum -= l[[i, k]] * z[k];
        }
        z[i] = sum / l[[i, i]];
    }

    // Back substitution: Lᵀ x = z.
    let mut x = Array1::<f64>::zeros(n);
    for i in (0..n).rev() {
        let mut sum = z[i];
        for k in (i + 1)..n {
            sum -= l[[k, i]] * x[k];
        }
        x[i] = sum / l[[i, i]];
    }
    Some(x)
}
