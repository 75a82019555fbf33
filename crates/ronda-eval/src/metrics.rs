//! Regression metrics for forecast evaluation.
//!
//! All metrics are computed on the original view scale except `r2_log`, which
//! compares `ln(1 + y)` against `ln(1 + ŷ)` so heavy-tailed counts do not
//! dominate the score.

use ronda_traits::stats::{log_transform, mean};
use ronda_traits::{Result, RondaError};
use serde::{Deserialize, Serialize};

/// Upper bound of SMAPE, reached when one side is zero and the other is not.
pub const SMAPE_MAX: f64 = 200.0;

/// Error metrics for one set of predictions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegressionMetrics {
    /// Number of evaluated rows.
    pub n: usize,
    /// Mean absolute error.
    pub mae: f64,
    /// Root mean squared error.
    pub rmse: f64,
    /// Symmetric mean absolute percentage error, in `[0, 200]`.
    pub smape: f64,
    /// Coefficient of determination on the raw scale.
    ///
    /// `None` when the truth has zero variance.
    pub r2: Option<f64>,
    /// Coefficient of determination on the `ln(1 + x)` scale.
    pub r2_log: Option<f64>,
}

impl RegressionMetrics {
    /// Compute every metric.
    ///
    /// # Errors
    ///
    /// Returns [`RondaError::Model`] if the slices are empty, differ in length,
    /// or contain a non-finite value.
    ///
    /// # Example
    ///
    /// ```
    /// use ronda_eval::RegressionMetrics;
    ///
    /// let m = RegressionMetrics::compute(&[100.0, 200.0], &[110.0, 190.0]).unwrap();
    /// assert_eq!(m.mae, 10.0);
    /// assert_eq!(m.rmse, 10.0);
    /// assert!(m.smape > 0.0 && m.smape < 200.0);
    /// ```
    pub fn compute(y_true: &[f64], y_pred: &[f64]) -> Result<Self> {
        if y_true.is_empty() {
            return Err(RondaError::Model("cannot evaluate an empty slice".into()));
        }
        if y_true.len() != y_pred.len() {
            return Err(RondaError::Model(format!(
                "{} targets but {} predictions",
                y_true.len(),
                y_pred.len()
            )));
        }
        if y_true.iter().chain(y_pred).any(|v| !v.is_finite()) {
            return Err(RondaError::Model("non-finite value in evaluation input".into()));
        }

        let log_true: Vec<f64> = y_true.iter().map(|&y| log_transform(y.max(0.0))).collect();
        let log_pred: Vec<f64> = y_pred.iter().map(|&y| log_transform(y.max(0.0))).collect();

        Ok(Self {
            n: y_true.len(),
            mae: mae(y_true, y_pred),
            rmse: rmse(y_true, y_pred),
            smape: smape(y_true, y_pred),
            r2: r_squared(y_true, y_pred),
            r2_log: r_squared(&log_true, &log_pred),
        })
    }
}

/// Mean absolute error.
pub fn mae(y_true: &[f64], y_pred: &[f64]) -> f64 {
    let errors: Vec<f64> = y_true.iter().zip(y_pred).map(|(t, p)| (t - p).abs()).collect();
    mean(&errors).unwrap_or(0.0)
}

/// Root mean squared error.
pub fn rmse(y_true: &[f64], y_pred: &[f64]) -> f64 {
    let squared: Vec<f64> = y_true.iter().zip(y_pred).map(|(t, p)| (t - p).powi(2)).collect();
    mean(&squared).unwrap_or(0.0).sqrt()
}

/// Symmetric MAPE with the denominator floored at one view.
///
/// `mean(|y - ŷ| / max((|y| + |ŷ|) / 2, 1)) * 100`. The floor keeps the
/// metric finite when both values are zero; the result is clamped to
/// `[0, SMAPE_MAX]`.
pub fn smape(y_true: &[f64], y_pred: &[f64]) -> f64 {
    let terms: Vec<f64> = y_true
        .iter()
        .zip(y_pred)
        .map(|(t, p)| {
            let denominator = ((t.abs() + p.abs()) / 2.0).max(1.0);
            (t - p).abs() / denominator
        })
        .collect();
    (mean(&terms).unwrap_or(0.0) * 100.0).clamp(0.0, SMAPE_MAX)
}

/// Coefficient of determination, `1 - SS_res / SS_tot`.
///
/// `None` when the truth is constant.
pub fn r_squared(y_true: &[f64], y_pred: &[f64]) -> Option<f64> {
    let m = mean(y_true)?;
    let ss_tot: f64 = y_true.iter().map(|t| (t - m).powi(2)).sum();
    if ss_tot <= f64::EPSILON {
        return None;
    }
    let ss_res: f64 = y_true.iter().zip(y_pred).map(|(t, p)| (t - p).powi(2)).sum();
    Some(1.0 - ss_res / ss_tot)
}
