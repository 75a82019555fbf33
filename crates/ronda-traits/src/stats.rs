//! Statistical utility functions shared across the pipeline.
//!
//! Everything here skips non-finite inputs, so callers can pass columns that
//! still carry NaN placeholders for missing values.

/// Minimum threshold for standard deviation to avoid division by zero.
/// Values below this threshold are treated as zero variance.
pub const MIN_STD_THRESHOLD: f64 = 1e-10;

/// Arithmetic mean of the finite values, `None` when there are none.
pub fn mean(values: &[f64]) -> Option<f64> {
    let (sum, n) = values
        .iter()
        .filter(|x| x.is_finite())
        .fold((0.0, 0usize), |(s, n), x| (s + x, n + 1));
    (n > 0).then(|| sum / n as f64)
}

/// Sample standard deviation (N-1) of the finite values.
///
/// `None` with fewer than two finite values.
pub fn sample_std(values: &[f64]) -> Option<f64> {
    let finite: Vec<f64> = values.iter().copied().filter(|x| x.is_finite()).collect();
    if finite.len() < 2 {
        return None;
    }
    let m = finite.iter().sum::<f64>() / finite.len() as f64;
    let variance =
        finite.iter().map(|x| (x - m).powi(2)).sum::<f64>() / (finite.len() - 1) as f64;
    Some(variance.sqrt())
}

/// Median of the finite values.
pub fn median(values: &[f64]) -> Option<f64> {
    quantile(values, 0.5)
}

/// Quantile of the finite values with linear interpolation between order
/// statistics (position `q * (n - 1)`).
///
/// `q` is clamped to `[0, 1]`. Returns `None` for an empty input.
///
/// # Examples
///
/// ```
/// use ronda_traits::stats::quantile;
///
/// let values: Vec<f64> = (0..=100).map(f64::from).collect();
/// assert_eq!(quantile(&values, 0.5), Some(50.0));
/// assert_eq!(quantile(&values, 0.25), Some(25.0));
/// ```
pub fn quantile(values: &[f64], q: f64) -> Option<f64> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|x| x.is_finite()).collect();
    if sorted.is_empty() {
        return None;
    }
    sorted.sort_by(f64::total_cmp);

    let q = q.clamp(0.0, 1.0);
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

/// Forward target transform, `ln(1 + x)`.
pub fn log_transform(x: f64) -> f64 {
    x.ln_1p()
}

/// Inverse target transform, `exp(x) - 1`.
pub fn inverse_log_transform(x: f64) -> f64 {
    x.exp_m1()
}

/// Division guarded so the denominator is never below one.
///
/// Used for every ratio derived from engagement counts so that a zero
/// denominator yields the numerator instead of infinity.
pub fn guarded_ratio(numerator: f64, denominator: f64) -> f64 {
    numerator / denominator.max(1.0)
}
