//! Time-series features derived from the daily observation window.
//!
//! Growth is measured on the running maximum of the views sequence, so a
//! platform correction that lowers a cumulative counter never produces
//! negative growth. Peak day and targets read the recorded values unchanged.

use ronda_traits::stats::{guarded_ratio, mean, sample_std};
use ronda_traits::{DailySeries, FeatureExtractor, FeatureMap, FeatureValue, Observation, Result};
use serde::{Deserialize, Serialize};

/// Names produced by [`TimeSeriesFeatures`], in output order.
pub const TIME_SERIES_FEATURES: [&str; 9] = [
    "growth_velocity",
    "growth_consistency",
    "peak_day",
    "like_ratio_day_1",
    "like_ratio_day_7",
    "like_ratio_day_30",
    "comment_ratio_day_1",
    "comment_ratio_day_7",
    "comment_ratio_day_30",
];

/// Days at which engagement ratios are sampled.
pub const RATIO_DAYS: [usize; 3] = [1, 7, 30];

/// Configuration for [`TimeSeriesFeatures`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeSeriesConfig {
    /// Last day included in the daily growth series (first is day 2).
    pub growth_window_days: usize,
}

impl Default for TimeSeriesConfig {
    fn default() -> Self {
        Self {
            growth_window_days: 7,
        }
    }
}

/// Growth, peak and engagement-ratio features from the daily sequences.
///
/// None of these are known at publish time; they are written to the feature
/// tables for analysis and only used for training in the diagnostic feature
/// set.
#[derive(Debug, Clone, Default)]
pub struct TimeSeriesFeatures {
    config: TimeSeriesConfig,
}

impl TimeSeriesFeatures {
    /// Create an extractor with the given configuration.
    #[must_use]
    pub const fn new(config: TimeSeriesConfig) -> Self {
        Self { config }
    }

    /// Compute the features for a single series.
    #[must_use]
    pub fn compute(&self, daily: &DailySeries) -> FeatureMap {
        let mut map = FeatureMap::new();
        let growth = daily_growth(&daily.views, self.config.growth_window_days);

        map.insert("growth_velocity".into(), mean(&growth).into());
        map.insert("growth_consistency".into(), sample_std(&growth).into());
        map.insert("peak_day".into(), FeatureValue::from(peak_day(&daily.views) as f64));

        for day in RATIO_DAYS {
            let views = daily.views_on(day);
            map.insert(
                format!("like_ratio_day_{day}"),
                engagement_ratio(daily.likes_on(day), views).into(),
            );
            map.insert(
                format!("comment_ratio_day_{day}"),
                engagement_ratio(daily.comments_on(day), views).into(),
            );
        }
        map
    }
}

impl FeatureExtractor for TimeSeriesFeatures {
    fn name(&self) -> &str {
        "time_series"
    }

    fn feature_names(&self) -> &[&'static str] {
        &TIME_SERIES_FEATURES
    }

    fn extract(&self, observations: &[Observation]) -> Result<Vec<FeatureMap>> {
        Ok(observations
            .iter()
            .map(|obs| self.compute(&obs.daily))
            .collect())
    }
}

/// Whether a row's time-series features cannot be computed at all.
pub fn is_degraded(daily: &DailySeries) -> bool {
    daily.is_entirely_missing()
}

/// Running maximum over the recorded values; missing entries stay missing.
pub fn running_max(values: &[Option<f64>]) -> Vec<Option<f64>> {
    let mut best = f64::NEG_INFINITY;
    values
        .iter()
        .map(|v| {
            v.map(|x| {
                best = best.max(x);
                best
            })
        })
        .collect()
}

/// Relative day-over-day growth for days `2..=window_days`.
///
/// Each entry is `(v[d] - v[d-1]) / max(v[d-1], 1)` on the running maximum of
/// `views`. Days where either value is missing are skipped.
///
/// # Example
///
/// ```
/// use ronda_features::timeseries::daily_growth;
///
/// let growth = daily_growth(&[Some(100.0), Some(150.0)], 7);
/// assert_eq!(growth, vec![0.5]);
/// ```
pub fn daily_growth(views: &[Option<f64>], window_days: usize) -> Vec<f64> {
    let clipped = running_max(views);
    (2..=window_days.min(clipped.len()))
        .filter_map(|day| match (clipped[day - 2], clipped[day - 1]) {
            (Some(prev), Some(cur)) => Some(guarded_ratio(cur - prev, prev)),
            _ => None,
        })
        .collect()
}

/// 1-based day of the first maximum recorded view count; 1 when none.
pub fn peak_day(views: &[Option<f64>]) -> usize {
    let mut peak: Option<(usize, f64)> = None;
    for (i, v) in views.iter().enumerate() {
        let Some(v) = *v else { continue };
        if peak.is_none_or(|(_, best)| v > best) {
            peak = Some((i + 1, v));
        }
    }
    peak.map_or(1, |(day, _)| day)
}

/// `numerator / max(views, 1)`, missing if either side is missing.
pub fn engagement_ratio(numerator: Option<f64>, views: Option<f64>) -> Option<f64> {
    Some(guarded_ratio(numerator?, views?))
}
