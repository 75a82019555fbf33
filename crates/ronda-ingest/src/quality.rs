//! Row-level quality rules.
//!
//! Rules run in a fixed order and each one is a pure predicate over a single
//! record, except the outlier rule whose threshold is computed over the rows
//! that survived the earlier rules.

use ronda_traits::stats::quantile;
use ronda_traits::{Observation, RawObservation, Result, RondaError};
use serde::{Deserialize, Serialize};

/// Thresholds used by the quality rules.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QualityConfig {
    /// Longest accepted duration in seconds.
    pub max_duration_seconds: i64,
    /// Quantile of `view_count` above which a row is an outlier.
    pub outlier_quantile: f64,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            max_duration_seconds: 14_400,
            outlier_quantile: 0.999,
        }
    }
}

/// Rejections per rule.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectionCounts {
    /// Missing identifier, channel, publish timestamp or duration.
    pub missing_required_field: usize,
    /// Duration that is zero, negative or failed to parse.
    pub non_positive_duration: usize,
    /// Duration above the configured maximum.
    pub excessive_duration: usize,
    /// View count strictly above the outlier threshold.
    pub view_count_outlier: usize,
}

impl RejectionCounts {
    /// Total rejected rows.
    pub const fn total(&self) -> usize {
        self.missing_required_field
            + self.non_positive_duration
            + self.excessive_duration
            + self.view_count_outlier
    }
}

/// Summary of a filter pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterReport {
    /// Rows entering the filter.
    pub input_rows: usize,
    /// Survivors after the required-field rule.
    pub after_required_fields: usize,
    /// Survivors after the positive-duration rule.
    pub after_positive_duration: usize,
    /// Survivors after the maximum-duration rule.
    pub after_max_duration: usize,
    /// Survivors after outlier removal; the final count.
    pub after_outlier_removal: usize,
    /// Rejections per rule.
    pub rejections: RejectionCounts,
    /// The computed view-count threshold, absent when no survivor had a count.
    pub view_count_threshold: Option<f64>,
    /// Surviving rows whose daily views decrease at some point.
    pub non_monotonic_rows: usize,
}

/// Applies the quality rules to raw observations.
#[derive(Debug, Clone, Default)]
pub struct QualityFilter {
    config: QualityConfig,
}

impl QualityFilter {
    /// Create a filter with the given thresholds.
    pub const fn new(config: QualityConfig) -> Self {
        Self { config }
    }

    /// The thresholds in use.
    pub const fn config(&self) -> &QualityConfig {
        &self.config
    }

    /// Run every rule and return the survivors with a report.
    ///
    /// Never fails; an empty survivor set is reported, not raised.
    pub fn filter(&self, rows: Vec<RawObservation>) -> (Vec<Observation>, FilterReport) {
        let mut report = FilterReport {
            input_rows: rows.len(),
            ..FilterReport::default()
        };

        let survivors: Vec<Observation> = rows.into_iter().filter_map(into_observation).collect();
        report.after_required_fields = survivors.len();
        report.rejections.missing_required_field = report.input_rows - survivors.len();

        let survivors: Vec<Observation> = survivors
            .into_iter()
            .filter(has_positive_duration)
            .collect();
        report.after_positive_duration = survivors.len();
        report.rejections.non_positive_duration =
            report.after_required_fields - report.after_positive_duration;

        let max_duration = self.config.max_duration_seconds;
        let survivors: Vec<Observation> = survivors
            .into_iter()
            .filter(|obs| within_max_duration(obs, max_duration))
            .collect();
        report.after_max_duration = survivors.len();
        report.rejections.excessive_duration =
            report.after_positive_duration - report.after_max_duration;

        let counts: Vec<f64> = survivors.iter().filter_map(|obs| obs.view_count).collect();
        let threshold = quantile(&counts, self.config.outlier_quantile);
        let survivors: Vec<Observation> = survivors
            .into_iter()
            .filter(|obs| !is_view_outlier(obs, threshold))
            .collect();
        report.view_count_threshold = threshold;
        report.after_outlier_removal = survivors.len();
        report.rejections.view_count_outlier =
            report.after_max_duration - report.after_outlier_removal;

        report.non_monotonic_rows = survivors
            .iter()
            .filter(|obs| !obs.daily.is_monotonic())
            .count();

        tracing::info!(
            input_rows = report.input_rows,
            survivors = report.after_outlier_removal,
            rejected = report.rejections.total(),
            threshold = ?report.view_count_threshold,
            non_monotonic = report.non_monotonic_rows,
            "quality filter applied"
        );

        (survivors, report)
    }

    /// Like [`filter`](Self::filter) but fails when nothing survives.
    ///
    /// # Errors
    ///
    /// Returns [`RondaError::EmptyDataset`] if every row was rejected.
    pub fn apply(&self, rows: Vec<RawObservation>) -> Result<(Vec<Observation>, FilterReport)> {
        let (survivors, report) = self.filter(rows);
        if survivors.is_empty() {
            return Err(RondaError::EmptyDataset {
                input_rows: report.input_rows,
            });
        }
        Ok((survivors, report))
    }
}

/// Rule 1: identity fields and a duration encoding are present.
fn into_observation(raw: RawObservation) -> Option<Observation> {
    let (Some(video_id), Some(channel_id), Some(published_at), Some(_)) =
        (raw.video_id, raw.channel_id, raw.published_at, raw.duration)
    else {
        return None;
    };
    Some(Observation {
        video_id,
        channel_id,
        published_at,
        title: raw.title.unwrap_or_default(),
        description: raw.description.unwrap_or_default(),
        tags: raw.tags.unwrap_or_default(),
        category_id: raw.category_id,
        duration_seconds: raw.duration_seconds,
        view_count: raw.view_count,
        like_count: raw.like_count,
        comment_count: raw.comment_count,
        daily: raw.daily,
    })
}

/// Rule 2.
const fn has_positive_duration(obs: &Observation) -> bool {
    obs.duration_seconds > 0
}

/// Rule 3.
const fn within_max_duration(obs: &Observation, max_duration_seconds: i64) -> bool {
    obs.duration_seconds <= max_duration_seconds
}

/// Rule 4. A missing count is never an outlier.
fn is_view_outlier(obs: &Observation, threshold: Option<f64>) -> bool {
    match (obs.view_count, threshold) {
        (Some(views), Some(limit)) => views > limit,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use ronda_traits::DailySeries;

    fn raw(id: &str, duration_seconds: i64, views: Option<f64>) -> RawObservation {
        RawObservation {
            video_id: Some(id.to_string()),
            channel_id: Some("chan".to_string()),
            published_at: Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()),
            duration: Some(format!("PT{duration_seconds}S")),
            duration_seconds,
            view_count: views,
            ..RawObservation::default()
        }
    }

    #[test]
    fn test_rules_in_order() {
        let mut missing_channel = raw("a", 30, Some(1.0));
        missing_channel.channel_id = None;
        let mut missing_duration = raw("b", 30, Some(1.0));
        missing_duration.duration = None;
        let unparsed = raw("c", 0, Some(1.0));
        let too_long = raw("d", 20_000, Some(1.0));
        let ok = raw("e", 30, Some(1.0));

        let filter = QualityFilter::default();
        let (rows, report) =
            filter.filter(vec![missing_channel, missing_duration, unparsed, too_long, ok]);

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].video_id, "e");
        assert_eq!(report.input_rows, 5);
        assert_eq!(report.after_required_fields, 3);
        assert_eq!(report.after_positive_duration, 2);
        assert_eq!(report.after_max_duration, 1);
        assert_eq!(report.after_outlier_removal, 1);
        assert_eq!(report.rejections.missing_required_field, 2);
        assert_eq!(report.rejections.non_positive_duration, 1);
        assert_eq!(report.rejections.excessive_duration, 1);
        assert_eq!(report.rejections.total(), 4);
    }

    #[test]
    fn test_max_duration_is_inclusive() {
        let filter = QualityFilter::default();
        let (rows, _) = filter.filter(vec![raw("a", 14_400, None), raw("b", 14_401, None)]);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].video_id, "a");
    }

    #[test]
    fn test_outlier_percentiles() {
        // Views 1..=2000: the 99.9th percentile interpolates to 1998.001.
        let rows: Vec<RawObservation> = (1..=2000)
            .map(|i| raw(&format!("v{i}"), 30, Some(f64::from(i))))
            .collect();

        let (kept, report) = QualityFilter::default().filter(rows);
        let ids: Vec<&str> = kept.iter().map(|o| o.video_id.as_str()).collect();

        // 99.95th percentile row removed, 99.5th retained.
        assert!(!ids.contains(&"v1999"));
        assert!(ids.contains(&"v1990"));
        assert!(ids.contains(&"v1998"));
        assert_eq!(report.rejections.view_count_outlier, 2);
        let threshold = report.view_count_threshold.unwrap();
        approx::assert_relative_eq!(threshold, 1998.001, epsilon = 1e-6);
    }

    #[test]
    fn test_missing_views_not_outliers() {
        let rows = vec![raw("a", 30, None), raw("b", 30, Some(5.0))];
        let (kept, report) = QualityFilter::default().filter(rows);
        assert_eq!(kept.len(), 2);
        assert_eq!(report.view_count_threshold, Some(5.0));
    }

    #[test]
    fn test_empty_dataset() {
        let err = QualityFilter::default()
            .apply(vec![raw("a", 0, None)])
            .unwrap_err();
        assert!(matches!(err, RondaError::EmptyDataset { input_rows: 1 }));
    }

    #[test]
    fn test_non_monotonic_counted_not_rejected() {
        let mut dipping = raw("a", 30, Some(10.0));
        dipping.daily = DailySeries::from_views(vec![Some(10.0), Some(8.0)]);
        let (kept, report) = QualityFilter::default().filter(vec![dipping, raw("b", 30, None)]);

        assert_eq!(kept.len(), 2);
        assert_eq!(report.non_monotonic_rows, 1);
    }

    #[test]
    fn test_optional_text_defaults_to_empty() {
        let (kept, _) = QualityFilter::default().filter(vec![raw("a", 30, None)]);
        assert_eq!(kept[0].title, "");
        assert_eq!(kept[0].category_id, None);
    }
}
