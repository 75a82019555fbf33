//! Per-pair evaluation results and the aggregated report.

use crate::metrics::RegressionMetrics;
use crate::split::SplitSummary;
use chrono::{DateTime, Utc};
use ronda_traits::{Horizon, Result, Segment};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome of one (segment, horizon) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PairStatus {
    /// A model was fitted and evaluated.
    Trained,
    /// Too few rows; no model was fitted.
    Skipped,
    /// Fitting, prediction or persistence failed.
    Failed,
}

impl PairStatus {
    /// Lowercase label.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Trained => "trained",
            Self::Skipped => "skipped",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for PairStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Usable rows per slice for one pair, after dropping missing targets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleCounts {
    /// Training rows.
    pub train: usize,
    /// Validation rows.
    pub validation: usize,
    /// Test rows.
    pub test: usize,
}

/// Evaluation of one (segment, horizon) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairReport {
    /// Segment.
    pub segment: Segment,
    /// Horizon.
    pub horizon: Horizon,
    /// Outcome.
    pub status: PairStatus,
    /// Usable rows per slice.
    pub samples: SampleCounts,
    /// Metrics on the validation slice.
    pub validation: Option<RegressionMetrics>,
    /// Metrics on the test slice.
    pub test: Option<RegressionMetrics>,
    /// Why the pair was skipped or failed.
    pub reason: Option<String>,
}

impl PairReport {
    /// A pair with a fitted model.
    pub const fn trained(
        segment: Segment,
        horizon: Horizon,
        samples: SampleCounts,
        validation: Option<RegressionMetrics>,
        test: Option<RegressionMetrics>,
    ) -> Self {
        Self {
            segment,
            horizon,
            status: PairStatus::Trained,
            samples,
            validation,
            test,
            reason: None,
        }
    }

    /// A pair that was not trained.
    pub fn skipped(
        segment: Segment,
        horizon: Horizon,
        samples: SampleCounts,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            segment,
            horizon,
            status: PairStatus::Skipped,
            samples,
            validation: None,
            test: None,
            reason: Some(reason.into()),
        }
    }

    /// A pair whose training failed.
    pub fn failed(
        segment: Segment,
        horizon: Horizon,
        samples: SampleCounts,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            status: PairStatus::Failed,
            ..Self::skipped(segment, horizon, samples, reason)
        }
    }

    /// `{segment}/{horizon}`, used in logs and warnings.
    pub fn key(&self) -> String {
        format!("{}/{}", self.segment, self.horizon)
    }
}

/// Results for every pair plus dataset sizes and warnings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    /// When the report was assembled.
    pub generated_at: DateTime<Utc>,
    /// Slice sizes and time ranges of the whole dataset.
    pub dataset: SplitSummary,
    /// One entry per pair, ordered by segment then horizon.
    pub pairs: Vec<PairReport>,
    /// Human-readable warnings collected during the run.
    pub warnings: Vec<String>,
}

impl EvaluationReport {
    /// An empty report for a dataset.
    pub fn new(dataset: SplitSummary) -> Self {
        Self {
            generated_at: Utc::now(),
            dataset,
            pairs: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Add a pair, keeping pairs ordered by (segment, horizon).
    pub fn push(&mut self, pair: PairReport) {
        let key = (pair.segment, pair.horizon);
        let at = self
            .pairs
            .partition_point(|p| (p.segment, p.horizon) < key);
        self.pairs.insert(at, pair);
    }

    /// Record a warning.
    pub fn warn(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }

    /// The report for a pair, if present.
    pub fn pair(&self, segment: Segment, horizon: Horizon) -> Option<&PairReport> {
        self.pairs
            .iter()
            .find(|p| p.segment == segment && p.horizon == horizon)
    }

    /// Number of pairs with the given status.
    pub fn count(&self, status: PairStatus) -> usize {
        self.pairs.iter().filter(|p| p.status == status).count()
    }

    /// Serialize to pretty JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding fails.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::split::SliceSummary;

    fn summary() -> SplitSummary {
        let slice = |rows| SliceSummary {
            rows,
            start: None,
            end: None,
        };
        SplitSummary {
            train: slice(70),
            validation: slice(15),
            test: slice(15),
        }
    }

    fn metrics() -> RegressionMetrics {
        RegressionMetrics::compute(&[1.0, 2.0, 3.0], &[1.0, 2.5, 3.0]).unwrap()
    }

    #[test]
    fn test_pairs_kept_in_order() {
        let counts = SampleCounts {
            train: 60,
            validation: 12,
            test: 12,
        };
        let mut report = EvaluationReport::new(summary());
        report.push(PairReport::skipped(
            Segment::LongForm,
            Horizon::Day1,
            counts,
            "too few rows",
        ));
        report.push(PairReport::trained(
            Segment::ShortForm,
            Horizon::Day30,
            counts,
            Some(metrics()),
            Some(metrics()),
        ));
        report.push(PairReport::trained(
            Segment::ShortForm,
            Horizon::Day1,
            counts,
            Some(metrics()),
            None,
        ));

        let keys: Vec<String> = report.pairs.iter().map(PairReport::key).collect();
        assert_eq!(keys, vec!["short_form/24h", "short_form/30d", "long_form/24h"]);
        assert_eq!(report.count(PairStatus::Trained), 2);
        assert_eq!(report.count(PairStatus::Skipped), 1);
        assert!(report.pair(Segment::LongForm, Horizon::Day7).is_none());
    }

    #[test]
    fn test_failed_pair_keeps_reason() {
        let pair = PairReport::failed(
            Segment::ShortForm,
            Horizon::Day7,
            SampleCounts::default(),
            "singular matrix",
        );
        assert_eq!(pair.status, PairStatus::Failed);
        assert_eq!(pair.reason.as_deref(), Some("singular matrix"));
        assert!(pair.validation.is_none());
    }

    #[test]
    fn test_json_shape() {
        let mut report = EvaluationReport::new(summary());
        report.warn("long_form/7d skipped");
        report.push(PairReport::trained(
            Segment::ShortForm,
            Horizon::Day7,
            SampleCounts::default(),
            Some(metrics()),
            Some(metrics()),
        ));

        let value: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(value["pairs"][0]["status"], "trained");
        assert_eq!(value["pairs"][0]["horizon"], "7d");
        assert_eq!(value["pairs"][0]["segment"], "short_form");
        assert_eq!(value["dataset"]["train"]["rows"], 70);
        assert_eq!(value["warnings"][0], "long_form/7d skipped");
        assert!(value["pairs"][0]["test"]["smape"].is_number());
    }
}
