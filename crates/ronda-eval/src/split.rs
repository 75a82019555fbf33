//! Chronological train / validation / test partitioning.
//!
//! Rows are ordered by publish time and sliced by position, so every
//! validation row is published no earlier than every training row and every
//! test row no earlier than every validation row. Random splits would let a
//! model learn from items published after the ones it is evaluated on.

use chrono::{DateTime, Utc};
use ronda_traits::{FeatureRow, Observation, Result, RondaError};
use serde::{Deserialize, Serialize};

/// Anything that carries a publish timestamp.
pub trait Published {
    /// The publish timestamp used as the split key.
    fn published_at(&self) -> DateTime<Utc>;
}

impl Published for FeatureRow {
    fn published_at(&self) -> DateTime<Utc> {
        self.published_at
    }
}

impl Published for Observation {
    fn published_at(&self) -> DateTime<Utc> {
        self.published_at
    }
}

/// Row counts and time range of one slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SliceSummary {
    /// Rows in the slice.
    pub rows: usize,
    /// Earliest publish timestamp, `None` for an empty slice.
    pub start: Option<DateTime<Utc>>,
    /// Latest publish timestamp, `None` for an empty slice.
    pub end: Option<DateTime<Utc>>,
}

impl SliceSummary {
    fn of<T: Published>(rows: &[T]) -> Self {
        Self {
            rows: rows.len(),
            start: rows.iter().map(Published::published_at).min(),
            end: rows.iter().map(Published::published_at).max(),
        }
    }
}

/// Three row-disjoint slices in chronological order.
#[derive(Debug, Clone, PartialEq)]
pub struct TemporalSplit<T> {
    /// Earliest rows.
    pub train: Vec<T>,
    /// Rows following the training slice.
    pub validation: Vec<T>,
    /// Latest rows.
    pub test: Vec<T>,
}

impl<T: Published> TemporalSplit<T> {
    /// Whether `max(train) <= min(validation) <= min(test)` holds, and every
    /// validation row precedes every test row.
    pub fn is_ordered(&self) -> bool {
        let train_end = SliceSummary::of(&self.train).end;
        let val = SliceSummary::of(&self.validation);
        let test_start = SliceSummary::of(&self.test).start;

        let before = |a: Option<DateTime<Utc>>, b: Option<DateTime<Utc>>| match (a, b) {
            (Some(a), Some(b)) => a <= b,
            _ => true,
        };
        before(train_end, val.start)
            && before(val.end, test_start)
            && before(train_end, test_start)
    }

    /// Summaries of the three slices.
    pub fn summaries(&self) -> SplitSummary {
        SplitSummary {
            train: SliceSummary::of(&self.train),
            validation: SliceSummary::of(&self.validation),
            test: SliceSummary::of(&self.test),
        }
    }

    /// Total number of rows.
    pub fn len(&self) -> usize {
        self.train.len() + self.validation.len() + self.test.len()
    }

    /// Whether all three slices are empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: Clone> TemporalSplit<T> {
    /// Training and validation rows combined, in chronological order.
    pub fn train_validation(&self) -> Vec<T> {
        self.train.iter().chain(&self.validation).cloned().collect()
    }
}

/// Per-slice summaries, as written to the processing report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitSummary {
    /// Training slice.
    pub train: SliceSummary,
    /// Validation slice.
    pub validation: SliceSummary,
    /// Test slice.
    pub test: SliceSummary,
}

/// Check that both fractions are in `[0, 1)` and leave room for training rows.
///
/// # Errors
///
/// Returns [`RondaError::InvalidConfig`] otherwise.
pub fn validate_fractions(validation_fraction: f64, test_fraction: f64) -> Result<()> {
    for (name, value) in [
        ("validation_fraction", validation_fraction),
        ("test_fraction", test_fraction),
    ] {
        if !(0.0..1.0).contains(&value) {
            return Err(RondaError::InvalidConfig(format!(
                "{name} must be in [0, 1), got {value}"
            )));
        }
    }
    if validation_fraction + test_fraction >= 1.0 {
        return Err(RondaError::InvalidConfig(format!(
            "validation_fraction + test_fraction must be below 1, got {}",
            validation_fraction + test_fraction
        )));
    }
    Ok(())
}

/// Sort rows by publish time (stable) and slice them by position.
///
/// `n_test = round(N * test_fraction)`, `n_val = round(N * validation_fraction)`
/// and the training slice takes the rest.
///
/// # Errors
///
/// Returns [`RondaError::InvalidConfig`] if the fractions are out of range.
///
/// # Example
///
/// ```
/// use chrono::{Duration, TimeZone, Utc};
/// use ronda_eval::split::{Published, temporal_split};
///
/// struct Item(chrono::DateTime<Utc>);
///
/// impl Published for Item {
///     fn published_at(&self) -> chrono::DateTime<Utc> {
///         self.0
///     }
/// }
///
/// let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
/// let rows: Vec<Item> = (0..1000).rev().map(|i| Item(start + Duration::hours(i))).collect();
///
/// let split = temporal_split(rows, 0.15, 0.15).unwrap();
/// assert_eq!((split.train.len(), split.validation.len(), split.test.len()), (700, 150, 150));
/// assert!(split.is_ordered());
/// ```
pub fn temporal_split<T: Published>(
    mut rows: Vec<T>,
    validation_fraction: f64,
    test_fraction: f64,
) -> Result<TemporalSplit<T>> {
    validate_fractions(validation_fraction, test_fraction)?;

    rows.sort_by_key(Published::published_at);

    let n = rows.len();
    let n_test = slice_size(n, test_fraction);
    let n_val = slice_size(n, validation_fraction).min(n - n_test);
    let n_train = n - n_val - n_test;

    let test = rows.split_off(n_train + n_val);
    let validation = rows.split_off(n_train);

    tracing::debug!(
        train = rows.len(),
        validation = validation.len(),
        test = test.len(),
        "temporal split"
    );

    Ok(TemporalSplit {
        train: rows,
        validation,
        test,
    })
}

fn slice_size(n: usize, fraction: f64) -> usize {
    ((n as f64 * fraction).round() as usize).min(n)
}
