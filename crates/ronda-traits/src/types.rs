//! Common types used throughout the Ronda pipeline.
//!
//! This module defines the raw observation record, the validated observation
//! that survives the quality filter, the feature row handed to model training,
//! and the two closed enumerations that key every trained model: [`Segment`]
//! and [`Horizon`].

use chrono::{DateTime, Utc};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Length of the daily observation window.
pub const OBSERVATION_DAYS: usize = 30;

/// Default duration threshold (inclusive) for short-form content, in seconds.
pub const DEFAULT_SHORT_FORM_THRESHOLD_SECONDS: i64 = 60;

/// Content-type partition; every segment is trained with independent models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Segment {
    /// Items at or below the short-form duration threshold.
    ShortForm,
    /// Everything longer.
    LongForm,
}

impl Segment {
    /// All segments in reporting order.
    pub const ALL: [Self; 2] = [Self::ShortForm, Self::LongForm];

    /// Assign a segment from a duration.
    ///
    /// Total and deterministic: `ShortForm` iff `duration_seconds <= threshold_seconds`.
    ///
    /// # Example
    ///
    /// ```
    /// use ronda_traits::Segment;
    ///
    /// assert_eq!(Segment::classify(45, 60), Segment::ShortForm);
    /// assert_eq!(Segment::classify(182, 60), Segment::LongForm);
    /// ```
    pub const fn classify(duration_seconds: i64, threshold_seconds: i64) -> Self {
        if duration_seconds <= threshold_seconds {
            Self::ShortForm
        } else {
            Self::LongForm
        }
    }

    /// Stable identifier used in file names and reports.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::ShortForm => "short_form",
            Self::LongForm => "long_form",
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A forecast target: cumulative views at a fixed day of the observation window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Horizon {
    /// Views after 24 hours.
    #[serde(rename = "24h")]
    Day1,
    /// Views after 7 days.
    #[serde(rename = "7d")]
    Day7,
    /// Views after 30 days.
    #[serde(rename = "30d")]
    Day30,
}

impl Horizon {
    /// All horizons in reporting order.
    pub const ALL: [Self; 3] = [Self::Day1, Self::Day7, Self::Day30];

    /// The 1-based observation day this horizon reads from.
    pub const fn day(&self) -> usize {
        match self {
            Self::Day1 => 1,
            Self::Day7 => 7,
            Self::Day30 => 30,
        }
    }

    /// Stable identifier used in file names and reports.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Day1 => "24h",
            Self::Day7 => "7d",
            Self::Day30 => "30d",
        }
    }

    /// Name of the input column the target is read from.
    pub fn source_column(&self) -> String {
        daily_column(self.day(), DailyMetric::Views)
    }

    /// Name of the target column in the feature tables.
    pub fn target_column(&self) -> String {
        format!("target_views_day_{}", self.day())
    }
}

impl fmt::Display for Horizon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One of the three parallel daily sequences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DailyMetric {
    /// Cumulative views.
    Views,
    /// Cumulative likes.
    Likes,
    /// Cumulative comments.
    Comments,
}

impl DailyMetric {
    /// All metrics in column order.
    pub const ALL: [Self; 3] = [Self::Views, Self::Likes, Self::Comments];

    /// Column suffix for this metric.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Views => "views",
            Self::Likes => "likes",
            Self::Comments => "comments",
        }
    }
}

/// Canonical name of a daily column, e.g. `day_7_views`.
pub fn daily_column(day: usize, metric: DailyMetric) -> String {
    format!("day_{day}_{}", metric.as_str())
}

/// Daily views/likes/comments over the observation window.
///
/// Entries are `None` when the day was not observed; a missing day and a
/// recorded zero are different things.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailySeries {
    /// Cumulative views, index 0 is day 1.
    pub views: Vec<Option<f64>>,
    /// Cumulative likes, index 0 is day 1.
    pub likes: Vec<Option<f64>>,
    /// Cumulative comments, index 0 is day 1.
    pub comments: Vec<Option<f64>>,
}

impl Default for DailySeries {
    fn default() -> Self {
        Self {
            views: vec![None; OBSERVATION_DAYS],
            likes: vec![None; OBSERVATION_DAYS],
            comments: vec![None; OBSERVATION_DAYS],
        }
    }
}

impl DailySeries {
    /// Build a series from views only; likes and comments are left missing.
    pub fn from_views(views: Vec<Option<f64>>) -> Self {
        Self {
            views,
            ..Self::default()
        }
    }

    /// Views recorded on a 1-based day.
    pub fn views_on(&self, day: usize) -> Option<f64> {
        value_on(&self.views, day)
    }

    /// Likes recorded on a 1-based day.
    pub fn likes_on(&self, day: usize) -> Option<f64> {
        value_on(&self.likes, day)
    }

    /// Comments recorded on a 1-based day.
    pub fn comments_on(&self, day: usize) -> Option<f64> {
        value_on(&self.comments, day)
    }

    /// Whether no view was recorded on any day.
    pub fn is_entirely_missing(&self) -> bool {
        self.views.iter().all(Option::is_none)
    }

    /// Whether the recorded views never decrease (missing days are skipped).
    pub fn is_monotonic(&self) -> bool {
        let mut last = f64::NEG_INFINITY;
        for v in self.views.iter().flatten() {
            if *v < last {
                return false;
            }
            last = *v;
        }
        true
    }
}

fn value_on(values: &[Option<f64>], day: usize) -> Option<f64> {
    day.checked_sub(1)
        .and_then(|i| values.get(i).copied().flatten())
}

/// One content item exactly as read from the input table.
///
/// Produced once by the schema normalizer and never mutated. Identity fields
/// are optional here because the quality filter is what enforces them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawObservation {
    /// Item identifier.
    pub video_id: Option<String>,
    /// Channel identifier.
    pub channel_id: Option<String>,
    /// Publish timestamp.
    pub published_at: Option<DateTime<Utc>>,
    /// Title text.
    pub title: Option<String>,
    /// Description text.
    pub description: Option<String>,
    /// Raw tag list.
    pub tags: Option<String>,
    /// Platform category identifier.
    pub category_id: Option<String>,
    /// Raw duration encoding, kept to distinguish "missing" from "unparseable".
    pub duration: Option<String>,
    /// Parsed duration; 0 when the encoding failed to parse.
    pub duration_seconds: i64,
    /// Current view counter.
    pub view_count: Option<f64>,
    /// Current like counter.
    pub like_count: Option<f64>,
    /// Current comment counter.
    pub comment_count: Option<f64>,
    /// Daily sequences.
    pub daily: DailySeries,
}

/// An observation that passed every quality rule.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    /// Item identifier.
    pub video_id: String,
    /// Channel identifier.
    pub channel_id: String,
    /// Publish timestamp.
    pub published_at: DateTime<Utc>,
    /// Title text (empty when absent).
    pub title: String,
    /// Description text (empty when absent).
    pub description: String,
    /// Raw tag list (empty when absent).
    pub tags: String,
    /// Platform category identifier.
    pub category_id: Option<String>,
    /// Duration in whole seconds, strictly positive.
    pub duration_seconds: i64,
    /// Current view counter.
    pub view_count: Option<f64>,
    /// Current like counter.
    pub like_count: Option<f64>,
    /// Current comment counter.
    pub comment_count: Option<f64>,
    /// Daily sequences.
    pub daily: DailySeries,
}

/// A single feature value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FeatureValue {
    /// A number, or a null when it could not be computed.
    Numeric(Option<f64>),
    /// A category label.
    Categorical(String),
}

impl FeatureValue {
    /// A numeric value from a boolean flag.
    pub const fn flag(value: bool) -> Self {
        Self::Numeric(Some(if value { 1.0 } else { 0.0 }))
    }

    /// The numeric value, if this is a non-null number.
    pub const fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Numeric(v) => *v,
            Self::Categorical(_) => None,
        }
    }

    /// The category label, if this is categorical.
    pub fn as_category(&self) -> Option<&str> {
        match self {
            Self::Categorical(s) => Some(s.as_str()),
            Self::Numeric(_) => None,
        }
    }
}

impl From<f64> for FeatureValue {
    fn from(v: f64) -> Self {
        Self::Numeric(Some(v))
    }
}

impl From<Option<f64>> for FeatureValue {
    fn from(v: Option<f64>) -> Self {
        Self::Numeric(v)
    }
}

/// Feature values keyed by feature name.
pub type FeatureMap = BTreeMap<String, FeatureValue>;

/// One row of the feature dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRow {
    /// Item identifier.
    pub video_id: String,
    /// Channel identifier.
    pub channel_id: String,
    /// Publish timestamp, the split key.
    pub published_at: DateTime<Utc>,
    /// Content-type segment.
    pub segment: Segment,
    /// Static and time-series features.
    pub features: FeatureMap,
    /// Recorded views at each horizon.
    pub targets: BTreeMap<Horizon, Option<f64>>,
}

impl FeatureRow {
    /// Target value for a horizon, if it was recorded.
    pub fn target(&self, horizon: Horizon) -> Option<f64> {
        self.targets.get(&horizon).copied().flatten()
    }

    /// Feature value by name.
    pub fn feature(&self, name: &str) -> Option<&FeatureValue> {
        self.features.get(name)
    }
}

/// Container for the raw engagement table.
///
/// `EngagementData` wraps a Polars DataFrame holding one row per content item
/// with its metadata, current counters and the daily observation columns.
#[derive(Debug, Clone)]
pub struct EngagementData {
    data: DataFrame,
}

impl EngagementData {
    /// Creates a new `EngagementData` instance from a DataFrame.
    pub const fn new(data: DataFrame) -> Self {
        Self { data }
    }

    /// Returns a reference to the underlying DataFrame.
    pub const fn data(&self) -> &DataFrame {
        &self.data
    }

    /// Returns a mutable reference to the underlying DataFrame.
    pub const fn data_mut(&mut self) -> &mut DataFrame {
        &mut self.data
    }

    /// Returns the number of rows.
    pub fn len(&self) -> usize {
        self.data.height()
    }

    /// Returns the column names.
    pub fn columns(&self) -> Vec<String> {
        self.data
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    /// Checks if a column exists.
    pub fn has_column(&self, name: &str) -> bool {
        self.data
            .get_column_names()
            .iter()
            .any(|s| s.as_str() == name)
    }
}

impl From<DataFrame> for EngagementData {
    fn from(data: DataFrame) -> Self {
        Self::new(data)
    }
}
