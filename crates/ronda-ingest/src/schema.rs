//! Column normalization and typed extraction.
//!
//! Input tables come from several harvesters that disagree on naming
//! (`videoId`, `video_id`, `id`, `contentDetails.duration`, ...). This module
//! maps every known alias onto one canonical schema and then reads each row
//! into a [`RawObservation`].

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use polars::prelude::*;
use regex::Regex;
use ronda_traits::{
    DailyMetric, DailySeries, EngagementData, OBSERVATION_DAYS, RawObservation, Result,
    RondaError, daily_column,
};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use crate::duration::duration_seconds;

/// Columns that must be present after normalization.
pub const REQUIRED_COLUMNS: [&str; 5] =
    ["video_id", "channel_id", "published_at", "duration", "view_count"];

/// Columns that are read when present and treated as all-null otherwise.
pub const OPTIONAL_COLUMNS: [&str; 6] = [
    "title",
    "description",
    "tags",
    "category_id",
    "like_count",
    "comment_count",
];

/// Canonical column name and the aliases it absorbs.
const ALIASES: &[(&str, &[&str])] = &[
    ("video_id", &["id", "videoId"]),
    ("channel_id", &["channelId", "channel"]),
    (
        "published_at",
        &["publishedAt", "publish_time", "publish_timestamp", "upload_date"],
    ),
    ("title", &["video_title"]),
    ("description", &["video_description"]),
    ("tags", &["video_tags"]),
    ("category_id", &["categoryId", "category"]),
    (
        "duration",
        &["contentDetails.duration", "duration_iso", "iso_duration"],
    ),
    ("view_count", &["viewCount", "views"]),
    ("like_count", &["likeCount", "likes"]),
    ("comment_count", &["commentCount", "comments"]),
];

static DAILY_KEY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:day|d)(\d{1,2})(views|likes|comments)$").expect("daily pattern is valid")
});

static ALIAS_LOOKUP: LazyLock<HashMap<String, &'static str>> = LazyLock::new(|| {
    let mut lookup = HashMap::new();
    for (canonical, aliases) in ALIASES {
        lookup.insert(match_key(canonical), *canonical);
        for alias in *aliases {
            lookup.insert(match_key(alias), *canonical);
        }
    }
    lookup
});

/// Lowercased name with every non-alphanumeric character removed.
fn match_key(name: &str) -> String {
    name.chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Canonical name for an input column, if it is a known field or daily column.
///
/// # Example
///
/// ```
/// use ronda_ingest::schema::canonical_name;
///
/// assert_eq!(canonical_name("videoId").as_deref(), Some("video_id"));
/// assert_eq!(canonical_name("d7_views").as_deref(), Some("day_7_views"));
/// assert_eq!(canonical_name("thumbnail_url"), None);
/// ```
pub fn canonical_name(column: &str) -> Option<String> {
    let key = match_key(column);
    if let Some(canonical) = ALIAS_LOOKUP.get(&key) {
        return Some((*canonical).to_string());
    }

    let caps = DAILY_KEY.captures(&key)?;
    let day: usize = caps[1].parse().ok()?;
    if !(1..=OBSERVATION_DAYS).contains(&day) {
        return None;
    }
    Some(format!("day_{day}_{}", &caps[2]))
}

/// What [`normalize_columns`] changed and what it could not find.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NormalizationReport {
    /// `(original, canonical)` pairs that were renamed.
    pub renamed: Vec<(String, String)>,
    /// Aliases left untouched because their canonical name was already taken.
    pub shadowed: Vec<String>,
    /// Optional columns absent from the input.
    pub missing_optional: Vec<String>,
    /// Number of the 90 daily columns absent from the input.
    pub missing_daily_columns: usize,
}

/// Rename known aliases to canonical names.
///
/// Renaming is case-insensitive and ignores separators, so `View_Count`,
/// `viewCount` and `views` all become `view_count`. When two input columns
/// map to the same canonical name the first one wins and the other is kept
/// under its original name. Rows are never dropped.
///
/// # Errors
///
/// Returns [`RondaError::Schema`] if a required column is still absent, or a
/// Polars error if a rename fails.
pub fn normalize_columns(data: &mut EngagementData) -> Result<NormalizationReport> {
    let original = data.columns();
    let mut taken: HashSet<String> = original.iter().cloned().collect();
    let mut report = NormalizationReport::default();

    for column in &original {
        let Some(canonical) = canonical_name(column) else {
            continue;
        };
        if canonical == *column {
            continue;
        }
        if taken.contains(&canonical) {
            tracing::debug!(column = %column, canonical = %canonical, "alias shadowed by existing column");
            report.shadowed.push(column.clone());
            continue;
        }
        data.data_mut().rename(column, canonical.as_str().into())?;
        taken.insert(canonical.clone());
        report.renamed.push((column.clone(), canonical));
    }

    require_columns(data)?;

    for name in OPTIONAL_COLUMNS {
        if !data.has_column(name) {
            tracing::warn!(column = name, "optional column missing, values treated as null");
            report.missing_optional.push(name.to_string());
        }
    }

    report.missing_daily_columns = (1..=OBSERVATION_DAYS)
        .flat_map(|day| DailyMetric::ALL.map(|metric| daily_column(day, metric)))
        .filter(|name| !data.has_column(name))
        .count();
    if report.missing_daily_columns > 0 {
        tracing::warn!(
            missing = report.missing_daily_columns,
            "daily columns missing, entries treated as unobserved"
        );
    }

    tracing::info!(
        rows = data.len(),
        renamed = report.renamed.len(),
        "normalized input columns"
    );
    Ok(report)
}

/// Fail with a schema error listing every required column that is absent.
///
/// # Errors
///
/// Returns [`RondaError::Schema`] naming the missing columns.
pub fn require_columns(data: &EngagementData) -> Result<()> {
    let missing: Vec<&str> = REQUIRED_COLUMNS
        .into_iter()
        .filter(|name| !data.has_column(name))
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(RondaError::Schema(format!(
            "missing required columns: {}",
            missing.join(", ")
        )))
    }
}

/// Read every row of a normalized table into a [`RawObservation`].
///
/// Text columns are trimmed (empty becomes missing), numeric columns are cast
/// non-strictly so malformed cells become missing, timestamps go through
/// [`parse_timestamp`] and durations through the duration parser.
///
/// # Errors
///
/// Returns [`RondaError::Schema`] if a required column is absent, or a Polars
/// error if a column cannot be cast.
pub fn extract_observations(data: &EngagementData) -> Result<Vec<RawObservation>> {
    require_columns(data)?;
    let df = data.data();
    let height = df.height();

    let video_id = text_values(df, "video_id", height)?;
    let channel_id = text_values(df, "channel_id", height)?;
    let published_at = text_values(df, "published_at", height)?;
    let title = text_values(df, "title", height)?;
    let description = text_values(df, "description", height)?;
    let tags = text_values(df, "tags", height)?;
    let category_id = text_values(df, "category_id", height)?;
    let duration = text_values(df, "duration", height)?;
    let view_count = numeric_values(df, "view_count", height)?;
    let like_count = numeric_values(df, "like_count", height)?;
    let comment_count = numeric_values(df, "comment_count", height)?;

    let mut daily_columns: Vec<[Vec<Option<f64>>; 3]> = Vec::with_capacity(OBSERVATION_DAYS);
    for day in 1..=OBSERVATION_DAYS {
        daily_columns.push([
            numeric_values(df, &daily_column(day, DailyMetric::Views), height)?,
            numeric_values(df, &daily_column(day, DailyMetric::Likes), height)?,
            numeric_values(df, &daily_column(day, DailyMetric::Comments), height)?,
        ]);
    }

    let mut unparsed_timestamps = 0usize;
    let rows = (0..height)
        .map(|i| {
            let published = published_at[i].as_deref().and_then(parse_timestamp);
            if published_at[i].is_some() && published.is_none() {
                unparsed_timestamps += 1;
            }
            let daily = DailySeries {
                views: daily_columns.iter().map(|d| d[0][i]).collect(),
                likes: daily_columns.iter().map(|d| d[1][i]).collect(),
                comments: daily_columns.iter().map(|d| d[2][i]).collect(),
            };
            RawObservation {
                video_id: video_id[i].clone(),
                channel_id: channel_id[i].clone(),
                published_at: published,
                title: title[i].clone(),
                description: description[i].clone(),
                tags: tags[i].clone(),
                category_id: category_id[i].clone(),
                duration_seconds: duration_seconds(duration[i].as_deref()),
                duration: duration[i].clone(),
                view_count: view_count[i],
                like_count: like_count[i],
                comment_count: comment_count[i],
                daily,
            }
        })
        .collect();

    if unparsed_timestamps > 0 {
        tracing::warn!(rows = unparsed_timestamps, "unparseable publish timestamps");
    }
    Ok(rows)
}

/// Parse a publish timestamp into UTC.
///
/// Accepts RFC 3339 (with offset or `Z`), naive `YYYY-MM-DD HH:MM:SS` or
/// `YYYY-MM-DDTHH:MM:SS` (optionally with fractional seconds, read as UTC)
/// and bare dates (midnight UTC).
///
/// # Example
///
/// ```
/// use ronda_ingest::schema::parse_timestamp;
///
/// let ts = parse_timestamp("2024-03-01T18:30:00Z").unwrap();
/// assert_eq!(ts.to_rfc3339(), "2024-03-01T18:30:00+00:00");
/// assert!(parse_timestamp("yesterday").is_none());
/// ```
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

fn text_values(df: &DataFrame, name: &str, height: usize) -> Result<Vec<Option<String>>> {
    let Ok(column) = df.column(name) else {
        return Ok(vec![None; height]);
    };
    let series = column.as_materialized_series().cast(&DataType::String)?;
    Ok(series
        .str()?
        .into_iter()
        .map(|v| {
            v.map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        })
        .collect())
}

fn numeric_values(df: &DataFrame, name: &str, height: usize) -> Result<Vec<Option<f64>>> {
    let Ok(column) = df.column(name) else {
        return Ok(vec![None; height]);
    };
    let series = column.as_materialized_series().cast(&DataType::Float64)?;
    Ok(series
        .f64()?
        .into_iter()
        .map(|v| v.filter(|x| x.is_finite()))
        .collect())
}
