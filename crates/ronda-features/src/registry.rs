//! Feature catalog and the leakage-safe selector.
//!
//! Every feature the pipeline can produce is listed here with its category,
//! kind and a short description. The at-publish allow-list is derived from
//! the catalog by name, so a newly added feature is screened automatically.

use crate::channel::CHANNEL_FEATURES;
use crate::content::CONTENT_FEATURES;
use crate::temporal::TEMPORAL_FEATURES;
use crate::timeseries::TIME_SERIES_FEATURES;
use serde::{Deserialize, Serialize};

/// Substrings that mark a feature as derived from post-publish engagement.
pub const FORBIDDEN_SUBSTRINGS: [&str; 8] = [
    "view",
    "like",
    "comment",
    "growth",
    "velocity",
    "peak",
    "consistency",
    "ratio",
];

/// Feature category classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureCategory {
    /// Title, description, tags, category and duration
    Content,
    /// Publish calendar
    Temporal,
    /// Per-channel aggregates
    Channel,
    /// Daily engagement trajectory
    TimeSeries,
}

impl FeatureCategory {
    /// All categories in catalog order.
    pub const ALL: [Self; 4] = [Self::Content, Self::Temporal, Self::Channel, Self::TimeSeries];

    /// Get a human-readable description of the category.
    #[must_use]
    pub const fn description(&self) -> &str {
        match self {
            Self::Content => "Text, metadata and duration of the item itself",
            Self::Temporal => "When the item was published (UTC)",
            Self::Channel => "Aggregate history of the publishing channel",
            Self::TimeSeries => "Growth and engagement over the observation window",
        }
    }

    /// Stable identifier used in metadata files.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Content => "content",
            Self::Temporal => "temporal",
            Self::Channel => "channel",
            Self::TimeSeries => "time_series",
        }
    }

    /// Whether features of this category are derived from publish-time data.
    #[must_use]
    pub const fn is_static(&self) -> bool {
        !matches!(self, Self::TimeSeries)
    }
}

/// Value type of a feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureKind {
    /// Real-valued, possibly null
    Numeric,
    /// Label, one-hot encoded before training
    Categorical,
}

/// Metadata about a feature.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureInfo {
    /// Column name
    pub name: &'static str,

    /// Category classification
    pub category: FeatureCategory,

    /// Value type
    pub kind: FeatureKind,

    /// Human-readable description
    pub description: &'static str,
}

impl FeatureInfo {
    /// Whether this feature may be used for at-publish forecasting.
    #[must_use]
    pub fn is_at_publish(&self) -> bool {
        self.category.is_static() && is_leakage_safe(self.name)
    }
}

const DESCRIPTIONS: &[(&str, &str)] = &[
    ("title_length", "Characters in the title"),
    ("title_word_count", "Words in the title"),
    ("title_has_question", "Title contains a question mark"),
    ("title_has_exclamation", "Title contains an exclamation mark"),
    ("title_uppercase_fraction", "Share of uppercase letters in the title"),
    ("title_has_digits", "Title contains a digit"),
    ("title_emoji_count", "Pictographic characters in the title"),
    ("description_length", "Characters in the description"),
    ("description_word_count", "Words in the description"),
    ("language", "Detected language of title and description"),
    ("tag_count", "Number of tags"),
    ("category_id", "Platform category"),
    ("duration_seconds", "Duration in seconds"),
    ("is_optimal_short_duration", "Duration between 15 and 60 seconds"),
    ("is_optimal_long_duration", "Duration between 3 and 8 minutes"),
    ("publish_hour", "Hour of publication"),
    ("publish_day_of_week", "Day of week of publication, Monday = 0"),
    ("publish_month", "Month of publication"),
    ("is_weekend", "Published on Saturday or Sunday"),
    ("is_prime_time", "Published between 19:00 and 21:59"),
    ("channel_view_mean", "Mean current views of the channel's earlier items"),
    ("channel_view_median", "Median current views of the channel's earlier items"),
    ("channel_view_std", "Standard deviation of current views of earlier items"),
    ("channel_engagement_mean", "Mean engagement rate of the channel's earlier items"),
    ("channel_engagement_median", "Median engagement rate of the channel's earlier items"),
    ("channel_engagement_std", "Standard deviation of engagement rate of earlier items"),
    ("channel_video_count", "Items the channel published before this one"),
    ("channel_short_form_share", "Share of the channel's earlier items that are short-form"),
    ("channel_authority_score", "Blend of log mean views, log item count and engagement of earlier items"),
    ("relative_view_performance", "Current views relative to the channel's earlier mean"),
    ("growth_velocity", "Mean daily relative view growth over days 2-7"),
    ("growth_consistency", "Standard deviation of daily relative view growth"),
    ("peak_day", "Day with the highest recorded views"),
    ("like_ratio_day_1", "Likes per view on day 1"),
    ("like_ratio_day_7", "Likes per view on day 7"),
    ("like_ratio_day_30", "Likes per view on day 30"),
    ("comment_ratio_day_1", "Comments per view on day 1"),
    ("comment_ratio_day_7", "Comments per view on day 7"),
    ("comment_ratio_day_30", "Comments per view on day 30"),
];

const CATEGORICAL: [&str; 2] = ["language", "category_id"];

fn names_in(category: FeatureCategory) -> &'static [&'static str] {
    match category {
        FeatureCategory::Content => &CONTENT_FEATURES,
        FeatureCategory::Temporal => &TEMPORAL_FEATURES,
        FeatureCategory::Channel => &CHANNEL_FEATURES,
        FeatureCategory::TimeSeries => &TIME_SERIES_FEATURES,
    }
}

/// Get information about every feature, in output column order.
#[must_use]
pub fn feature_catalog() -> Vec<FeatureInfo> {
    FeatureCategory::ALL
        .into_iter()
        .flat_map(|category| {
            names_in(category).iter().map(move |&name| FeatureInfo {
                name,
                category,
                kind: if CATEGORICAL.contains(&name) {
                    FeatureKind::Categorical
                } else {
                    FeatureKind::Numeric
                },
                description: DESCRIPTIONS
                    .iter()
                    .find(|(n, _)| *n == name)
                    .map_or("", |(_, d)| *d),
            })
        })
        .collect()
}

/// Get all features in a specific category.
#[must_use]
pub fn features_by_category(category: FeatureCategory) -> Vec<FeatureInfo> {
    feature_catalog()
        .into_iter()
        .filter(|info| info.category == category)
        .collect()
}

/// Get information about a specific feature by name.
#[must_use]
pub fn get_feature_info(name: &str) -> Option<FeatureInfo> {
    feature_catalog().into_iter().find(|info| info.name == name)
}

/// Whether a feature name contains none of the [`FORBIDDEN_SUBSTRINGS`].
#[must_use]
pub fn is_leakage_safe(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    !FORBIDDEN_SUBSTRINGS.iter().any(|s| lower.contains(s))
}

/// Every feature name derived from publish-time data.
#[must_use]
pub fn static_features() -> Vec<&'static str> {
    feature_catalog()
        .into_iter()
        .filter(|info| info.category.is_static())
        .map(|info| info.name)
        .collect()
}

/// Static features safe for at-publish forecasting.
///
/// # Example
///
/// ```
/// use ronda_features::registry::at_publish_features;
///
/// let allowed = at_publish_features();
/// assert!(allowed.contains(&"title_length"));
/// assert!(!allowed.contains(&"channel_view_mean"));
/// ```
#[must_use]
pub fn at_publish_features() -> Vec<&'static str> {
    static_features()
        .into_iter()
        .filter(|name| is_leakage_safe(name))
        .collect()
}

/// Catalog features not eligible for at-publish forecasting.
#[must_use]
pub fn excluded_features() -> Vec<&'static str> {
    feature_catalog()
        .into_iter()
        .filter(|info| !info.is_at_publish())
        .map(|info| info.name)
        .collect()
}

/// Every feature name in output column order.
#[must_use]
pub fn all_features() -> Vec<&'static str> {
    feature_catalog().into_iter().map(|info| info.name).collect()
}

/// Names of the categorical features.
#[must_use]
pub fn categorical_features() -> Vec<&'static str> {
    CATEGORICAL.to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_at_publish_has_no_forbidden_substring() {
        let allowed = at_publish_features();
        assert!(!allowed.is_empty());
        for name in &allowed {
            for forbidden in FORBIDDEN_SUBSTRINGS {
                assert!(!name.contains(forbidden), "{name} contains {forbidden}");
            }
        }
    }

    #[test]
    fn test_at_publish_excludes_engagement_features() {
        let allowed = at_publish_features();
        for name in [
            "channel_view_mean",
            "relative_view_performance",
            "growth_velocity",
            "like_ratio_day_1",
            "peak_day",
        ] {
            assert!(!allowed.contains(&name), "{name} should be excluded");
        }
        for name in [
            "title_length",
            "language",
            "publish_hour",
            "channel_authority_score",
            "channel_engagement_mean",
            "duration_seconds",
        ] {
            assert!(allowed.contains(&name), "{name} should be allowed");
        }
    }

    #[test]
    fn test_allowed_and_excluded_partition_catalog() {
        let allowed = at_publish_features();
        let excluded = excluded_features();
        assert_eq!(allowed.len() + excluded.len(), feature_catalog().len());
        assert!(allowed.iter().all(|n| !excluded.contains(n)));
    }

    #[test]
    fn test_catalog_is_complete() {
        let catalog = feature_catalog();
        assert_eq!(catalog.len(), 15 + 5 + 10 + 9);
        for info in &catalog {
            assert!(!info.description.is_empty(), "{} has no description", info.name);
        }

        let mut names: Vec<_> = catalog.iter().map(|i| i.name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), catalog.len());
    }

    #[test]
    fn test_features_by_category() {
        assert_eq!(features_by_category(FeatureCategory::Temporal).len(), 5);
        assert_eq!(features_by_category(FeatureCategory::TimeSeries).len(), 9);
        assert!(
            features_by_category(FeatureCategory::TimeSeries)
                .iter()
                .all(|info| !info.is_at_publish())
        );
    }

    #[test]
    fn test_get_feature_info() {
        let info = get_feature_info("language").unwrap();
        assert_eq!(info.category, FeatureCategory::Content);
        assert_eq!(info.kind, FeatureKind::Categorical);
        assert!(get_feature_info("nonexistent_feature").is_none());
    }

    #[test]
    fn test_category_descriptions() {
        for category in FeatureCategory::ALL {
            assert!(!category.description().is_empty());
        }
    }
}
