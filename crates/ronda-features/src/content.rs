//! Content features: title, description, tags, category and duration.

use crate::language::detect_language;
use ronda_traits::{FeatureExtractor, FeatureMap, FeatureValue, Observation, Result};
use serde::{Deserialize, Serialize};
use unicode_segmentation::UnicodeSegmentation;

/// Names produced by [`ContentFeatures`], in output order.
pub const CONTENT_FEATURES: [&str; 15] = [
    "title_length",
    "title_word_count",
    "title_has_question",
    "title_has_exclamation",
    "title_uppercase_fraction",
    "title_has_digits",
    "title_emoji_count",
    "description_length",
    "description_word_count",
    "language",
    "tag_count",
    "category_id",
    "duration_seconds",
    "is_optimal_short_duration",
    "is_optimal_long_duration",
];

/// Category label used when the input has none.
pub const UNKNOWN_CATEGORY: &str = "unknown";

/// Configuration for [`ContentFeatures`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentConfig {
    /// Inclusive duration range, in seconds, that performs best for short-form items.
    pub optimal_short_seconds: (i64, i64),
    /// Inclusive duration range, in seconds, that performs best for long-form items.
    pub optimal_long_seconds: (i64, i64),
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            optimal_short_seconds: (15, 60),
            optimal_long_seconds: (180, 480),
        }
    }
}

/// Text and metadata features available at publish time.
#[derive(Debug, Clone, Default)]
pub struct ContentFeatures {
    config: ContentConfig,
}

impl ContentFeatures {
    /// Create an extractor with the given configuration.
    #[must_use]
    pub const fn new(config: ContentConfig) -> Self {
        Self { config }
    }

    /// Compute the features for a single observation.
    #[must_use]
    pub fn compute(&self, obs: &Observation) -> FeatureMap {
        let title = obs.title.as_str();
        let (short_lo, short_hi) = self.config.optimal_short_seconds;
        let (long_lo, long_hi) = self.config.optimal_long_seconds;
        let duration = obs.duration_seconds;

        let language = detect_language(&format!("{title} {}", obs.description));
        let category = obs
            .category_id
            .clone()
            .unwrap_or_else(|| UNKNOWN_CATEGORY.to_string());

        let mut map = FeatureMap::new();
        map.insert("title_length".into(), count(title.chars().count()));
        map.insert("title_word_count".into(), count(title.unicode_words().count()));
        map.insert(
            "title_has_question".into(),
            FeatureValue::flag(title.contains(['?', '¿', '？'])),
        );
        map.insert(
            "title_has_exclamation".into(),
            FeatureValue::flag(title.contains(['!', '¡', '！'])),
        );
        map.insert(
            "title_uppercase_fraction".into(),
            uppercase_fraction(title).into(),
        );
        map.insert(
            "title_has_digits".into(),
            FeatureValue::flag(title.chars().any(char::is_numeric)),
        );
        map.insert("title_emoji_count".into(), count(emoji_count(title)));
        map.insert(
            "description_length".into(),
            count(obs.description.chars().count()),
        );
        map.insert(
            "description_word_count".into(),
            count(obs.description.unicode_words().count()),
        );
        map.insert(
            "language".into(),
            FeatureValue::Categorical(language.to_string()),
        );
        map.insert("tag_count".into(), count(tag_count(&obs.tags)));
        map.insert("category_id".into(), FeatureValue::Categorical(category));
        map.insert("duration_seconds".into(), FeatureValue::from(duration as f64));
        map.insert(
            "is_optimal_short_duration".into(),
            FeatureValue::flag((short_lo..=short_hi).contains(&duration)),
        );
        map.insert(
            "is_optimal_long_duration".into(),
            FeatureValue::flag((long_lo..=long_hi).contains(&duration)),
        );
        map
    }
}

impl FeatureExtractor for ContentFeatures {
    fn name(&self) -> &str {
        "content"
    }

    fn feature_names(&self) -> &[&'static str] {
        &CONTENT_FEATURES
    }

    fn extract(&self, observations: &[Observation]) -> Result<Vec<FeatureMap>> {
        Ok(observations.iter().map(|obs| self.compute(obs)).collect())
    }
}

fn count(n: usize) -> FeatureValue {
    FeatureValue::from(n as f64)
}

/// Share of uppercase letters among all letters; 0 when there are none.
pub fn uppercase_fraction(text: &str) -> f64 {
    let (upper, letters) = text
        .chars()
        .filter(|c| c.is_alphabetic())
        .fold((0usize, 0usize), |(u, n), c| {
            (u + usize::from(c.is_uppercase()), n + 1)
        });
    if letters == 0 {
        0.0
    } else {
        upper as f64 / letters as f64
    }
}

/// Number of pictographic characters.
pub fn emoji_count(text: &str) -> usize {
    text.chars()
        .filter(|c| {
            matches!(
                u32::from(*c),
                0x1F1E6..=0x1F1FF | 0x1F300..=0x1FAFF | 0x2600..=0x27BF | 0x2B50 | 0x2B55
            )
        })
        .count()
}

/// Number of non-empty tags in a raw tag list.
///
/// Accepts a JSON array, a bracketed list with single quotes, or a plain
/// list separated by `|` or `,`.
///
/// # Example
///
/// ```
/// use ronda_features::content::tag_count;
///
/// assert_eq!(tag_count(r#"["cooking", "pasta"]"#), 2);
/// assert_eq!(tag_count("cooking|pasta|dinner"), 3);
/// assert_eq!(tag_count(""), 0);
/// ```
pub fn tag_count(raw: &str) -> usize {
    let trimmed = raw.trim();
    if trimmed.starts_with('[') {
        if let Ok(tags) = serde_json::from_str::<Vec<String>>(trimmed) {
            return tags.iter().filter(|t| !t.trim().is_empty()).count();
        }
    }
    trimmed
        .trim_start_matches('[')
        .trim_end_matches(']')
        .split(['|', ','])
        .map(|t| t.trim().trim_matches(['\'', '"']).trim())
        .filter(|t| !t.is_empty())
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::{TimeZone, Utc};
    use ronda_traits::DailySeries;

    fn observation(title: &str, duration_seconds: i64) -> Observation {
        Observation {
            video_id: "v".into(),
            channel_id: "c".into(),
            published_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            title: title.into(),
            description: "A quick recipe for the whole family".into(),
            tags: "food|recipe".into(),
            category_id: Some("26".into()),
            duration_seconds,
            view_count: Some(100.0),
            like_count: None,
            comment_count: None,
            daily: DailySeries::default(),
        }
    }

    #[test]
    fn test_title_features() {
        let map = ContentFeatures::default().compute(&observation("WOW 5 pasta tricks?! 🍝", 45));

        assert_eq!(map["title_length"].as_f64(), Some(22.0));
        assert_eq!(map["title_word_count"].as_f64(), Some(4.0));
        assert_eq!(map["title_has_question"].as_f64(), Some(1.0));
        assert_eq!(map["title_has_exclamation"].as_f64(), Some(1.0));
        assert_eq!(map["title_has_digits"].as_f64(), Some(1.0));
        assert_eq!(map["title_emoji_count"].as_f64(), Some(1.0));
        assert_relative_eq!(map["title_uppercase_fraction"].as_f64().unwrap(), 3.0 / 14.0);
    }

    #[test]
    fn test_metadata_features() {
        let map = ContentFeatures::default().compute(&observation("Pasta", 45));

        assert_eq!(map["tag_count"].as_f64(), Some(2.0));
        assert_eq!(map["category_id"].as_category(), Some("26"));
        assert_eq!(map["language"].as_category(), Some("en"));
        assert_eq!(map["duration_seconds"].as_f64(), Some(45.0));
        assert_eq!(map["description_word_count"].as_f64(), Some(7.0));
        for name in CONTENT_FEATURES {
            assert!(map.contains_key(name), "missing {name}");
        }
    }

    #[test]
    fn test_missing_category_is_unknown() {
        let mut obs = observation("Pasta", 45);
        obs.category_id = None;
        let map = ContentFeatures::default().compute(&obs);
        assert_eq!(map["category_id"].as_category(), Some("unknown"));
    }

    #[test]
    fn test_optimal_duration_flags() {
        let features = ContentFeatures::default();
        let flags = |d| {
            let map = features.compute(&observation("x", d));
            (
                map["is_optimal_short_duration"].as_f64(),
                map["is_optimal_long_duration"].as_f64(),
            )
        };
        assert_eq!(flags(14), (Some(0.0), Some(0.0)));
        assert_eq!(flags(15), (Some(1.0), Some(0.0)));
        assert_eq!(flags(60), (Some(1.0), Some(0.0)));
        assert_eq!(flags(180), (Some(0.0), Some(1.0)));
        assert_eq!(flags(481), (Some(0.0), Some(0.0)));
    }

    #[test]
    fn test_uppercase_fraction_without_letters() {
        assert_eq!(uppercase_fraction("123 !!"), 0.0);
        assert_eq!(uppercase_fraction("ABC"), 1.0);
    }

    #[test]
    fn test_tag_formats() {
        assert_eq!(tag_count("['a', 'b', 'c']"), 3);
        assert_eq!(tag_count("a, b,,c"), 3);
        assert_eq!(tag_count("[]"), 0);
        assert_eq!(tag_count("single"), 1);
    }
}
