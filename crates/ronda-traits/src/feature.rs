//! Feature extractor trait.
//!
//! A `FeatureExtractor` turns validated observations into named feature
//! values. Extractors work on the whole batch at once so that aggregate
//! features (per-channel statistics) share one interface with per-row ones.

use crate::{FeatureMap, Observation, Result};

/// Computes a fixed family of features for a batch of observations.
///
/// Implementations must be thread-safe (`Send + Sync`) and must return exactly
/// one [`FeatureMap`] per input observation, in input order, each containing
/// every name listed by [`feature_names`](Self::feature_names). Values that
/// cannot be computed for a row are nulls, never errors.
///
/// # Example
///
/// ```
/// use ronda_traits::{FeatureExtractor, FeatureMap, FeatureValue, Observation, Result};
///
/// struct TitleLength;
///
/// impl FeatureExtractor for TitleLength {
///     fn name(&self) -> &str {
///         "title_length"
///     }
///
///     fn feature_names(&self) -> &[&'static str] {
///         &["title_length"]
///     }
///
///     fn extract(&self, observations: &[Observation]) -> Result<Vec<FeatureMap>> {
///         Ok(observations
///             .iter()
///             .map(|obs| {
///                 let mut map = FeatureMap::new();
///                 map.insert(
///                     "title_length".to_string(),
///                     FeatureValue::from(obs.title.chars().count() as f64),
///                 );
///                 map
///             })
///             .collect())
///     }
/// }
/// ```
pub trait FeatureExtractor: Send + Sync {
    /// Name of this extractor, used in logs.
    fn name(&self) -> &str;

    /// Names of the features produced, in output column order.
    fn feature_names(&self) -> &[&'static str];

    /// Computes features for every observation.
    ///
    /// # Errors
    ///
    /// Returns an error only when the batch as a whole cannot be processed.
    /// Per-row failures are represented as null values.
    fn extract(&self, observations: &[Observation]) -> Result<Vec<FeatureMap>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DailySeries, FeatureValue};
    use chrono::{TimeZone, Utc};

    struct ConstantExtractor;

    impl FeatureExtractor for ConstantExtractor {
        fn name(&self) -> &str {
            "constant"
        }

        fn feature_names(&self) -> &[&'static str] {
            &["one", "label"]
        }

        fn extract(&self, observations: &[Observation]) -> Result<Vec<FeatureMap>> {
            Ok(observations
                .iter()
                .map(|_| {
                    let mut map = FeatureMap::new();
                    map.insert("one".to_string(), FeatureValue::from(1.0));
                    map.insert(
                        "label".to_string(),
                        FeatureValue::Categorical("x".to_string()),
                    );
                    map
                })
                .collect())
        }
    }

    fn observation() -> Observation {
        Observation {
            video_id: "v1".to_string(),
            channel_id: "c1".to_string(),
            published_at: Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
            title: "Hello".to_string(),
            description: String::new(),
            tags: String::new(),
            category_id: None,
            duration_seconds: 30,
            view_count: Some(10.0),
            like_count: None,
            comment_count: None,
            daily: DailySeries::default(),
        }
    }

    #[test]
    fn test_extract_one_map_per_row() {
        let extractor = ConstantExtractor;
        let rows = vec![observation(), observation()];
        let maps = extractor.extract(&rows).unwrap();

        assert_eq!(maps.len(), 2);
        for map in &maps {
            for name in extractor.feature_names() {
                assert!(map.contains_key(*name));
            }
        }
    }

    #[test]
    fn test_extractor_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Box<dyn FeatureExtractor>>();
    }
}
