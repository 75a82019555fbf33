//! Publish-time calendar features, all in UTC.

use chrono::{Datelike, Timelike, Weekday};
use ronda_traits::{FeatureExtractor, FeatureMap, FeatureValue, Observation, Result};
use serde::{Deserialize, Serialize};

/// Names produced by [`TemporalFeatures`], in output order.
pub const TEMPORAL_FEATURES: [&str; 5] = [
    "publish_hour",
    "publish_day_of_week",
    "publish_month",
    "is_weekend",
    "is_prime_time",
];

/// Configuration for [`TemporalFeatures`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemporalConfig {
    /// Inclusive hour range considered prime time.
    pub prime_time_hours: (u32, u32),
}

impl Default for TemporalConfig {
    fn default() -> Self {
        Self {
            prime_time_hours: (19, 21),
        }
    }
}

/// Hour, weekday and month of publication.
///
/// Day of week counts from Monday = 0.
#[derive(Debug, Clone, Default)]
pub struct TemporalFeatures {
    config: TemporalConfig,
}

impl TemporalFeatures {
    /// Create an extractor with the given configuration.
    #[must_use]
    pub const fn new(config: TemporalConfig) -> Self {
        Self { config }
    }

    /// Compute the features for a single observation.
    #[must_use]
    pub fn compute(&self, obs: &Observation) -> FeatureMap {
        let ts = obs.published_at;
        let hour = ts.hour();
        let weekday = ts.weekday();
        let (prime_start, prime_end) = self.config.prime_time_hours;

        let mut map = FeatureMap::new();
        map.insert("publish_hour".into(), FeatureValue::from(f64::from(hour)));
        map.insert(
            "publish_day_of_week".into(),
            FeatureValue::from(f64::from(weekday.num_days_from_monday())),
        );
        map.insert(
            "publish_month".into(),
            FeatureValue::from(f64::from(ts.month())),
        );
        map.insert(
            "is_weekend".into(),
            FeatureValue::flag(matches!(weekday, Weekday::Sat | Weekday::Sun)),
        );
        map.insert(
            "is_prime_time".into(),
            FeatureValue::flag((prime_start..=prime_end).contains(&hour)),
        );
        map
    }
}

impl FeatureExtractor for TemporalFeatures {
    fn name(&self) -> &str {
        "temporal"
    }

    fn feature_names(&self) -> &[&'static str] {
        &TEMPORAL_FEATURES
    }

    fn extract(&self, observations: &[Observation]) -> Result<Vec<FeatureMap>> {
        Ok(observations.iter().map(|obs| self.compute(obs)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use ronda_traits::DailySeries;

    fn published(y: i32, m: u32, d: u32, h: u32) -> Observation {
        Observation {
            video_id: "v".into(),
            channel_id: "c".into(),
            published_at: Utc.with_ymd_and_hms(y, m, d, h, 15, 0).unwrap(),
            title: String::new(),
            description: String::new(),
            tags: String::new(),
            category_id: None,
            duration_seconds: 30,
            view_count: None,
            like_count: None,
            comment_count: None,
            daily: DailySeries::default(),
        }
    }

    #[test]
    fn test_weekday_features() {
        // 2024-03-02 is a Saturday.
        let map = TemporalFeatures::default().compute(&published(2024, 3, 2, 20));
        assert_eq!(map["publish_hour"].as_f64(), Some(20.0));
        assert_eq!(map["publish_day_of_week"].as_f64(), Some(5.0));
        assert_eq!(map["publish_month"].as_f64(), Some(3.0));
        assert_eq!(map["is_weekend"].as_f64(), Some(1.0));
        assert_eq!(map["is_prime_time"].as_f64(), Some(1.0));
    }

    #[test]
    fn test_monday_morning() {
        let map = TemporalFeatures::default().compute(&published(2024, 3, 4, 8));
        assert_eq!(map["publish_day_of_week"].as_f64(), Some(0.0));
        assert_eq!(map["is_weekend"].as_f64(), Some(0.0));
        assert_eq!(map["is_prime_time"].as_f64(), Some(0.0));
    }

    #[test]
    fn test_prime_time_bounds() {
        let features = TemporalFeatures::default();
        let prime = |h| features.compute(&published(2024, 3, 4, h))["is_prime_time"].as_f64();
        assert_eq!(prime(18), Some(0.0));
        assert_eq!(prime(19), Some(1.0));
        assert_eq!(prime(21), Some(1.0));
        assert_eq!(prime(22), Some(0.0));
    }
}
