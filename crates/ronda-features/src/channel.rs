//! Per-channel history features.
//!
//! Each row sees only the items its channel published strictly before it, so
//! nothing observed on the row itself or on later items reaches its features.
//! A channel's first item has no history: its statistics are null and its
//! item count is zero.

use ronda_traits::stats::{guarded_ratio, mean, median, sample_std};
use ronda_traits::types::DEFAULT_SHORT_FORM_THRESHOLD_SECONDS;
use ronda_traits::{FeatureExtractor, FeatureMap, FeatureValue, Observation, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Names produced by [`ChannelFeatures`], in output order.
pub const CHANNEL_FEATURES: [&str; 10] = [
    "channel_view_mean",
    "channel_view_median",
    "channel_view_std",
    "channel_engagement_mean",
    "channel_engagement_median",
    "channel_engagement_std",
    "channel_video_count",
    "channel_short_form_share",
    "channel_authority_score",
    "relative_view_performance",
];

/// Configuration for [`ChannelFeatures`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelConfig {
    /// Duration at or below which an item counts as short-form.
    pub short_form_threshold_seconds: i64,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            short_form_threshold_seconds: DEFAULT_SHORT_FORM_THRESHOLD_SECONDS,
        }
    }
}

/// Summary statistics over a channel's earlier items.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelStats {
    /// Mean current view count.
    pub view_mean: Option<f64>,
    /// Median current view count.
    pub view_median: Option<f64>,
    /// Sample standard deviation of current view counts.
    pub view_std: Option<f64>,
    /// Mean engagement rate.
    pub engagement_mean: Option<f64>,
    /// Median engagement rate.
    pub engagement_median: Option<f64>,
    /// Sample standard deviation of engagement rates.
    pub engagement_std: Option<f64>,
    /// Items published by the channel.
    pub video_count: usize,
    /// Share of those items that are short-form; `None` without items.
    pub short_form_share: Option<f64>,
}

impl ChannelStats {
    /// Build statistics from a set of observations of one channel.
    pub fn from_observations(rows: &[&Observation], short_form_threshold_seconds: i64) -> Self {
        let mut history = ChannelHistory::default();
        for obs in rows {
            history.push(obs, short_form_threshold_seconds);
        }
        history.stats()
    }

    /// `0.4 ln(1 + mean views) + 0.3 ln(1 + count) + 0.3 mean engagement`.
    ///
    /// Missing means contribute zero.
    pub fn authority_score(&self) -> f64 {
        0.4 * self.view_mean.unwrap_or(0.0).max(0.0).ln_1p()
            + 0.3 * (self.video_count as f64).ln_1p()
            + 0.3 * self.engagement_mean.unwrap_or(0.0)
    }
}

/// Running record of the items a channel has published so far.
#[derive(Debug, Clone, Default)]
struct ChannelHistory {
    views: Vec<f64>,
    rates: Vec<f64>,
    count: usize,
    short: usize,
}

impl ChannelHistory {
    fn push(&mut self, obs: &Observation, short_form_threshold_seconds: i64) {
        if let Some(v) = obs.view_count.filter(|v| v.is_finite()) {
            insert_sorted(&mut self.views, v);
        }
        if let Some(r) = engagement_rate(obs).filter(|r| r.is_finite()) {
            insert_sorted(&mut self.rates, r);
        }
        self.count += 1;
        if obs.duration_seconds <= short_form_threshold_seconds {
            self.short += 1;
        }
    }

    fn stats(&self) -> ChannelStats {
        ChannelStats {
            view_mean: mean(&self.views),
            view_median: median(&self.views),
            view_std: sample_std(&self.views),
            engagement_mean: mean(&self.rates),
            engagement_median: median(&self.rates),
            engagement_std: sample_std(&self.rates),
            video_count: self.count,
            short_form_share: (self.count > 0).then(|| self.short as f64 / self.count as f64),
        }
    }
}

fn insert_sorted(values: &mut Vec<f64>, v: f64) {
    let at = values.partition_point(|x| *x < v);
    values.insert(at, v);
}

/// `(likes + comments) / max(views, 1)` from the current counters.
///
/// Missing when views are missing or both likes and comments are missing.
pub fn engagement_rate(obs: &Observation) -> Option<f64> {
    let views = obs.view_count?;
    if obs.like_count.is_none() && obs.comment_count.is_none() {
        return None;
    }
    let interactions = obs.like_count.unwrap_or(0.0) + obs.comment_count.unwrap_or(0.0);
    Some(guarded_ratio(interactions, views))
}

/// Channel history joined onto each row.
#[derive(Debug, Clone, Default)]
pub struct ChannelFeatures {
    config: ChannelConfig,
}

impl ChannelFeatures {
    /// Create an extractor with the given configuration.
    #[must_use]
    pub const fn new(config: ChannelConfig) -> Self {
        Self { config }
    }

    /// Statistics for every observation, in input order, over the items of
    /// its channel published strictly earlier.
    ///
    /// Items sharing a timestamp do not see each other.
    #[must_use]
    pub fn prior_stats(&self, observations: &[Observation]) -> Vec<ChannelStats> {
        let mut groups: HashMap<&str, Vec<usize>> = HashMap::new();
        for (i, obs) in observations.iter().enumerate() {
            groups.entry(obs.channel_id.as_str()).or_default().push(i);
        }

        let threshold = self.config.short_form_threshold_seconds;
        let mut out: Vec<Option<ChannelStats>> = vec![None; observations.len()];
        for mut indices in groups.into_values() {
            indices.sort_by_key(|&i| observations[i].published_at);
            let mut history = ChannelHistory::default();
            for batch in indices.chunk_by(|&a, &b| {
                observations[a].published_at == observations[b].published_at
            }) {
                let stats = history.stats();
                for &i in batch {
                    out[i] = Some(stats.clone());
                }
                for &i in batch {
                    history.push(&observations[i], threshold);
                }
            }
        }
        out.into_iter()
            .map(|stats| stats.unwrap_or_else(|| ChannelHistory::default().stats()))
            .collect()
    }
}

impl FeatureExtractor for ChannelFeatures {
    fn name(&self) -> &str {
        "channel"
    }

    fn feature_names(&self) -> &[&'static str] {
        &CHANNEL_FEATURES
    }

    fn extract(&self, observations: &[Observation]) -> Result<Vec<FeatureMap>> {
        let stats = self.prior_stats(observations);
        tracing::debug!(rows = stats.len(), "computed channel history");

        Ok(observations
            .iter()
            .zip(stats)
            .map(|(obs, s)| {
                let mut map = FeatureMap::new();
                map.insert("channel_view_mean".into(), s.view_mean.into());
                map.insert("channel_view_median".into(), s.view_median.into());
                map.insert("channel_view_std".into(), s.view_std.into());
                map.insert("channel_engagement_mean".into(), s.engagement_mean.into());
                map.insert("channel_engagement_median".into(), s.engagement_median.into());
                map.insert("channel_engagement_std".into(), s.engagement_std.into());
                map.insert(
                    "channel_video_count".into(),
                    FeatureValue::from(s.video_count as f64),
                );
                map.insert("channel_short_form_share".into(), s.short_form_share.into());
                map.insert(
                    "channel_authority_score".into(),
                    FeatureValue::from(s.authority_score()),
                );
                map.insert(
                    "relative_view_performance".into(),
                    obs.view_count
                        .zip(s.view_mean)
                        .map(|(views, m)| guarded_ratio(views, m))
                        .into(),
                );
                map
            })
            .collect())
    }
}
