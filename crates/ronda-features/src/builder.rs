//! Assembly of feature rows from the individual extractors.

use crate::channel::{ChannelConfig, ChannelFeatures};
use crate::content::ContentFeatures;
use crate::temporal::TemporalFeatures;
use crate::timeseries::{TimeSeriesFeatures, is_degraded};
use rayon::prelude::*;
use ronda_traits::{
    FeatureExtractor, FeatureMap, FeatureRow, Horizon, Observation, Result, RondaError, Segment,
};
use std::collections::BTreeMap;
use std::fmt;

/// Feature rows plus the bookkeeping the processing report needs.
#[derive(Debug, Clone, Default)]
pub struct FeatureSet {
    /// One row per observation, in input order.
    pub rows: Vec<FeatureRow>,
    /// Rows whose daily views were entirely missing.
    pub degraded_time_series_rows: usize,
    /// Row count per segment.
    pub segment_counts: BTreeMap<Segment, usize>,
}

/// Runs every registered extractor and joins their output into [`FeatureRow`]s.
pub struct FeatureBuilder {
    extractors: Vec<Box<dyn FeatureExtractor>>,
    short_form_threshold_seconds: i64,
}

impl fmt::Debug for FeatureBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FeatureBuilder")
            .field("extractors", &self.extractor_names())
            .field("short_form_threshold_seconds", &self.short_form_threshold_seconds)
            .finish()
    }
}

impl FeatureBuilder {
    /// Builder with the content, temporal, channel and time-series extractors.
    #[must_use]
    pub fn new(short_form_threshold_seconds: i64) -> Self {
        Self::empty(short_form_threshold_seconds)
            .with_extractor(Box::new(ContentFeatures::default()))
            .with_extractor(Box::new(TemporalFeatures::default()))
            .with_extractor(Box::new(ChannelFeatures::new(ChannelConfig {
                short_form_threshold_seconds,
            })))
            .with_extractor(Box::new(TimeSeriesFeatures::default()))
    }

    /// Builder with no extractors; rows carry only segment and targets.
    #[must_use]
    pub const fn empty(short_form_threshold_seconds: i64) -> Self {
        Self {
            extractors: Vec::new(),
            short_form_threshold_seconds,
        }
    }

    /// Register an additional extractor.
    #[must_use]
    pub fn with_extractor(mut self, extractor: Box<dyn FeatureExtractor>) -> Self {
        self.extractors.push(extractor);
        self
    }

    /// Names of the registered extractors.
    pub fn extractor_names(&self) -> Vec<&str> {
        self.extractors.iter().map(|e| e.name()).collect()
    }

    /// Compute features, segment and targets for every observation.
    ///
    /// Extractors run in parallel. Targets are read from the recorded daily
    /// views at each horizon.
    ///
    /// # Errors
    ///
    /// Returns [`RondaError::FeatureComputation`] if an extractor fails as a
    /// whole or returns the wrong number of rows.
    pub fn build(&self, observations: &[Observation]) -> Result<FeatureSet> {
        let outputs: Vec<Vec<FeatureMap>> = self
            .extractors
            .par_iter()
            .map(|extractor| {
                let maps = extractor.extract(observations)?;
                if maps.len() != observations.len() {
                    return Err(RondaError::FeatureComputation(format!(
                        "extractor {} returned {} rows for {} observations",
                        extractor.name(),
                        maps.len(),
                        observations.len()
                    )));
                }
                Ok(maps)
            })
            .collect::<Result<_>>()?;

        let mut merged: Vec<FeatureMap> = vec![FeatureMap::new(); observations.len()];
        for maps in outputs {
            for (row, map) in merged.iter_mut().zip(maps) {
                row.extend(map);
            }
        }

        let mut set = FeatureSet::default();
        for (obs, features) in observations.iter().zip(merged) {
            if is_degraded(&obs.daily) {
                set.degraded_time_series_rows += 1;
            }
            let segment = Segment::classify(obs.duration_seconds, self.short_form_threshold_seconds);
            *set.segment_counts.entry(segment).or_default() += 1;

            set.rows.push(FeatureRow {
                video_id: obs.video_id.clone(),
                channel_id: obs.channel_id.clone(),
                published_at: obs.published_at,
                segment,
                features,
                targets: Horizon::ALL
                    .into_iter()
                    .map(|h| (h, obs.daily.views_on(h.day())))
                    .collect(),
            });
        }

        if set.degraded_time_series_rows > 0 {
            tracing::warn!(
                rows = set.degraded_time_series_rows,
                "daily views entirely missing, time-series features set to null"
            );
        }
        tracing::info!(
            rows = set.rows.len(),
            extractors = self.extractors.len(),
            segments = ?set.segment_counts,
            "built feature rows"
        );
        Ok(set)
    }
}
