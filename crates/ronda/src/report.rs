//! Processing report and feature metadata written next to the split tables.

use crate::config::PipelineConfig;
use chrono::{DateTime, Utc};
use ronda_eval::SplitSummary;
use ronda_features::FeatureInfo;
use ronda_features::registry::{
    at_publish_features, categorical_features, excluded_features, feature_catalog,
};
use ronda_ingest::{FilterReport, NormalizationReport};
use ronda_traits::{Horizon, Segment};
use serde::Serialize;
use std::collections::BTreeMap;

/// Row counts and data-quality findings of the preparation stages.
#[derive(Debug, Clone, Serialize)]
pub struct ProcessingReport {
    /// When the report was assembled.
    pub generated_at: DateTime<Utc>,
    /// Input file.
    pub input: String,
    /// Effective configuration.
    pub config: PipelineConfig,
    /// Column renames and missing columns.
    pub normalization: NormalizationReport,
    /// Row counts after each quality rule and rejection reasons.
    pub filtering: FilterReport,
    /// Rows whose daily views were entirely missing.
    pub degraded_time_series_rows: usize,
    /// Rows per segment after filtering.
    pub segment_counts: BTreeMap<Segment, usize>,
    /// Slice sizes and publish-time ranges.
    pub split: SplitSummary,
    /// Warnings raised while preparing the data and training.
    pub warnings: Vec<String>,
}

/// Description of the feature columns in the split tables.
#[derive(Debug, Clone, Serialize)]
pub struct FeatureMetadata {
    /// Feature names grouped by category.
    pub features_by_category: BTreeMap<String, Vec<&'static str>>,
    /// Features that are one-hot encoded.
    pub categorical_features: Vec<&'static str>,
    /// Features eligible for at-publish forecasting.
    pub at_publish_features: Vec<&'static str>,
    /// Features excluded from at-publish forecasting.
    pub excluded_features: Vec<&'static str>,
    /// Features the models of this run were trained on.
    pub selected_features: Vec<&'static str>,
    /// Target columns, one per horizon.
    pub targets: BTreeMap<Horizon, String>,
    /// Every feature with its category, kind and description.
    pub catalog: Vec<FeatureInfo>,
}

impl FeatureMetadata {
    /// Metadata for a run with the given configuration.
    pub fn new(config: &PipelineConfig) -> Self {
        let catalog = feature_catalog();
        let mut features_by_category: BTreeMap<String, Vec<&'static str>> = BTreeMap::new();
        for info in &catalog {
            features_by_category
                .entry(info.category.as_str().to_string())
                .or_default()
                .push(info.name);
        }

        Self {
            features_by_category,
            categorical_features: categorical_features(),
            at_publish_features: at_publish_features(),
            excluded_features: excluded_features(),
            selected_features: config.selected_features(),
            targets: Horizon::ALL
                .into_iter()
                .map(|h| (h, h.target_column()))
                .collect(),
            catalog,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ronda_features::registry::is_leakage_safe;

    #[test]
    fn test_feature_metadata_default() {
        let meta = FeatureMetadata::new(&PipelineConfig::default());
        assert_eq!(meta.selected_features, meta.at_publish_features);
        assert!(meta.selected_features.iter().all(|f| is_leakage_safe(f)));
        assert_eq!(
            meta.at_publish_features.len() + meta.excluded_features.len(),
            meta.catalog.len()
        );
        assert_eq!(meta.targets[&Horizon::Day7], "target_views_day_7");
    }

    #[test]
    fn test_feature_metadata_json() {
        let meta = FeatureMetadata::new(&PipelineConfig::default());
        let value = serde_json::to_value(&meta).unwrap();
        assert!(value["features_by_category"]["time_series"].is_array());
        assert_eq!(value["targets"]["30d"], "target_views_day_30");
        assert!(
            value["categorical_features"]
                .as_array()
                .unwrap()
                .contains(&serde_json::json!("language"))
        );
    }
}
