//! End-to-end pipeline: load, filter, featurize, split, train, evaluate, write.

use crate::config::PipelineConfig;
use crate::output::StagedOutput;
use crate::report::{FeatureMetadata, ProcessingReport};
use crate::trainer::Trainer;
use chrono::Utc;
use ronda_eval::{EvaluationReport, PairStatus, TemporalSplit, temporal_split};
use ronda_features::{FeatureBuilder, FeatureSet};
use ronda_ingest::{FilterReport, NormalizationReport, QualityFilter, load_observations};
use ronda_traits::{FeatureRow, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Data after every preparation stage, before training.
#[derive(Debug, Clone)]
pub struct Prepared {
    /// Column normalization outcome.
    pub normalization: NormalizationReport,
    /// Quality filter outcome.
    pub filtering: FilterReport,
    /// Feature rows with per-segment counts.
    pub features: FeatureSet,
    /// Chronological split of the feature rows.
    pub split: TemporalSplit<FeatureRow>,
    /// Data-quality warnings.
    pub warnings: Vec<String>,
}

/// What a completed run produced.
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// Output root.
    pub output_dir: PathBuf,
    /// Processing report as written.
    pub processing: ProcessingReport,
    /// Evaluation report as written.
    pub evaluation: EvaluationReport,
    /// Paths of the persisted model artifacts.
    pub model_paths: Vec<PathBuf>,
}

/// A validated pipeline configuration ready to run.
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ronda_traits::RondaError::InvalidConfig`] if validation fails.
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// The configuration in use.
    pub const fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Load, normalize, filter, featurize and split the input.
    ///
    /// # Errors
    ///
    /// Returns a schema error for missing required columns,
    /// [`ronda_traits::RondaError::EmptyDataset`] when no row survives the
    /// quality filter, or an I/O or Polars error if the input cannot be read.
    pub fn prepare(&self, input: &Path) -> Result<Prepared> {
        let (raw, normalization) = load_observations(input)?;
        let mut warnings = Vec::new();
        if !normalization.missing_optional.is_empty() {
            warnings.push(format!(
                "optional columns missing: {}",
                normalization.missing_optional.join(", ")
            ));
        }
        if normalization.missing_daily_columns > 0 {
            warnings.push(format!(
                "{} daily columns missing; treated as empty",
                normalization.missing_daily_columns
            ));
        }

        let (observations, filtering) = QualityFilter::new(self.config.quality()).apply(raw)?;
        if filtering.non_monotonic_rows > 0 {
            warnings.push(format!(
                "{} rows have non-monotonic daily views",
                filtering.non_monotonic_rows
            ));
        }

        let builder = FeatureBuilder::new(self.config.short_form_threshold_seconds);
        let mut features = builder.build(&observations)?;
        if features.degraded_time_series_rows > 0 {
            warnings.push(format!(
                "{} rows have no daily views; time-series features are null",
                features.degraded_time_series_rows
            ));
        }

        let rows = std::mem::take(&mut features.rows);
        let split = temporal_split(
            rows,
            self.config.validation_fraction,
            self.config.test_fraction,
        )?;
        debug_assert!(split.is_ordered());

        tracing::info!(
            rows = split.len(),
            train = split.train.len(),
            validation = split.validation.len(),
            test = split.test.len(),
            segments = ?features.segment_counts,
            "prepared dataset"
        );

        Ok(Prepared {
            normalization,
            filtering,
            features,
            split,
            warnings,
        })
    }

    /// Prepare the input and return its processing report without writing.
    ///
    /// # Errors
    ///
    /// Same as [`prepare`](Self::prepare).
    pub fn inspect(&self, input: &Path) -> Result<ProcessingReport> {
        let prepared = self.prepare(input)?;
        Ok(self.processing_report(input, &prepared, prepared.warnings.clone()))
    }

    /// Run every stage and write all outputs under `output`.
    ///
    /// Nothing is written until every fatal check, including the training
    /// budget, has passed. Files are written to a staging directory beside
    /// `output` and moved in only after the last one succeeds, so a failed
    /// write leaves `output` as it was. Pairs that are skipped or fail are recorded in the
    /// reports and do not fail the run.
    ///
    /// # Errors
    ///
    /// Returns the first fatal error: schema, empty dataset, training timeout,
    /// or an I/O failure while writing the tables and reports.
    pub async fn run(&self, input: &Path, output: &Path) -> Result<RunSummary> {
        let prepared = self.prepare(input)?;
        let split = Arc::new(prepared.split.clone());
        let outcomes = Trainer::new(&self.config).train_all(Arc::clone(&split)).await?;

        let stage = StagedOutput::new(output)?;
        let writer = stage.writer();
        let mut evaluation = EvaluationReport::new(split.summaries());
        let mut warnings = prepared.warnings.clone();
        let mut model_paths = Vec::new();

        for outcome in outcomes {
            let mut pair = outcome.report;
            if let Some(artifact) = outcome.artifact {
                match writer.write_model(&artifact) {
                    Ok(path) => model_paths.push(stage.final_path(&path)),
                    Err(e) => {
                        tracing::warn!(pair = %pair.key(), error = %e, "could not persist model");
                        pair.status = PairStatus::Failed;
                        pair.reason = Some(format!("could not persist model: {e}"));
                    }
                }
            }
            if pair.status != PairStatus::Trained
                && let Some(reason) = &pair.reason
            {
                warnings.push(format!("{} {}: {reason}", pair.key(), pair.status));
            }
            evaluation.push(pair);
        }
        for warning in &warnings {
            evaluation.warn(warning.clone());
        }

        let processing = self.processing_report(input, &prepared, warnings);
        writer.write_splits(&split)?;
        writer.write_feature_metadata(&FeatureMetadata::new(&self.config))?;
        writer.write_processing_report(&processing)?;
        writer.write_evaluation_report(&evaluation)?;
        let output_dir = stage.publish()?;

        tracing::info!(
            output = %output.display(),
            trained = evaluation.count(PairStatus::Trained),
            skipped = evaluation.count(PairStatus::Skipped),
            failed = evaluation.count(PairStatus::Failed),
            "run complete"
        );

        Ok(RunSummary {
            output_dir,
            processing,
            evaluation,
            model_paths,
        })
    }

    fn processing_report(
        &self,
        input: &Path,
        prepared: &Prepared,
        warnings: Vec<String>,
    ) -> ProcessingReport {
        ProcessingReport {
            generated_at: Utc::now(),
            input: input.display().to_string(),
            config: self.config,
            normalization: prepared.normalization.clone(),
            filtering: prepared.filtering.clone(),
            degraded_time_series_rows: prepared.features.degraded_time_series_rows,
            segment_counts: prepared.features.segment_counts.clone(),
            split: prepared.split.summaries(),
            warnings,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ronda_traits::RondaError;
    use std::fs;

    const HEADER: &str =
        "video_id,channel_id,published_at,title,duration,view_count,like_count,comment_count";

    #[test]
    fn test_invalid_config_rejected_up_front() {
        let config = PipelineConfig {
            test_fraction: 1.5,
            ..Default::default()
        };
        assert!(matches!(
            Pipeline::new(config),
            Err(RondaError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_missing_required_column_is_schema_error() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.csv");
        fs::write(&input, "video_id,title\na,hello\n").unwrap();

        let pipeline = Pipeline::new(PipelineConfig::default()).unwrap();
        let err = pipeline.inspect(&input).unwrap_err();
        assert!(matches!(err, RondaError::Schema(_)));
    }

    #[test]
    fn test_everything_rejected_is_empty_dataset() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.csv");
        fs::write(
            &input,
            format!("{HEADER}\na,c,2024-01-01T00:00:00Z,t,PT0S,1,1,1\nb,c,2024-01-02T00:00:00Z,t,,1,1,1\n"),
        )
        .unwrap();

        let pipeline = Pipeline::new(PipelineConfig::default()).unwrap();
        let err = pipeline.inspect(&input).unwrap_err();
        assert!(matches!(err, RondaError::EmptyDataset { input_rows: 2 }));
    }

    #[test]
    fn test_inspect_reports_counts() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.csv");
        let mut csv = format!("{HEADER}\n");
        for i in 0..20 {
            let duration = if i % 2 == 0 { "PT45S" } else { "PT3M2S" };
            csv.push_str(&format!(
                "v{i},c{},2024-02-{:02}T12:00:00Z,title {i},{duration},{},{},{}\n",
                i % 3,
                i + 1,
                100 * (i + 1),
                10 * (i + 1),
                i + 1
            ));
        }
        fs::write(&input, csv).unwrap();

        let pipeline = Pipeline::new(PipelineConfig::default()).unwrap();
        let report = pipeline.inspect(&input).unwrap();
        assert_eq!(report.filtering.input_rows, 20);
        assert_eq!(report.degraded_time_series_rows, report.filtering.after_outlier_removal);
        assert_eq!(
            report.split.train.rows + report.split.validation.rows + report.split.test.rows,
            report.filtering.after_outlier_removal
        );
        assert!(report.warnings.iter().any(|w| w.contains("daily columns missing")));
        assert!(!dir.path().join("train.csv").exists());
    }
}
