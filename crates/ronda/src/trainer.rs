//! Per-pair model training.
//!
//! Each (segment, horizon) pair is an independent blocking task on the tokio
//! runtime. Tasks share the split read-only through an [`Arc`] and send back a
//! [`PairOutcome`]; the caller joins all of them before anything is reported.
//! A task that fails or panics marks its pair as failed and the others carry
//! on. The training step as a whole runs under one wall-clock budget.

use crate::config::PipelineConfig;
use ronda_eval::{PairReport, RegressionMetrics, SampleCounts, TemporalSplit};
use ronda_models::{FeatureColumn, ModelArtifact, ModelConfig};
use ronda_traits::{FeatureMap, FeatureRow, Horizon, Result, RondaError, Segment};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;

/// What one training task sends back.
#[derive(Debug, Clone)]
pub struct PairOutcome {
    /// Evaluation entry for the pair.
    pub report: PairReport,
    /// The fitted model, present only when the pair trained.
    pub artifact: Option<ModelArtifact>,
}

impl PairOutcome {
    fn failed(segment: Segment, horizon: Horizon, samples: SampleCounts, reason: String) -> Self {
        Self {
            report: PairReport::failed(segment, horizon, samples, reason),
            artifact: None,
        }
    }
}

/// Rows of one slice usable for a pair: right segment, recorded target.
#[derive(Debug, Default)]
struct PairRows<'a> {
    features: Vec<&'a FeatureMap>,
    targets: Vec<f64>,
}

impl<'a> PairRows<'a> {
    fn select(rows: &'a [FeatureRow], segment: Segment, horizon: Horizon) -> Self {
        let mut selected = Self::default();
        for row in rows {
            if row.segment != segment {
                continue;
            }
            let Some(target) = row.target(horizon).filter(|t| t.is_finite() && *t >= 0.0) else {
                continue;
            };
            selected.features.push(&row.features);
            selected.targets.push(target);
        }
        selected
    }

    fn len(&self) -> usize {
        self.targets.len()
    }
}

/// Everything one task needs to train its pair.
#[derive(Debug, Clone)]
struct PairJob {
    segment: Segment,
    horizon: Horizon,
    columns: Arc<Vec<FeatureColumn>>,
    model: ModelConfig,
    min_samples: usize,
    refit: bool,
}

impl PairJob {
    /// Train the pair. `samples` is filled in before fitting starts so a
    /// panic during the fit still reports the pair's row counts.
    fn run(&self, split: &TemporalSplit<FeatureRow>, samples: &mut SampleCounts) -> PairOutcome {
        let (segment, horizon) = (self.segment, self.horizon);
        let train = PairRows::select(&split.train, segment, horizon);
        let validation = PairRows::select(&split.validation, segment, horizon);
        let test = PairRows::select(&split.test, segment, horizon);
        *samples = SampleCounts {
            train: train.len(),
            validation: validation.len(),
            test: test.len(),
        };
        let samples = *samples;

        if train.len() < self.min_samples || validation.len() < self.min_samples {
            let err = RondaError::InsufficientSamples {
                segment,
                horizon,
                train: train.len(),
                validation: validation.len(),
                required: self.min_samples,
            };
            tracing::warn!(%segment, %horizon, "{err}");
            return PairOutcome {
                report: PairReport::skipped(segment, horizon, samples, err.to_string()),
                artifact: None,
            };
        }

        match self.fit_and_evaluate(&train, &validation, &test) {
            Ok((artifact, val_metrics, test_metrics)) => {
                tracing::info!(
                    %segment,
                    %horizon,
                    train = samples.train,
                    validation_smape = val_metrics.smape,
                    validation_r2_log = ?val_metrics.r2_log,
                    "trained pair"
                );
                PairOutcome {
                    report: PairReport::trained(
                        segment,
                        horizon,
                        samples,
                        Some(val_metrics),
                        test_metrics,
                    ),
                    artifact: Some(artifact),
                }
            }
            Err(e) => {
                tracing::warn!(%segment, %horizon, error = %e, "pair failed");
                PairOutcome::failed(segment, horizon, samples, e.to_string())
            }
        }
    }

    fn fit_and_evaluate(
        &self,
        train: &PairRows<'_>,
        validation: &PairRows<'_>,
        test: &PairRows<'_>,
    ) -> Result<(ModelArtifact, RegressionMetrics, Option<RegressionMetrics>)> {
        let fit = |rows: &[&FeatureMap], targets: &[f64]| {
            ModelArtifact::fit(
                self.segment,
                self.horizon,
                &self.columns,
                rows,
                targets,
                &self.model,
            )
        };

        let mut artifact = fit(train.features.as_slice(), train.targets.as_slice())?;
        let predictions = artifact.predict(&validation.features)?;
        let val_metrics = RegressionMetrics::compute(&validation.targets, &predictions)?;

        if self.refit {
            let rows: Vec<&FeatureMap> = train
                .features
                .iter()
                .chain(&validation.features)
                .copied()
                .collect();
            let targets: Vec<f64> = train
                .targets
                .iter()
                .chain(&validation.targets)
                .copied()
                .collect();
            artifact = fit(rows.as_slice(), targets.as_slice())?;
        }

        let test_metrics = if test.targets.is_empty() {
            None
        } else {
            let predictions = artifact.predict(&test.features)?;
            Some(RegressionMetrics::compute(&test.targets, &predictions)?)
        };

        Ok((artifact, val_metrics, test_metrics))
    }
}

/// Trains one model per (segment, horizon) pair.
#[derive(Debug, Clone)]
pub struct Trainer {
    columns: Arc<Vec<FeatureColumn>>,
    model: ModelConfig,
    min_samples: usize,
    refit: bool,
    budget: Duration,
}

impl Trainer {
    /// A trainer using the pipeline's model settings and feature selection.
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            columns: Arc::new(config.feature_columns()),
            model: config.model(),
            min_samples: config.min_samples_per_pair,
            refit: config.refit_on_train_validation,
            budget: Duration::from_secs(config.training_timeout_secs),
        }
    }

    /// Train every pair concurrently and wait for all of them.
    ///
    /// Outcomes are ordered by (segment, horizon).
    ///
    /// # Errors
    ///
    /// Returns [`RondaError::TrainingTimeout`] if the step exceeds its budget.
    /// Per-pair failures are reported in the outcomes, not raised.
    pub async fn train_all(&self, split: Arc<TemporalSplit<FeatureRow>>) -> Result<Vec<PairOutcome>> {
        let jobs: Vec<_> = Segment::ALL
            .into_iter()
            .flat_map(|segment| Horizon::ALL.into_iter().map(move |horizon| (segment, horizon)))
            .map(|(segment, horizon)| {
                let job = PairJob {
                    segment,
                    horizon,
                    columns: Arc::clone(&self.columns),
                    model: self.model,
                    min_samples: self.min_samples,
                    refit: self.refit,
                };
                let split = Arc::clone(&split);
                (segment, horizon, move |samples: &mut SampleCounts| job.run(&split, samples))
            })
            .collect();

        let mut outcomes = run_jobs(jobs, self.budget).await?;
        outcomes.sort_by_key(|o| (o.report.segment, o.report.horizon));
        Ok(outcomes)
    }
}

/// Run blocking jobs on the runtime's blocking pool under a shared budget.
///
/// Each job records its sample counts through the `&mut SampleCounts` it is
/// handed; a job that panics is reported with whatever it recorded.
async fn run_jobs<F>(jobs: Vec<(Segment, Horizon, F)>, budget: Duration) -> Result<Vec<PairOutcome>>
where
    F: FnOnce(&mut SampleCounts) -> PairOutcome + Send + 'static,
{
    let mut tasks = JoinSet::new();
    for (segment, horizon, job) in jobs {
        tasks.spawn_blocking(move || {
            let mut samples = SampleCounts::default();
            let result = catch_unwind(AssertUnwindSafe(|| job(&mut samples)));
            result.unwrap_or_else(|payload| {
                let message = panic_message(payload.as_ref());
                tracing::error!(%segment, %horizon, %message, "training task panicked");
                PairOutcome::failed(
                    segment,
                    horizon,
                    samples,
                    format!("training panicked: {message}"),
                )
            })
        });
    }

    let collect = async {
        let mut outcomes = Vec::with_capacity(tasks.len());
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => tracing::error!(error = %e, "training task did not complete"),
            }
        }
        outcomes
    };

    match tokio::time::timeout(budget, collect).await {
        Ok(outcomes) => Ok(outcomes),
        Err(_) => {
            tasks.abort_all();
            Err(RondaError::TrainingTimeout {
                secs: budget.as_secs(),
            })
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration as ChronoDuration, TimeZone, Utc};
    use ronda_eval::{PairStatus, temporal_split};
    use ronda_models::HyperParameters;
    use ronda_traits::FeatureValue;
    use std::collections::BTreeMap;

    type Job = Box<dyn FnOnce(&mut SampleCounts) -> PairOutcome + Send>;

    fn row(i: usize, segment: Segment) -> FeatureRow {
        let duration = if segment == Segment::ShortForm { 30.0 } else { 600.0 };
        let mut features = FeatureMap::new();
        features.insert("duration_seconds".into(), FeatureValue::from(duration));
        features.insert("title_length".into(), FeatureValue::from((i % 40) as f64));
        features.insert(
            "language".into(),
            FeatureValue::Categorical(if i % 3 == 0 { "en" } else { "es" }.into()),
        );
        let base = 100.0 + 25.0 * (i % 40) as f64;
        let targets: BTreeMap<Horizon, Option<f64>> = Horizon::ALL
            .into_iter()
            .map(|h| (h, Some(base * h.day() as f64)))
            .collect();
        FeatureRow {
            video_id: format!("v{i}"),
            channel_id: format!("c{}", i % 5),
            published_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
                + ChronoDuration::hours(i as i64),
            segment,
            features,
            targets,
        }
    }

    fn config() -> PipelineConfig {
        PipelineConfig {
            min_samples_per_pair: 20,
            regressor_hyperparameters: HyperParameters {
                n_estimators: 20,
                max_depth: 3,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_small_segment_skipped_others_train() {
        // 400 short-form rows, 40 long-form rows.
        let rows: Vec<FeatureRow> = (0..440)
            .map(|i| row(i, if i % 11 == 0 { Segment::LongForm } else { Segment::ShortForm }))
            .collect();
        let split = temporal_split(rows, 0.15, 0.15).unwrap();
        let outcomes = Trainer::new(&config()).train_all(Arc::new(split)).await.unwrap();

        assert_eq!(outcomes.len(), 6);
        for outcome in &outcomes {
            match outcome.report.segment {
                Segment::ShortForm => {
                    assert_eq!(outcome.report.status, PairStatus::Trained);
                    assert!(outcome.artifact.is_some());
                    let val = outcome.report.validation.unwrap();
                    assert!((0.0..=200.0).contains(&val.smape));
                    assert!(outcome.report.test.is_some());
                }
                Segment::LongForm => {
                    assert_eq!(outcome.report.status, PairStatus::Skipped);
                    assert!(outcome.artifact.is_none());
                    let reason = outcome.report.reason.as_deref().unwrap();
                    assert!(reason.starts_with("Insufficient samples for long_form/"));
                }
            }
        }
    }

    #[tokio::test]
    async fn test_missing_targets_dropped_from_counts() {
        let rows: Vec<FeatureRow> = (0..300)
            .map(|i| {
                let mut r = row(i, Segment::ShortForm);
                if i % 2 == 0 {
                    r.targets.insert(Horizon::Day30, None);
                }
                r
            })
            .collect();
        let split = temporal_split(rows, 0.15, 0.15).unwrap();
        let outcomes = Trainer::new(&config()).train_all(Arc::new(split)).await.unwrap();

        let day1 = &outcomes[0].report;
        let day30 = &outcomes[2].report;
        assert_eq!(day1.horizon, Horizon::Day1);
        assert_eq!(day1.samples.train, 210);
        assert_eq!(day30.samples.train, 105);
        assert_eq!(day30.samples.validation, 22);
        assert_eq!(day30.status, PairStatus::Trained);
    }

    #[tokio::test]
    async fn test_refit_still_reports_test_metrics() {
        let rows: Vec<FeatureRow> = (0..200).map(|i| row(i, Segment::ShortForm)).collect();
        let split = temporal_split(rows, 0.15, 0.15).unwrap();
        let config = PipelineConfig {
            refit_on_train_validation: true,
            ..config()
        };
        let outcomes = Trainer::new(&config).train_all(Arc::new(split)).await.unwrap();
        let first = &outcomes[0];
        assert_eq!(first.report.status, PairStatus::Trained);
        assert_eq!(first.artifact.as_ref().unwrap().metadata.training_samples, 170);
        assert!(first.report.test.is_some());
    }

    #[tokio::test]
    async fn test_panicking_job_recorded_as_failed() {
        let jobs: Vec<(Segment, Horizon, Job)> = vec![(
            Segment::ShortForm,
            Horizon::Day1,
            Box::new(|_: &mut SampleCounts| -> PairOutcome { panic!("boom") }),
        )];
        let outcomes = run_jobs(jobs, Duration::from_secs(10)).await.unwrap();
        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].report.status, PairStatus::Failed);
        assert_eq!(
            outcomes[0].report.reason.as_deref(),
            Some("training panicked: boom")
        );
        assert_eq!(outcomes[0].report.samples, SampleCounts::default());
    }

    #[tokio::test]
    async fn test_panic_during_fit_keeps_sample_counts() {
        let counted = SampleCounts {
            train: 120,
            validation: 30,
            test: 25,
        };
        let jobs: Vec<(Segment, Horizon, Job)> = vec![(
            Segment::ShortForm,
            Horizon::Day30,
            Box::new(move |samples: &mut SampleCounts| -> PairOutcome {
                *samples = counted;
                panic!("singular matrix")
            }),
        )];
        let outcomes = run_jobs(jobs, Duration::from_secs(10)).await.unwrap();
        let report = &outcomes[0].report;
        assert_eq!(report.status, PairStatus::Failed);
        assert_eq!(report.samples, counted);
        assert_eq!(report.key(), "short_form/30d");
    }

    #[test]
    fn test_job_records_counts_before_fitting() {
        let rows: Vec<FeatureRow> = (0..100).map(|i| row(i, Segment::ShortForm)).collect();
        let split = temporal_split(rows, 0.15, 0.15).unwrap();
        let job = PairJob {
            segment: Segment::ShortForm,
            horizon: Horizon::Day1,
            columns: Arc::new(config().feature_columns()),
            model: config().model(),
            min_samples: 1_000,
            refit: false,
        };
        let mut samples = SampleCounts::default();
        let outcome = job.run(&split, &mut samples);
        assert_eq!(outcome.report.status, PairStatus::Skipped);
        assert_eq!(samples, outcome.report.samples);
        assert_eq!(samples.train, 70);
    }

    #[tokio::test]
    async fn test_budget_exceeded_is_fatal() {
        let jobs: Vec<(Segment, Horizon, Job)> = vec![(
            Segment::LongForm,
            Horizon::Day7,
            Box::new(|_: &mut SampleCounts| {
                std::thread::sleep(Duration::from_millis(300));
                PairOutcome::failed(
                    Segment::LongForm,
                    Horizon::Day7,
                    SampleCounts::default(),
                    "late".into(),
                )
            }),
        )];
        let err = run_jobs(jobs, Duration::from_millis(20)).await.unwrap_err();
        assert!(matches!(err, RondaError::TrainingTimeout { .. }));
        assert!(err.is_fatal());
    }
}
