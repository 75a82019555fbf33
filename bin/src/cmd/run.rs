//! Run command implementation.

use super::{banner, load_config};
use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use ronda::eval::{EvaluationReport, PairStatus};
use ronda::models::RegressorKind;
use ronda::{FeatureSetKind, Pipeline, PipelineConfig};
use std::path::PathBuf;

/// Regressor family as spelled on the command line.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub(crate) enum RegressorArg {
    /// Gradient-boosted regression trees
    GradientBoosting,
    /// Random forest
    RandomForest,
    /// Ridge regression
    Linear,
}

impl From<RegressorArg> for RegressorKind {
    fn from(arg: RegressorArg) -> Self {
        match arg {
            RegressorArg::GradientBoosting => Self::GradientBoosting,
            RegressorArg::RandomForest => Self::RandomForest,
            RegressorArg::Linear => Self::Linear,
        }
    }
}

/// Feature selection as spelled on the command line.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub(crate) enum FeatureSetArg {
    /// Only features known at publish time
    AtPublish,
    /// Every feature, including post-publish ones
    Diagnostic,
}

impl From<FeatureSetArg> for FeatureSetKind {
    fn from(arg: FeatureSetArg) -> Self {
        match arg {
            FeatureSetArg::AtPublish => Self::AtPublish,
            FeatureSetArg::Diagnostic => Self::Diagnostic,
        }
    }
}

/// Arguments of `ronda run`.
#[derive(Debug, Args)]
pub(crate) struct RunArgs {
    /// Input CSV file
    #[arg(short, long)]
    input: PathBuf,

    /// Output directory
    #[arg(short, long)]
    output: PathBuf,

    /// JSON configuration file; flags below override it
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Regressor family
    #[arg(short, long, value_enum)]
    regressor: Option<RegressorArg>,

    /// Random seed
    #[arg(long)]
    seed: Option<u64>,

    /// Fraction of rows held out for testing
    #[arg(long)]
    test_fraction: Option<f64>,

    /// Fraction of rows used for validation
    #[arg(long)]
    validation_fraction: Option<f64>,

    /// Minimum rows per slice for a pair to train
    #[arg(long)]
    min_samples: Option<usize>,

    /// Feature selection
    #[arg(long, value_enum)]
    feature_set: Option<FeatureSetArg>,

    /// Refit persisted models on train + validation
    #[arg(long)]
    refit: bool,

    /// Training budget in seconds
    #[arg(long)]
    timeout: Option<u64>,
}

impl RunArgs {
    /// Apply command-line overrides on top of a loaded configuration.
    fn apply(&self, mut config: PipelineConfig) -> PipelineConfig {
        if let Some(regressor) = self.regressor {
            config.regressor_kind = regressor.into();
        }
        if let Some(seed) = self.seed {
            config.random_seed = seed;
        }
        if let Some(fraction) = self.test_fraction {
            config.test_fraction = fraction;
        }
        if let Some(fraction) = self.validation_fraction {
            config.validation_fraction = fraction;
        }
        if let Some(min) = self.min_samples {
            config.min_samples_per_pair = min;
        }
        if let Some(feature_set) = self.feature_set {
            config.feature_set = feature_set.into();
        }
        if self.refit {
            config.refit_on_train_validation = true;
        }
        if let Some(secs) = self.timeout {
            config.training_timeout_secs = secs;
        }
        config
    }
}

/// Run the full pipeline and print a summary of the evaluation.
pub(crate) async fn run(args: RunArgs) -> Result<()> {
    let config = args.apply(load_config(args.config.as_deref())?);
    let pipeline = Pipeline::new(config).context("invalid configuration")?;

    let summary = pipeline
        .run(&args.input, &args.output)
        .await
        .with_context(|| format!("pipeline failed for {}", args.input.display()))?;

    print_evaluation(&summary.evaluation);
    println!("Outputs written to {}", summary.output_dir.display());
    Ok(())
}

fn print_evaluation(report: &EvaluationReport) {
    banner("Evaluation");

    println!(
        "{:<24} {:>8} {:>8} {:>12} {:>8} {:>8}",
        "Pair", "Status", "Train", "Test MAE", "SMAPE", "R² log"
    );
    println!("{}", "-".repeat(74));
    for pair in &report.pairs {
        let test = pair.test.or(pair.validation);
        let (mae, smape, r2) = test.map_or_else(
            || ("-".to_string(), "-".to_string(), "-".to_string()),
            |m| {
                (
                    format!("{:.1}", m.mae),
                    format!("{:.1}", m.smape),
                    m.r2_log.map_or_else(|| "-".to_string(), |r| format!("{r:.3}")),
                )
            },
        );
        println!(
            "{:<24} {:>8} {:>8} {:>12} {:>8} {:>8}",
            pair.key(),
            pair.status.as_str(),
            pair.samples.train,
            mae,
            smape,
            r2
        );
    }

    let skipped = report.count(PairStatus::Skipped) + report.count(PairStatus::Failed);
    if skipped > 0 {
        println!("\n{skipped} pair(s) not trained:");
        for pair in report.pairs.iter().filter(|p| p.status != PairStatus::Trained) {
            println!("  - {}: {}", pair.key(), pair.reason.as_deref().unwrap_or(""));
        }
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> RunArgs {
        RunArgs {
            input: PathBuf::from("in.csv"),
            output: PathBuf::from("out"),
            config: None,
            regressor: Some(RegressorArg::Linear),
            seed: Some(7),
            test_fraction: None,
            validation_fraction: Some(0.2),
            min_samples: None,
            feature_set: Some(FeatureSetArg::Diagnostic),
            refit: true,
            timeout: None,
        }
    }

    #[test]
    fn test_overrides_apply_on_top_of_config() {
        let config = args().apply(PipelineConfig::default());
        assert_eq!(config.regressor_kind, RegressorKind::Linear);
        assert_eq!(config.random_seed, 7);
        assert_eq!(config.validation_fraction, 0.2);
        assert_eq!(config.test_fraction, 0.15);
        assert_eq!(config.feature_set, FeatureSetKind::Diagnostic);
        assert!(config.refit_on_train_validation);
        assert_eq!(config.training_timeout_secs, 3_600);
    }

    #[test]
    fn test_cli_parses_run() {
        use clap::Parser;

        let cli = crate::Cli::try_parse_from([
            "ronda",
            "run",
            "--input",
            "videos.csv",
            "--output",
            "out",
            "--regressor",
            "random-forest",
        ])
        .unwrap();
        match cli.command {
            crate::Commands::Run(args) => {
                assert_eq!(
                    RegressorKind::from(args.regressor.unwrap()),
                    RegressorKind::RandomForest
                );
            }
            _ => panic!("expected run"),
        }
    }
}
