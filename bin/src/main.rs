//! Ronda CLI binary.
//!
//! Provides the command-line interface for the Ronda forecasting pipeline.

mod cmd;

use anyhow::Result;
use clap::{Parser, Subcommand};
use cmd::run::RunArgs;
use std::path::PathBuf;
use std::process;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter.
const LOG_ENV: &str = "RONDA_LOG";

#[derive(Parser)]
#[command(name = "ronda")]
#[command(about = "Engagement forecasting from daily view logs", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build features, train models and write all outputs
    Run(RunArgs),

    /// List available features
    Features {
        /// Filter by category
        #[arg(short, long)]
        category: Option<String>,

        /// Show detailed information
        #[arg(short, long)]
        verbose: bool,
    },

    /// Load and filter an input file and print the processing report
    Inspect {
        /// Input CSV file
        input: PathBuf,

        /// JSON configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    init_logging();

    if let Err(e) = run().await {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run(args) => {
            cmd::run::run(args).await?;
        }
        Commands::Features { category, verbose } => {
            cmd::features::list_features(category, verbose)?;
        }
        Commands::Inspect {
            input,
            config,
            json,
        } => {
            cmd::inspect::inspect(&input, config.as_deref(), json)?;
        }
    }

    Ok(())
}
