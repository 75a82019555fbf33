//! CLI subcommand modules.
//!
//! This module contains the implementations for all ronda CLI subcommands.

pub(crate) mod features;
pub(crate) mod inspect;
pub(crate) mod run;

use anyhow::{Context, Result};
use ronda::PipelineConfig;
use std::path::Path;

/// Load the configuration file if one was given, defaults otherwise.
pub(crate) fn load_config(path: Option<&Path>) -> Result<PipelineConfig> {
    match path {
        Some(path) => PipelineConfig::from_file(path)
            .with_context(|| format!("failed to load config from {}", path.display())),
        None => Ok(PipelineConfig::default()),
    }
}

/// Print a boxed section title.
pub(crate) fn banner(title: &str) {
    println!("\n╔══════════════════════════════════════════════════════════════╗");
    println!("║ {title:^60} ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");
}
