//! Inspect command implementation.

use super::{banner, load_config};
use anyhow::{Context, Result};
use ronda::{Pipeline, ProcessingReport};
use std::path::Path;

/// Prepare the input without training or writing and print the report.
pub(crate) fn inspect(input: &Path, config: Option<&Path>, json: bool) -> Result<()> {
    let pipeline = Pipeline::new(load_config(config)?)?;
    let report = pipeline
        .inspect(input)
        .with_context(|| format!("failed to inspect {}", input.display()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(())
}

fn print_report(report: &ProcessingReport) {
    banner("Processing Report");

    let f = &report.filtering;
    println!("Input:              {}", report.input);
    println!("Columns renamed:    {}", report.normalization.renamed.len());
    println!("Missing daily cols: {}", report.normalization.missing_daily_columns);
    println!();
    println!("Rows read:          {}", f.input_rows);
    println!(
        "Required fields:    {} (-{})",
        f.after_required_fields, f.rejections.missing_required_field
    );
    println!(
        "Positive duration:  {} (-{})",
        f.after_positive_duration, f.rejections.non_positive_duration
    );
    println!(
        "Max duration:       {} (-{})",
        f.after_max_duration, f.rejections.excessive_duration
    );
    println!(
        "Outlier removal:    {} (-{})",
        f.after_outlier_removal, f.rejections.view_count_outlier
    );
    if let Some(threshold) = f.view_count_threshold {
        println!("View threshold:     {threshold:.0}");
    }
    println!("Non-monotonic rows: {}", f.non_monotonic_rows);
    println!("Degraded rows:      {}", report.degraded_time_series_rows);
    println!();

    for (segment, count) in &report.segment_counts {
        println!("{:20}{count}", format!("{segment}:"));
    }
    println!();

    for (name, slice) in [
        ("train", &report.split.train),
        ("validation", &report.split.validation),
        ("test", &report.split.test),
    ] {
        match (slice.start, slice.end) {
            (Some(start), Some(end)) => println!(
                "{name:11} {:>6} rows  {} .. {}",
                slice.rows,
                start.format("%Y-%m-%d"),
                end.format("%Y-%m-%d")
            ),
            _ => println!("{name:11} {:>6} rows", slice.rows),
        }
    }

    if !report.warnings.is_empty() {
        println!("\nWarnings:");
        for warning in &report.warnings {
            println!("  - {warning}");
        }
    }
    println!();
}
