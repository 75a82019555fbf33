#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/ronda/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod duration;
pub mod io;
pub mod quality;
pub mod schema;

pub use duration::{duration_seconds, parse_duration};
pub use io::{read_table, write_csv, write_json};
pub use quality::{FilterReport, QualityConfig, QualityFilter, RejectionCounts};
pub use schema::{NormalizationReport, extract_observations, normalize_columns};

use ronda_traits::{RawObservation, Result};
use std::path::Path;

/// Load a CSV file, normalize its columns and extract typed observations.
///
/// # Errors
///
/// Returns an I/O or Polars error if the file cannot be read, or
/// [`ronda_traits::RondaError::Schema`] if a required column is missing.
pub fn load_observations(path: &Path) -> Result<(Vec<RawObservation>, NormalizationReport)> {
    let mut data = read_table(path)?;
    let report = normalize_columns(&mut data)?;
    let rows = extract_observations(&data)?;
    Ok((rows, report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_load_observations() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("input.csv");
        fs::write(
            &path,
            "videoId,channelId,publishedAt,duration,views,d1_views,d2_views\n\
             a,c1,2024-01-01T10:00:00Z,PT45S,500,100,150\n\
             b,c1,2024-01-02T10:00:00Z,PT3M2S,900,200,\n",
        )
        .unwrap();

        let (rows, report) = load_observations(&path).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(report.renamed.len(), 6);
        assert_eq!(rows[0].duration_seconds, 45);
        assert_eq!(rows[0].daily.views_on(2), Some(150.0));
        assert_eq!(rows[1].daily.views_on(2), None);
        assert_eq!(rows[1].view_count, Some(900.0));
    }
}
