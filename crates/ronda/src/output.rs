//! Output directory layout and table conversion.
//!
//! ```text
//! <output>/
//!   train.csv  validation.csv  test.csv  train_validation.csv
//!   feature_metadata.json  processing_report.json  evaluation_report.json
//!   models/{segment}_{horizon}.json
//! ```
//!
//! Every file is written through a temporary sibling and renamed into place.
//! A run writes into a [`StagedOutput`] next to the root and moves the whole
//! tree in only once every file has been written.

use crate::report::{FeatureMetadata, ProcessingReport};
use polars::prelude::*;
use ronda_eval::{EvaluationReport, TemporalSplit};
use ronda_features::FeatureKind;
use ronda_features::registry::feature_catalog;
use ronda_ingest::io::{write_atomic, write_csv, write_json};
use ronda_models::ModelArtifact;
use ronda_traits::{FeatureRow, Horizon, Result};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Directory for model artifacts, relative to the output root.
pub const MODELS_DIR: &str = "models";

/// Identity columns leading every split table.
pub const ID_COLUMNS: [&str; 4] = ["video_id", "channel_id", "published_at", "segment"];

/// Convert feature rows to a table: identity columns, every catalog feature in
/// catalog order, then one target column per horizon.
///
/// # Errors
///
/// Returns a Polars error if the frame cannot be assembled.
pub fn feature_frame(rows: &[FeatureRow]) -> Result<DataFrame> {
    let mut columns = vec![
        Column::new(
            ID_COLUMNS[0].into(),
            rows.iter().map(|r| r.video_id.as_str()).collect::<Vec<_>>(),
        ),
        Column::new(
            ID_COLUMNS[1].into(),
            rows.iter().map(|r| r.channel_id.as_str()).collect::<Vec<_>>(),
        ),
        Column::new(
            ID_COLUMNS[2].into(),
            rows.iter()
                .map(|r| r.published_at.to_rfc3339())
                .collect::<Vec<_>>(),
        ),
        Column::new(
            ID_COLUMNS[3].into(),
            rows.iter().map(|r| r.segment.as_str()).collect::<Vec<_>>(),
        ),
    ];

    for info in feature_catalog() {
        let column = match info.kind {
            FeatureKind::Numeric => Column::new(
                info.name.into(),
                rows.iter()
                    .map(|r| r.feature(info.name).and_then(|v| v.as_f64()))
                    .collect::<Vec<Option<f64>>>(),
            ),
            FeatureKind::Categorical => Column::new(
                info.name.into(),
                rows.iter()
                    .map(|r| r.feature(info.name).and_then(|v| v.as_category()))
                    .collect::<Vec<Option<&str>>>(),
            ),
        };
        columns.push(column);
    }

    for horizon in Horizon::ALL {
        columns.push(Column::new(
            horizon.target_column().into(),
            rows.iter()
                .map(|r| r.target(horizon))
                .collect::<Vec<Option<f64>>>(),
        ));
    }

    Ok(DataFrame::new(columns)?)
}

/// Writes the files of one run under a root directory.
#[derive(Debug, Clone)]
pub struct OutputWriter {
    root: PathBuf,
}

impl OutputWriter {
    /// A writer rooted at `root`. Nothing is created until the first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The output root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of a model artifact.
    pub fn model_path(&self, artifact: &ModelArtifact) -> PathBuf {
        self.root.join(MODELS_DIR).join(artifact.file_name())
    }

    /// Write the three split tables and the combined train + validation table.
    ///
    /// # Errors
    ///
    /// Returns an I/O or Polars error if a table cannot be written.
    pub fn write_splits(&self, split: &TemporalSplit<FeatureRow>) -> Result<()> {
        let combined = split.train_validation();
        for (name, rows) in [
            ("train.csv", split.train.as_slice()),
            ("validation.csv", split.validation.as_slice()),
            ("test.csv", split.test.as_slice()),
            ("train_validation.csv", combined.as_slice()),
        ] {
            let mut frame = feature_frame(rows)?;
            write_csv(&mut frame, &self.root.join(name))?;
            tracing::info!(file = name, rows = rows.len(), "wrote split table");
        }
        Ok(())
    }

    /// Write `feature_metadata.json`.
    ///
    /// # Errors
    ///
    /// Returns an I/O or JSON error if the file cannot be written.
    pub fn write_feature_metadata(&self, metadata: &FeatureMetadata) -> Result<()> {
        write_json(metadata, &self.root.join("feature_metadata.json"))
    }

    /// Write `processing_report.json`.
    ///
    /// # Errors
    ///
    /// Returns an I/O or JSON error if the file cannot be written.
    pub fn write_processing_report(&self, report: &ProcessingReport) -> Result<()> {
        write_json(report, &self.root.join("processing_report.json"))
    }

    /// Write `evaluation_report.json`.
    ///
    /// # Errors
    ///
    /// Returns an I/O or JSON error if the file cannot be written.
    pub fn write_evaluation_report(&self, report: &EvaluationReport) -> Result<()> {
        write_json(report, &self.root.join("evaluation_report.json"))
    }

    /// Write one model artifact and return its path.
    ///
    /// # Errors
    ///
    /// Returns [`ronda_traits::RondaError::Serialization`] if the artifact
    /// cannot be encoded, or an I/O error if it cannot be written.
    pub fn write_model(&self, artifact: &ModelArtifact) -> Result<PathBuf> {
        let json = artifact.to_json()?;
        let path = self.model_path(artifact);
        write_atomic(&path, |file| {
            file.write_all(json.as_bytes())?;
            file.write_all(b"\n")?;
            Ok(())
        })?;
        Ok(path)
    }
}

/// Scratch directory beside the output root.
///
/// Writers point at the scratch directory; nothing appears under the root
/// until [`publish`](Self::publish). Dropping an unpublished stage removes it.
#[derive(Debug)]
pub struct StagedOutput {
    dir: tempfile::TempDir,
    target: PathBuf,
}

impl StagedOutput {
    /// Create the scratch directory in the parent of `target`, so publishing
    /// is a rename on the same filesystem.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the parent or the scratch directory cannot be
    /// created.
    pub fn new(target: impl Into<PathBuf>) -> Result<Self> {
        let target = target.into();
        let parent = match target.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&parent)?;
        let dir = tempfile::Builder::new()
            .prefix(".ronda-staging-")
            .tempdir_in(&parent)?;
        Ok(Self { dir, target })
    }

    /// Writer for the scratch directory.
    pub fn writer(&self) -> OutputWriter {
        OutputWriter::new(self.dir.path())
    }

    /// Where a staged file will live once published.
    pub fn final_path(&self, staged: &Path) -> PathBuf {
        staged
            .strip_prefix(self.dir.path())
            .map_or_else(|_| staged.to_path_buf(), |rel| self.target.join(rel))
    }

    /// Move every staged file under the target root, replacing files of the
    /// same name, and return the root.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if a directory cannot be created or a file cannot
    /// be renamed.
    pub fn publish(self) -> Result<PathBuf> {
        move_tree(self.dir.path(), &self.target)?;
        tracing::debug!(output = %self.target.display(), "published staged output");
        Ok(self.target)
    }
}

fn move_tree(from: &Path, to: &Path) -> Result<()> {
    fs::create_dir_all(to)?;
    for entry in fs::read_dir(from)? {
        let entry = entry?;
        let dest = to.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            move_tree(&entry.path(), &dest)?;
        } else {
            fs::rename(entry.path(), &dest)?;
        }
    }
    Ok(())
}
