//! Table and report IO.
//!
//! Every writer goes through a sibling temporary file that is renamed into
//! place, so a reader never observes a half-written output.

use polars::prelude::*;
use ronda_traits::{EngagementData, Result, RondaError};
use serde::Serialize;
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Rows scanned to infer column types.
const INFER_SCHEMA_ROWS: usize = 10_000;

/// Load a CSV file with a header row.
///
/// Cells that do not match the inferred column type are read as nulls rather
/// than failing the whole load.
///
/// # Errors
///
/// Returns an I/O error if the file does not exist, or a Polars error if it
/// cannot be parsed as CSV.
pub fn read_table(path: &Path) -> Result<EngagementData> {
    if !path.is_file() {
        return Err(RondaError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("input file not found: {}", path.display()),
        )));
    }

    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(INFER_SCHEMA_ROWS))
        .with_ignore_errors(true)
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()?;

    tracing::info!(
        path = %path.display(),
        rows = df.height(),
        columns = df.width(),
        "loaded input table"
    );
    Ok(EngagementData::new(df))
}

/// Write a DataFrame as CSV with a header row.
///
/// # Errors
///
/// Returns an I/O or Polars error if the file cannot be written.
pub fn write_csv(df: &mut DataFrame, path: &Path) -> Result<()> {
    write_atomic(path, |file| {
        CsvWriter::new(file).include_header(true).finish(df)?;
        Ok(())
    })
}

/// Write a value as pretty-printed JSON.
///
/// # Errors
///
/// Returns an I/O or JSON error if the file cannot be written.
pub fn write_json<T: Serialize + ?Sized>(value: &T, path: &Path) -> Result<()> {
    write_atomic(path, |file| {
        serde_json::to_writer_pretty(&mut *file, value)?;
        file.write_all(b"\n")?;
        Ok(())
    })
}

/// Run `write` against a temporary sibling of `path`, then rename it into place.
///
/// Parent directories are created as needed. The temporary file is removed if
/// `write` fails.
///
/// # Errors
///
/// Propagates the error from `write`, or an I/O error from creating, syncing
/// or renaming the file.
pub fn write_atomic<F>(path: &Path, write: F) -> Result<()>
where
    F: FnOnce(&mut File) -> Result<()>,
{
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let tmp = temp_path(path);
    let mut file = File::create(&tmp)?;
    let written = write(&mut file).and_then(|()| file.sync_all().map_err(RondaError::from));
    drop(file);

    if let Err(e) = written {
        let _ = fs::remove_file(&tmp);
        return Err(e);
    }
    fs::rename(&tmp, path)?;
    tracing::debug!(path = %path.display(), "wrote output file");
    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(OsString::from).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
