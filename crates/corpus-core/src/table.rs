//! Source table reader
//!
//! The input is a CSV file with a header row containing at least `id` and
//! `title`; other columns are ignored.

use std::io::Read;
use std::path::Path;

use thiserror::Error;

use crate::item::SourceRow;

#[derive(Debug, Error)]
pub enum TableError {
    #[error("Failed to open table {path}: {message}")]
    Open { path: String, message: String },

    #[error("Invalid row at line {line}: {message}")]
    Row { line: u64, message: String },
}

/// Read every row of the CSV file at `path`
pub fn read_source_table(path: &Path) -> Result<Vec<SourceRow>, TableError> {
    let reader = csv::Reader::from_path(path).map_err(|e| TableError::Open {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    collect_rows(reader)
}

/// Read rows from any CSV source (header row required)
pub fn read_source_rows<R: Read>(input: R) -> Result<Vec<SourceRow>, TableError> {
    collect_rows(csv::Reader::from_reader(input))
}

fn collect_rows<R: Read>(mut reader: csv::Reader<R>) -> Result<Vec<SourceRow>, TableError> {
    reader
        .deserialize::<SourceRow>()
        .map(|row| {
            row.map_err(|e| TableError::Row {
                line: e.position().map(|p| p.line()).unwrap_or(0),
                message: e.to_string(),
            })
        })
        .collect()
}
