//! Output Sink Module
//! Serializes the canonical table back to CSV, atomically.

use polars::prelude::*;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use thiserror::Error;

use super::loader::ScanTable;

#[derive(Error, Debug)]
pub enum WriterError {
    #[error("Failed to write CSV: {0}")]
    Csv(#[from] PolarsError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Writes a `ScanTable` as CSV under the table's own (trimmed) headers.
pub struct ScanWriter;

impl ScanWriter {
    /// Write the table to `output_path`.
    ///
    /// The file is written to a `.tmp` sibling first and renamed into place
    /// on success, so a failure mid-write never leaves a partial file at the
    /// final path. A table with zero rows produces a header-only file.
    pub fn write(table: &ScanTable, output_path: &Path) -> Result<(), WriterError> {
        let mut columns: Vec<Column> = Vec::with_capacity(table.headers.len());
        for (idx, name) in table.headers.iter().enumerate() {
            let values: Vec<String> = table
                .rows
                .iter()
                .map(|row| {
                    row.cells
                        .get(idx)
                        .and_then(|cell| cell.clone())
                        .unwrap_or_default()
                })
                .collect();
            columns.push(Column::new(name.as_str().into(), values));
        }
        let mut df = DataFrame::new(columns)?;

        let tmp_path = Self::temp_path(output_path);
        if let Err(e) = Self::write_df(&mut df, &tmp_path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(e);
        }
        if let Err(e) = fs::rename(&tmp_path, output_path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(e.into());
        }
        Ok(())
    }

    fn write_df(df: &mut DataFrame, path: &Path) -> Result<(), WriterError> {
        let mut file = File::create(path)?;
        CsvWriter::new(&mut file).finish(df)?;
        Ok(())
    }

    fn temp_path(output_path: &Path) -> PathBuf {
        let mut name = output_path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "output.csv".into());
        name.push(".tmp");
        output_path.with_file_name(name)
    }
}
