//! Capture Loader Module
//! Handles capture CSV loading and row materialization using Polars.

use chrono::NaiveDateTime;
use polars::prelude::*;
use std::path::{Path, PathBuf};
use thiserror::Error;

use super::columns;

/// Accepted `LocalTime` layouts, tried in order.
const TIMESTAMP_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y/%m/%d %H:%M:%S",
];

#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("Failed to load CSV: {0}")]
    Csv(#[from] PolarsError),
    #[error("Input file '{}' not found", .0.display())]
    FileNotFound(PathBuf),
    #[error("Missing required column: {0}")]
    MissingColumn(String),
    #[error("Unparseable LocalTime '{value}' on line {line}")]
    Timestamp { line: usize, value: String },
    #[error("Unparseable Power '{value}' on line {line}")]
    Power { line: usize, value: String },
    #[error("Unknown Type '{value}' on line {line} (expected AP or Client)")]
    DeviceClass { line: usize, value: String },
}

/// Classification of an observed radio, as reported by the scanner.
///
/// The derived ordering (`AccessPoint` before `Client`) is the canonical
/// output ordering's primary key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DeviceClass {
    AccessPoint,
    Client,
}

impl DeviceClass {
    /// Parse a trimmed `Type` cell. Returns `None` for unrecognized values.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "AP" => Some(Self::AccessPoint),
            "Client" => Some(Self::Client),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::AccessPoint => "AP",
            Self::Client => "Client",
        }
    }
}

/// Which columns the loader must find after header trimming.
///
/// `WithGeo` matches the original capture contract; `Core` accepts tables
/// recorded without position data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnSet {
    Core,
    WithGeo,
}

impl ColumnSet {
    fn required(self) -> &'static [&'static str] {
        match self {
            Self::Core => &[
                columns::LOCAL_TIME,
                columns::BSSID,
                columns::ESSID,
                columns::POWER,
                columns::SECURITY,
                columns::TYPE,
            ],
            Self::WithGeo => &[
                columns::LOCAL_TIME,
                columns::BSSID,
                columns::ESSID,
                columns::POWER,
                columns::SECURITY,
                columns::TYPE,
                columns::LATITUDE,
                columns::LONGITUDE,
            ],
        }
    }
}

/// One scan event, as read from the capture file.
///
/// `cells` carries every column value (trimmed, `None` where the field was
/// empty) in header order; pass-through columns live there uninterpreted.
/// The typed fields are parsed views of the cells the pipeline decides on.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanRow {
    pub cells: Vec<Option<String>>,
    pub timestamp: Option<NaiveDateTime>,
    /// `BSSID` cell, ASCII-uppercased (the reconciliation key).
    pub hardware_id: Option<String>,
    pub power: Option<i32>,
    pub device_class: Option<DeviceClass>,
}

/// A materialized capture table: trimmed headers plus one `ScanRow` per
/// data line, in file order.
#[derive(Debug, Clone)]
pub struct ScanTable {
    pub headers: Vec<String>,
    pub rows: Vec<ScanRow>,
}

impl ScanTable {
    /// Index of a column by trimmed, case-sensitive name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Reads capture CSVs with Polars and materializes typed rows.
pub struct ScanLoader;

impl ScanLoader {
    /// Load a capture CSV.
    ///
    /// Every column is read as a string column so pass-through data survives
    /// verbatim; header names are whitespace-trimmed before the required
    /// column check. A non-empty `LocalTime`, `Power` or `Type` value that
    /// does not parse aborts the whole batch; empty cells are left for the
    /// validity filter downstream.
    pub fn load(path: &Path, column_set: ColumnSet) -> Result<ScanTable, LoaderError> {
        if !path.exists() {
            return Err(LoaderError::FileNotFound(path.to_path_buf()));
        }

        // infer_schema_length of 0 keeps every column as a string column
        let df = LazyCsvReader::new(path)
            .with_infer_schema_length(Some(0))
            .finish()?
            .collect()?;

        let headers: Vec<String> = df
            .get_column_names()
            .iter()
            .map(|s| s.as_str().trim().to_string())
            .collect();

        for name in column_set.required() {
            if !headers.iter().any(|h| h == name) {
                return Err(LoaderError::MissingColumn((*name).to_string()));
            }
        }

        let index_of = |name: &str| headers.iter().position(|h| h == name);
        let time_idx = index_of(columns::LOCAL_TIME);
        let bssid_idx = index_of(columns::BSSID);
        let power_idx = index_of(columns::POWER);
        let type_idx = index_of(columns::TYPE);

        let series = df.get_columns();
        let mut rows = Vec::with_capacity(df.height());
        for i in 0..df.height() {
            let mut cells = Vec::with_capacity(headers.len());
            for column in series {
                let value = column.get(i)?;
                cells.push(Self::cell_to_string(value));
            }

            // Data lines start after the header line.
            let line = i + 2;
            let cell_at = |idx: Option<usize>| idx.and_then(|j| cells[j].as_deref());

            let timestamp = match cell_at(time_idx) {
                Some(value) => {
                    Some(
                        Self::parse_timestamp(value).ok_or_else(|| LoaderError::Timestamp {
                            line,
                            value: value.to_string(),
                        })?,
                    )
                }
                None => None,
            };
            let power = match cell_at(power_idx) {
                Some(value) => Some(value.parse::<i32>().map_err(|_| LoaderError::Power {
                    line,
                    value: value.to_string(),
                })?),
                None => None,
            };
            let device_class = match cell_at(type_idx) {
                Some(value) => {
                    Some(DeviceClass::parse(value).ok_or_else(|| LoaderError::DeviceClass {
                        line,
                        value: value.to_string(),
                    })?)
                }
                None => None,
            };
            let hardware_id = cell_at(bssid_idx).map(|v| v.to_ascii_uppercase());

            rows.push(ScanRow {
                cells,
                timestamp,
                hardware_id,
                power,
                device_class,
            });
        }

        Ok(ScanTable { headers, rows })
    }

    /// Extract a trimmed cell value; empty and null cells collapse to `None`.
    fn cell_to_string(value: AnyValue) -> Option<String> {
        if value.is_null() {
            return None;
        }
        let text = value.to_string();
        let trimmed = text.trim_matches('"').trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }

    fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
        TIMESTAMP_FORMATS
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
    }
}
