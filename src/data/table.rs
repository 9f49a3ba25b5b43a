// Sensor reading table.
// Parses the exported CSV into rows with a normalized timestamp column.

use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use csv::{ReaderBuilder, Trim};

use crate::error::{DashError, Result};

/// Header name of the timestamp column (matched case-insensitively).
pub const TIMESTAMP_COLUMN: &str = "Timestamp";

/// Column index of the out-of-band crop type cell in the header-less view.
pub const CROP_TYPE_COLUMN: usize = 6;

/// Returned when the sheet has no crop type cell.
pub const UNKNOWN_CROP: &str = "Unknown";

/// Timestamp layouts accepted in the sheet, tried in order.
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y"];

/// One row of the sheet with its parsed timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    pub timestamp: NaiveDateTime,
    /// Raw cells, one per header, including the timestamp cell.
    pub cells: Vec<String>,
}

impl Reading {
    pub fn get(&self, col: usize) -> Option<&str> {
        self.cells.get(col).map(String::as_str)
    }

    /// Numeric value of a cell, if it parses as a float.
    pub fn value(&self, col: usize) -> Option<f64> {
        self.get(col).and_then(|cell| cell.trim().parse().ok())
    }

    pub fn date(&self) -> NaiveDate {
        self.timestamp.date()
    }
}

/// A parsed dataset: ordered headers plus rows in source order.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    headers: Vec<String>,
    timestamp_col: usize,
    /// Columns holding sensor values, in header order.
    variable_cols: Vec<usize>,
    rows: Vec<Reading>,
}

impl Table {
    /// Parse CSV text whose first row is the header.
    ///
    /// Fails if the timestamp column is missing or any non-blank row has an
    /// empty or unparsable timestamp. Fully blank rows are skipped. A header
    /// in the crop type position with no values below it is metadata, not a
    /// variable.
    pub fn from_csv(text: &str) -> Result<Self> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(Trim::All)
            .from_reader(text.as_bytes());

        let headers: Vec<String> = reader
            .headers()
            .map_err(|e| DashError::Parse(e.to_string()))?
            .iter()
            .map(str::to_string)
            .collect();

        let timestamp_col = find_column(&headers, TIMESTAMP_COLUMN).ok_or_else(|| {
            DashError::Parse(format!("missing '{}' column", TIMESTAMP_COLUMN))
        })?;

        let mut rows = Vec::new();
        for (index, record) in reader.records().enumerate() {
            let record = record.map_err(|e| DashError::Parse(e.to_string()))?;
            if record.iter().all(str::is_empty) {
                continue;
            }

            let mut cells: Vec<String> = record.iter().map(str::to_string).collect();
            cells.resize(headers.len(), String::new());

            let raw = &cells[timestamp_col];
            // Data rows start on line 2 of the sheet.
            let line = index + 2;
            if raw.is_empty() {
                return Err(DashError::Parse(format!("empty timestamp on line {}", line)));
            }
            let timestamp = parse_timestamp(raw).ok_or_else(|| {
                DashError::Parse(format!("unparsable timestamp '{}' on line {}", raw, line))
            })?;

            rows.push(Reading { timestamp, cells });
        }

        let variable_cols = (0..headers.len())
            .filter(|&col| col != timestamp_col && !headers[col].is_empty())
            .filter(|&col| {
                col != CROP_TYPE_COLUMN || rows.iter().any(|row| !row.cells[col].is_empty())
            })
            .collect();

        Ok(Self {
            headers,
            timestamp_col,
            variable_cols,
            rows,
        })
    }

    /// Copy of this table's schema holding only `rows`.
    pub fn with_rows(&self, rows: Vec<Reading>) -> Self {
        Self {
            headers: self.headers.clone(),
            timestamp_col: self.timestamp_col,
            variable_cols: self.variable_cols.clone(),
            rows,
        }
    }

    pub fn rows(&self) -> &[Reading] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Index and header of each sensor value column.
    pub fn variable_columns(&self) -> impl Iterator<Item = (usize, &str)> {
        self.variable_cols
            .iter()
            .map(|&col| (col, self.headers[col].as_str()))
    }

    /// Header names of the sensor value columns.
    pub fn variables(&self) -> Vec<&str> {
        self.variable_columns().map(|(_, name)| name).collect()
    }

    /// Distinct calendar dates present, ascending.
    pub fn dates(&self) -> BTreeSet<NaiveDate> {
        self.rows.iter().map(Reading::date).collect()
    }

    /// Last row in source order.
    pub fn latest(&self) -> Option<&Reading> {
        self.rows.last()
    }

    /// Time series of one variable. Cells that are not numbers become `None`.
    pub fn series(&self, variable: &str) -> Result<Vec<(NaiveDateTime, Option<f64>)>> {
        let col = find_column(&self.headers, variable)
            .filter(|col| self.variable_cols.contains(col))
            .ok_or_else(|| DashError::UnknownColumn(variable.to_string()))?;

        Ok(self
            .rows
            .iter()
            .map(|row| (row.timestamp, row.value(col)))
            .collect())
    }
}

/// Read the crop type cell (row 0, column 6) from CSV text parsed without a
/// header row. Returns [`UNKNOWN_CROP`] when the first row is too short or
/// the cell is blank.
pub fn parse_crop_type(text: &str) -> Result<String> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    let first = match reader.records().next() {
        Some(record) => record.map_err(|e| DashError::Parse(e.to_string()))?,
        None => return Ok(UNKNOWN_CROP.to_string()),
    };

    Ok(first
        .get(CROP_TYPE_COLUMN)
        .filter(|cell| !cell.trim().is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| UNKNOWN_CROP.to_string()))
}

/// Parse a sheet timestamp into a naive date-time.
///
/// Offsets in RFC 3339 input are dropped; the wall-clock reading is kept.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_local());
    }

    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
}

fn find_column(headers: &[String], name: &str) -> Option<usize> {
    let name = name.trim();
    headers
        .iter()
        .position(|h| h == name)
        .or_else(|| headers.iter().position(|h| h.eq_ignore_ascii_case(name)))
}
