// Dashboard view assembly.
// Turns a table plus an explicit request into the data a presentation layer shows.

use chrono::{NaiveDate, NaiveDateTime};

use crate::error::Result;

use super::filter::filter_by_date;
use super::table::Table;

/// What the user picked: setup, optional variable, optional date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardRequest {
    pub setup: String,
    pub variable: Option<String>,
    pub date: Option<NaiveDate>,
}

impl DashboardRequest {
    pub fn new(setup: impl Into<String>) -> Self {
        Self {
            setup: setup.into(),
            variable: None,
            date: None,
        }
    }

    pub fn with_variable(mut self, variable: impl Into<String>) -> Self {
        self.variable = Some(variable.into());
        self
    }

    pub fn with_date(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }
}

/// A single headline value from the latest reading.
#[derive(Debug, Clone, PartialEq)]
pub struct Metric {
    pub name: String,
    pub raw: String,
    pub value: Option<f64>,
}

impl Metric {
    /// Display form: one decimal for numbers, raw text otherwise.
    pub fn display(&self) -> String {
        match self.value {
            Some(v) => format!("{:.1}", v),
            None => self.raw.clone(),
        }
    }
}

/// Everything the dashboard renders for one request.
#[derive(Debug, Clone)]
pub struct DashboardView {
    pub setup: String,
    pub crop_type: String,
    /// Timestamp of the latest reading in the whole dataset.
    pub latest_at: Option<NaiveDateTime>,
    /// Variables available for selection.
    pub variables: Vec<String>,
    /// Every variable's value in that latest reading.
    pub latest: Vec<Metric>,
    /// Dates available for selection.
    pub dates: Vec<NaiveDate>,
    /// Rows for the selected date, or all rows when no date was chosen.
    pub rows: Table,
    /// Selected variable over `rows`; empty when no variable was chosen.
    pub series: Vec<(NaiveDateTime, Option<f64>)>,
}

impl DashboardView {
    pub fn build(table: &Table, crop_type: String, request: &DashboardRequest) -> Result<Self> {
        let latest_at = table.latest().map(|row| row.timestamp);
        let latest = match table.latest() {
            Some(row) => table
                .variable_columns()
                .map(|(i, name)| Metric {
                    name: name.to_string(),
                    raw: row.get(i).unwrap_or_default().to_string(),
                    value: row.value(i),
                })
                .collect(),
            None => Vec::new(),
        };

        let rows = match request.date {
            Some(date) => filter_by_date(table, date),
            None => table.clone(),
        };

        let series = match &request.variable {
            Some(variable) => rows.series(variable)?,
            None => Vec::new(),
        };

        Ok(Self {
            setup: request.setup.clone(),
            crop_type,
            latest_at,
            variables: table.variables().into_iter().map(str::to_string).collect(),
            latest,
            dates: table.dates().into_iter().collect(),
            rows,
            series,
        })
    }
}
