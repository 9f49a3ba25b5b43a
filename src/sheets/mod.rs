// Spreadsheet source module.
// Provides the tabular source seam and the HTTP client for the CSV export.

pub mod client;
pub mod source;

pub use client::SheetsClient;
pub use source::TabularSource;
