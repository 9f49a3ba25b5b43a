// Tabular source seam.
// Anything that can return the CSV text of a named spreadsheet tab.

use std::future::Future;

use crate::error::Result;

/// A remote source of delimited text, one document per tab.
pub trait TabularSource: Send + Sync {
    /// Fetch the CSV export of `tab`.
    fn fetch_csv(&self, tab: &str) -> impl Future<Output = Result<String>> + Send;
}
