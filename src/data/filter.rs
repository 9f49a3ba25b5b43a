// Row filtering for sensor tables.

use chrono::NaiveDate;

use super::table::Table;

/// Rows whose timestamp falls on `date`, in source order.
///
/// No match yields an empty table rather than an error.
pub fn filter_by_date(table: &Table, date: NaiveDate) -> Table {
    let rows = table
        .rows()
        .iter()
        .filter(|row| row.date() == date)
        .cloned()
        .collect();
    table.with_rows(rows)
}
