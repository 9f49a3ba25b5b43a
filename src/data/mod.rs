// Dataset module.
// Parsed sensor tables, date filtering, and the per-request dashboard view.

pub mod filter;
pub mod table;
pub mod view;

pub use table::{Table, parse_crop_type};
pub use view::{DashboardRequest, DashboardView};
