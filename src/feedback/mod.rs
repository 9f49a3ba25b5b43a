// Feedback module.
// Role-specific feedback schemas, records, and the append-only CSV store.

pub mod logger;
pub mod record;
pub mod schema;

pub use logger::FeedbackLogger;
pub use record::FeedbackRecord;
pub use schema::{FeedbackSchema, Role};
