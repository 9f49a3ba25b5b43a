// Cache module for in-memory, TTL-bounded caching.
// Also owns the filesystem path helpers for config and feedback stores.

pub mod paths;
pub mod store;

pub use store::{DEFAULT_TTL, TtlCache};
