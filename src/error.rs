// Error types for sensordash.
// Covers ingestion (fetch, parse), feedback logging, and configuration errors.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DashError {
    #[error("Unknown dataset: {0}")]
    UnknownDataset(String),

    #[error("Fetch failed: {0}")]
    Fetch(#[from] reqwest::Error),

    #[error("Fetch failed: HTTP {status} from {url}")]
    HttpStatus { status: u16, url: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Unknown column: {0}")]
    UnknownColumn(String),

    #[error("Feedback schema mismatch: {0}")]
    SchemaMismatch(String),

    #[error("Rating out of range (1-5): {0}")]
    InvalidRating(u8),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, DashError>;
