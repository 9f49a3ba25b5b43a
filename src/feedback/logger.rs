// Append-only feedback store.
// One CSV file per schema id; header published once, records appended one line at a time.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, Terminator, WriterBuilder};
use tempfile::NamedTempFile;
use tracing::{info, warn};

use crate::cache::paths;
use crate::error::{DashError, Result};

use super::record::FeedbackRecord;
use super::schema::{FeedbackSchema, LEADING_COLUMNS};

/// Counts read back from a store.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedbackSummary {
    pub records: usize,
    pub mean_overall: Option<f64>,
}

/// Writes feedback records to per-schema CSV stores under one directory.
#[derive(Debug, Clone)]
pub struct FeedbackLogger {
    dir: PathBuf,
}

impl FeedbackLogger {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Path of the store for `schema`.
    pub fn store_path(&self, schema: FeedbackSchema) -> PathBuf {
        paths::feedback_path(&self.dir, schema.id())
    }

    /// Append one record to the store for `schema`.
    ///
    /// Creates the store with its header if it does not exist yet. The
    /// record line is written with a single append and synced before this
    /// returns; on error nothing partial is left behind.
    pub fn append(&self, record: &FeedbackRecord, schema: FeedbackSchema) -> Result<()> {
        record.validate(schema)?;
        let line = encode_line(&record.fields())?;

        fs::create_dir_all(&self.dir)?;
        let path = self.store_path(schema);
        self.ensure_header(&path, schema)?;

        let mut file = OpenOptions::new().append(true).open(&path)?;
        file.write_all(&line)?;
        file.sync_data()?;

        info!(store = %path.display(), setup = %record.setup, "feedback appended");
        Ok(())
    }

    /// Make sure `path` exists and starts with this schema's header.
    fn ensure_header(&self, path: &Path, schema: FeedbackSchema) -> Result<()> {
        let header = encode_line(&schema.header())?;

        if !path.exists() {
            let mut temp = NamedTempFile::new_in(&self.dir)?;
            temp.write_all(&header)?;
            temp.as_file().sync_all()?;

            match temp.persist_noclobber(path) {
                Ok(_) => {
                    info!(store = %path.display(), schema = schema.id(), "feedback store created");
                    return Ok(());
                }
                Err(e) if e.error.kind() == io::ErrorKind::AlreadyExists => {
                    warn!(store = %path.display(), "store created concurrently");
                }
                Err(e) => return Err(e.error.into()),
            }
        }

        let mut first_line = Vec::new();
        BufReader::new(File::open(path)?).read_until(b'\n', &mut first_line)?;

        if first_line.is_empty() {
            // Pre-existing empty file: it still needs its header.
            let mut file = OpenOptions::new().append(true).open(path)?;
            file.write_all(&header)?;
            file.sync_data()?;
            return Ok(());
        }

        if first_line != header {
            return Err(DashError::SchemaMismatch(format!(
                "{} has header '{}', expected {}",
                path.display(),
                String::from_utf8_lossy(&first_line).trim_end(),
                schema.id()
            )));
        }
        Ok(())
    }

    /// Record count and mean overall rating for a schema's store.
    pub fn summary(&self, schema: FeedbackSchema) -> Result<FeedbackSummary> {
        let path = self.store_path(schema);
        if !path.exists() {
            return Ok(FeedbackSummary::default());
        }

        let overall_col = LEADING_COLUMNS.len() - 1;
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_path(&path)?;

        let mut records = 0;
        let mut rated = 0;
        let mut total = 0u64;
        for record in reader.records() {
            let record = record?;
            records += 1;
            if let Some(rating) = record.get(overall_col).and_then(|v| v.parse::<u8>().ok()) {
                rated += 1;
                total += u64::from(rating);
            }
        }

        Ok(FeedbackSummary {
            records,
            mean_overall: (rated > 0).then(|| total as f64 / rated as f64),
        })
    }
}

/// Serialize one CSV line, `\n` terminated.
fn encode_line(fields: &[String]) -> Result<Vec<u8>> {
    let mut writer = WriterBuilder::new()
        .terminator(Terminator::Any(b'\n'))
        .from_writer(Vec::new());
    writer.write_record(fields)?;
    writer
        .into_inner()
        .map_err(|e| DashError::Io(e.into_error()))
}
