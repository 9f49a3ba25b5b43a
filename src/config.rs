// Application configuration.
// Loads the JSON config file (or defaults) and maps setup names to sheet tabs.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::cache::{DEFAULT_TTL, paths};
use crate::error::{DashError, Result};

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "SENSORDASH_CONFIG";

const DEFAULT_SHEET_ID: &str = "1W58Fb7zDH0tyi6Sk8SAh5QEMQZtTvtgMAYtVIkHI13k";
const DEFAULT_BASE_URL: &str = "https://docs.google.com/spreadsheets/d";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Spreadsheet document id.
    pub sheet_id: String,
    /// Base URL the sheet id and export path are appended to.
    pub base_url: String,
    /// Setup name -> spreadsheet tab name.
    pub setups: BTreeMap<String, String>,
    /// Seconds a fetched dataset stays valid.
    pub ttl_secs: u64,
    /// Request timeout for each fetch, in seconds.
    pub fetch_timeout_secs: u64,
    /// Directory holding the feedback stores.
    pub feedback_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        let setups = [("Setup 1", "Sheet1"), ("Setup 2", "Sheet2")]
            .into_iter()
            .map(|(name, tab)| (name.to_string(), tab.to_string()))
            .collect();

        Self {
            sheet_id: DEFAULT_SHEET_ID.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            setups,
            ttl_secs: DEFAULT_TTL.as_secs(),
            fetch_timeout_secs: 10,
            feedback_dir: paths::data_dir().unwrap_or_else(|| PathBuf::from(".")),
        }
    }
}

impl Config {
    /// Resolve which config file to read: explicit path, then env var, then
    /// the per-user default.
    pub fn resolve_path(explicit: Option<&Path>) -> Option<PathBuf> {
        explicit
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from))
            .or_else(paths::config_path)
    }

    /// Load configuration from `path`, or return defaults if it does not exist.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) if path.exists() => {
                let contents = fs::read_to_string(path)?;
                serde_json::from_str(&contents)?
            }
            _ => Config::default(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the ingestion cache cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.ttl_secs == 0 {
            return Err(DashError::Config("ttl_secs must be greater than 0".into()));
        }
        if self.fetch_timeout_secs == 0 {
            return Err(DashError::Config(
                "fetch_timeout_secs must be greater than 0".into(),
            ));
        }
        if self.setups.is_empty() {
            return Err(DashError::Config("no setups configured".into()));
        }
        if self.sheet_id.trim().is_empty() {
            return Err(DashError::Config("sheet_id is empty".into()));
        }
        Ok(())
    }

    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    /// Tab name for a setup, if configured.
    pub fn tab_for(&self, setup: &str) -> Option<&str> {
        self.setups.get(setup).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_uses_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config = Config::load(Some(temp_dir.path().join("none.json").as_path())).unwrap();

        assert_eq!(config.ttl(), Duration::from_secs(300));
        assert_eq!(config.ttl(), DEFAULT_TTL);
        assert_eq!(config.fetch_timeout(), Duration::from_secs(10));
        assert_eq!(config.tab_for("Setup 1"), Some("Sheet1"));
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.json");
        fs::write(
            &path,
            r#"{"ttl_secs": 60, "setups": {"Greenhouse": "GH"}}"#,
        )
        .unwrap();

        let config = Config::load(Some(path.as_path())).unwrap();
        assert_eq!(config.ttl_secs, 60);
        assert_eq!(config.tab_for("Greenhouse"), Some("GH"));
        assert_eq!(config.tab_for("Setup 1"), None);
        assert_eq!(config.sheet_id, DEFAULT_SHEET_ID);
    }

    #[test]
    fn test_zero_ttl_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.json");
        fs::write(&path, r#"{"ttl_secs": 0}"#).unwrap();

        let err = Config::load(Some(path.as_path())).unwrap_err();
        assert!(matches!(err, DashError::Config(_)));
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.json");
        fs::write(&path, "{not json").unwrap();

        assert!(matches!(
            Config::load(Some(path.as_path())).unwrap_err(),
            DashError::Json(_)
        ));
    }

    #[test]
    fn test_explicit_path_wins() {
        let path = PathBuf::from("/tmp/explicit.json");
        assert_eq!(Config::resolve_path(Some(path.as_path())), Some(path));
    }
}
