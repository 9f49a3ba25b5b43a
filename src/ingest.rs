// Dataset ingestion with a per-dataset TTL cache.
// Resolves setup names to sheet tabs, fetches, parses, and memoizes the result.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::cache::TtlCache;
use crate::config::Config;
use crate::data::{Table, parse_crop_type};
use crate::error::{DashError, Result};
use crate::sheets::TabularSource;

/// Fetches datasets by setup name and caches them for a fixed TTL.
///
/// Safe to share between tasks. Two callers refreshing the same expired
/// entry may both fetch; each stores a fully parsed table and the later one
/// wins.
pub struct IngestionCache<S> {
    source: S,
    setups: BTreeMap<String, String>,
    tables: TtlCache<String, Arc<Table>>,
    crops: TtlCache<String, String>,
}

impl<S: TabularSource> IngestionCache<S> {
    /// Create a cache over `source` using the setups and TTL from `config`.
    pub fn new(source: S, config: &Config) -> Self {
        Self::with_ttl(source, config.setups.clone(), config.ttl())
    }

    pub fn with_ttl(source: S, setups: BTreeMap<String, String>, ttl: Duration) -> Self {
        Self {
            source,
            setups,
            tables: TtlCache::new(ttl),
            crops: TtlCache::new(ttl),
        }
    }

    fn tab(&self, id: &str) -> Result<&str> {
        self.setups
            .get(id)
            .map(String::as_str)
            .ok_or_else(|| DashError::UnknownDataset(id.to_string()))
    }

    /// Get the parsed table for a dataset, fetching it if not cached.
    pub async fn get_dataset(&self, id: &str) -> Result<Arc<Table>> {
        self.get_dataset_at(id, Utc::now()).await
    }

    /// Same as [`get_dataset`](Self::get_dataset) with an explicit clock.
    pub async fn get_dataset_at(&self, id: &str, now: DateTime<Utc>) -> Result<Arc<Table>> {
        let tab = self.tab(id)?;
        let key = id.to_string();

        if let Some(table) = self.tables.get_at(&key, now) {
            debug!(dataset = id, "cache hit");
            return Ok(table);
        }

        let text = self.source.fetch_csv(tab).await?;
        let table = Arc::new(Table::from_csv(&text)?);
        info!(dataset = id, tab, rows = table.len(), "dataset refreshed");

        self.tables.insert_at(key, Arc::clone(&table), now);
        Ok(table)
    }

    /// Get the crop type cell for a dataset, or `"Unknown"` if absent.
    pub async fn get_metadata(&self, id: &str) -> Result<String> {
        self.get_metadata_at(id, Utc::now()).await
    }

    /// Same as [`get_metadata`](Self::get_metadata) with an explicit clock.
    pub async fn get_metadata_at(&self, id: &str, now: DateTime<Utc>) -> Result<String> {
        let tab = self.tab(id)?;
        let key = id.to_string();

        if let Some(crop) = self.crops.get_at(&key, now) {
            debug!(dataset = id, "metadata cache hit");
            return Ok(crop);
        }

        let text = self.source.fetch_csv(tab).await?;
        let crop = parse_crop_type(&text)?;

        self.crops.insert_at(key, crop.clone(), now);
        Ok(crop)
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use chrono::NaiveDate;

    use crate::data::filter::filter_by_date;

    /// In-memory source that counts fetches.
    struct FakeSource {
        tabs: HashMap<String, String>,
        calls: AtomicUsize,
    }

    impl FakeSource {
        fn new(tab: &str, body: String) -> Self {
            Self {
                tabs: HashMap::from([(tab.to_string(), body)]),
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl TabularSource for FakeSource {
        async fn fetch_csv(&self, tab: &str) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::task::yield_now().await;
            self.tabs.get(tab).cloned().ok_or(DashError::HttpStatus {
                status: 404,
                url: tab.to_string(),
            })
        }
    }

    /// 100 readings, 10 of them on 2024-06-01, with a crop type cell.
    fn setup_one_csv() -> String {
        let mut csv = String::from("Timestamp,Temperature,Humidity,SoilMoisture,,,Maize\n");
        for i in 0..45 {
            csv.push_str(&format!("2024-05-31 {:02}:{:02}:00,20.0,50,400\n", i / 2, (i % 2) * 30));
        }
        for i in 0..10 {
            csv.push_str(&format!("2024-06-01 {:02}:00:00,{}.5,55,410\n", i + 8, 20 + i));
        }
        for i in 0..45 {
            csv.push_str(&format!("2024-06-02 {:02}:{:02}:00,22.0,60,420\n", i / 2, (i % 2) * 30));
        }
        csv
    }

    fn cache_over(source: FakeSource) -> IngestionCache<FakeSource> {
        let setups = BTreeMap::from([("Setup 1".to_string(), "Sheet1".to_string())]);
        IngestionCache::with_ttl(source, setups, Duration::from_secs(300))
    }

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(1_717_200_000 + secs, 0).unwrap()
    }

    #[tokio::test]
    async fn test_setup_one_scenario() {
        let cache = cache_over(FakeSource::new("Sheet1", setup_one_csv()));

        let table = cache.get_dataset_at("Setup 1", at(0)).await.unwrap();
        assert_eq!(table.len(), 100);
        assert_eq!(table.rows()[0].get(0), Some("2024-05-31 00:00:00"));
        assert_eq!(table.variables(), vec!["Temperature", "Humidity", "SoilMoisture"]);
        assert!(matches!(
            table.series("Maize").unwrap_err(),
            DashError::UnknownColumn(_)
        ));

        let day = filter_by_date(&table, NaiveDate::from_ymd_opt(2024, 6, 1).unwrap());
        assert_eq!(day.len(), 10);
        assert_eq!(day.rows(), &table.rows()[45..55]);
        let temps: Vec<_> = day.rows().iter().map(|r| r.value(1).unwrap()).collect();
        assert_eq!(temps[0], 20.5);
        assert_eq!(temps[9], 29.5);
    }

    #[tokio::test]
    async fn test_second_call_within_ttl_is_cached() {
        let cache = cache_over(FakeSource::new("Sheet1", setup_one_csv()));

        let first = cache.get_dataset_at("Setup 1", at(0)).await.unwrap();
        let second = cache.get_dataset_at("Setup 1", at(299)).await.unwrap();

        assert_eq!(cache.source.calls(), 1);
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn test_expired_entry_is_refetched() {
        let cache = cache_over(FakeSource::new("Sheet1", setup_one_csv()));

        cache.get_dataset_at("Setup 1", at(0)).await.unwrap();
        cache.get_dataset_at("Setup 1", at(300)).await.unwrap();
        cache.get_dataset_at("Setup 1", at(301)).await.unwrap();

        assert_eq!(cache.source.calls(), 2);
    }

    #[tokio::test]
    async fn test_unknown_dataset() {
        let cache = cache_over(FakeSource::new("Sheet1", setup_one_csv()));

        let err = cache.get_dataset("Setup 9").await.unwrap_err();
        assert!(matches!(err, DashError::UnknownDataset(ref id) if id == "Setup 9"));
        assert!(cache.get_metadata("Setup 9").await.is_err());
        assert_eq!(cache.source.calls(), 0);
    }

    #[tokio::test]
    async fn test_fetch_error_is_not_cached() {
        let cache = cache_over(FakeSource::new("Other", setup_one_csv()));

        for _ in 0..2 {
            let err = cache.get_dataset_at("Setup 1", at(0)).await.unwrap_err();
            assert!(matches!(err, DashError::HttpStatus { status: 404, .. }));
        }
        assert_eq!(cache.source.calls(), 2);
    }

    #[tokio::test]
    async fn test_parse_error_surfaces() {
        let cache = cache_over(FakeSource::new("Sheet1", "Time,Temp\nx,1\n".to_string()));

        let err = cache.get_dataset("Setup 1").await.unwrap_err();
        assert!(matches!(err, DashError::Parse(_)));
    }

    #[tokio::test]
    async fn test_metadata_and_fallback() {
        let cache = cache_over(FakeSource::new("Sheet1", setup_one_csv()));
        assert_eq!(cache.get_metadata_at("Setup 1", at(0)).await.unwrap(), "Maize");
        assert_eq!(cache.get_metadata_at("Setup 1", at(10)).await.unwrap(), "Maize");
        assert_eq!(cache.source.calls(), 1);

        let narrow = "Timestamp,Temperature\n2024-06-01,20\n".to_string();
        let cache = cache_over(FakeSource::new("Sheet1", narrow));
        assert_eq!(cache.get_metadata("Setup 1").await.unwrap(), "Unknown");
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_cached_table() {
        let cache = cache_over(FakeSource::new("Sheet1", setup_one_csv()));
        let first = cache.get_dataset_at("Setup 1", at(0)).await.unwrap();

        // A failing fetch for another setup must not disturb the cached table.
        let mut setups = cache.setups.clone();
        setups.insert("Setup 2".to_string(), "Missing".to_string());
        let cache = IngestionCache { setups, ..cache };
        assert!(cache.get_dataset_at("Setup 2", at(1)).await.is_err());

        let again = cache.get_dataset_at("Setup 1", at(2)).await.unwrap();
        assert!(Arc::ptr_eq(&first, &again));
        assert_eq!(cache.source.calls(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_refresh_yields_whole_tables() {
        let cache = Arc::new(cache_over(FakeSource::new("Sheet1", setup_one_csv())));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let cache = Arc::clone(&cache);
                tokio::spawn(async move { cache.get_dataset_at("Setup 1", at(0)).await })
            })
            .collect();

        for handle in handles {
            let table = handle.await.unwrap().unwrap();
            assert_eq!(table.len(), 100);
        }
        assert!((1..=4).contains(&cache.source.calls()));

        cache.get_dataset_at("Setup 1", at(5)).await.unwrap();
        assert!(cache.source.calls() <= 4);
    }
}
