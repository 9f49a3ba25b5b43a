// Cache store for TTL-bounded in-memory values.
// Entries carry their fetch time; expiry is checked against a caller-supplied clock.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::RwLock;
use std::time::Duration;

use chrono::{DateTime, Utc};

/// Default TTL for fetched datasets: 5 minutes.
pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

/// Wrapper for cached data with metadata.
#[derive(Debug, Clone)]
pub struct CachedData<T> {
    /// The cached data.
    pub data: T,
    /// When the data was fetched.
    pub cached_at: DateTime<Utc>,
}

impl<T> CachedData<T> {
    /// Create a new cached data entry fetched at `cached_at`.
    pub fn new(data: T, cached_at: DateTime<Utc>) -> Self {
        Self { data, cached_at }
    }

    /// Check if this entry has expired at `now`.
    ///
    /// An entry is valid while `now - cached_at < ttl`. A `now` earlier than
    /// the fetch time counts as expired so a clock step never pins an entry.
    pub fn is_expired_at(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        let elapsed = now
            .signed_duration_since(self.cached_at)
            .to_std()
            .unwrap_or(Duration::MAX);

        elapsed >= ttl
    }

    /// Check if this entry is still valid at `now`.
    pub fn is_valid_at(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        !self.is_expired_at(now, ttl)
    }
}

/// Keyed in-memory cache where every entry expires `ttl` after insertion.
///
/// Entries are only ever replaced, never evicted; there is no size bound. Reads take a shared lock, writes an exclusive one, and no lock
/// is held while a caller computes a replacement value.
#[derive(Debug)]
pub struct TtlCache<K, V> {
    ttl: Duration,
    entries: RwLock<HashMap<K, CachedData<V>>>,
}

impl<K: Eq + Hash, V: Clone> TtlCache<K, V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Get a value if present and still valid at `now`.
    pub fn get_at(&self, key: &K, now: DateTime<Utc>) -> Option<V> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries
            .get(key)
            .filter(|cached| cached.is_valid_at(now, self.ttl))
            .map(|cached| cached.data.clone())
    }

    /// Store a value fetched at `now`, replacing any previous entry.
    pub fn insert_at(&self, key: K, value: V, now: DateTime<Utc>) {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.insert(key, CachedData::new(value, now));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(1_717_200_000 + secs, 0).unwrap()
    }

    #[test]
    fn test_valid_within_ttl() {
        let data = CachedData::new("test", at(0));

        assert!(data.is_valid_at(at(0), DEFAULT_TTL));
        assert!(data.is_valid_at(at(299), DEFAULT_TTL));
    }

    #[test]
    fn test_expires_at_ttl_boundary() {
        let data = CachedData::new("test", at(0));

        assert!(data.is_expired_at(at(300), Duration::from_secs(300)));
        assert!(data.is_expired_at(at(600), Duration::from_secs(300)));
    }

    #[test]
    fn test_clock_going_backwards_expires() {
        let data = CachedData::new("test", at(100));
        assert!(data.is_expired_at(at(50), DEFAULT_TTL));
    }

    #[test]
    fn test_ttl_cache_hit_and_expiry() {
        let cache: TtlCache<String, u32> = TtlCache::new(Duration::from_secs(10));
        cache.insert_at("a".to_string(), 1, at(0));

        assert_eq!(cache.get_at(&"a".to_string(), at(5)), Some(1));
        assert_eq!(cache.get_at(&"a".to_string(), at(10)), None);
        assert_eq!(cache.get_at(&"b".to_string(), at(5)), None);
    }

    #[test]
    fn test_ttl_cache_replace_restarts_ttl() {
        let cache: TtlCache<&str, u32> = TtlCache::new(Duration::from_secs(10));
        cache.insert_at("a", 1, at(0));
        assert_eq!(cache.get_at(&"a", at(15)), None);

        cache.insert_at("a", 2, at(20));
        assert_eq!(cache.get_at(&"a", at(25)), Some(2));
        assert_eq!(cache.get_at(&"a", at(30)), None);
    }
}
