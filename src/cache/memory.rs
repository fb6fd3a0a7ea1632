//! In-process cache backend.

use std::time::{Duration, Instant};

use moka::Expiry;
use moka::sync::Cache;
use serde_json::Value;

use super::CacheBackend;

/// Default maximum number of entries.
const DEFAULT_MAX_ENTRIES: u64 = 10_000;

/// Default TTL for `Timeout::Default` viewlets.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Clone)]
struct Stored {
    value: Value,
    ttl: Duration,
}

/// Expires each entry after the TTL it was stored with. Overwrites restart
/// the clock.
struct PerEntryTtl;

impl Expiry<String, Stored> for PerEntryTtl {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &Stored,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &Stored,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// Thread-safe in-memory backend.
///
/// Bounded LRU (moka) with a TTL per entry, so viewlets sharing the backend
/// can each keep their own timeout.
pub struct MemoryCache {
    entries: Cache<String, Stored>,
    default_timeout: Duration,
}

impl MemoryCache {
    /// Create a cache with the default capacity (10,000) and timeout (300s).
    pub fn new() -> Self {
        Self::with_config(DEFAULT_MAX_ENTRIES, DEFAULT_TIMEOUT)
    }

    pub fn with_config(max_entries: u64, default_timeout: Duration) -> Self {
        let entries = Cache::builder()
            .max_capacity(max_entries)
            .expire_after(PerEntryTtl)
            .build();
        Self {
            entries,
            default_timeout,
        }
    }

    /// Number of live entries (approximate, as reported by moka).
    pub fn len(&self) -> u64 {
        self.entries.entry_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheBackend for MemoryCache {
    fn get(&self, key: &str) -> Option<Value> {
        self.entries.get(key).map(|stored| stored.value)
    }

    fn set(&self, key: &str, value: Value, timeout: Duration) {
        if timeout.is_zero() {
            self.entries.invalidate(key);
            return;
        }
        self.entries.insert(
            key.to_string(),
            Stored {
                value,
                ttl: timeout,
            },
        );
    }

    fn delete(&self, key: &str) {
        self.entries.invalidate(key);
    }

    fn clear(&self) {
        self.entries.invalidate_all();
    }

    fn default_timeout(&self) -> Duration {
        self.default_timeout
    }
}
