//! Backend that caches nothing.

use std::time::Duration;

use serde_json::Value;

use super::CacheBackend;

/// Accepts writes and forgets them; every read misses.
///
/// Useful to switch caching off for a whole alias without touching viewlet
/// timeouts.
#[derive(Debug, Clone)]
pub struct DummyCache {
    default_timeout: Duration,
}

impl DummyCache {
    pub fn new() -> Self {
        Self::with_default_timeout(Duration::from_secs(300))
    }

    pub fn with_default_timeout(default_timeout: Duration) -> Self {
        Self { default_timeout }
    }
}

impl Default for DummyCache {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheBackend for DummyCache {
    fn get(&self, _key: &str) -> Option<Value> {
        None
    }

    fn set(&self, _key: &str, _value: Value, _timeout: Duration) {}

    fn delete(&self, _key: &str) {}

    fn default_timeout(&self) -> Duration {
        self.default_timeout
    }
}
