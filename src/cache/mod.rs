//! Cache backends.
//!
//! A viewlet talks to its backend through the [`CacheBackend`] trait: get,
//! set with a TTL, delete, and a default timeout. Two implementations ship:
//!
//! - [`MemoryCache`]: moka LRU with per-entry TTL.
//! - [`DummyCache`]: stores nothing.
//!
//! Backends are configured under aliases in a [`CacheRegistry`]. Resolving an
//! alias never fails: an unconfigured alias falls back to `default`, and when
//! that is missing too, to a process-wide in-memory backend.
//!
//! Backends are expected to swallow their own I/O failures and report them as
//! misses; a slow or unavailable cache must not fail a page render.

mod dummy;
mod memory;

pub use dummy::DummyCache;
pub use memory::MemoryCache;

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, warn};

use crate::config::{BackendKind, CacheSettings};

/// Alias used when the configured default alias is missing.
pub const DEFAULT_ALIAS: &str = "default";

/// Minimal capability set viewlets need from a cache.
pub trait CacheBackend: Send + Sync {
    /// Cached value for `key`, or `None` when absent or expired.
    fn get(&self, key: &str) -> Option<Value>;

    /// Store `value` for `timeout`. A zero timeout stores nothing.
    fn set(&self, key: &str, value: Value, timeout: Duration);

    /// Remove `key`; no-op when absent.
    fn delete(&self, key: &str);

    /// Evict all entries.
    fn clear(&self) {}

    /// TTL applied to viewlets declared with `Timeout::Default`.
    fn default_timeout(&self) -> Duration;
}

/// Process-wide fallback backend, shared by every registry.
fn process_default() -> Arc<dyn CacheBackend> {
    static FALLBACK: OnceLock<Arc<MemoryCache>> = OnceLock::new();
    FALLBACK.get_or_init(|| Arc::new(MemoryCache::new())).clone()
}

/// Cache backends by alias.
pub struct CacheRegistry {
    backends: HashMap<String, Arc<dyn CacheBackend>>,
    default_alias: String,
}

impl CacheRegistry {
    /// Create an empty registry whose default alias is `default_alias`.
    pub fn new(default_alias: impl Into<String>) -> Self {
        Self {
            backends: HashMap::new(),
            default_alias: default_alias.into(),
        }
    }

    /// Build backends from settings.
    pub fn from_settings<'a>(
        default_alias: impl Into<String>,
        caches: impl IntoIterator<Item = (&'a String, &'a CacheSettings)>,
    ) -> Self {
        let mut registry = Self::new(default_alias);
        for (alias, settings) in caches {
            let timeout = Duration::from_secs(settings.timeout_secs);
            let backend: Arc<dyn CacheBackend> = match settings.backend {
                BackendKind::Memory => {
                    Arc::new(MemoryCache::with_config(settings.max_entries, timeout))
                }
                BackendKind::Dummy => Arc::new(DummyCache::with_default_timeout(timeout)),
            };
            registry.insert(alias.clone(), backend);
        }
        registry
    }

    /// Configure (or replace) the backend behind `alias`.
    pub fn insert(&mut self, alias: impl Into<String>, backend: Arc<dyn CacheBackend>) {
        self.backends.insert(alias.into(), backend);
    }

    pub fn default_alias(&self) -> &str {
        &self.default_alias
    }

    pub fn contains(&self, alias: &str) -> bool {
        self.backends.contains_key(alias)
    }

    pub fn aliases(&self) -> Vec<&str> {
        self.backends.keys().map(String::as_str).collect()
    }

    /// Backend for `alias`, or the default alias when `None`.
    ///
    /// Falls back to the `default` alias and then to the process-wide
    /// in-memory backend. An explicitly requested alias that is missing is
    /// logged as a warning.
    pub fn resolve(&self, alias: Option<&str>) -> Arc<dyn CacheBackend> {
        let requested = alias.unwrap_or(&self.default_alias);
        if let Some(backend) = self.backends.get(requested) {
            return Arc::clone(backend);
        }

        if alias.is_some() {
            warn!(alias = requested, "unknown cache alias, falling back to default backend");
        } else {
            debug!(alias = requested, "default cache alias not configured, falling back");
        }

        match self.backends.get(DEFAULT_ALIAS) {
            Some(backend) => Arc::clone(backend),
            None => process_default(),
        }
    }
}

impl Default for CacheRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_ALIAS)
    }
}
