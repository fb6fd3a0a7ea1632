//! Settings for viewlet registries.
//!
//! Settings are loaded from TOML files with the following resolution order:
//! 1. Explicit path (e.g. a `--config` CLI flag)
//! 2. `~/.viewlet/viewlet.toml` (user)
//! 3. `/etc/viewlet/viewlet.toml` (system)
//!
//! Every field has a default, so an empty file (or [`Settings::default`]) is a
//! working configuration.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::key::KeyFunction;
use crate::types::Timeout;
use crate::{Result, ViewletError};

/// Roughly one year, used for [`Timeout::Infinite`](crate::Timeout::Infinite).
pub const DEFAULT_INFINITE_TIMEOUT_SECS: u64 = 60 * 60 * 24 * 30 * 12;

/// Memcached's key limit, the strictest common backend.
pub const DEFAULT_MAX_KEY_LENGTH: usize = 250;

/// Top-level settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Alias of the cache backend used when a viewlet names none.
    pub default_cache_alias: String,
    /// Timeout of viewlets declared with [`Timeout::Default`]: `"default"`
    /// (the backend's own default), `"infinite"` or seconds.
    pub default_timeout: Timeout,
    /// TTL substituted for infinite timeouts.
    pub infinite_timeout_secs: u64,
    /// Strategy for `{args}` substitution and default keys.
    pub key_function: KeyFunction,
    /// Longest cache key accepted before a call fails.
    pub max_key_length: usize,
    pub template_engine: TemplateEngine,
    /// Directories searched for templates (MiniJinja engine).
    pub template_dirs: Vec<PathBuf>,
    /// Discovery locations scanned when a lookup misses.
    pub discover: Vec<String>,
    /// Cache backends by alias.
    pub caches: BTreeMap<String, CacheSettings>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_cache_alias: "viewlet".to_string(),
            default_timeout: Timeout::Default,
            infinite_timeout_secs: DEFAULT_INFINITE_TIMEOUT_SECS,
            key_function: KeyFunction::default(),
            max_key_length: DEFAULT_MAX_KEY_LENGTH,
            template_engine: TemplateEngine::default(),
            template_dirs: Vec::new(),
            discover: Vec::new(),
            caches: BTreeMap::new(),
        }
    }
}

/// Template engine used to render viewlet templates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemplateEngine {
    #[default]
    Minijinja,
    Askama,
}

/// Kind of cache backend behind an alias.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// In-process LRU with per-entry TTL.
    #[default]
    Memory,
    /// Stores nothing; every read misses.
    Dummy,
}

/// One configured cache backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    pub backend: BackendKind,
    /// Default TTL for viewlets using this backend with `Timeout::Default`.
    pub timeout_secs: u64,
    pub max_entries: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            timeout_secs: 300,
            max_entries: 10_000,
        }
    }
}

impl Settings {
    /// Load settings from the standard locations.
    ///
    /// Resolution order:
    /// 1. Explicit path (if provided)
    /// 2. `~/.viewlet/viewlet.toml`
    /// 3. `/etc/viewlet/viewlet.toml`
    ///
    /// Falls back to [`Settings::default`] when no file exists and no
    /// explicit path was given.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        match Self::resolve_path(explicit_path)? {
            Some(path) => Self::load_from_file(&path),
            None => Ok(Self::default()),
        }
    }

    /// Parse settings from a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| ViewletError::Configuration(format!("Failed to parse settings: {e}")))
    }

    /// Render these settings as a TOML document.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| ViewletError::Configuration(format!("Failed to serialize settings: {e}")))
    }

    fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            ViewletError::Configuration(format!("Failed to read settings file {path:?}: {e}"))
        })?;
        toml::from_str(&content).map_err(|e| {
            ViewletError::Configuration(format!("Failed to parse settings file {path:?}: {e}"))
        })
    }

    fn resolve_path(explicit: Option<&Path>) -> Result<Option<PathBuf>> {
        if let Some(path) = explicit {
            if path.exists() {
                return Ok(Some(path.to_path_buf()));
            }
            return Err(ViewletError::Configuration(format!(
                "Settings file not found: {path:?}"
            )));
        }

        // User settings
        if let Some(home) = dirs::home_dir() {
            let user = home.join(".viewlet").join("viewlet.toml");
            if user.exists() {
                return Ok(Some(user));
            }
        }

        // System settings
        let system = PathBuf::from("/etc/viewlet/viewlet.toml");
        if system.exists() {
            return Ok(Some(system));
        }

        Ok(None)
    }

    /// Resolve the configured default timeout against a backend's default.
    pub fn default_timeout_for(&self, backend_default: Duration) -> Duration {
        self.default_timeout
            .resolve(backend_default, self.infinite_timeout())
    }

    pub fn infinite_timeout(&self) -> Duration {
        Duration::from_secs(self.infinite_timeout_secs)
    }
}
