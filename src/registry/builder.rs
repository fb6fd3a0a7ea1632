//! Builder for configuring registries.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, RwLock};

#[cfg(feature = "minijinja")]
use tracing::debug;

use super::{DiscoveryHook, ViewletRegistry};
use crate::cache::{CacheBackend, CacheRegistry};
use crate::config::{Settings, TemplateEngine};
use crate::render::Renderer;
use crate::{Result, ViewletError};

#[cfg(feature = "minijinja")]
use crate::render::MiniJinjaRenderer;

enum RendererChoice {
    /// Build one from `template_engine` and `template_dirs`.
    FromSettings,
    Explicit(Arc<dyn Renderer>),
    Disabled,
}

/// Builder for [`ViewletRegistry`].
///
/// ```rust
/// # use viewlet::{MemoryCache, Settings, ViewletRegistry};
/// # use std::time::Duration;
/// let registry = ViewletRegistry::builder()
///     .settings(Settings::default())
///     .cache("short", MemoryCache::with_config(100, Duration::from_millis(250)))
///     .build()
///     .unwrap();
/// assert!(registry.caches().contains("short"));
/// ```
pub struct RegistryBuilder {
    settings: Settings,
    renderer: RendererChoice,
    caches: Vec<(String, Arc<dyn CacheBackend>)>,
    locations: HashMap<String, DiscoveryHook>,
    enabled: Vec<String>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self {
            settings: Settings::default(),
            renderer: RendererChoice::FromSettings,
            caches: Vec::new(),
            locations: HashMap::new(),
            enabled: Vec::new(),
        }
    }

    pub fn settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    /// Render templates with `renderer` instead of one built from settings.
    pub fn renderer(mut self, renderer: impl Renderer + 'static) -> Self {
        self.renderer = RendererChoice::Explicit(Arc::new(renderer));
        self
    }

    /// Build a registry without a renderer; templated viewlets are refused.
    pub fn without_renderer(mut self) -> Self {
        self.renderer = RendererChoice::Disabled;
        self
    }

    /// Put `backend` behind `alias`, overriding `[caches.<alias>]` settings.
    pub fn cache(mut self, alias: impl Into<String>, backend: impl CacheBackend + 'static) -> Self {
        self.caches.push((alias.into(), Arc::new(backend)));
        self
    }

    /// Shared-ownership variant of [`cache`](Self::cache).
    pub fn cache_arc(mut self, alias: impl Into<String>, backend: Arc<dyn CacheBackend>) -> Self {
        self.caches.push((alias.into(), backend));
        self
    }

    /// Provide the discovery hook for `name`. It only runs when `name` is
    /// listed in the `discover` setting.
    pub fn location<F>(mut self, name: impl Into<String>, hook: F) -> Self
    where
        F: Fn(&ViewletRegistry) -> Result<()> + Send + Sync + 'static,
    {
        self.locations.insert(name.into(), Arc::new(hook));
        self
    }

    /// Provide the discovery hook for `name` and enable it.
    pub fn discover<F>(mut self, name: impl Into<String>, hook: F) -> Self
    where
        F: Fn(&ViewletRegistry) -> Result<()> + Send + Sync + 'static,
    {
        let name = name.into();
        self.enabled.push(name.clone());
        self.location(name, hook)
    }

    pub fn build(self) -> Result<ViewletRegistry> {
        let mut settings = self.settings;
        for name in self.enabled {
            if !settings.discover.contains(&name) {
                settings.discover.push(name);
            }
        }

        let mut caches =
            CacheRegistry::from_settings(settings.default_cache_alias.clone(), &settings.caches);
        for (alias, backend) in self.caches {
            caches.insert(alias, backend);
        }

        let renderer = match self.renderer {
            RendererChoice::Explicit(renderer) => Some(renderer),
            RendererChoice::Disabled => None,
            RendererChoice::FromSettings => Some(renderer_from_settings(&settings)?),
        };

        Ok(ViewletRegistry {
            entries: RwLock::new(HashMap::new()),
            locations: self.locations,
            loaded: Mutex::new(HashSet::new()),
            caches,
            renderer,
            settings,
        })
    }
}

impl Default for RegistryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn renderer_from_settings(settings: &Settings) -> Result<Arc<dyn Renderer>> {
    match settings.template_engine {
        #[cfg(feature = "minijinja")]
        TemplateEngine::Minijinja => {
            debug!(dirs = ?settings.template_dirs, "using minijinja renderer");
            Ok(Arc::new(MiniJinjaRenderer::with_template_dirs(
                &settings.template_dirs,
            )))
        }
        #[cfg(not(feature = "minijinja"))]
        TemplateEngine::Minijinja => Err(ViewletError::Configuration(
            "template engine \"minijinja\" requires the `minijinja` feature".to_string(),
        )),
        // Compiled templates cannot be found from settings alone.
        TemplateEngine::Askama => Err(ViewletError::Configuration(
            "template engine \"askama\" needs an explicit `AskamaRenderer`, \
             pass one with `RegistryBuilder::renderer`"
                .to_string(),
        )),
    }
}
