//! Viewlet registry: unique name → registered viewlet.
//!
//! The registry is append-only. A name is claimed by the first registration;
//! later registrations under the same name are ignored. On a lookup miss the
//! registry runs discovery: each enabled location hook gets a chance to
//! register viewlets, then the lookup is attempted once more.
//!
//! A location counts as loaded once its hook succeeds. A failing hook is
//! logged and forgotten, so a later miss retries it.

mod builder;

pub use builder::RegistryBuilder;

use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::cache::CacheRegistry;
use crate::config::Settings;
use crate::render::Renderer;
use crate::types::{Arguments, Context, ViewletArgs};
use crate::viewlet::{Viewlet, ViewletOptions};
use crate::{Result, ViewletError};

/// Discovery hook: registers the viewlets of one location.
pub type DiscoveryHook = Arc<dyn Fn(&ViewletRegistry) -> Result<()> + Send + Sync>;

/// Registered viewlets by name, plus everything needed to build new ones.
pub struct ViewletRegistry {
    entries: RwLock<HashMap<String, Arc<Viewlet>>>,
    locations: HashMap<String, DiscoveryHook>,
    loaded: Mutex<HashSet<String>>,
    caches: CacheRegistry,
    renderer: Option<Arc<dyn Renderer>>,
    settings: Settings,
}

impl ViewletRegistry {
    /// Create a new builder for configuring a registry.
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// Register `viewlet` unless its name is taken.
    ///
    /// Returns the entry registered under the name afterwards, which is the
    /// existing one for a duplicate.
    pub fn register(&self, viewlet: Viewlet) -> Arc<Viewlet> {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        match entries.entry(viewlet.name().to_string()) {
            Entry::Occupied(existing) => {
                debug!(viewlet = viewlet.name(), "ignoring duplicate registration");
                Arc::clone(existing.get())
            }
            Entry::Vacant(slot) => {
                debug!(viewlet = viewlet.name(), "registered viewlet");
                Arc::clone(slot.insert(Arc::new(viewlet)))
            }
        }
    }

    /// Register `f` with default options, named after the function.
    ///
    /// The function takes no parameters besides the context; use
    /// [`ViewletOptions`] for anything else.
    pub fn register_fn<F>(&self, f: F) -> Result<Arc<Viewlet>>
    where
        F: Fn(&Context, &ViewletArgs<'_>) -> Result<Value> + Send + Sync + 'static,
    {
        ViewletOptions::new().register(self, f)
    }

    /// Look up a viewlet, running discovery on a miss.
    pub fn get(&self, name: &str) -> Result<Arc<Viewlet>> {
        if let Some(viewlet) = self.lookup(name) {
            return Ok(viewlet);
        }
        self.discover();
        self.lookup(name)
            .ok_or_else(|| ViewletError::UnknownViewlet(name.to_string()))
    }

    /// Call a viewlet by name. A missing context is an empty one.
    #[instrument(skip(self, context, args))]
    pub fn call(
        &self,
        name: &str,
        context: Option<&Context>,
        args: impl Into<Arguments>,
    ) -> Result<String> {
        let viewlet = self.get(name)?;
        match context {
            Some(context) => viewlet.call(context, args),
            None => viewlet.call(&Context::new(), args),
        }
    }

    /// Recompute a viewlet's payload, overwrite the cache and return the
    /// fresh output.
    pub fn refresh(&self, name: &str, args: impl Into<Arguments>) -> Result<String> {
        self.get(name)?.refresh(args)
    }

    /// Drop a viewlet's cached payload for `args`.
    pub fn expire(&self, name: &str, args: impl Into<Arguments>) -> Result<()> {
        self.get(name)?.expire(args)
    }

    /// Run every enabled discovery location that has not loaded yet.
    ///
    /// Failures are logged and swallowed; the failed location is retried on
    /// the next run.
    pub fn discover(&self) {
        for location in &self.settings.discover {
            let Some(hook) = self.locations.get(location) else {
                warn!(%location, "no discovery hook for enabled location");
                continue;
            };

            // Claim the location before running it so a hook looking up a
            // missing viewlet does not run itself again.
            if !self.loaded().insert(location.clone()) {
                continue;
            }

            debug!(%location, "discovering viewlets");
            if let Err(e) = hook(self) {
                warn!(%location, error = %e, "viewlet discovery failed");
                self.loaded().remove(location);
            }
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        let mut names: Vec<String> = entries.keys().cloned().collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn caches(&self) -> &CacheRegistry {
        &self.caches
    }

    pub fn renderer(&self) -> Option<Arc<dyn Renderer>> {
        self.renderer.clone()
    }

    fn lookup(&self, name: &str) -> Option<Arc<Viewlet>> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    fn loaded(&self) -> std::sync::MutexGuard<'_, HashSet<String>> {
        self.loaded.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for ViewletRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut locations: Vec<&str> = self.locations.keys().map(String::as_str).collect();
        locations.sort_unstable();
        f.debug_struct("ViewletRegistry")
            .field("viewlets", &self.names())
            .field("locations", &locations)
            .field("has_renderer", &self.renderer.is_some())
            .finish_non_exhaustive()
    }
}
