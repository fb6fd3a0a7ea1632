//! Builder for declaring viewlets.

use std::sync::Arc;

use serde_json::Value;
use tracing::warn;

use super::Viewlet;
use crate::key::{KeyFn, KeyPolicy};
use crate::registry::ViewletRegistry;
use crate::types::{Context, Param, Timeout, ViewletArgs};
use crate::{Result, ViewletError};

/// Declaration options for a viewlet.
///
/// ```rust
/// # use viewlet::{Context, Timeout, ViewletArgs, ViewletOptions, ViewletRegistry};
/// # use serde_json::{json, Value};
/// let registry = ViewletRegistry::builder().build().unwrap();
///
/// ViewletOptions::new()
///     .name("shout")
///     .param("text")
///     .timeout(Timeout::secs(60))
///     .register(&registry, |_: &Context, args: &ViewletArgs<'_>| {
///         Ok(json!(args.str("text").unwrap_or_default().to_uppercase()))
///     })
///     .unwrap();
///
/// assert_eq!(registry.call("shout", None, ["hey"]).unwrap(), "HEY");
/// ```
#[derive(Debug, Clone, Default)]
pub struct ViewletOptions {
    name: Option<String>,
    template: Option<String>,
    key: KeyPolicy,
    timeout: Timeout,
    using: Option<String>,
    params: Vec<Param>,
}

impl ViewletOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registration name. Defaults to the function's name; closures must set
    /// one.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Render the function's mapping through this template.
    pub fn template(mut self, template: impl Into<String>) -> Self {
        self.template = Some(template.into());
        self
    }

    /// Key template (`"greeting:{args}"`) or any other [`KeyPolicy`].
    pub fn key(mut self, key: impl Into<KeyPolicy>) -> Self {
        self.key = key.into();
        self
    }

    /// Compute keys with a function of the viewlet and its bound arguments.
    pub fn key_fn<F>(mut self, f: F) -> Self
    where
        F: Fn(&Viewlet, &[Value]) -> String + Send + Sync + 'static,
    {
        let f: KeyFn = Arc::new(f);
        self.key = KeyPolicy::Function(f);
        self
    }

    pub fn timeout(mut self, timeout: impl Into<Timeout>) -> Self {
        self.timeout = timeout.into();
        self
    }

    /// Cache alias to store payloads in.
    pub fn using(mut self, alias: impl Into<String>) -> Self {
        self.using = Some(alias.into());
        self
    }

    /// `cached(false)` disables caching; `cached(true)` leaves the timeout
    /// untouched.
    #[deprecated(note = "use `timeout(Timeout::DISABLED)` instead")]
    pub fn cached(mut self, cached: bool) -> Self {
        if !cached {
            warn!("`cached(false)` is deprecated, use `timeout(Timeout::DISABLED)`");
            self.timeout = Timeout::DISABLED;
        }
        self
    }

    /// Declare the next parameter.
    pub fn param(mut self, name: impl Into<String>) -> Self {
        self.params.push(Param::new(name));
        self
    }

    /// Declare the next parameter with a default value.
    pub fn param_default(mut self, name: impl Into<String>, default: impl Into<Value>) -> Self {
        self.params.push(Param::with_default(name, default));
        self
    }

    /// Declare parameters in order.
    pub fn params<I>(mut self, params: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Param>,
    {
        self.params.extend(params.into_iter().map(Into::into));
        self
    }

    /// Build a viewlet against `registry`'s settings, caches and renderer
    /// without registering it.
    ///
    /// The cache alias and timeout are resolved here, once.
    pub fn build<F>(self, registry: &ViewletRegistry, f: F) -> Result<Viewlet>
    where
        F: Fn(&Context, &ViewletArgs<'_>) -> Result<Value> + Send + Sync + 'static,
    {
        let name = match self.name {
            Some(name) => name,
            None => function_name::<F>().map(str::to_string).ok_or_else(|| {
                ViewletError::Configuration(
                    "cannot derive a viewlet name from this function type, set one with `name`".to_string(),
                )
            })?,
        };

        let settings = registry.settings();
        let cache = registry.caches().resolve(self.using.as_deref());
        let default_timeout = settings.default_timeout_for(cache.default_timeout());
        let timeout = self
            .timeout
            .resolve(default_timeout, settings.infinite_timeout());

        let renderer = match &self.template {
            Some(_) => Some(
                registry
                    .renderer()
                    .ok_or_else(|| ViewletError::MissingRenderer {
                        viewlet: name.clone(),
                    })?,
            ),
            None => None,
        };

        Ok(Viewlet {
            name,
            func: Arc::new(f),
            params: self.params,
            template: self.template,
            key_policy: self.key,
            key_function: settings.key_function,
            max_key_length: settings.max_key_length,
            timeout,
            cache,
            renderer,
        })
    }

    /// Build and register a viewlet, returning the registered entry.
    ///
    /// When the name is already taken the existing entry is kept and
    /// returned.
    pub fn register<F>(self, registry: &ViewletRegistry, f: F) -> Result<Arc<Viewlet>>
    where
        F: Fn(&Context, &ViewletArgs<'_>) -> Result<Value> + Send + Sync + 'static,
    {
        let viewlet = self.build(registry, f)?;
        Ok(registry.register(viewlet))
    }
}

/// Short name of function type `F`, e.g. `greet` for `app::views::greet`.
///
/// `None` unless `F` is a plain fn item. Closures, fn pointers, references,
/// boxed or shared trait objects and generic instantiations all share names
/// across distinct functions.
pub fn function_name<F: ?Sized>() -> Option<&'static str> {
    let full = std::any::type_name::<F>();
    let is_ident = |segment: &str| {
        !segment.is_empty()
            && !segment.starts_with(|c: char| c.is_ascii_digit())
            && segment.chars().all(|c| c.is_alphanumeric() || c == '_')
    };
    if !full.split("::").all(is_ident) {
        return None;
    }
    full.rsplit("::").next()
}
