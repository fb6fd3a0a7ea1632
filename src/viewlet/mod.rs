//! Viewlets: named, cacheable units of work.
//!
//! A [`Viewlet`] wraps a function `(context, args) -> value` together with a
//! timeout, a key policy and an optional template. Calling it:
//!
//! ```text
//! call(context, args)
//!     │ bind args onto declared params
//!     ▼
//! timeout == 0 or refresh? ──yes──► compute
//!     │ no
//!     ▼
//! build key ──► cache.get ──hit──► payload
//!                   │ miss
//!                   ▼
//!               compute ──► cache.set(payload)
//!                                │
//!                                ▼
//!               template? render(context + payload) : payload as text
//! ```
//!
//! The cached payload is the function's data, not the rendered markup, so a
//! template change shows up on the next render without expiring anything.
//! Concurrent misses on the same key all recompute; the last write wins.

mod options;

pub use options::{ViewletOptions, function_name};

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::Value;
use tracing::{debug, instrument, trace};

use crate::cache::CacheBackend;
use crate::key::{self, KeyFunction, KeyPolicy};
use crate::render::Renderer;
use crate::telemetry;
use crate::types::{Arguments, Context, Param, ViewletArgs};
use crate::{Result, ViewletError};

/// Function wrapped by a viewlet.
///
/// Receives the caller's context and the bound arguments. A templated viewlet
/// returns a mapping merged into the template context; any other viewlet
/// returns text.
pub type ViewletFn = Arc<dyn Fn(&Context, &ViewletArgs<'_>) -> Result<Value> + Send + Sync>;

/// A registered cacheable computation.
pub struct Viewlet {
    name: String,
    func: ViewletFn,
    params: Vec<Param>,
    template: Option<String>,
    key_policy: KeyPolicy,
    key_function: KeyFunction,
    max_key_length: usize,
    timeout: Duration,
    cache: Arc<dyn CacheBackend>,
    renderer: Option<Arc<dyn Renderer>>,
}

impl Viewlet {
    /// Start configuring a viewlet.
    pub fn options() -> ViewletOptions {
        ViewletOptions::new()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared parameters, excluding the context.
    pub fn params(&self) -> &[Param] {
        &self.params
    }

    pub fn template(&self) -> Option<&str> {
        self.template.as_deref()
    }

    pub fn key_policy(&self) -> &KeyPolicy {
        &self.key_policy
    }

    pub fn key_function(&self) -> KeyFunction {
        self.key_function
    }

    pub fn max_key_length(&self) -> usize {
        self.max_key_length
    }

    /// Resolved TTL; zero when caching is disabled.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// The backend this viewlet reads and writes.
    pub fn cache(&self) -> &Arc<dyn CacheBackend> {
        &self.cache
    }

    pub fn is_using_cache(&self) -> bool {
        !self.timeout.is_zero()
    }

    /// Render (or return) the viewlet's output, consulting the cache.
    pub fn call(&self, context: &Context, args: impl Into<Arguments>) -> Result<String> {
        self.invoke(context, args.into(), false)
    }

    /// Recompute with an empty context, overwrite the cache and return the
    /// fresh output.
    pub fn refresh(&self, args: impl Into<Arguments>) -> Result<String> {
        metrics::counter!(telemetry::REFRESHES_TOTAL, "viewlet" => self.name.clone()).increment(1);
        self.invoke(&Context::new(), args.into(), true)
    }

    /// Delete the cached payload for `args`; no-op when nothing is cached.
    ///
    /// A viewlet with caching disabled never builds a key, so this returns
    /// `Ok(())` without touching the backend.
    pub fn expire(&self, args: impl Into<Arguments>) -> Result<()> {
        if !self.is_using_cache() {
            trace!(viewlet = %self.name, "caching disabled, nothing to expire");
            return Ok(());
        }
        let bound = self.bind(args.into())?;
        let key = self.cache_key(bound.values())?;
        debug!(viewlet = %self.name, %key, "expiring cached payload");
        self.cache.delete(&key);
        metrics::counter!(telemetry::EXPIRES_TOTAL, "viewlet" => self.name.clone()).increment(1);
        Ok(())
    }

    /// Cache key for already-bound argument values.
    pub fn cache_key(&self, args: &[Value]) -> Result<String> {
        key::build_key(self, args)
    }

    /// Cache key for call arguments, bound the same way [`call`](Self::call)
    /// binds them.
    ///
    /// Diagnostic only: the key is built even when caching is disabled, in
    /// which case `call`, `refresh` and `expire` never use it.
    pub fn key_for(&self, args: impl Into<Arguments>) -> Result<String> {
        let bound = self.bind(args.into())?;
        self.cache_key(bound.values())
    }

    #[instrument(skip_all, fields(viewlet = %self.name, refresh = refresh))]
    fn invoke(&self, context: &Context, args: Arguments, refresh: bool) -> Result<String> {
        let bound = self.bind(args)?;
        let payload = self.fetch(context, &bound, refresh)?;
        self.finish(context, payload)
    }

    /// Bind positional then named arguments onto the declared parameters.
    fn bind(&self, args: Arguments) -> Result<ViewletArgs<'_>> {
        let (positional, named) = args.into_parts();
        if positional.len() > self.params.len() {
            return Err(ViewletError::InvalidArguments {
                viewlet: self.name.clone(),
                expected: self.params.len(),
                given: positional.len(),
            });
        }

        let mut slots: Vec<Option<Value>> = positional.into_iter().map(Some).collect();
        slots.resize(self.params.len(), None);

        for (name, value) in named {
            match self.params.iter().position(|p| p.name == name) {
                Some(index) => slots[index] = Some(value),
                None => trace!(viewlet = %self.name, argument = %name, "ignoring undeclared argument"),
            }
        }

        let values = slots
            .into_iter()
            .zip(&self.params)
            .map(|(slot, param)| {
                slot.or_else(|| param.default.clone())
                    .unwrap_or(Value::Null)
            })
            .collect();
        Ok(ViewletArgs::new(&self.params, values))
    }

    fn fetch(&self, context: &Context, args: &ViewletArgs<'_>, refresh: bool) -> Result<Value> {
        if !self.is_using_cache() {
            return self.compute(context, args);
        }

        let key = self.cache_key(args.values())?;
        if !refresh {
            match self.cache.get(&key) {
                Some(payload) if !payload.is_null() => {
                    debug!(%key, "cache hit");
                    metrics::counter!(telemetry::CACHE_HITS_TOTAL, "viewlet" => self.name.clone())
                        .increment(1);
                    return Ok(payload);
                }
                _ => {
                    debug!(%key, "cache miss");
                    metrics::counter!(telemetry::CACHE_MISSES_TOTAL, "viewlet" => self.name.clone())
                        .increment(1);
                }
            }
        }

        let payload = self.compute(context, args)?;
        self.cache.set(&key, payload.clone(), self.timeout);
        Ok(payload)
    }

    fn compute(&self, context: &Context, args: &ViewletArgs<'_>) -> Result<Value> {
        let start = Instant::now();
        let payload = (self.func)(context, args)?;
        metrics::histogram!(telemetry::COMPUTE_DURATION_SECONDS, "viewlet" => self.name.clone())
            .record(start.elapsed().as_secs_f64());

        if self.template.is_some() && !payload.is_object() {
            return Err(self.invalid_output(format!(
                "templated viewlets must return a mapping, got {}",
                kind(&payload)
            )));
        }
        Ok(payload)
    }

    /// Turn a payload into text, rendering mapping payloads of templated
    /// viewlets.
    fn finish(&self, context: &Context, payload: Value) -> Result<String> {
        match (&self.template, payload) {
            (Some(template), Value::Object(data)) => {
                let renderer = self
                    .renderer
                    .as_ref()
                    .ok_or_else(|| ViewletError::MissingRenderer {
                        viewlet: self.name.clone(),
                    })?;
                renderer.render(template, &context.derive(&data))
            }
            // Markup cached before payloads were data.
            (_, Value::String(text)) => Ok(text),
            (_, Value::Null) => Ok(String::new()),
            (_, Value::Bool(b)) => Ok(b.to_string()),
            (_, Value::Number(n)) => Ok(n.to_string()),
            (_, other) => Err(self.invalid_output(format!(
                "expected text without a template, got {}",
                kind(&other)
            ))),
        }
    }

    fn invalid_output(&self, reason: String) -> ViewletError {
        ViewletError::InvalidOutput {
            viewlet: self.name.clone(),
            reason,
        }
    }
}

impl fmt::Debug for Viewlet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Viewlet")
            .field("name", &self.name)
            .field("params", &self.params)
            .field("template", &self.template)
            .field("key_policy", &self.key_policy)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "a mapping",
    }
}
