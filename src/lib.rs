//! Viewlet - fragment caching for server-rendered templates
//!
//! A viewlet is a named function plus an optional template. Calling it
//! through a [`ViewletRegistry`] caches the function's data behind a key
//! derived from the call arguments, renders the template with that data and
//! returns text. [`refresh`](ViewletRegistry::refresh) and
//! [`expire`](ViewletRegistry::expire) control cached entries explicitly.
//!
//! # Example
//!
//! ```rust
//! use serde_json::{json, Value};
//! use viewlet::{Context, MiniJinjaRenderer, ViewletArgs, ViewletOptions, ViewletRegistry};
//!
//! fn greet(_: &Context, args: &ViewletArgs<'_>) -> viewlet::Result<Value> {
//!     Ok(json!({ "name": args.get("name") }))
//! }
//!
//! # fn main() -> viewlet::Result<()> {
//! let renderer = MiniJinjaRenderer::new().template("greet.html", "Hello {{ name }}!")?;
//! let registry = ViewletRegistry::builder().renderer(renderer).build()?;
//!
//! ViewletOptions::new()
//!     .template("greet.html")
//!     .param("name")
//!     .register(&registry, greet)?;
//!
//! assert_eq!(registry.call("greet", None, ["world"])?, "Hello world!");
//!
//! // The cache holds the function's data, not the markup.
//! let viewlet = registry.get("greet")?;
//! let key = viewlet.key_for(["world"])?;
//! assert_eq!(viewlet.cache().get(&key), Some(json!({ "name": "world" })));
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod key;
pub mod registry;
pub mod render;
pub mod telemetry;
pub mod types;
pub mod viewlet;

// Re-export main types at crate root
pub use cache::{CacheBackend, CacheRegistry, DummyCache, MemoryCache};
pub use config::Settings;
pub use error::{Result, ViewletError};
pub use key::{KeyFunction, KeyPolicy};
pub use registry::{RegistryBuilder, ViewletRegistry};
pub use render::Renderer;
pub use types::{Arguments, Context, Param, Timeout, ViewletArgs};
pub use viewlet::{Viewlet, ViewletOptions};

#[cfg(feature = "askama")]
pub use render::AskamaRenderer;
#[cfg(feature = "minijinja")]
pub use render::MiniJinjaRenderer;
