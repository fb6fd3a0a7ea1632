//! Template rendering.
//!
//! Viewlets with a template hand their data, layered over the caller's
//! context, to a [`Renderer`]. Engines are interchangeable behind that one
//! method:
//!
//! - [`MiniJinjaRenderer`] (feature `minijinja`): runtime Jinja templates,
//!   from strings or template directories.
//! - [`AskamaRenderer`] (feature `askama`): compiled askama templates,
//!   registered under a name and filled by deserializing the context.

#[cfg(feature = "askama")]
mod askama;
#[cfg(feature = "minijinja")]
mod minijinja;

#[cfg(feature = "askama")]
pub use self::askama::AskamaRenderer;
#[cfg(feature = "minijinja")]
pub use self::minijinja::MiniJinjaRenderer;

use crate::Result;
use crate::types::Context;

/// Renders a named template against a context.
///
/// The context is complete when it arrives: the viewlet has already layered
/// its payload over the caller's context, and callers wanting extra values
/// add them to the [`Context`] they pass in. Escaping is the engine's
/// business; rendered text is returned as is.
pub trait Renderer: Send + Sync {
    fn render(&self, template: &str, context: &Context) -> Result<String>;
}

impl<F> Renderer for F
where
    F: Fn(&str, &Context) -> Result<String> + Send + Sync,
{
    fn render(&self, template: &str, context: &Context) -> Result<String> {
        self(template, context)
    }
}
