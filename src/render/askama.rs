//! Askama adapter.

use std::collections::HashMap;
use std::fmt;

use askama::Template;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::Renderer;
use crate::types::Context;
use crate::{Result, ViewletError};

type RenderFn = Box<dyn Fn(&Context) -> Result<String> + Send + Sync>;

/// Renders compiled askama templates by name.
///
/// Askama templates are Rust types, so each one is registered under the name
/// viewlets refer to. At render time the context is deserialized into the
/// template type; context entries the type does not declare are ignored.
///
/// ```rust
/// # use viewlet::{AskamaRenderer, Context, Renderer};
/// #[derive(askama::Template, serde::Deserialize)]
/// #[template(source = "Hello {{ name }}!", ext = "txt")]
/// struct Hello {
///     name: String,
/// }
///
/// let renderer = AskamaRenderer::new().template::<Hello>("hello.txt");
/// let ctx = Context::new().with("name", "world");
/// assert_eq!(renderer.render("hello.txt", &ctx).unwrap(), "Hello world!");
/// ```
#[derive(Default)]
pub struct AskamaRenderer {
    templates: HashMap<String, RenderFn>,
}

impl AskamaRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register template type `T` under `name`.
    pub fn template<T>(mut self, name: impl Into<String>) -> Self
    where
        T: Template + DeserializeOwned + 'static,
    {
        self.insert::<T>(name);
        self
    }

    /// Register template type `T` under `name`, replacing any previous one.
    pub fn insert<T>(&mut self, name: impl Into<String>)
    where
        T: Template + DeserializeOwned + 'static,
    {
        let render: RenderFn = Box::new(|context: &Context| {
            let template: T = serde_json::from_value(Value::Object(context.as_map().clone()))?;
            Ok(template.render()?)
        });
        self.templates.insert(name.into(), render);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.templates.contains_key(name)
    }
}

impl fmt::Debug for AskamaRenderer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.templates.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("AskamaRenderer")
            .field("templates", &names)
            .finish()
    }
}

impl Renderer for AskamaRenderer {
    fn render(&self, template: &str, context: &Context) -> Result<String> {
        let render = self
            .templates
            .get(template)
            .ok_or_else(|| ViewletError::Template(format!("template not found: {template}")))?;
        render(context)
    }
}
