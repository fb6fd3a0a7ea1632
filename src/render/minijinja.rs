//! MiniJinja adapter.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use minijinja::{Environment, ErrorKind};

use super::Renderer;
use crate::Result;
use crate::types::Context;

/// Renders Jinja templates with minijinja.
///
/// Templates are either added from source with [`add_template`](Self::add_template)
/// or loaded lazily from template directories, searched in order.
pub struct MiniJinjaRenderer {
    env: Environment<'static>,
}

impl MiniJinjaRenderer {
    pub fn new() -> Self {
        let mut env = Environment::new();
        env.set_keep_trailing_newline(true);
        Self { env }
    }

    /// Renderer loading templates from `dirs`; the first directory holding a
    /// template wins.
    pub fn with_template_dirs<P: AsRef<Path>>(dirs: impl IntoIterator<Item = P>) -> Self {
        let dirs: Vec<PathBuf> = dirs.into_iter().map(|d| d.as_ref().to_path_buf()).collect();
        let mut renderer = Self::new();
        renderer
            .env
            .set_loader(move |name| load_from_dirs(&dirs, name));
        renderer
    }

    /// Add a template from source.
    pub fn add_template(
        &mut self,
        name: impl Into<String>,
        source: impl Into<String>,
    ) -> Result<()> {
        self.env.add_template_owned(name.into(), source.into())?;
        Ok(())
    }

    /// Builder-style [`add_template`](Self::add_template).
    pub fn template(mut self, name: impl Into<String>, source: impl Into<String>) -> Result<Self> {
        self.add_template(name, source)?;
        Ok(self)
    }

    /// Mutable access to the environment, e.g. to register filters.
    pub fn environment_mut(&mut self) -> &mut Environment<'static> {
        &mut self.env
    }
}

impl Default for MiniJinjaRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MiniJinjaRenderer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MiniJinjaRenderer").finish_non_exhaustive()
    }
}

impl Renderer for MiniJinjaRenderer {
    fn render(&self, template: &str, context: &Context) -> Result<String> {
        let template = self.env.get_template(template)?;
        Ok(template.render(context.as_map())?)
    }
}

fn load_from_dirs(
    dirs: &[PathBuf],
    name: &str,
) -> std::result::Result<Option<String>, minijinja::Error> {
    let relative = Path::new(name);
    // Refuse names escaping the template directories.
    if relative
        .components()
        .any(|c| !matches!(c, Component::Normal(_)))
    {
        return Ok(None);
    }
    for dir in dirs {
        match fs::read_to_string(dir.join(relative)) {
            Ok(source) => return Ok(Some(source)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
            Err(e) => {
                return Err(minijinja::Error::new(
                    ErrorKind::InvalidOperation,
                    format!("could not read template {name:?} from {dir:?}"),
                )
                .with_source(e));
            }
        }
    }
    Ok(None)
}
