//! Call arguments and their binding onto declared parameters.

use serde_json::{Map, Value};

static NULL: Value = Value::Null;

/// Arguments supplied by a caller: positional values plus named values.
///
/// ```rust
/// # use viewlet::Arguments;
/// let args = Arguments::new().arg("Hello").kwarg("name", "world");
/// assert_eq!(args.positional().len(), 1);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Arguments {
    positional: Vec<Value>,
    named: Map<String, Value>,
}

impl Arguments {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a positional argument.
    pub fn arg(mut self, value: impl Into<Value>) -> Self {
        self.positional.push(value.into());
        self
    }

    /// Set a named argument. Names the viewlet does not declare are ignored
    /// at call time.
    pub fn kwarg(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.named.insert(name.into(), value.into());
        self
    }

    pub fn positional(&self) -> &[Value] {
        &self.positional
    }

    pub fn named(&self) -> &Map<String, Value> {
        &self.named
    }

    pub(crate) fn into_parts(self) -> (Vec<Value>, Map<String, Value>) {
        (self.positional, self.named)
    }
}

impl From<()> for Arguments {
    fn from(_: ()) -> Self {
        Self::default()
    }
}

impl From<Vec<Value>> for Arguments {
    fn from(positional: Vec<Value>) -> Self {
        Self {
            positional,
            named: Map::new(),
        }
    }
}

impl<V: Into<Value>, const N: usize> From<[V; N]> for Arguments {
    fn from(values: [V; N]) -> Self {
        Self {
            positional: values.into_iter().map(Into::into).collect(),
            named: Map::new(),
        }
    }
}

/// A declared viewlet parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    /// Used when a call supplies neither a positional nor a named value.
    pub default: Option<Value>,
}

impl Param {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            default: None,
        }
    }

    pub fn with_default(name: impl Into<String>, default: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            default: Some(default.into()),
        }
    }
}

impl From<&str> for Param {
    fn from(name: &str) -> Self {
        Param::new(name)
    }
}

impl From<String> for Param {
    fn from(name: String) -> Self {
        Param::new(name)
    }
}

/// Arguments bound onto a viewlet's declared parameters, in declaration order.
///
/// This is what the wrapped function receives next to the context.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewletArgs<'a> {
    params: &'a [Param],
    values: Vec<Value>,
}

impl<'a> ViewletArgs<'a> {
    pub(crate) fn new(params: &'a [Param], values: Vec<Value>) -> Self {
        Self { params, values }
    }

    /// Value bound to the named parameter, or `null` when not declared.
    pub fn get(&self, name: &str) -> &Value {
        self.params
            .iter()
            .position(|p| p.name == name)
            .and_then(|i| self.values.get(i))
            .unwrap_or(&NULL)
    }

    /// String value bound to the named parameter.
    pub fn str(&self, name: &str) -> Option<&str> {
        self.get(name).as_str()
    }

    /// Value at a parameter position, or `null` when out of range.
    pub fn at(&self, index: usize) -> &Value {
        self.values.get(index).unwrap_or(&NULL)
    }

    /// All bound values in parameter order; this is the cache key input.
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
