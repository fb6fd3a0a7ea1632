//! Template context passed to viewlets and renderers.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Result, ViewletError};

/// Mapping of names to values available to a viewlet and its template.
///
/// Rendering never mutates a caller's context: the data returned by a
/// viewlet function is layered over a copy via [`Context::derive`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Context(Map<String, Value>);

impl Context {
    /// Create an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Insert (or overwrite) a value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// A new context holding this context's values overridden by `data`.
    pub fn derive(&self, data: &Map<String, Value>) -> Context {
        let mut derived = self.0.clone();
        for (key, value) in data {
            derived.insert(key.clone(), value.clone());
        }
        Context(derived)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Map<String, Value>> for Context {
    fn from(map: Map<String, Value>) -> Self {
        Context(map)
    }
}

impl TryFrom<Value> for Context {
    type Error = ViewletError;

    fn try_from(value: Value) -> Result<Self> {
        match value {
            Value::Object(map) => Ok(Context(map)),
            Value::Null => Ok(Context::new()),
            other => Err(ViewletError::InvalidInput(format!(
                "context must be a mapping, got {other}"
            ))),
        }
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Context {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Context(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}
