//! Cache key derivation.
//!
//! Keys are derived from a viewlet's [`KeyPolicy`] and its bound argument
//! values (the context is never part of a key). Two strategies turn an
//! argument tuple into text:
//!
//! - [`join`]: literal representations joined with `:`. Readable, handy when
//!   debugging what a backend holds.
//! - [`digest`]: SHA-256 of the joined form. Bounded length and safe
//!   characters whatever the arguments are.
//!
//! The selected [`KeyFunction`] is used both for `{args}` substitution in key
//! templates and for the default `viewlet:{name}:{args}` key.
//!
//! All key errors are raised before any cache I/O or function call.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::viewlet::Viewlet;
use crate::{Result, ViewletError};

/// Placeholder replaced by the argument string in key templates.
pub const ARGS_PLACEHOLDER: &str = "{args}";

/// Prefix of keys built by the default key function.
pub const KEY_PREFIX: &str = "viewlet";

const ARG_DELIMITER: &str = ":";

/// Custom key function: `(viewlet, bound argument values) -> key`.
pub type KeyFn = Arc<dyn Fn(&Viewlet, &[Value]) -> String + Send + Sync>;

/// Rule mapping call arguments to a cache key.
#[derive(Clone, Default)]
pub enum KeyPolicy {
    /// `viewlet:{name}` or `viewlet:{name}:{args}` using the configured
    /// [`KeyFunction`].
    #[default]
    Default,
    /// Fixed template; must contain `{args}` when the viewlet takes arguments.
    Template(String),
    /// Result used verbatim (still subject to the length limit).
    Function(KeyFn),
}

impl KeyPolicy {
    pub fn function<F>(f: F) -> Self
    where
        F: Fn(&Viewlet, &[Value]) -> String + Send + Sync + 'static,
    {
        KeyPolicy::Function(Arc::new(f))
    }
}

impl fmt::Debug for KeyPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyPolicy::Default => f.write_str("Default"),
            KeyPolicy::Template(template) => f.debug_tuple("Template").field(template).finish(),
            KeyPolicy::Function(_) => f.write_str("Function(..)"),
        }
    }
}

impl From<&str> for KeyPolicy {
    fn from(template: &str) -> Self {
        KeyPolicy::Template(template.to_string())
    }
}

impl From<String> for KeyPolicy {
    fn from(template: String) -> Self {
        KeyPolicy::Template(template)
    }
}

/// Strategy turning an argument tuple into key text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
pub enum KeyFunction {
    #[default]
    Digest,
    Join,
}

impl KeyFunction {
    pub fn apply(self, args: &[Value]) -> String {
        match self {
            KeyFunction::Digest => digest(args),
            KeyFunction::Join => join(args),
        }
    }

    /// Key used by viewlets without a key policy.
    pub fn default_key(self, name: &str, args: &[Value]) -> String {
        if args.is_empty() {
            format!("{KEY_PREFIX}:{name}")
        } else {
            format!("{KEY_PREFIX}:{name}:{}", self.apply(args))
        }
    }
}

/// Literal representation of one argument value.
///
/// Strings are quoted so `"1"` and `1` never collide; everything else is
/// compact JSON, whose object keys are sorted.
pub fn literal(value: &Value) -> String {
    // Serializing a `Value` cannot fail.
    serde_json::to_string(value).unwrap_or_default()
}

/// Join the literal representation of each argument with `:`.
pub fn join(args: &[Value]) -> String {
    args.iter()
        .map(literal)
        .collect::<Vec<_>>()
        .join(ARG_DELIMITER)
}

/// Hex SHA-256 of [`join`].
pub fn digest(args: &[Value]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(join(args).as_bytes());
    hex::encode(hasher.finalize())
}

/// Expand a key template for a viewlet named `name` taking `arity` arguments.
///
/// Percent placeholders are rejected first so callers migrating from the old
/// positional format get a distinct error.
pub fn expand_template(
    template: &str,
    name: &str,
    arity: usize,
    strategy: KeyFunction,
    args: &[Value],
) -> Result<String> {
    if has_percent_placeholder(template) {
        return Err(ViewletError::DeprecatedKeyFormat {
            viewlet: name.to_string(),
        });
    }
    if !template.contains(ARGS_PLACEHOLDER) {
        if arity > 0 {
            return Err(ViewletError::WrongKeyFormat {
                viewlet: name.to_string(),
            });
        }
        return Ok(template.to_string());
    }
    Ok(template.replace(ARGS_PLACEHOLDER, &strategy.apply(args)))
}

/// Reject keys longer than `max` bytes.
pub fn check_length(key: String, max: usize) -> Result<String> {
    if key.len() > max {
        return Err(ViewletError::KeyTooLong {
            length: key.len(),
            key,
            max,
        });
    }
    Ok(key)
}

/// Build the cache key for `viewlet` called with bound `args`.
pub fn build_key(viewlet: &Viewlet, args: &[Value]) -> Result<String> {
    let key = match viewlet.key_policy() {
        KeyPolicy::Function(f) => f(viewlet, args),
        KeyPolicy::Template(template) => expand_template(
            template,
            viewlet.name(),
            viewlet.params().len(),
            viewlet.key_function(),
            args,
        )?,
        KeyPolicy::Default => viewlet.key_function().default_key(viewlet.name(), args),
    };
    check_length(key, viewlet.max_key_length())
}

fn has_percent_placeholder(template: &str) -> bool {
    let bytes = template.as_bytes();
    bytes
        .windows(2)
        .any(|w| w[0] == b'%' && (w[1] == b's' || w[1] == b'('))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn join_quotes_strings() {
        assert_eq!(join(&[json!("Hello"), json!("world")]), r#""Hello":"world""#);
        assert_eq!(join(&[json!(1), json!(true), Value::Null]), "1:true:null");
        assert_eq!(join(&[]), "");
    }

    #[test]
    fn join_distinguishes_types() {
        assert_ne!(join(&[json!("1")]), join(&[json!(1)]));
    }

    #[test]
    fn join_is_stable_for_objects() {
        let a = json!({"b": 2, "a": 1});
        let b = json!({"a": 1, "b": 2});
        assert_eq!(join(&[a]), join(&[b]));
    }

    #[test]
    fn digest_deterministic() {
        let args = [json!("Hello"), json!("wörld")];
        assert_eq!(digest(&args), digest(&args));
        assert_eq!(digest(&args).len(), 64);
    }

    #[test]
    fn digest_differs_on_input() {
        assert_ne!(digest(&[json!("a")]), digest(&[json!("b")]));
        assert_ne!(
            digest(&[json!("a"), json!("b")]),
            digest(&[json!("b"), json!("a")])
        );
    }

    #[test]
    fn default_key_without_args() {
        assert_eq!(
            KeyFunction::Digest.default_key("hello_world", &[]),
            "viewlet:hello_world"
        );
    }

    #[test]
    fn default_key_with_args() {
        let args = [json!("world")];
        assert_eq!(
            KeyFunction::Join.default_key("greet", &args),
            r#"viewlet:greet:"world""#
        );
        assert_eq!(
            KeyFunction::Digest.default_key("greet", &args),
            format!("viewlet:greet:{}", digest(&args))
        );
    }

    #[test]
    fn template_without_args_placeholder() {
        let key = expand_template("somekey", "v", 0, KeyFunction::Join, &[]).unwrap();
        assert_eq!(key, "somekey");
    }

    #[test]
    fn template_missing_placeholder_with_arguments() {
        let err = expand_template("somekey", "v", 2, KeyFunction::Join, &[json!(1), json!(2)])
            .unwrap_err();
        assert!(matches!(err, ViewletError::WrongKeyFormat { .. }));
    }

    #[test]
    fn template_with_percent_placeholders() {
        let err = expand_template("somekey(%s,%s)", "v", 2, KeyFunction::Join, &[])
            .unwrap_err();
        assert!(matches!(err, ViewletError::DeprecatedKeyFormat { .. }));

        let err = expand_template("somekey(%(name)s)", "v", 1, KeyFunction::Join, &[])
            .unwrap_err();
        assert!(matches!(err, ViewletError::DeprecatedKeyFormat { .. }));
    }

    #[test]
    fn template_substitution() {
        let key = expand_template(
            "somekey:{args}",
            "v",
            2,
            KeyFunction::Join,
            &[json!("Hello"), json!("world")],
        )
        .unwrap();
        assert_eq!(key, r#"somekey:"Hello":"world""#);
    }

    #[test]
    fn length_limit() {
        assert!(check_length("a".repeat(250), 250).is_ok());
        let err = check_length("a".repeat(251), 250).unwrap_err();
        assert!(matches!(
            err,
            ViewletError::KeyTooLong {
                length: 251,
                max: 250,
                ..
            }
        ));
    }
}
