//! Viewlet error types

/// Message for key templates still written with percent-style placeholders.
pub const DEPRECATED_KEY_FORMAT_MESSAGE: &str =
    "key argument format has changed: use a key function or a string containing `{args}`";

/// Message for key templates that cannot distinguish between argument tuples.
pub const WRONG_KEY_FORMAT_MESSAGE: &str = "a custom key for a viewlet with arguments must \
     contain `{args}` where the arguments will be inserted";

/// Viewlet error types
#[derive(Debug, thiserror::Error)]
pub enum ViewletError {
    // Lookup errors
    #[error("unknown viewlet \"{0}\"")]
    UnknownViewlet(String),

    // Key configuration errors
    #[error("viewlet \"{viewlet}\": {msg}", msg = DEPRECATED_KEY_FORMAT_MESSAGE)]
    DeprecatedKeyFormat { viewlet: String },

    #[error("viewlet \"{viewlet}\": {msg}", msg = WRONG_KEY_FORMAT_MESSAGE)]
    WrongKeyFormat { viewlet: String },

    #[error("cache key is {length} bytes, exceeding the maximum of {max}: {key}")]
    KeyTooLong {
        key: String,
        length: usize,
        max: usize,
    },

    // Call errors
    /// More positional arguments than the viewlet declares parameters.
    #[error("viewlet \"{viewlet}\" takes {expected} argument(s) but {given} were given")]
    InvalidArguments {
        viewlet: String,
        expected: usize,
        given: usize,
    },

    /// The wrapped function returned a value of the wrong shape, e.g. text
    /// from a templated viewlet.
    #[error("viewlet \"{viewlet}\" returned invalid output: {reason}")]
    InvalidOutput { viewlet: String, reason: String },

    #[error("viewlet function failed: {0}")]
    Callable(String),

    // Rendering errors
    #[error("viewlet \"{viewlet}\" has a template but no renderer is configured")]
    MissingRenderer { viewlet: String },

    #[error("template error: {0}")]
    Template(String),

    // Data errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    // Configuration errors
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl ViewletError {
    /// Whether this error signals a programming or configuration mistake.
    ///
    /// These are never retried or degraded: a bad key template, an oversized
    /// key or a call with too many arguments fails the same way every time.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            ViewletError::DeprecatedKeyFormat { .. }
                | ViewletError::WrongKeyFormat { .. }
                | ViewletError::KeyTooLong { .. }
                | ViewletError::InvalidArguments { .. }
                | ViewletError::MissingRenderer { .. }
                | ViewletError::Configuration(_)
        )
    }
}

#[cfg(feature = "minijinja")]
impl From<minijinja::Error> for ViewletError {
    fn from(err: minijinja::Error) -> Self {
        ViewletError::Template(err.to_string())
    }
}

#[cfg(feature = "askama")]
impl From<askama::Error> for ViewletError {
    fn from(err: askama::Error) -> Self {
        ViewletError::Template(err.to_string())
    }
}

/// Result type alias for viewlet operations
pub type Result<T> = std::result::Result<T, ViewletError>;
