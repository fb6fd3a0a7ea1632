//! Cache timeout policy.

use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// How long a viewlet's payload stays cached.
///
/// Resolved to a concrete [`Duration`] once, when the viewlet is built:
///
/// - [`Timeout::Default`]: the configured `default_timeout`, or the
///   selected backend's own default.
/// - [`Timeout::Infinite`]: `infinite_timeout_secs`; backends do not agree on
///   what zero or "none" means, so "forever" is a large finite TTL.
/// - [`Timeout::After`]: an explicit duration; zero disables caching.
///
/// In settings files a timeout is `"default"`, `"infinite"` or a number of
/// whole seconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Timeout {
    #[default]
    Default,
    Infinite,
    After(Duration),
}

impl Timeout {
    /// Caching disabled: every call recomputes.
    pub const DISABLED: Timeout = Timeout::After(Duration::ZERO);

    pub fn secs(secs: u64) -> Self {
        Timeout::After(Duration::from_secs(secs))
    }

    pub fn millis(millis: u64) -> Self {
        Timeout::After(Duration::from_millis(millis))
    }

    pub(crate) fn resolve(self, default: Duration, infinite: Duration) -> Duration {
        match self {
            Timeout::Default => default,
            Timeout::Infinite => infinite,
            Timeout::After(duration) => duration,
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum TimeoutRepr {
    Secs(u64),
    Keyword(TimeoutKeyword),
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum TimeoutKeyword {
    Default,
    Infinite,
}

impl Serialize for Timeout {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let repr = match self {
            Timeout::Default => TimeoutRepr::Keyword(TimeoutKeyword::Default),
            Timeout::Infinite => TimeoutRepr::Keyword(TimeoutKeyword::Infinite),
            Timeout::After(duration) => TimeoutRepr::Secs(duration.as_secs()),
        };
        repr.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Timeout {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match TimeoutRepr::deserialize(deserializer)? {
            TimeoutRepr::Secs(secs) => Timeout::secs(secs),
            TimeoutRepr::Keyword(TimeoutKeyword::Default) => Timeout::Default,
            TimeoutRepr::Keyword(TimeoutKeyword::Infinite) => Timeout::Infinite,
        })
    }
}

impl From<Duration> for Timeout {
    fn from(duration: Duration) -> Self {
        Timeout::After(duration)
    }
}
