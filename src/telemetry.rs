//! Telemetry metric name constants.
//!
//! Centralised metric names for viewlet operations. Consumers install their
//! own `metrics` recorder (e.g. prometheus, statsd); without a recorder
//! installed, all metric calls are no-ops.
//!
//! # Metric naming conventions
//!
//! All metrics are prefixed with `viewlet_`. Counters end in `_total`,
//! histograms use meaningful units (e.g. `_seconds`).
//!
//! # Common labels
//!
//! - `viewlet`: registered viewlet name

/// Calls answered from the cache.
///
/// Labels: `viewlet`.
pub const CACHE_HITS_TOTAL: &str = "viewlet_cache_hits_total";

/// Cache reads that found nothing (or `null`) and recomputed.
///
/// Labels: `viewlet`.
pub const CACHE_MISSES_TOTAL: &str = "viewlet_cache_misses_total";

/// Forced recomputations.
///
/// Labels: `viewlet`.
pub const REFRESHES_TOTAL: &str = "viewlet_refreshes_total";

/// Explicit cache deletions.
///
/// Labels: `viewlet`.
pub const EXPIRES_TOTAL: &str = "viewlet_expires_total";

/// Time spent in the wrapped function, in seconds. Cache hits record nothing.
///
/// Labels: `viewlet`.
pub const COMPUTE_DURATION_SECONDS: &str = "viewlet_compute_duration_seconds";
