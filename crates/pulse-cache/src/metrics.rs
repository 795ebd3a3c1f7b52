//! Prometheus metrics for cache monitoring.

use crate::ConnectionState;
use metrics::{counter, describe_counter, describe_gauge, gauge};

/// Metric names for the cache layer.
pub mod names {
    /// Total cache hits.
    pub const CACHE_HITS_TOTAL: &str = "pulse_cache_hits_total";
    /// Total cache misses (including undecodable entries).
    pub const CACHE_MISSES_TOTAL: &str = "pulse_cache_misses_total";
    /// Total failed store operations.
    pub const CACHE_ERRORS_TOTAL: &str = "pulse_cache_errors_total";
    /// Total tag invalidations.
    pub const CACHE_INVALIDATIONS_TOTAL: &str = "pulse_cache_invalidations_total";
    /// Whether the store is connected (1) or not (0).
    pub const CACHE_CONNECTED: &str = "pulse_cache_connected";
}

/// Register all metric descriptions.
pub fn register_metrics() {
    describe_counter!(names::CACHE_HITS_TOTAL, "Total number of cache hits");
    describe_counter!(names::CACHE_MISSES_TOTAL, "Total number of cache misses");
    describe_counter!(
        names::CACHE_ERRORS_TOTAL,
        "Total number of failed cache store operations"
    );
    describe_counter!(
        names::CACHE_INVALIDATIONS_TOTAL,
        "Total number of tag invalidations"
    );
    describe_gauge!(
        names::CACHE_CONNECTED,
        "Whether the cache store is connected (1) or not (0)"
    );
}

/// Cache metrics recorder.
#[derive(Clone)]
pub struct CacheMetrics;

impl CacheMetrics {
    /// Record a hit.
    pub fn hit() {
        counter!(names::CACHE_HITS_TOTAL).increment(1);
    }

    /// Record a miss.
    pub fn miss() {
        counter!(names::CACHE_MISSES_TOTAL).increment(1);
    }

    /// Record a failed store operation.
    pub fn error(operation: &'static str) {
        counter!(names::CACHE_ERRORS_TOTAL, "operation" => operation).increment(1);
    }

    /// Record a tag invalidation.
    pub fn invalidation(deleted: u64) {
        counter!(names::CACHE_INVALIDATIONS_TOTAL).increment(1);
        tracing::trace!(deleted, "Recorded tag invalidation");
    }

    /// Publish the connection state of the service owning `prefix`.
    pub fn connection_state(prefix: &str, state: ConnectionState) {
        gauge!(names::CACHE_CONNECTED, "prefix" => prefix.to_owned())
            .set(if state.is_connected() { 1.0 } else { 0.0 });
    }
}
