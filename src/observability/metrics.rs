//! Metrics registry for docucache
//!
//! - Counters only, monotonic, reset on process start
//! - Thread-safe via atomics, Relaxed ordering (exactness per counter,
//!   no cross-counter consistency required)

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Operational counters for the caching layer
#[derive(Debug, Default)]
pub struct CacheMetrics {
    /// Cache reads served from the store
    hits: AtomicU64,
    /// Cache reads that fell through to live execution
    misses: AtomicU64,
    /// Queries that bypassed the cache (disabled or non-cacheable op)
    bypasses: AtomicU64,
    /// Successful store writes
    writes: AtomicU64,
    /// Failed store writes
    write_failures: AtomicU64,
    /// Streaming reads served from the store
    stream_hits: AtomicU64,
    /// Streaming reads buffered from live execution
    stream_misses: AtomicU64,
    /// Consolidated reference lookups issued
    populate_lookups: AtomicU64,
    /// Population calls that reused previously resolved ids
    populate_reuses: AtomicU64,
}

impl CacheMetrics {
    /// Create a registry with all counters at zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a cache hit
    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a cache miss
    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a cache bypass
    pub fn record_bypass(&self) {
        self.bypasses.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a successful store write
    pub fn record_write(&self) {
        self.writes.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a failed store write
    pub fn record_write_failure(&self) {
        self.write_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a streaming cache hit
    pub fn record_stream_hit(&self) {
        self.stream_hits.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a streaming cache miss
    pub fn record_stream_miss(&self) {
        self.stream_misses.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a consolidated reference lookup
    pub fn record_populate_lookup(&self) {
        self.populate_lookups.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a populate call that reused prior ids
    pub fn record_populate_reuse(&self) {
        self.populate_reuses.fetch_add(1, Ordering::Relaxed);
    }

    /// Take a point-in-time snapshot of all counters
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            bypasses: self.bypasses.load(Ordering::Relaxed),
            writes: self.writes.load(Ordering::Relaxed),
            write_failures: self.write_failures.load(Ordering::Relaxed),
            stream_hits: self.stream_hits.load(Ordering::Relaxed),
            stream_misses: self.stream_misses.load(Ordering::Relaxed),
            populate_lookups: self.populate_lookups.load(Ordering::Relaxed),
            populate_reuses: self.populate_reuses.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time view of the counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub hits: u64,
    pub misses: u64,
    pub bypasses: u64,
    pub writes: u64,
    pub write_failures: u64,
    pub stream_hits: u64,
    pub stream_misses: u64,
    pub populate_lookups: u64,
    pub populate_reuses: u64,
}
