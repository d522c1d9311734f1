//! Observability for docucache
//!
//! Structured JSON logging and operational counters for the caching layer.
//! Logs are synchronous, one line per event, with deterministic key order.

mod logger;
mod metrics;

pub use logger::{Logger, Severity};
pub use metrics::{CacheMetrics, MetricsSnapshot};
