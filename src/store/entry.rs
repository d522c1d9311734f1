//! Cache entries

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde_json::Value;

/// A stored cache entry: opaque raw value plus its expiry bookkeeping
///
/// The value is always the pre-materialization raw form (a row, a row
/// array, or a geo row array), so lean/hydrated decisions happen at read
/// time.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    value: Value,
    stored_at: DateTime<Utc>,
    expires_at: Option<Instant>,
}

impl CacheEntry {
    /// Create an entry; a TTL of zero never expires
    pub fn new(value: Value, ttl_secs: u64) -> Self {
        let expires_at = if ttl_secs == 0 {
            None
        } else {
            Some(Instant::now() + Duration::from_secs(ttl_secs))
        };
        Self {
            value,
            stored_at: Utc::now(),
            expires_at,
        }
    }

    /// The stored raw value
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// When the entry was stored
    pub fn stored_at(&self) -> DateTime<Utc> {
        self.stored_at
    }

    /// Whether the entry has outlived its TTL
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(deadline) => Instant::now() >= deadline,
            None => false,
        }
    }
}
