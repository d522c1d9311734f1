//! Key-value cache store
//!
//! The store is an external collaborator: the engine consumes exactly two
//! operations, `get` and `set` with a TTL, and owns no eviction policy of
//! its own. `MemoryStore` is the in-process reference implementation used
//! by the test suites and small deployments; production deployments inject
//! an implementation backed by their key-value service.

mod entry;
mod errors;
mod memory;

use std::future::Future;
use std::pin::Pin;

use serde_json::Value;

pub use entry::CacheEntry;
pub use errors::{StoreError, StoreResult};
pub use memory::MemoryStore;

/// Future type returned by store operations
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = StoreResult<T>> + Send + 'a>>;

/// External key-value store contract
///
/// `get` signals a miss as `Err(StoreError::Miss)`, never as an empty
/// value. Implementations must be safe to share across concurrent calls.
pub trait CacheStore: Send + Sync {
    /// Fetch the raw value stored under `key`
    fn get(&self, key: &str) -> StoreFuture<'_, Value>;

    /// Store a raw value under `key` for `ttl_secs` seconds (zero = no expiry)
    fn set(&self, key: &str, value: Value, ttl_secs: u64) -> StoreFuture<'_, ()>;
}
