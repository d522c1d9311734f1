//! In-memory cache store

use std::collections::HashMap;
use std::sync::Mutex;

use serde_json::Value;

use super::entry::CacheEntry;
use super::errors::{StoreError, StoreResult};
use super::{CacheStore, StoreFuture};

/// In-process store with per-entry TTL expiry
///
/// Expiry is checked lazily on `get`; expired entries are removed and
/// reported as misses. There is no background sweeper.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every entry
    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.clear();
        }
    }

    /// Number of stored entries, expired ones included
    pub fn len(&self) -> usize {
        self.entries.lock().map(|entries| entries.len()).unwrap_or(0)
    }

    /// Whether no entries are stored
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether a live entry exists for `key`
    pub fn contains(&self, key: &str) -> bool {
        self.entries
            .lock()
            .map(|entries| entries.get(key).is_some_and(|e| !e.is_expired()))
            .unwrap_or(false)
    }

    fn get_sync(&self, key: &str) -> StoreResult<Value> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| StoreError::Backend("store lock poisoned".into()))?;

        match entries.get(key) {
            Some(entry) if entry.is_expired() => {
                entries.remove(key);
                Err(StoreError::Miss)
            }
            Some(entry) => Ok(entry.value().clone()),
            None => Err(StoreError::Miss),
        }
    }

    fn set_sync(&self, key: &str, value: Value, ttl_secs: u64) -> StoreResult<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| StoreError::Backend("store lock poisoned".into()))?;
        entries.insert(key.to_string(), CacheEntry::new(value, ttl_secs));
        Ok(())
    }
}

impl CacheStore for MemoryStore {
    fn get(&self, key: &str) -> StoreFuture<'_, Value> {
        let result = self.get_sync(key);
        Box::pin(async move { result })
    }

    fn set(&self, key: &str, value: Value, ttl_secs: u64) -> StoreFuture<'_, ()> {
        let result = self.set_sync(key, value, ttl_secs);
        Box::pin(async move { result })
    }
}
