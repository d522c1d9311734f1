//! Process-wide cache configuration
//!
//! Set once when the engine is constructed and treated as read-only
//! afterwards. Every field can be overridden per query via the cache
//! directive, except the key-generator override, which only per-query
//! explicit keys shadow.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::query::{KeyFn, QueryDescriptor};

/// Default time-to-live for cached entries, in seconds
pub const DEFAULT_TTL_SECS: u64 = 60;

/// Default key-value store endpoint
pub const DEFAULT_ENDPOINT: &str = "localhost:11211";

/// Process-wide defaults for the caching layer
#[derive(Clone)]
pub struct CacheConfig {
    /// Whether queries cache by default (per-query directives override)
    pub enabled: bool,
    /// Default TTL in seconds
    pub ttl_secs: u64,
    /// Store endpoint, handed to the external store constructor
    pub endpoint: String,
    /// Opaque options for the external store constructor
    pub store_options: Option<Value>,
    /// Process-wide key generator override
    key_generator: Option<Arc<KeyFn>>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            ttl_secs: DEFAULT_TTL_SECS,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            store_options: None,
            key_generator: None,
        }
    }
}

impl CacheConfig {
    /// Create the default configuration (caching off, 60 second TTL)
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable caching by default
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Set the default TTL in seconds
    pub fn with_ttl(mut self, ttl_secs: u64) -> Self {
        self.ttl_secs = ttl_secs;
        self
    }

    /// Set the store endpoint
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Set opaque store options
    pub fn with_store_options(mut self, options: Value) -> Self {
        self.store_options = Some(options);
        self
    }

    /// Install a process-wide key generator
    pub fn with_key_generator<F>(mut self, f: F) -> Self
    where
        F: Fn(&QueryDescriptor) -> String + Send + Sync + 'static,
    {
        self.key_generator = Some(Arc::new(f));
        self
    }

    /// The installed key generator, if any
    pub fn key_generator(&self) -> Option<&Arc<KeyFn>> {
        self.key_generator.as_ref()
    }
}

impl fmt::Debug for CacheConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheConfig")
            .field("enabled", &self.enabled)
            .field("ttl_secs", &self.ttl_secs)
            .field("endpoint", &self.endpoint)
            .field("store_options", &self.store_options)
            .field(
                "key_generator",
                &self.key_generator.as_ref().map(|_| "<fn>"),
            )
            .finish()
    }
}
