//! Query descriptors and per-query cache directives

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::populate::ReferencePath;

use super::options::QueryOptions;

/// Signature for user-supplied key generators
pub type KeyFn = dyn Fn(&QueryDescriptor) -> String + Send + Sync;

/// The operation a descriptor executes
///
/// Only `Find` and `FindOne` qualify for read-through caching; everything
/// else bypasses the store entirely. Only `Find` streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Find,
    FindOne,
    Count,
    Distinct,
    Update,
    Remove,
}

impl Operation {
    /// Whether results of this operation may be served from the cache
    pub fn is_cacheable(&self) -> bool {
        matches!(self, Operation::Find | Operation::FindOne)
    }

    /// Whether this operation supports streaming execution
    pub fn streams(&self) -> bool {
        matches!(self, Operation::Find)
    }

    /// Lowercase operation name, used in keys and log fields
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Find => "find",
            Operation::FindOne => "findOne",
            Operation::Count => "count",
            Operation::Distinct => "distinct",
            Operation::Update => "update",
            Operation::Remove => "remove",
        }
    }
}

/// An explicit cache key: a literal string or a function of the descriptor
#[derive(Clone)]
pub enum CacheKey {
    Literal(String),
    Derived(Arc<KeyFn>),
}

impl CacheKey {
    /// Resolve the key against a descriptor
    pub fn resolve(&self, descriptor: &QueryDescriptor) -> String {
        match self {
            CacheKey::Literal(key) => key.clone(),
            CacheKey::Derived(f) => f.as_ref()(descriptor),
        }
    }

    /// Build a derived key from a function
    pub fn derived<F>(f: F) -> Self
    where
        F: Fn(&QueryDescriptor) -> String + Send + Sync + 'static,
    {
        CacheKey::Derived(Arc::new(f))
    }
}

impl fmt::Debug for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheKey::Literal(key) => f.debug_tuple("Literal").field(key).finish(),
            CacheKey::Derived(_) => f.write_str("Derived(<fn>)"),
        }
    }
}

impl From<&str> for CacheKey {
    fn from(key: &str) -> Self {
        CacheKey::Literal(key.to_string())
    }
}

impl From<String> for CacheKey {
    fn from(key: String) -> Self {
        CacheKey::Literal(key)
    }
}

/// Per-query cache override
///
/// Unset fields fall back to the process-wide configuration at execution
/// time; the resolved values are what the query reports afterwards.
#[derive(Debug, Clone, Default)]
pub struct CacheDirective {
    pub enabled: Option<bool>,
    pub ttl_secs: Option<u64>,
    pub key: Option<CacheKey>,
}

impl CacheDirective {
    /// Directive that enables caching with all defaults
    pub fn enabled() -> Self {
        Self {
            enabled: Some(true),
            ..Self::default()
        }
    }
}

/// Identifies one lookup against the data source
///
/// `update`, `path` and `distinct` never drive execution here; they exist so
/// that descriptors for those operations key distinctly.
#[derive(Debug, Clone)]
pub struct QueryDescriptor {
    pub collection: String,
    pub operation: Operation,
    pub conditions: Value,
    pub fields: Option<Value>,
    pub update: Option<Value>,
    pub path: Option<String>,
    pub distinct: Option<String>,
    pub options: QueryOptions,
    pub cache: CacheDirective,
    pub populate: Vec<ReferencePath>,
}

impl QueryDescriptor {
    /// Create a descriptor with default options and no cache directive
    pub fn new(collection: impl Into<String>, operation: Operation, conditions: Value) -> Self {
        Self {
            collection: collection.into(),
            operation,
            conditions,
            fields: None,
            update: None,
            path: None,
            distinct: None,
            options: QueryOptions::default(),
            cache: CacheDirective::default(),
            populate: Vec::new(),
        }
    }
}
