//! The query decorator
//!
//! `Query` wraps a descriptor plus the engine handle: builder methods
//! shape the descriptor, `exec`/`exec_one`/`stream` run it through the
//! read-through protocol, and the from-cache / cache-enabled flags remain
//! readable afterwards. The flags are atomics shared with the streaming
//! task, so a stream's hit/miss outcome is visible on the query too.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde_json::Value;

use crate::materialize::{Record, Records};
use crate::populate::ReferencePath;
use crate::query::{CacheDirective, CacheKey, QueryDescriptor, SortSpec};

use super::engine::CacheEngine;
use super::errors::EngineResult;
use super::stream::{spawn_stream, DocumentStream};

/// Read-only introspection state, published atomically per call
pub(crate) struct QueryState {
    from_cache: AtomicBool,
    cache_enabled: AtomicBool,
}

impl QueryState {
    pub(crate) fn new(cache_enabled: bool) -> Self {
        Self {
            from_cache: AtomicBool::new(false),
            cache_enabled: AtomicBool::new(cache_enabled),
        }
    }

    pub(crate) fn set_from_cache(&self, value: bool) {
        self.from_cache.store(value, Ordering::SeqCst);
    }

    pub(crate) fn from_cache(&self) -> bool {
        self.from_cache.load(Ordering::SeqCst)
    }

    pub(crate) fn set_cache_enabled(&self, value: bool) {
        self.cache_enabled.store(value, Ordering::SeqCst);
    }

    pub(crate) fn cache_enabled(&self) -> bool {
        self.cache_enabled.load(Ordering::SeqCst)
    }
}

/// One query against the caching layer
pub struct Query {
    engine: CacheEngine,
    descriptor: QueryDescriptor,
    state: Arc<QueryState>,
}

impl Query {
    pub(crate) fn new(engine: CacheEngine, descriptor: QueryDescriptor) -> Self {
        let enabled = descriptor
            .cache
            .enabled
            .unwrap_or(engine.config().enabled);
        Self {
            engine,
            descriptor,
            state: Arc::new(QueryState::new(enabled)),
        }
    }

    /// Project the result fields
    pub fn select(mut self, fields: Value) -> Self {
        self.descriptor.fields = Some(fields);
        self
    }

    /// Sort the result set
    pub fn sort(mut self, sort: SortSpec) -> Self {
        self.descriptor.options.sort = Some(sort);
        self
    }

    /// Limit the result set
    pub fn limit(mut self, limit: u64) -> Self {
        self.descriptor.options.limit = Some(limit);
        self
    }

    /// Skip leading results
    pub fn skip(mut self, skip: u64) -> Self {
        self.descriptor.options.skip = Some(skip);
        self
    }

    /// Materialize plain records instead of hydrated documents
    pub fn lean(mut self) -> Self {
        self.descriptor.options.lean = true;
        self
    }

    /// Declare a reference path to resolve on materialization
    pub fn populate(mut self, path: ReferencePath) -> Self {
        self.descriptor.populate.push(path);
        self
    }

    /// Enable caching with the process-wide defaults
    pub fn cache(self) -> Self {
        self.cache_with(true, None, None)
    }

    /// Override the cache directive for this query
    pub fn cache_with(
        mut self,
        enabled: bool,
        ttl_secs: Option<u64>,
        key: Option<CacheKey>,
    ) -> Self {
        self.descriptor.cache = CacheDirective {
            enabled: Some(enabled),
            ttl_secs,
            key,
        };
        self.state.set_cache_enabled(enabled);
        self
    }

    /// The frozen descriptor this query executes
    pub fn descriptor(&self) -> &QueryDescriptor {
        &self.descriptor
    }

    /// Whether the last execution was served from the cache
    pub fn is_from_cache(&self) -> bool {
        self.state.from_cache()
    }

    /// The resolved cache-enabled flag
    pub fn is_cache_enabled(&self) -> bool {
        self.state.cache_enabled()
    }

    /// The TTL this query would store under, in seconds
    pub fn resolved_ttl(&self) -> u64 {
        self.descriptor
            .cache
            .ttl_secs
            .unwrap_or(self.engine.config().ttl_secs)
    }

    /// Execute, returning the ordered result set
    pub async fn exec(&self) -> EngineResult<Records> {
        let raw = self.engine.fetch_raw(&self.descriptor, &self.state).await?;
        let rows = raw.into_rows();
        if self.state.from_cache() {
            self.engine.materialize_cached(&self.descriptor, rows).await
        } else {
            self.engine.materialize_live(&self.descriptor, rows).await
        }
    }

    /// Execute, returning at most one result
    pub async fn exec_one(&self) -> EngineResult<Option<Record>> {
        let raw = self.engine.fetch_raw(&self.descriptor, &self.state).await?;
        let from_cache = self.state.from_cache();
        match raw.into_row() {
            Some(row) => Ok(Some(
                self.engine
                    .materialize_row(&self.descriptor, row, from_cache)
                    .await?,
            )),
            None => Ok(None),
        }
    }

    /// Execute as a stream of materialized records
    pub fn stream(&self) -> DocumentStream {
        spawn_stream(
            self.engine.clone(),
            self.descriptor.clone(),
            Arc::clone(&self.state),
        )
    }
}
