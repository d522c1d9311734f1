//! The cache engine
//!
//! A cheap-to-clone handle over the injected store, source, and
//! configuration. The read-through protocol lives here: resolve the
//! directive, derive the key, try the store, fall through to live
//! execution on any get error, store the raw pre-materialization result on
//! a miss, and materialize identically on both paths.

use std::sync::Arc;

use futures_util::future::try_join_all;
use serde_json::Value;

use crate::config::CacheConfig;
use crate::keygen::KeyGenerator;
use crate::materialize::{Record, Records, ResultMaterializer};
use crate::observability::{CacheMetrics, Logger, Severity};
use crate::populate::{ReferenceResolver, ReferenceTargets, StaticTargets};
use crate::query::{Operation, QueryDescriptor};
use crate::source::DataSource;
use crate::store::CacheStore;

use super::errors::{EngineError, EngineResult};
use super::query::{Query, QueryState};

pub(crate) struct EngineInner {
    pub(crate) store: Arc<dyn CacheStore>,
    pub(crate) source: Arc<dyn DataSource>,
    pub(crate) config: CacheConfig,
    pub(crate) targets: Arc<dyn ReferenceTargets>,
    pub(crate) metrics: Arc<CacheMetrics>,
}

/// Raw pre-materialization result of one fetch
pub(crate) enum RawResult {
    Many(Vec<Value>),
    One(Option<Value>),
}

impl RawResult {
    /// Rebuild from a stored cache value
    fn from_cached(value: Value) -> Self {
        match value {
            Value::Array(rows) => RawResult::Many(rows),
            other => RawResult::One(Some(other)),
        }
    }

    /// The form written to the store
    fn to_store_value(&self) -> Value {
        match self {
            RawResult::Many(rows) => Value::Array(rows.clone()),
            RawResult::One(Some(row)) => row.clone(),
            RawResult::One(None) => Value::Null,
        }
    }

    /// Flatten into a row list
    pub(crate) fn into_rows(self) -> Vec<Value> {
        match self {
            RawResult::Many(rows) => rows,
            RawResult::One(Some(row)) => vec![row],
            RawResult::One(None) => Vec::new(),
        }
    }

    /// The single-row view
    pub(crate) fn into_row(self) -> Option<Value> {
        match self {
            RawResult::One(row) => row,
            RawResult::Many(rows) => rows.into_iter().next(),
        }
    }
}

/// Read-through caching engine over an injected store and data source
pub struct CacheEngine {
    inner: Arc<EngineInner>,
}

impl Clone for CacheEngine {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl CacheEngine {
    /// Build an engine from its collaborators
    pub fn new(
        store: Arc<dyn CacheStore>,
        source: Arc<dyn DataSource>,
        config: CacheConfig,
    ) -> Self {
        Self {
            inner: Arc::new(EngineInner {
                store,
                source,
                config,
                targets: Arc::new(StaticTargets::new()),
                metrics: Arc::new(CacheMetrics::new()),
            }),
        }
    }

    /// Install schema-declared reference targets
    pub fn with_targets(self, targets: impl ReferenceTargets + 'static) -> Self {
        Self {
            inner: Arc::new(EngineInner {
                store: Arc::clone(&self.inner.store),
                source: Arc::clone(&self.inner.source),
                config: self.inner.config.clone(),
                targets: Arc::new(targets),
                metrics: Arc::clone(&self.inner.metrics),
            }),
        }
    }

    /// The injected cache store
    pub fn store(&self) -> &Arc<dyn CacheStore> {
        &self.inner.store
    }

    /// The injected data source
    pub fn source(&self) -> &Arc<dyn DataSource> {
        &self.inner.source
    }

    /// Process-wide configuration
    pub fn config(&self) -> &CacheConfig {
        &self.inner.config
    }

    /// Operational counters
    pub fn metrics(&self) -> &Arc<CacheMetrics> {
        &self.inner.metrics
    }

    /// The reference-target resolver
    pub fn reference_targets(&self) -> &Arc<dyn ReferenceTargets> {
        &self.inner.targets
    }

    /// Start a find query against a collection
    pub fn find(&self, collection: impl Into<String>, conditions: Value) -> Query {
        Query::new(
            self.clone(),
            QueryDescriptor::new(collection, Operation::Find, conditions),
        )
    }

    /// Start a findOne query against a collection
    pub fn find_one(&self, collection: impl Into<String>, conditions: Value) -> Query {
        Query::new(
            self.clone(),
            QueryDescriptor::new(collection, Operation::FindOne, conditions),
        )
    }

    /// Populate reference paths over an already-fetched document batch
    pub async fn populate<T: crate::populate::PopulateTarget>(
        &self,
        model: &str,
        docs: &mut [T],
        paths: &[crate::populate::ReferencePath],
    ) -> EngineResult<()> {
        ReferenceResolver::new(self)
            .populate(model, docs, paths)
            .await?;
        Ok(())
    }

    /// Resolve the effective enabled flag and TTL for a descriptor
    pub(crate) fn resolve_directive(&self, descriptor: &QueryDescriptor) -> (bool, u64) {
        let enabled = descriptor
            .cache
            .enabled
            .unwrap_or(self.inner.config.enabled);
        let ttl = descriptor
            .cache
            .ttl_secs
            .unwrap_or(self.inner.config.ttl_secs);
        (enabled, ttl)
    }

    /// Resolve the cache key: explicit per-query key, then the configured
    /// generator, then the canonical derivation
    pub(crate) fn resolve_key(&self, descriptor: &QueryDescriptor) -> String {
        if let Some(key) = &descriptor.cache.key {
            return key.resolve(descriptor);
        }
        if let Some(generator) = self.inner.config.key_generator() {
            return generator.as_ref()(descriptor);
        }
        KeyGenerator::derive(descriptor)
    }

    /// The read-through fetch protocol, returning the raw result
    ///
    /// Any store get error is a definite miss, not retried. A cached JSON
    /// null is never served as a hit. A successful miss attempts exactly
    /// one set, and a set failure surfaces even though the live data was
    /// obtained.
    pub(crate) async fn fetch_raw(
        &self,
        descriptor: &QueryDescriptor,
        state: &QueryState,
    ) -> EngineResult<RawResult> {
        let (enabled, ttl) = self.resolve_directive(descriptor);
        state.set_cache_enabled(enabled);

        if !enabled || !descriptor.operation.is_cacheable() {
            state.set_from_cache(false);
            self.inner.metrics.record_bypass();
            return self.live(descriptor, None, ttl).await;
        }

        let key = self.resolve_key(descriptor);
        match self.inner.store.get(&key).await {
            Ok(value) if !value.is_null() => {
                self.inner.metrics.record_hit();
                Logger::log(
                    Severity::Debug,
                    "cache_hit",
                    &[("collection", descriptor.collection.as_str())],
                );
                state.set_from_cache(true);
                Ok(RawResult::from_cached(value))
            }
            _ => {
                self.inner.metrics.record_miss();
                state.set_from_cache(false);
                self.live(descriptor, Some(&key), ttl).await
            }
        }
    }

    /// Live execution, storing the raw result when a key is supplied
    async fn live(
        &self,
        descriptor: &QueryDescriptor,
        key: Option<&str>,
        ttl: u64,
    ) -> EngineResult<RawResult> {
        let result = match descriptor.operation {
            Operation::FindOne => {
                RawResult::One(self.inner.source.find_one(descriptor).await?)
            }
            _ => RawResult::Many(self.inner.source.find(descriptor).await?),
        };

        if let Some(key) = key {
            match self
                .inner
                .store
                .set(key, result.to_store_value(), ttl)
                .await
            {
                Ok(()) => self.inner.metrics.record_write(),
                Err(err) => {
                    self.inner.metrics.record_write_failure();
                    Logger::log(
                        Severity::Warn,
                        "cache_write_failed",
                        &[
                            ("collection", descriptor.collection.as_str()),
                            ("error", &err.to_string()),
                        ],
                    );
                    return Err(EngineError::StoreWrite(err));
                }
            }
        }
        Ok(result)
    }

    /// Run the fetch protocol for an internal consolidated lookup
    pub(crate) async fn fetch_find(
        &self,
        descriptor: &QueryDescriptor,
    ) -> EngineResult<Vec<Value>> {
        let state = QueryState::new(false);
        Ok(self.fetch_raw(descriptor, &state).await?.into_rows())
    }

    /// Materialize live rows: hydration, then batch population
    ///
    /// The live path hydrates first and resolves declared paths over the
    /// whole result set at once, so each path costs one consolidated
    /// lookup for the batch and hydrated results keep their populated
    /// ledger.
    pub(crate) async fn materialize_live(
        &self,
        descriptor: &QueryDescriptor,
        rows: Vec<Value>,
    ) -> EngineResult<Records> {
        let records =
            ResultMaterializer::materialize_many(rows, descriptor.options.lean, false)?;
        if descriptor.populate.is_empty() {
            return Ok(records);
        }
        match records {
            Records::Lean(mut rows) => {
                ReferenceResolver::new(self)
                    .populate(&descriptor.collection, &mut rows, &descriptor.populate)
                    .await?;
                Ok(Records::Lean(rows))
            }
            Records::Documents(mut docs) => {
                ReferenceResolver::new(self)
                    .populate(&descriptor.collection, &mut docs, &descriptor.populate)
                    .await?;
                Ok(Records::Documents(docs))
            }
        }
    }

    /// Materialize cached rows: independent per-record units
    ///
    /// Each stored row is populated and hydrated as its own unit; the
    /// units run concurrently and report into pre-assigned output slots,
    /// so result order matches stored order regardless of completion
    /// order. The first failure fails the whole call.
    pub(crate) async fn materialize_cached(
        &self,
        descriptor: &QueryDescriptor,
        rows: Vec<Value>,
    ) -> EngineResult<Records> {
        let lean = descriptor.options.lean;
        if descriptor.populate.is_empty() {
            return Ok(ResultMaterializer::materialize_many(rows, lean, true)?);
        }

        let units = rows.into_iter().map(|row| {
            let engine = self.clone();
            async move {
                let mut row = row;
                ReferenceResolver::new(&engine)
                    .populate(
                        &descriptor.collection,
                        std::slice::from_mut(&mut row),
                        &descriptor.populate,
                    )
                    .await?;
                Ok::<Record, EngineError>(ResultMaterializer::materialize(row, lean, true)?)
            }
        });
        let records = try_join_all(units).await?;
        Ok(Records::assemble(records, lean))
    }

    /// Materialize one row
    ///
    /// Cached rows populate raw and then hydrate; live rows hydrate first
    /// so a hydrated result keeps its populated ledger.
    pub(crate) async fn materialize_row(
        &self,
        descriptor: &QueryDescriptor,
        row: Value,
        from_cache: bool,
    ) -> EngineResult<Record> {
        if from_cache {
            let mut row = row;
            if !descriptor.populate.is_empty() {
                ReferenceResolver::new(self)
                    .populate(
                        &descriptor.collection,
                        std::slice::from_mut(&mut row),
                        &descriptor.populate,
                    )
                    .await?;
            }
            return Ok(ResultMaterializer::materialize(
                row,
                descriptor.options.lean,
                true,
            )?);
        }

        let mut record =
            ResultMaterializer::materialize(row, descriptor.options.lean, false)?;
        if !descriptor.populate.is_empty() {
            ReferenceResolver::new(self)
                .populate(
                    &descriptor.collection,
                    std::slice::from_mut(&mut record),
                    &descriptor.populate,
                )
                .await?;
        }
        Ok(record)
    }
}
