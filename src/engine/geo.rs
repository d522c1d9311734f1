//! geoNear with read-through caching
//!
//! Same hit/miss shape as the find path, with two deliberate differences
//! carried over from the original behavior: a store get *error* (not a
//! miss) falls back to live execution without attempting a set, and
//! hit-path materialization chains sequentially per record instead of
//! fanning out.

use serde_json::{json, Value};

use crate::document::Document;
use crate::materialize::Record;
use crate::observability::{Logger, Severity};
use crate::source::{GeoQuery, GeoRow};
use crate::store::StoreError;

use super::engine::CacheEngine;
use super::errors::{EngineError, EngineResult};

/// Cache settings for one geoNear call; passing them enables caching
#[derive(Debug, Clone, Default)]
pub struct GeoCache {
    /// TTL override in seconds
    pub ttl_secs: Option<u64>,
    /// Explicit key; derived from the query when absent
    pub key: Option<String>,
}

/// One materialized geo result
#[derive(Debug, Clone, PartialEq)]
pub struct GeoRecord {
    pub distance: f64,
    pub record: Record,
}

/// The outcome of a geoNear call
#[derive(Debug, Clone, PartialEq)]
pub struct GeoNearOutcome {
    pub records: Vec<GeoRecord>,
    from_cache: bool,
}

impl GeoNearOutcome {
    /// Whether the records came from the cache
    pub fn is_from_cache(&self) -> bool {
        self.from_cache
    }
}

impl CacheEngine {
    /// Execute a geoNear, read-through cached when `cache` is supplied
    pub async fn geo_near(
        &self,
        query: &GeoQuery,
        cache: Option<GeoCache>,
    ) -> EngineResult<GeoNearOutcome> {
        let cache = match cache {
            Some(cache) => cache,
            None => {
                let rows = self.source().geo_near(query).await?;
                return outcome(rows, query.options.lean, false);
            }
        };

        let ttl = cache.ttl_secs.unwrap_or(self.config().ttl_secs);
        let key = cache.key.unwrap_or_else(|| {
            json!({"geo": &query.geometry, "opts": &query.options}).to_string()
        });

        match self.store().get(&key).await {
            Ok(value) if !value.is_null() => {
                self.metrics().record_hit();
                Logger::log(
                    Severity::Debug,
                    "geo_cache_hit",
                    &[("collection", query.collection.as_str())],
                );
                let rows = parse_rows(&value);
                outcome(rows, query.options.lean, true)
            }
            Ok(_) | Err(StoreError::Miss) => {
                // miss: live execution, then exactly one set attempt
                self.metrics().record_miss();
                let rows = self.source().geo_near(query).await?;
                let stored: Vec<Value> = rows.iter().map(GeoRow::to_value).collect();
                match self.store().set(&key, Value::Array(stored), ttl).await {
                    Ok(()) => self.metrics().record_write(),
                    Err(err) => {
                        self.metrics().record_write_failure();
                        return Err(EngineError::StoreWrite(err));
                    }
                }
                outcome(rows, query.options.lean, false)
            }
            Err(_) => {
                // backend error: serve live, skip the store entirely
                self.metrics().record_bypass();
                let rows = self.source().geo_near(query).await?;
                outcome(rows, query.options.lean, false)
            }
        }
    }
}

fn parse_rows(value: &Value) -> Vec<GeoRow> {
    value
        .as_array()
        .map(|rows| rows.iter().filter_map(GeoRow::from_value).collect())
        .unwrap_or_default()
}

/// Sequential per-record materialization: each hydration completes before
/// the next begins; final order matches input order
fn outcome(rows: Vec<GeoRow>, lean: bool, from_cache: bool) -> EngineResult<GeoNearOutcome> {
    let mut records = Vec::with_capacity(rows.len());
    for row in rows {
        let record = if lean {
            Record::Lean(row.document)
        } else if from_cache {
            Record::Document(Document::init_from_cache(row.document)?)
        } else {
            Record::Document(Document::init(row.document)?)
        };
        records.push(GeoRecord {
            distance: row.distance,
            record,
        });
    }
    Ok(GeoNearOutcome {
        records,
        from_cache,
    })
}
