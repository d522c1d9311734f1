//! Read-through caching invariants
//!
//! - No caching without an explicit or default enable
//! - Hit results structurally equal the original live results
//! - TTL expiry and per-call TTL override
//! - Store get errors recover as misses; store write errors surface
//! - A cached null is never served as a hit

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use serde_json::{json, Value};

use docucache::store::StoreFuture;
use docucache::{
    CacheConfig, CacheEngine, CacheKey, CacheStore, GeoCache, GeoQuery, MemorySource,
    MemoryStore, Records, StoreError,
};

// =============================================================================
// Helper Functions
// =============================================================================

const NAMES: [&str; 10] = [
    "Jacob", "Sophia", "Mason", "Isabella", "William", "Emma", "Jayden", "Olivia", "Noah", "Ava",
];

/// Seed `amount` people, each referencing the previous one in a cycle
fn generate_crowd(source: &MemorySource, amount: usize) -> Vec<String> {
    let mut rng = rand::thread_rng();
    let mut docs = Vec::with_capacity(amount);
    for i in 0..amount {
        let peer = if i == 0 { amount - 1 } else { i - 1 };
        docs.push(json!({
            "_id": format!("p{i}"),
            "name": NAMES[rng.gen_range(0..NAMES.len())],
            "num": rng.gen_range(0..10_000),
            "peer": format!("p{peer}"),
        }));
    }
    source.insert_many("people", docs)
}

fn engine_with(store: Arc<dyn CacheStore>, source: Arc<MemorySource>) -> CacheEngine {
    CacheEngine::new(store, source, CacheConfig::new())
}

fn setup(amount: usize) -> (CacheEngine, Arc<MemoryStore>, Arc<MemorySource>) {
    let store = Arc::new(MemoryStore::new());
    let source = Arc::new(MemorySource::new());
    generate_crowd(&source, amount);
    let engine = engine_with(store.clone(), source.clone());
    (engine, store, source)
}

/// A store whose reads always fail with a backend error
struct BrokenGetStore {
    inner: MemoryStore,
}

impl CacheStore for BrokenGetStore {
    fn get(&self, _key: &str) -> StoreFuture<'_, Value> {
        Box::pin(async { Err(StoreError::Backend("connection refused".into())) })
    }

    fn set(&self, key: &str, value: Value, ttl_secs: u64) -> StoreFuture<'_, ()> {
        self.inner.set(key, value, ttl_secs)
    }
}

/// A store whose writes always fail with a backend error
struct BrokenSetStore {
    inner: MemoryStore,
}

impl CacheStore for BrokenSetStore {
    fn get(&self, key: &str) -> StoreFuture<'_, Value> {
        self.inner.get(key)
    }

    fn set(&self, _key: &str, _value: Value, _ttl_secs: u64) -> StoreFuture<'_, ()> {
        Box::pin(async { Err(StoreError::Backend("write refused".into())) })
    }
}

// =============================================================================
// Baseline: no incidental caching
// =============================================================================

/// Queries that never enable caching are independently computed.
#[tokio::test]
async fn test_no_caching_without_enable() {
    let (engine, store, _source) = setup(10);

    for _ in 0..3 {
        let query = engine.find("people", json!({}));
        let records = query.exec().await.unwrap();
        assert_eq!(records.len(), 10);
        assert!(!query.is_from_cache());
        assert!(!query.is_cache_enabled());
    }
    assert!(store.is_empty());
}

/// An explicit cache(false) after a cached write still reads live data.
#[tokio::test]
async fn test_cache_false_reads_live() {
    let (engine, _store, source) = setup(10);

    engine.find("people", json!({})).cache().exec().await.unwrap();
    source.insert("people", json!({"_id": "extra", "name": "Extra"}));

    // the cached entry still holds 10 documents
    let cached = engine.find("people", json!({})).cache();
    assert_eq!(cached.exec().await.unwrap().len(), 10);
    assert!(cached.is_from_cache());

    // cache(false) bypasses it and sees the live 11
    let live = engine.find("people", json!({})).cache_with(false, None, None);
    assert_eq!(live.exec().await.unwrap().len(), 11);
    assert!(!live.is_from_cache());
    assert!(!live.is_cache_enabled());
}

// =============================================================================
// Hit/miss round trips
// =============================================================================

/// A qualified call caches; equivalent calls within TTL hit and match the
/// original live result field for field.
#[tokio::test]
async fn test_cache_round_trip_structural_equality() {
    let (engine, _store, _source) = setup(10);

    let first = engine.find("people", json!({})).cache_with(true, Some(2), None);
    let original = first.exec().await.unwrap();
    assert!(!first.is_from_cache());
    assert!(first.is_cache_enabled());

    let second = engine.find("people", json!({})).cache();
    let cached = second.exec().await.unwrap();
    assert!(second.is_from_cache());
    assert_eq!(original.bodies(), cached.bodies());

    // hydrated documents from a hit carry the provenance tag
    match cached {
        Records::Documents(docs) => {
            assert!(docs.iter().all(|doc| doc.is_from_cache()));
        }
        Records::Lean(_) => panic!("expected hydrated documents"),
    }
}

/// Lean and hydrated reads share one stored entry and differ only in
/// materialization.
#[tokio::test]
async fn test_lean_and_hydrated_share_the_entry() {
    let (engine, store, _source) = setup(5);

    engine.find("people", json!({})).cache().exec().await.unwrap();
    assert_eq!(store.len(), 1);

    let lean = engine.find("people", json!({})).lean().cache();
    let records = lean.exec().await.unwrap();
    assert!(lean.is_from_cache());
    assert_eq!(store.len(), 1);
    match records {
        Records::Lean(rows) => assert_eq!(rows.len(), 5),
        Records::Documents(_) => panic!("expected lean records"),
    }
}

/// Materializing the same stored value twice yields equal, independently
/// owned result sets.
#[tokio::test]
async fn test_hit_materialization_is_idempotent() {
    let (engine, _store, _source) = setup(5);
    engine.find("people", json!({})).cache().exec().await.unwrap();

    let a = engine.find("people", json!({})).lean().cache().exec().await.unwrap();
    let b = engine.find("people", json!({})).lean().cache().exec().await.unwrap();
    assert_eq!(a, b);

    // mutating one copy leaves the other untouched
    let mut a_rows = a.into_bodies();
    a_rows[0]["name"] = json!("changed");
    assert_ne!(Some(&a_rows[0]), b.bodies().first().copied());
}

/// findOne caches a single raw record and serves it back.
#[tokio::test]
async fn test_find_one_round_trip() {
    let (engine, _store, _source) = setup(10);

    let first = engine.find_one("people", json!({"_id": "p3"})).cache();
    let record = first.exec_one().await.unwrap().unwrap();
    assert!(!first.is_from_cache());
    assert_eq!(record.body()["_id"], "p3");

    let second = engine.find_one("people", json!({"_id": "p3"})).cache();
    let record = second.exec_one().await.unwrap().unwrap();
    assert!(second.is_from_cache());
    assert_eq!(record.body()["_id"], "p3");
}

/// A cached null (findOne with no match) is never served as a hit.
#[tokio::test]
async fn test_cached_null_is_not_a_hit() {
    let (engine, store, _source) = setup(3);

    let first = engine.find_one("people", json!({"_id": "ghost"})).cache();
    assert!(first.exec_one().await.unwrap().is_none());
    assert!(!first.is_from_cache());
    assert_eq!(store.len(), 1);

    let second = engine.find_one("people", json!({"_id": "ghost"})).cache();
    assert!(second.exec_one().await.unwrap().is_none());
    assert!(!second.is_from_cache());
}

// =============================================================================
// TTL handling
// =============================================================================

/// Entries expire with their TTL and the next call recomputes.
#[tokio::test]
async fn test_ttl_expiry_recomputes() {
    let (engine, _store, source) = setup(4);

    engine
        .find("people", json!({}))
        .cache_with(true, Some(1), None)
        .exec()
        .await
        .unwrap();
    source.insert("people", json!({"_id": "late", "name": "Late"}));

    tokio::time::sleep(Duration::from_millis(1100)).await;

    let query = engine.find("people", json!({})).cache();
    let records = query.exec().await.unwrap();
    assert!(!query.is_from_cache());
    assert_eq!(records.len(), 5);
}

/// A second call with its own TTL reports that TTL while hitting the
/// first call's stored value.
#[tokio::test]
async fn test_ttl_override_reported_on_hit() {
    let (engine, _store, _source) = setup(4);

    let first = engine.find("people", json!({})).cache_with(true, Some(50), None);
    first.exec().await.unwrap();
    assert_eq!(first.resolved_ttl(), 50);

    let second = engine.find("people", json!({})).cache_with(true, Some(40), None);
    second.exec().await.unwrap();
    assert_eq!(second.resolved_ttl(), 40);
    assert!(second.is_from_cache());
}

// =============================================================================
// Keys
// =============================================================================

/// Explicit literal keys take precedence over derivation: two different
/// queries sharing a literal key share an entry.
#[tokio::test]
async fn test_explicit_key_takes_precedence() {
    let (engine, _store, _source) = setup(6);

    let write = engine
        .find("people", json!({}))
        .cache_with(true, None, Some(CacheKey::from("shared")));
    assert_eq!(write.exec().await.unwrap().len(), 6);

    // a completely different query with the same literal key hits
    let read = engine
        .find("people", json!({"_id": "p0"}))
        .cache_with(true, None, Some(CacheKey::from("shared")));
    let records = read.exec().await.unwrap();
    assert!(read.is_from_cache());
    assert_eq!(records.len(), 6);
}

/// A process-wide key generator reroutes derivation.
#[tokio::test]
async fn test_config_key_generator_applies() {
    let store = Arc::new(MemoryStore::new());
    let source = Arc::new(MemorySource::new());
    generate_crowd(&source, 3);
    let engine = CacheEngine::new(
        store,
        source,
        CacheConfig::new().with_key_generator(|d| format!("all:{}", d.collection)),
    );

    engine.find("people", json!({})).cache().exec().await.unwrap();

    // different conditions, same generated key: served from cache
    let query = engine.find("people", json!({"_id": "p1"})).cache();
    assert_eq!(query.exec().await.unwrap().len(), 3);
    assert!(query.is_from_cache());
}

// =============================================================================
// Store failure handling
// =============================================================================

/// Any get error recovers as a miss on the non-streaming path; the result
/// still arrives and the set is attempted.
#[tokio::test]
async fn test_get_error_recovers_as_miss() {
    let broken = Arc::new(BrokenGetStore {
        inner: MemoryStore::new(),
    });
    let source = Arc::new(MemorySource::new());
    generate_crowd(&source, 5);
    let engine = CacheEngine::new(broken.clone(), source, CacheConfig::new());

    let query = engine.find("people", json!({})).cache();
    let records = query.exec().await.unwrap();
    assert_eq!(records.len(), 5);
    assert!(!query.is_from_cache());
    // the live result was stored despite the broken reads
    assert_eq!(broken.inner.len(), 1);
}

/// A set failure surfaces to the caller even though live data was
/// obtained.
#[tokio::test]
async fn test_set_failure_surfaces() {
    let broken = Arc::new(BrokenSetStore {
        inner: MemoryStore::new(),
    });
    let source = Arc::new(MemorySource::new());
    generate_crowd(&source, 5);
    let engine = CacheEngine::new(broken, source, CacheConfig::new());

    let err = engine
        .find("people", json!({}))
        .cache()
        .exec()
        .await
        .unwrap_err();
    assert!(err.is_store_write());
}

// =============================================================================
// geoNear
// =============================================================================

fn seed_places(source: &MemorySource) {
    source.insert_many(
        "places",
        vec![
            json!({"_id": "near", "location": {"type": "Point", "coordinates": [1.0, 0.0]}}),
            json!({"_id": "mid", "location": {"type": "Point", "coordinates": [3.0, 0.0]}}),
            json!({"_id": "far", "location": {"type": "Point", "coordinates": [9.0, 0.0]}}),
        ],
    );
}

/// geoNear round trip: miss stores, hit serves the same distance-ordered
/// rows.
#[tokio::test]
async fn test_geo_near_round_trip() {
    let store = Arc::new(MemoryStore::new());
    let source = Arc::new(MemorySource::new());
    seed_places(&source);
    let engine = engine_with(store.clone(), source);

    let query = GeoQuery::point("places", 0.0, 0.0);
    let first = engine
        .geo_near(&query, Some(GeoCache::default()))
        .await
        .unwrap();
    assert!(!first.is_from_cache());
    assert_eq!(store.len(), 1);

    let second = engine
        .geo_near(&query, Some(GeoCache::default()))
        .await
        .unwrap();
    assert!(second.is_from_cache());

    let ids = |outcome: &docucache::GeoNearOutcome| -> Vec<Value> {
        outcome
            .records
            .iter()
            .map(|r| r.record.body()["_id"].clone())
            .collect()
    };
    assert_eq!(ids(&first), ids(&second));
    assert_eq!(ids(&first), vec![json!("near"), json!("mid"), json!("far")]);
    let distances: Vec<f64> = second.records.iter().map(|r| r.distance).collect();
    assert_eq!(distances, vec![1.0, 3.0, 9.0]);
}

/// Without cache settings geoNear never touches the store.
#[tokio::test]
async fn test_geo_near_uncached_passthrough() {
    let store = Arc::new(MemoryStore::new());
    let source = Arc::new(MemorySource::new());
    seed_places(&source);
    let engine = engine_with(store.clone(), source);

    let outcome = engine
        .geo_near(&GeoQuery::point("places", 0.0, 0.0), None)
        .await
        .unwrap();
    assert!(!outcome.is_from_cache());
    assert_eq!(outcome.records.len(), 3);
    assert!(store.is_empty());
}

/// A geo get error serves live data and skips the set entirely.
#[tokio::test]
async fn test_geo_near_get_error_skips_set() {
    let broken = Arc::new(BrokenGetStore {
        inner: MemoryStore::new(),
    });
    let source = Arc::new(MemorySource::new());
    seed_places(&source);
    let engine = CacheEngine::new(broken.clone(), source, CacheConfig::new());

    let outcome = engine
        .geo_near(&GeoQuery::point("places", 0.0, 0.0), Some(GeoCache::default()))
        .await
        .unwrap();
    assert!(!outcome.is_from_cache());
    assert_eq!(outcome.records.len(), 3);
    assert!(broken.inner.is_empty());
}

/// An explicit geo key is honored.
#[tokio::test]
async fn test_geo_near_explicit_key() {
    let store = Arc::new(MemoryStore::new());
    let source = Arc::new(MemorySource::new());
    seed_places(&source);
    let engine = engine_with(store.clone(), source);

    let cache = GeoCache {
        ttl_secs: Some(30),
        key: Some("geo:places".into()),
    };
    engine
        .geo_near(&GeoQuery::point("places", 0.0, 0.0), Some(cache))
        .await
        .unwrap();
    assert!(store.contains("geo:places"));
}
