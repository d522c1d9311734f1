//! Streaming cache invariants
//!
//! - Miss buffers the live stream, stores it, and re-emits in order
//! - Hit replays the stored sequence element for element
//! - Backend read errors and write errors surface as stream errors
//! - Destroy stops emission cooperatively without an extra error

use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use serde_json::{json, Value};

use docucache::store::StoreFuture;
use docucache::{
    CacheConfig, CacheEngine, CacheStore, MemorySource, MemoryStore, Record, ReferencePath,
    StoreError,
};

// =============================================================================
// Helper Functions
// =============================================================================

fn seed_people(source: &MemorySource, amount: usize) {
    for i in 0..amount {
        let peer = if i == 0 { amount - 1 } else { i - 1 };
        source.insert(
            "people",
            json!({
                "_id": format!("p{i}"),
                "name": format!("person-{i}"),
                "peer": format!("p{peer}"),
            }),
        );
    }
}

fn setup(amount: usize) -> (CacheEngine, Arc<MemoryStore>, Arc<MemorySource>) {
    let store = Arc::new(MemoryStore::new());
    let source = Arc::new(MemorySource::new());
    seed_people(&source, amount);
    let engine = CacheEngine::new(store.clone(), source.clone(), CacheConfig::new());
    (engine, store, source)
}

async fn collect_bodies(stream: docucache::DocumentStream) -> Vec<Value> {
    stream
        .map(|item| item.expect("stream item").into_body())
        .collect()
        .await
}

struct BrokenGetStore;

impl CacheStore for BrokenGetStore {
    fn get(&self, _key: &str) -> StoreFuture<'_, Value> {
        Box::pin(async { Err(StoreError::Backend("connection refused".into())) })
    }

    fn set(&self, _key: &str, _value: Value, _ttl_secs: u64) -> StoreFuture<'_, ()> {
        Box::pin(async { Ok(()) })
    }
}

struct BrokenSetStore;

impl CacheStore for BrokenSetStore {
    fn get(&self, _key: &str) -> StoreFuture<'_, Value> {
        Box::pin(async { Err(StoreError::Miss) })
    }

    fn set(&self, _key: &str, _value: Value, _ttl_secs: u64) -> StoreFuture<'_, ()> {
        Box::pin(async { Err(StoreError::Backend("write refused".into())) })
    }
}

// =============================================================================
// Hit/miss sequences
// =============================================================================

/// Streaming the same query twice, miss then hit, yields equal sequences
/// in the same order, and the query flags track the outcome.
#[tokio::test]
async fn test_stream_miss_then_hit_equal_sequences() {
    let (engine, store, _source) = setup(10);

    let first = engine.find("people", json!({})).cache();
    let miss_stream = first.stream();
    let miss_bodies = collect_bodies(miss_stream).await;
    assert_eq!(miss_bodies.len(), 10);
    assert!(!first.is_from_cache());
    assert!(first.is_cache_enabled());
    assert_eq!(store.len(), 1);

    let second = engine.find("people", json!({})).cache();
    let hit_bodies = collect_bodies(second.stream()).await;
    assert!(second.is_from_cache());
    assert_eq!(miss_bodies, hit_bodies);

    // stored order is insertion order
    for (i, body) in hit_bodies.iter().enumerate() {
        assert_eq!(body["_id"], json!(format!("p{i}")));
    }
}

/// A cache-disabled stream passes through without touching the store.
#[tokio::test]
async fn test_stream_without_cache_is_passthrough() {
    let (engine, store, _source) = setup(5);

    let query = engine.find("people", json!({}));
    let bodies = collect_bodies(query.stream()).await;
    assert_eq!(bodies.len(), 5);
    assert!(!query.is_from_cache());
    assert!(store.is_empty());
}

/// Stream records hydrate like exec results do, tagged by origin.
#[tokio::test]
async fn test_stream_records_hydrate() {
    let (engine, _store, _source) = setup(3);

    engine.find("people", json!({})).cache().stream().count().await;

    let mut stream = engine.find("people", json!({})).cache().stream();
    while let Some(item) = stream.next().await {
        match item.unwrap() {
            Record::Document(doc) => assert!(doc.is_from_cache()),
            Record::Lean(_) => panic!("expected hydrated documents"),
        }
    }
}

/// Declared reference paths resolve on both the miss and hit passes.
#[tokio::test]
async fn test_stream_populates_on_both_paths() {
    let (engine, _store, _source) = setup(4);

    let build = || {
        engine
            .find("people", json!({}))
            .populate(ReferencePath::new("peer"))
            .cache()
    };

    let miss_bodies = collect_bodies(build().stream()).await;
    let hit_bodies = collect_bodies(build().stream()).await;
    assert_eq!(miss_bodies, hit_bodies);
    for (i, body) in hit_bodies.iter().enumerate() {
        let expected = if i == 0 { 3 } else { i - 1 };
        assert_eq!(body["peer"]["_id"], json!(format!("p{expected}")));
    }
}

// =============================================================================
// Stream errors
// =============================================================================

/// A non-miss backend error on the cache read surfaces as a stream error
/// (unlike the non-streaming path, which recovers it as a miss).
#[tokio::test]
async fn test_stream_backend_read_error_surfaces() {
    let source = Arc::new(MemorySource::new());
    seed_people(&source, 3);
    let engine = CacheEngine::new(Arc::new(BrokenGetStore), source, CacheConfig::new());

    let mut stream = engine.find("people", json!({})).cache().stream();
    let first = stream.next().await.expect("one event");
    assert!(matches!(
        first.unwrap_err(),
        docucache::EngineError::StoreRead(_)
    ));
    assert!(stream.next().await.is_none());
}

/// A store write failure after buffering surfaces as a stream error.
#[tokio::test]
async fn test_stream_write_error_surfaces() {
    let source = Arc::new(MemorySource::new());
    seed_people(&source, 3);
    let engine = CacheEngine::new(Arc::new(BrokenSetStore), source, CacheConfig::new());

    let mut stream = engine.find("people", json!({})).cache().stream();
    let first = stream.next().await.expect("one event");
    assert!(first.unwrap_err().is_store_write());
    assert!(stream.next().await.is_none());
}

// =============================================================================
// Cancellation
// =============================================================================

/// Destroying the stream before emission starts suppresses every event
/// without raising an error.
#[tokio::test]
async fn test_destroy_stops_emission() {
    let (engine, _store, _source) = setup(10);

    let stream = engine.find("people", json!({})).cache().stream();
    stream.destroy();
    assert!(stream.is_destroyed());

    // give the driver well past its deferred tick
    tokio::time::sleep(Duration::from_millis(100)).await;

    let events = stream.collect::<Vec<_>>().await;
    assert!(events.is_empty());
}
