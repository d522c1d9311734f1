//! Streaming execution with read-through caching
//!
//! Only find queries stream. A spawned task drives the protocol and feeds
//! a channel; emission always waits a short deferred tick first, so
//! consumers that obtain the stream and attach synchronously observe every
//! event. This is a scheduling contract, not an accident. The miss path buffers
//! the entire live stream, stores the raw buffer, then re-emits.

use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use futures_util::{Stream, StreamExt};
use serde_json::Value;
use tokio::sync::mpsc;

use crate::materialize::Record;
use crate::observability::{Logger, Severity};
use crate::query::QueryDescriptor;

use super::engine::CacheEngine;
use super::errors::{EngineError, EngineResult};
use super::query::QueryState;

/// Window for consumers to attach before the first event
const EMIT_DEFER: Duration = Duration::from_millis(3);

/// A stream of materialized records
///
/// Ends when the channel closes; errors arrive as stream items.
/// `destroy` is cooperative: the driving task checks the flag before each
/// buffered item and stops emitting once set, raising no extra error.
pub struct DocumentStream {
    rx: mpsc::Receiver<EngineResult<Record>>,
    destroyed: Arc<AtomicBool>,
}

impl DocumentStream {
    /// Stop emission after the current item
    pub fn destroy(&self) {
        self.destroyed.store(true, Ordering::SeqCst);
    }

    /// Whether the stream was destroyed
    pub fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::SeqCst)
    }
}

impl Stream for DocumentStream {
    type Item = EngineResult<Record>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

pub(crate) fn spawn_stream(
    engine: CacheEngine,
    descriptor: QueryDescriptor,
    state: Arc<QueryState>,
) -> DocumentStream {
    let (tx, rx) = mpsc::channel(32);
    let destroyed = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&destroyed);
    tokio::spawn(async move {
        run(engine, descriptor, state, tx, flag).await;
    });
    DocumentStream { rx, destroyed }
}

async fn run(
    engine: CacheEngine,
    descriptor: QueryDescriptor,
    state: Arc<QueryState>,
    tx: mpsc::Sender<EngineResult<Record>>,
    destroyed: Arc<AtomicBool>,
) {
    let (enabled, ttl) = engine.resolve_directive(&descriptor);
    state.set_cache_enabled(enabled);

    if !enabled || !descriptor.operation.streams() {
        state.set_from_cache(false);
        passthrough(&engine, &descriptor, &tx, &destroyed).await;
        return;
    }

    let key = engine.resolve_key(&descriptor);
    match engine.store().get(&key).await {
        Ok(value) if !value.is_null() => {
            state.set_from_cache(true);
            engine.metrics().record_stream_hit();
            let rows = match value {
                Value::Array(rows) => rows,
                other => vec![other],
            };
            defer().await;
            emit_rows(&engine, &descriptor, rows, true, &tx, &destroyed).await;
        }
        Err(err) if !err.is_miss() => {
            // real backend failures surface on the stream, unlike the
            // non-streaming path where every get error is just a miss
            state.set_from_cache(false);
            Logger::log(
                Severity::Warn,
                "stream_cache_read_failed",
                &[("error", &err.to_string())],
            );
            defer().await;
            let _ = tx.send(Err(EngineError::StoreRead(err))).await;
        }
        _ => {
            // miss, including a cached null
            state.set_from_cache(false);
            engine.metrics().record_stream_miss();
            let mut live = engine.source().stream(&descriptor);
            let mut buffer: Vec<Value> = Vec::new();
            while let Some(item) = live.next().await {
                match item {
                    Ok(row) => buffer.push(row),
                    Err(err) => {
                        defer().await;
                        let _ = tx.send(Err(EngineError::Source(err))).await;
                        return;
                    }
                }
            }

            match engine
                .store()
                .set(&key, Value::Array(buffer.clone()), ttl)
                .await
            {
                Ok(()) => engine.metrics().record_write(),
                Err(err) => {
                    engine.metrics().record_write_failure();
                    defer().await;
                    let _ = tx.send(Err(EngineError::StoreWrite(err))).await;
                    return;
                }
            }

            defer().await;
            emit_rows(&engine, &descriptor, buffer, false, &tx, &destroyed).await;
        }
    }
}

/// Emit rows one by one, honoring the destroy flag between items
async fn emit_rows(
    engine: &CacheEngine,
    descriptor: &QueryDescriptor,
    rows: Vec<Value>,
    from_cache: bool,
    tx: &mpsc::Sender<EngineResult<Record>>,
    destroyed: &AtomicBool,
) {
    for row in rows {
        if destroyed.load(Ordering::SeqCst) {
            return;
        }
        match engine.materialize_row(descriptor, row, from_cache).await {
            Ok(record) => {
                if tx.send(Ok(record)).await.is_err() {
                    return;
                }
            }
            Err(err) => {
                let _ = tx.send(Err(err)).await;
                return;
            }
        }
    }
}

/// Cache-disabled path: forward the live stream without buffering
async fn passthrough(
    engine: &CacheEngine,
    descriptor: &QueryDescriptor,
    tx: &mpsc::Sender<EngineResult<Record>>,
    destroyed: &AtomicBool,
) {
    let mut live = engine.source().stream(descriptor);
    while let Some(item) = live.next().await {
        if destroyed.load(Ordering::SeqCst) {
            return;
        }
        match item {
            Ok(row) => match engine.materialize_row(descriptor, row, false).await {
                Ok(record) => {
                    if tx.send(Ok(record)).await.is_err() {
                        return;
                    }
                }
                Err(err) => {
                    let _ = tx.send(Err(err)).await;
                    return;
                }
            },
            Err(err) => {
                let _ = tx.send(Err(err.into())).await;
                return;
            }
        }
    }
}

async fn defer() {
    tokio::time::sleep(EMIT_DEFER).await;
}
