#![allow(dead_code)]

use mindcache::annotations::PageIdentity;
use mindcache::background::{Background, BackgroundHandle};
use mindcache::badge::MemoryBadgeSink;
use mindcache::config::MindCacheConfig;
use mindcache::storage::{MemoryStore, Storage};
use mindcache::tracking::types::{InteractionEvent, InteractionRecord, PageRef, VisitData};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

/// A running background over fresh in-memory storage.
pub struct TestBackground {
    pub handle: BackgroundHandle,
    pub storage: Storage,
    pub badge: Arc<MemoryBadgeSink>,
}

pub fn start_background() -> TestBackground {
    start_background_with(Storage::in_memory(), &MindCacheConfig::default())
}

pub fn start_background_with(storage: Storage, config: &MindCacheConfig) -> TestBackground {
    let badge = Arc::new(MemoryBadgeSink::default());
    let (handle, _task) = Background::spawn(storage.clone(), config, badge.clone()).unwrap();
    TestBackground {
        handle,
        storage,
        badge,
    }
}

/// Storage whose every read and write takes `latency_ms`.
pub fn slow_storage(latency_ms: u64) -> Storage {
    Storage::new(Arc::new(MemoryStore::with_latency(Duration::from_millis(
        latency_ms,
    ))))
}

pub fn visit(url: &str, timestamp: i64) -> InteractionRecord {
    InteractionRecord::new(
        InteractionEvent::PageVisit(VisitData {
            page: PageRef::new(url, "Test page"),
        }),
        timestamp,
    )
}

pub fn page(url: &str) -> PageIdentity {
    PageIdentity::new(url, "Test page").unwrap()
}

/// Serve `router` on an ephemeral local port.
pub async fn spawn_http(router: axum::Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

/// Poll `check` until it returns true or `timeout` elapses.
pub async fn eventually<F, Fut>(timeout: Duration, mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    false
}
