// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
#![allow(dead_code)]

use std::future::Future;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use witness_node::config::{NodeConfig, RetryConfig};
use witness_node::network::{LocalBroker, PubSub, StaticPeerIdentity, Subscription, TransportError};
use witness_node::persistence::{DocumentStore, MemoryDocumentStore, Result as StoreResult, StoreError};
use witness_node::Peer;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_env_filter("witness_node=debug").try_init();
}

pub fn test_config() -> NodeConfig {
    NodeConfig {
        retry: RetryConfig {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(5),
        },
        ..Default::default()
    }
}

pub async fn start_peer(peer_id: &str, broker: &LocalBroker, store: &MemoryDocumentStore) -> Peer {
    Peer::start(
        test_config(),
        Arc::new(StaticPeerIdentity(peer_id.to_string())),
        Arc::new(broker.clone()),
        Arc::new(store.clone()),
    )
    .await
    .expect("peer should start")
}

/// Polls `check` until it returns true or two seconds pass.
pub async fn eventually<F, Fut>(what: &str, mut check: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    loop {
        if check().await {
            return;
        }
        if tokio::time::Instant::now() >= deadline {
            panic!("timed out waiting for: {what}");
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// Store whose every call fails.
pub struct DownStore {
    pub calls: AtomicU32,
}

impl DownStore {
    pub fn new() -> Self {
        Self { calls: AtomicU32::new(0) }
    }
}

#[async_trait]
impl DocumentStore for DownStore {
    async fn put(&self, _address: &str, _document: &[u8]) -> StoreResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(StoreError::Unavailable("connection refused".into()))
    }

    async fn query(&self, _address: &str, _field: &str, _value: &str) -> StoreResult<Vec<Value>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(StoreError::Unavailable("connection refused".into()))
    }
}

/// Subscribes through the broker but refuses to publish.
pub struct MutePubSub {
    pub broker: LocalBroker,
}

#[async_trait]
impl PubSub for MutePubSub {
    async fn publish(&self, _topic: &str, _payload: Vec<u8>) -> std::result::Result<(), TransportError> {
        Err(TransportError::Unavailable("no peers reachable".into()))
    }

    async fn subscribe(&self, topic: &str) -> std::result::Result<Box<dyn Subscription>, TransportError> {
        self.broker.subscribe(topic).await
    }
}

/// Memory store whose `put` number `fail_on` (1-based) fails once.
pub struct FlakyStore {
    pub inner: MemoryDocumentStore,
    pub fail_on: u32,
    pub puts: AtomicU32,
}

impl FlakyStore {
    pub fn new(inner: MemoryDocumentStore, fail_on: u32) -> Self {
        Self { inner, fail_on, puts: AtomicU32::new(0) }
    }
}

#[async_trait]
impl DocumentStore for FlakyStore {
    async fn put(&self, address: &str, document: &[u8]) -> StoreResult<()> {
        let n = self.puts.fetch_add(1, Ordering::SeqCst) + 1;
        if n == self.fail_on {
            return Err(StoreError::Unavailable("write timed out".into()));
        }
        self.inner.put(address, document).await
    }

    async fn query(&self, address: &str, field: &str, value: &str) -> StoreResult<Vec<Value>> {
        self.inner.query(address, field, value).await
    }
}

/// Reads succeed, writes always fail.
pub struct ReadOnlyStore {
    pub inner: MemoryDocumentStore,
    pub puts: AtomicU32,
}

#[async_trait]
impl DocumentStore for ReadOnlyStore {
    async fn put(&self, _address: &str, _document: &[u8]) -> StoreResult<()> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        Err(StoreError::Unavailable("disk full".into()))
    }

    async fn query(&self, address: &str, field: &str, value: &str) -> StoreResult<Vec<Value>> {
        self.inner.query(address, field, value).await
    }
}
