// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Peer network seams.
//!
//! The node only needs three things from the peer network: its own peer id,
//! topic publish, and topic subscribe. Real substrates implement these traits;
//! [`LocalBroker`] wires several peers together inside one process.

pub mod broker;

use async_trait::async_trait;
use thiserror::Error;

pub use broker::LocalBroker;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("subscription lagged, {0} messages dropped")]
    Lagged(u64),
    #[error("subscription closed")]
    Closed,
    #[error("peer network unavailable: {0}")]
    Unavailable(String),
}

/// A message received on a topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub topic: String,
    pub data: Vec<u8>,
}

#[async_trait]
pub trait PubSub: Send + Sync {
    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), TransportError>;
    async fn subscribe(&self, topic: &str) -> Result<Box<dyn Subscription>, TransportError>;
}

#[async_trait]
pub trait Subscription: Send {
    /// Waits for the next message. Blocks until one arrives.
    async fn next(&mut self) -> Result<Message, TransportError>;
}

#[async_trait]
pub trait PeerIdentity: Send + Sync {
    async fn peer_id(&self) -> Result<String, TransportError>;
}

/// Fixed peer id, for processes that already know who they are.
#[derive(Debug, Clone)]
pub struct StaticPeerIdentity(pub String);

#[async_trait]
impl PeerIdentity for StaticPeerIdentity {
    async fn peer_id(&self) -> Result<String, TransportError> {
        if self.0.is_empty() {
            return Err(TransportError::Unavailable("no peer id configured".into()));
        }
        Ok(self.0.clone())
    }
}
