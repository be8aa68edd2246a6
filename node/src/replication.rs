// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Replication channel adapter.
//!
//! Bridges the kernel to the peer network: two broadcast topics carrying
//! JSON events (`create-event`, `update-event`) and the shared document
//! collection used for durability and startup sync.
//!
//! Inbound messages are decoded here and handed to the engine one at a time
//! per topic. Outbound mutations are persisted first, then published; the two
//! steps are retried independently and are not atomic.

use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;

use tokio::task::JoinHandle;
use witness_kernel::config::EVENT_TYPE;
use witness_kernel::{Event, Topic};

use crate::config::RetryConfig;
use crate::engine::EngineHandle;
use crate::errors::NodeError;
use crate::network::{PubSub, Subscription, TransportError};
use crate::persistence::DocumentStore;

pub struct ReplicationAdapter {
    pubsub: Arc<dyn PubSub>,
    store: Arc<dyn DocumentStore>,
    db_address: String,
    retry: RetryConfig,
}

impl ReplicationAdapter {
    pub fn new(
        pubsub: Arc<dyn PubSub>,
        store: Arc<dyn DocumentStore>,
        db_address: impl Into<String>,
        retry: RetryConfig,
    ) -> Self {
        Self {
            pubsub,
            store,
            db_address: db_address.into(),
            retry,
        }
    }

    pub fn db_address(&self) -> &str {
        &self.db_address
    }

    pub async fn subscribe(&self, topic: Topic) -> Result<Box<dyn Subscription>, NodeError> {
        with_retry(&self.retry, "subscribe", || self.pubsub.subscribe(topic.as_str()))
            .await
            .map_err(NodeError::Transport)
    }

    /// Reads every event document from the durable store.
    ///
    /// Documents that do not decode are logged and skipped.
    pub async fn bulk_sync(&self) -> Result<Vec<Event>, NodeError> {
        let documents = with_retry(&self.retry, "query", || {
            self.store.query(&self.db_address, "type", EVENT_TYPE)
        })
        .await
        .map_err(|e| NodeError::DurableStoreUnavailable(e.to_string()))?;

        let mut events = Vec::with_capacity(documents.len());
        for document in documents {
            match Event::from_value(document) {
                Ok(event) => events.push(event),
                Err(e) => {
                    tracing::warn!("Bulk sync: skipping undecodable document: {}", e);
                    metrics::increment_counter!("witness_malformed_messages_total", "topic" => "bulk-sync");
                }
            }
        }
        tracing::info!("Bulk sync read {} events from {}", events.len(), self.db_address);
        Ok(events)
    }

    /// Durable put, then publish on `topic`.
    pub async fn persist_and_publish(&self, topic: Topic, event: &Event) -> Result<(), NodeError> {
        let payload = event.to_json()?;

        with_retry(&self.retry, "put", || self.store.put(&self.db_address, &payload))
            .await
            .map_err(|e| NodeError::DurableStoreUnavailable(e.to_string()))?;

        with_retry(&self.retry, "publish", || self.pubsub.publish(topic.as_str(), payload.clone()))
            .await
            .map_err(|e| NodeError::PublishFailure {
                topic: topic.as_str(),
                reason: e.to_string(),
            })?;

        metrics::increment_counter!("witness_publications_total", "topic" => topic.as_str());
        tracing::debug!("Published event {} on {}", event.id, topic);
        Ok(())
    }

    /// Spawns the listen loop for one topic.
    ///
    /// Each message is fully applied before the next is read. The loop ends
    /// when the engine stops.
    pub fn spawn_listener(
        self: Arc<Self>,
        topic: Topic,
        mut subscription: Box<dyn Subscription>,
        engine: EngineHandle,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            tracing::info!("Listening on topic {}", topic);
            loop {
                let message = match subscription.next().await {
                    Ok(message) => message,
                    Err(TransportError::Lagged(missed)) => {
                        tracing::warn!("Subscriber of {} lagged, {} messages missed until next sync", topic, missed);
                        continue;
                    }
                    Err(e) => {
                        tracing::warn!("Subscription to {} failed: {}. Re-subscribing...", topic, e);
                        match self.subscribe(topic).await {
                            Ok(fresh) => subscription = fresh,
                            Err(e) => {
                                tracing::error!("Re-subscribe to {} failed: {}", topic, e);
                                tokio::time::sleep(self.retry.max_backoff).await;
                            }
                        }
                        continue;
                    }
                };

                tracing::debug!("Subscriber of topic {} received {} bytes", topic, message.data.len());
                metrics::increment_counter!("witness_inbound_messages_total", "topic" => topic.as_str());

                let event = match decode_message(topic, &message.data) {
                    Ok(event) => event,
                    Err(e) => {
                        tracing::warn!("{}", e);
                        metrics::increment_counter!("witness_malformed_messages_total", "topic" => topic.as_str());
                        continue;
                    }
                };

                match engine.apply_inbound(topic, event).await {
                    Ok(_) => {}
                    Err(NodeError::EngineStopped) => {
                        tracing::info!("Engine stopped, listener for {} exiting", topic);
                        return;
                    }
                    Err(e) => tracing::warn!("Discarded message on {}: {}", topic, e),
                }
            }
        })
    }
}

pub fn decode_message(topic: Topic, data: &[u8]) -> Result<Event, NodeError> {
    Event::from_json(data).map_err(|e| NodeError::MalformedReplicationMessage {
        topic: topic.as_str(),
        reason: e.to_string(),
    })
}

/// Runs `op` until it succeeds or `retry.max_attempts` is reached.
pub async fn with_retry<T, E, F, Fut>(retry: &RetryConfig, name: &'static str, mut op: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let mut attempt = 1;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < retry.max_attempts => {
                let delay = retry.backoff(attempt);
                tracing::warn!(
                    "{} failed (attempt {}/{}): {}. Retrying in {:?}",
                    name,
                    attempt,
                    retry.max_attempts,
                    e,
                    delay
                );
                metrics::increment_counter!("witness_retries_total", "op" => name);
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => {
                tracing::error!("{} failed after {} attempts: {}", name, attempt, e);
                return Err(e);
            }
        }
    }
}
