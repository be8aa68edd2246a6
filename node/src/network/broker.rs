// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::broadcast;

use super::{Message, PubSub, Subscription, TransportError};

const TOPIC_CAPACITY: usize = 1024;

/// In-process pub/sub. Every subscriber of a topic, the publisher included,
/// receives each message once.
#[derive(Clone, Default)]
pub struct LocalBroker {
    topics: Arc<Mutex<HashMap<String, broadcast::Sender<Vec<u8>>>>>,
}

impl LocalBroker {
    pub fn new() -> Self {
        Self::default()
    }

    fn sender(&self, topic: &str) -> Result<broadcast::Sender<Vec<u8>>, TransportError> {
        let mut topics = self
            .topics
            .lock()
            .map_err(|_| TransportError::Unavailable("broker lock poisoned".into()))?;
        let sender = topics
            .entry(topic.to_string())
            .or_insert_with(|| broadcast::channel(TOPIC_CAPACITY).0);
        Ok(sender.clone())
    }

    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.sender(topic).map(|s| s.receiver_count()).unwrap_or(0)
    }
}

#[async_trait]
impl PubSub for LocalBroker {
    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), TransportError> {
        // No subscribers is not an error: nobody was listening.
        let _ = self.sender(topic)?.send(payload);
        Ok(())
    }

    async fn subscribe(&self, topic: &str) -> Result<Box<dyn Subscription>, TransportError> {
        let rx = self.sender(topic)?.subscribe();
        Ok(Box::new(BrokerSubscription { topic: topic.to_string(), rx }))
    }
}

struct BrokerSubscription {
    topic: String,
    rx: broadcast::Receiver<Vec<u8>>,
}

#[async_trait]
impl Subscription for BrokerSubscription {
    async fn next(&mut self) -> Result<Message, TransportError> {
        match self.rx.recv().await {
            Ok(data) => Ok(Message { topic: self.topic.clone(), data }),
            Err(broadcast::error::RecvError::Lagged(n)) => Err(TransportError::Lagged(n)),
            Err(broadcast::error::RecvError::Closed) => Err(TransportError::Closed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fan_out_to_all_subscribers() {
        let broker = LocalBroker::new();
        let mut a = broker.subscribe("create-event").await.unwrap();
        let mut b = broker.subscribe("create-event").await.unwrap();
        let mut other = broker.subscribe("update-event").await.unwrap();

        broker.publish("create-event", b"hello".to_vec()).await.unwrap();

        assert_eq!(a.next().await.unwrap().data, b"hello");
        assert_eq!(b.next().await.unwrap().data, b"hello");

        broker.publish("update-event", b"u".to_vec()).await.unwrap();
        let msg = other.next().await.unwrap();
        assert_eq!(msg.topic, "update-event");
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_succeeds() {
        let broker = LocalBroker::new();
        assert!(broker.publish("create-event", vec![1]).await.is_ok());
        assert_eq!(broker.subscriber_count("create-event"), 0);
    }
}
