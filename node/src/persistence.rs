// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Durable document store seam.
//!
//! Documents are JSON objects keyed by their own `_id` field and grouped
//! under a logical collection address. `put` upserts, `query` returns every
//! document of a collection whose `field` equals `value`.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::RwLock;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Document has no string \"_id\" field")]
    MissingKey,
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn put(&self, address: &str, document: &[u8]) -> Result<()>;
    async fn query(&self, address: &str, field: &str, value: &str) -> Result<Vec<Value>>;
}

/// address -> (_id -> document)
pub(crate) type Collections = HashMap<String, BTreeMap<String, Value>>;

pub(crate) fn document_key(document: &Value) -> Result<String> {
    document
        .get("_id")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or(StoreError::MissingKey)
}

pub(crate) fn select(collections: &Collections, address: &str, field: &str, value: &str) -> Vec<Value> {
    collections
        .get(address)
        .map(|docs| {
            docs.values()
                .filter(|doc| doc.get(field).and_then(Value::as_str) == Some(value))
                .cloned()
                .collect()
        })
        .unwrap_or_default()
}

/// Volatile store; clones share the same documents.
#[derive(Clone, Default)]
pub struct MemoryDocumentStore {
    collections: Arc<RwLock<Collections>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self, address: &str) -> usize {
        self.collections.read().await.get(address).map(BTreeMap::len).unwrap_or(0)
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn put(&self, address: &str, document: &[u8]) -> Result<()> {
        let document: Value = serde_json::from_slice(document)?;
        let key = document_key(&document)?;
        self.collections
            .write()
            .await
            .entry(address.to_string())
            .or_default()
            .insert(key, document);
        Ok(())
    }

    async fn query(&self, address: &str, field: &str, value: &str) -> Result<Vec<Value>> {
        Ok(select(&*self.collections.read().await, address, field, value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const ADDR: &str = "/orbitdb/test/event";

    #[tokio::test]
    async fn test_put_upserts_by_id() {
        let store = MemoryDocumentStore::new();
        store.put(ADDR, br#"{"_id":"1","type":"event","title":"a"}"#).await.unwrap();
        store.put(ADDR, br#"{"_id":"1","type":"event","title":"b"}"#).await.unwrap();
        store.put(ADDR, br#"{"_id":"2","type":"other"}"#).await.unwrap();

        assert_eq!(store.len(ADDR).await, 2);
        let events = store.query(ADDR, "type", "event").await.unwrap();
        assert_eq!(events, vec![json!({"_id":"1","type":"event","title":"b"})]);
    }

    #[tokio::test]
    async fn test_put_requires_key() {
        let store = MemoryDocumentStore::new();
        let err = store.put(ADDR, br#"{"type":"event"}"#).await.unwrap_err();
        assert!(matches!(err, StoreError::MissingKey));
        assert!(matches!(store.put(ADDR, b"not json").await, Err(StoreError::Serialization(_))));
    }

    #[tokio::test]
    async fn test_query_unknown_address_is_empty() {
        let store = MemoryDocumentStore::new();
        assert!(store.query("/nowhere", "type", "event").await.unwrap().is_empty());
    }
}
