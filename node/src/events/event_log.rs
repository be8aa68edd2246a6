// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Append-Only Document Log
//!
//! File-backed [`DocumentStore`]. Every `put` appends one JSON line and is
//! fsync'd before it returns; on open the file is replayed and the last line
//! per `(address, _id)` wins. Nothing is ever truncated or rewritten.
//!
//! # File Format
//! ```text
//! {"address":"/orbitdb/.../event","document":{"_id":"1",...}}
//! {"address":"/orbitdb/.../event","document":{"_id":"1",...}}
//! ```
//!
//! A torn final line (crash mid-write) is cut off on open. Any other line that
//! does not parse is skipped.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::persistence::{document_key, select, Collections, DocumentStore, Result};

#[derive(Serialize, Deserialize)]
struct LogLine {
    address: String,
    document: Value,
}

struct Inner {
    file: File,
    collections: Collections,
    line_count: u64,
}

pub struct DocumentLog {
    path: PathBuf,
    inner: Mutex<Inner>,
}

impl DocumentLog {
    /// Open or create a document log, replaying any existing content.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let mut collections = Collections::new();
        let mut line_count = 0;

        if tokio::fs::try_exists(&path).await? {
            let content = tokio::fs::read(&path).await?;

            // Bytes after the last newline were never acknowledged. Drop them
            // so the next append starts on a clean line.
            let complete = content.iter().rposition(|&b| b == b'\n').map_or(0, |i| i + 1);
            for (n, line) in content[..complete].split(|&b| b == b'\n').enumerate() {
                if line.iter().all(u8::is_ascii_whitespace) {
                    continue;
                }
                match parse_line(line) {
                    Ok((key, entry)) => {
                        collections.entry(entry.address).or_default().insert(key, entry.document);
                        line_count += 1;
                    }
                    Err(e) => {
                        tracing::warn!("Document log {:?}: skipping line {}: {}", path, n + 1, e);
                    }
                }
            }
            if complete < content.len() {
                tracing::warn!(
                    "Document log {:?}: discarding {} bytes of torn tail",
                    path,
                    content.len() - complete
                );
                let file = OpenOptions::new().write(true).open(&path).await?;
                file.set_len(complete as u64).await?;
                file.sync_all().await?;
            }
            tracing::info!("Document log replayed {} entries from {:?}", line_count, path);
        }

        let file = OpenOptions::new().create(true).append(true).open(&path).await?;

        Ok(Self {
            path,
            inner: Mutex::new(Inner { file, collections, line_count }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Lines successfully written or replayed.
    pub async fn line_count(&self) -> u64 {
        self.inner.lock().await.line_count
    }
}

fn parse_line(line: &[u8]) -> Result<(String, LogLine)> {
    let entry: LogLine = serde_json::from_slice(line)?;
    Ok((document_key(&entry.document)?, entry))
}

#[async_trait]
impl DocumentStore for DocumentLog {
    async fn put(&self, address: &str, document: &[u8]) -> Result<()> {
        let document: Value = serde_json::from_slice(document)?;
        let key = document_key(&document)?;
        let entry = LogLine { address: address.to_string(), document };
        let mut line = serde_json::to_vec(&entry)?;
        line.push(b'\n');

        let mut inner = self.inner.lock().await;
        inner.file.write_all(&line).await?;
        inner.file.flush().await?;
        inner.file.sync_data().await?;

        inner.collections.entry(entry.address).or_default().insert(key, entry.document);
        inner.line_count += 1;
        Ok(())
    }

    async fn query(&self, address: &str, field: &str, value: &str) -> Result<Vec<Value>> {
        let inner = self.inner.lock().await;
        Ok(select(&inner.collections, address, field, value))
    }
}
