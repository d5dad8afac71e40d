//! JSON-lines file sink
//!
//! Appends one line per accepted item:
//! `{"id":..,"collection":..,"document":..}`. Each request is appended with a
//! single write; a failed write or sync truncates the file back to its length
//! before the request and fails the whole request. Items with an empty
//! collection name are rejected individually, as can a configurable random
//! share of items.

use std::path::{Path, PathBuf};

use futures_util::future::BoxFuture;
use serde::Serialize;
use serde_json::Value;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::id::Identifier;

use super::bulk::{BulkResult, BulkSink};
use super::errors::TransportError;
use super::record::{BulkItem, ItemError, ItemOutcome};

#[derive(Serialize)]
struct Line<'a> {
    id: Identifier,
    collection: &'a str,
    document: &'a Value,
}

#[derive(Debug)]
pub struct JsonLinesSink {
    path: PathBuf,
    file: Mutex<File>,
    fail_rate: f64,
}

impl JsonLinesSink {
    /// Opens or creates `path` for appending.
    pub async fn open(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;

        Ok(Self {
            path,
            file: Mutex::new(file),
            fail_rate: 0.0,
        })
    }

    /// Rejects roughly `rate` (0.0-1.0) of items with a simulated error.
    pub fn with_fail_rate(mut self, rate: f64) -> Self {
        self.fail_rate = rate.clamp(0.0, 1.0);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn judge(&self, item: &BulkItem) -> Option<ItemError> {
        if item.collection.is_empty() {
            return Some(ItemError::new("invalid_collection").caused_by("empty collection name"));
        }
        if self.fail_rate > 0.0 && rand::random::<f64>() < self.fail_rate {
            return Some(ItemError::new("simulated_failure").caused_by("fail rate"));
        }
        None
    }

    async fn write(&self, items: &[BulkItem]) -> BulkResult {
        let mut buffer = Vec::new();
        let mut outcomes = Vec::with_capacity(items.len());

        for item in items {
            if let Some(error) = self.judge(item) {
                outcomes.push(ItemOutcome::failed(item, error));
                continue;
            }
            let line = Line {
                id: item.id,
                collection: &item.collection,
                document: &item.document,
            };
            match serde_json::to_writer(&mut buffer, &line) {
                Ok(()) => {
                    buffer.push(b'\n');
                    outcomes.push(ItemOutcome::succeeded(item));
                }
                Err(e) => outcomes.push(ItemOutcome::failed(
                    item,
                    ItemError::new("serialization_failed").caused_by(e.to_string()),
                )),
            }
        }

        if buffer.is_empty() {
            return Ok(outcomes);
        }

        let mut file = self.file.lock().await;
        let start = file
            .metadata()
            .await
            .map_err(|e| TransportError::with_source("stat of output file failed", e))?
            .len();

        if let Err(e) = append(&mut file, &buffer).await {
            // Leave no torn line behind for the retry to append after.
            if let Err(truncate) = file.set_len(start).await {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %truncate,
                    "cannot truncate output file after failed append"
                );
            }
            return Err(TransportError::with_source("append to output file failed", e));
        }

        Ok(outcomes)
    }
}

async fn append(file: &mut File, buffer: &[u8]) -> std::io::Result<()> {
    file.write_all(buffer).await?;
    file.flush().await?;
    file.sync_data().await
}

impl BulkSink for JsonLinesSink {
    fn submit<'a>(&'a self, items: &'a [BulkItem]) -> BoxFuture<'a, BulkResult> {
        Box::pin(self.write(items))
    }
}
