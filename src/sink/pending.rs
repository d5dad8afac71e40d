//! Records awaiting confirmation from the sink
//!
//! Owned by the worker alone; no locking.

use std::collections::HashMap;

use serde_json::Value;

use crate::id::Identifier;

use super::record::BulkItem;

/// A submitted record that is neither confirmed nor dropped yet.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingRecord {
    pub id: Identifier,
    pub collection: String,
    pub document: Value,
    /// Failed attempts that were followed by a retry
    pub retry_count: u32,
}

impl PendingRecord {
    pub fn new(id: Identifier, collection: String, document: Value) -> Self {
        Self {
            id,
            collection,
            document,
            retry_count: 0,
        }
    }

    /// Rebuilds the bulk item for a retry.
    pub fn to_item(&self) -> BulkItem {
        BulkItem {
            id: self.id,
            collection: self.collection.clone(),
            document: self.document.clone(),
        }
    }
}

/// What to do with a record after a failed attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Requeue; carries the new retry count
    Retry(u32),
    /// Budget exhausted; carries the retries already made
    Drop(u32),
}

/// In-flight records keyed by identifier
#[derive(Debug, Default)]
pub struct PendingSet {
    records: HashMap<Identifier, PendingRecord>,
}

impl PendingSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, record: PendingRecord) {
        self.records.insert(record.id, record);
    }

    pub fn contains(&self, id: Identifier) -> bool {
        self.records.contains_key(&id)
    }

    pub fn get(&self, id: Identifier) -> Option<&PendingRecord> {
        self.records.get(&id)
    }

    /// Removes a confirmed or dropped record.
    pub fn remove(&mut self, id: Identifier) -> Option<PendingRecord> {
        self.records.remove(&id)
    }

    /// Applies one failed attempt to `id`.
    ///
    /// A record with `retry_count >= retry_limit` is removed and reported as
    /// [`RetryDecision::Drop`]; otherwise its count is bumped. `None` if the
    /// id is not pending.
    pub fn record_failure(&mut self, id: Identifier, retry_limit: u32) -> Option<RetryDecision> {
        let record = self.records.get_mut(&id)?;
        if record.retry_count >= retry_limit {
            let retries = record.retry_count;
            self.records.remove(&id);
            return Some(RetryDecision::Drop(retries));
        }
        record.retry_count += 1;
        Some(RetryDecision::Retry(record.retry_count))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
