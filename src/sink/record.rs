//! Records and bulk items
//!
//! A [`Record`] is what producers submit. Once stamped with an identifier it
//! travels to the bulk sink as a [`BulkItem`], and comes back as an
//! [`ItemOutcome`].

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::id::Identifier;

/// A document addressed to a collection, as submitted by a producer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Target collection (index, table, bucket...)
    pub collection: String,

    /// Opaque document body
    pub document: Value,

    /// Caller-supplied identifier; one is issued when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Identifier>,
}

impl Record {
    pub fn new(collection: impl Into<String>, document: Value) -> Self {
        Self {
            collection: collection.into(),
            document,
            id: None,
        }
    }

    /// Pins the record to an identifier chosen by the caller.
    pub fn with_id(mut self, id: Identifier) -> Self {
        self.id = Some(id);
        self
    }
}

/// One entry of a bulk submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulkItem {
    pub id: Identifier,
    pub collection: String,
    pub document: Value,
}

/// Why the sink rejected an item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemError {
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caused_by: Option<String>,
}

impl ItemError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            caused_by: None,
        }
    }

    pub fn caused_by(mut self, cause: impl Into<String>) -> Self {
        self.caused_by = Some(cause.into());
        self
    }
}

/// Result of one item in a bulk submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemOutcome {
    pub id: Identifier,
    pub collection: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ItemError>,
}

impl ItemOutcome {
    pub fn succeeded(item: &BulkItem) -> Self {
        Self {
            id: item.id,
            collection: item.collection.clone(),
            success: true,
            error: None,
        }
    }

    pub fn failed(item: &BulkItem, error: ItemError) -> Self {
        Self {
            id: item.id,
            collection: item.collection.clone(),
            success: false,
            error: Some(error),
        }
    }
}
