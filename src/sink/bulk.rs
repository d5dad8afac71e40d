//! Bulk sink capability
//!
//! The external write target. One call submits a whole batch and returns one
//! outcome per submitted item, or a [`TransportError`] when no per-item
//! result can be trusted.
//!
//! There is no timeout around `submit`: a hung call stalls the worker's
//! flushing (ingestion keeps buffering up to channel capacity). Implementations
//! that need bounded latency must enforce it themselves.

use futures_util::future::BoxFuture;

use super::errors::TransportError;
use super::record::{BulkItem, ItemOutcome};

/// Result of one bulk submission
pub type BulkResult = Result<Vec<ItemOutcome>, TransportError>;

/// A bulk-oriented write target.
///
/// On `Ok`, every submitted id must appear exactly once in the outcomes.
pub trait BulkSink: Send + Sync {
    /// Submits `items` in one request.
    fn submit<'a>(&'a self, items: &'a [BulkItem]) -> BoxFuture<'a, BulkResult>;
}
