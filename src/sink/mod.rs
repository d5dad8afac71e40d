//! Batched write pipeline
//!
//! ```text
//! producers -> bounded channel -> worker -> batch -> bulk sink
//!                                   ^                   |
//!                                   +--- retry/evict ---+
//! ```
//!
//! # Behaviour
//!
//! - Records without an id are stamped from the injected [`IdSource`]
//! - A batch flushes when it reaches `batch_size`, and on a fixed timer
//! - Failed items are retried up to `retry_limit` times, then dropped
//! - A failed bulk call counts one failed attempt for each of its records
//! - Every recovered failure reaches the failure callback; none stop the worker
//!
//! [`IdSource`]: crate::id::IdSource

mod batch;
mod bulk;
mod config;
mod errors;
mod jsonl;
mod memory;
mod pending;
mod pipeline;
mod record;
mod worker;

pub use batch::Batch;
pub use bulk::{BulkResult, BulkSink};
pub use config::{
    PipelineConfig, DEFAULT_BATCH_SIZE, DEFAULT_CHANNEL_CAPACITY, DEFAULT_FLUSH_INTERVAL_SECS,
    MAX_FLUSH_INTERVAL_SECS,
};
pub use errors::{PipelineError, SinkError, SinkResult, TransportError};
pub use jsonl::JsonLinesSink;
pub use memory::{ItemPolicy, MemorySink, ResponseHook};
pub use pending::{PendingRecord, PendingSet, RetryDecision};
pub use pipeline::{BatchedSink, BatchedSinkBuilder, SinkHandle};
pub use record::{BulkItem, ItemError, ItemOutcome, Record};
pub use worker::{ErrorCallback, StopSummary};
