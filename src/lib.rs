//! snowbatch - batched bulk writes with snowflake identifiers
//!
//! - [`id`]: time-ordered 64-bit identifiers
//! - [`sink`]: bounded ingestion, size/timer flushing, per-item retry
//! - [`observability`]: logging events and pipeline counters
//! - [`cli`]: the `snowbatch` binary

pub mod cli;
pub mod id;
pub mod observability;
pub mod sink;
