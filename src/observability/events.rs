//! Observable pipeline events
//!
//! Every log line emitted by the pipeline carries one of these names in its
//! `event` field, so log consumers can match on a stable vocabulary.

use std::fmt;

/// Log severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// Normal operations
    Info,
    /// Recoverable issues
    Warn,
    /// Operation failures
    Error,
    /// The reporting component cannot continue safely
    Fatal,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "INFO",
            Severity::Warn => "WARN",
            Severity::Error => "ERROR",
            Severity::Fatal => "FATAL",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Observable events in the write pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Lifecycle
    /// Worker task started
    PipelineStart,
    /// Worker task returned
    PipelineStop,

    // Flush cycle
    /// Bulk submission finished and outcomes were applied
    FlushComplete,
    /// Bulk submission failed as a whole
    TransportFailed,

    // Per-record outcomes
    /// Sink rejected a single item
    ItemFailed,
    /// Failed record scheduled into the next batch
    RecordRetried,
    /// Record exhausted its retries and was discarded
    RecordDropped,

    // Inconsistencies
    /// Sink reported an id the worker never submitted
    UnknownId,
    /// Sink omitted an outcome for a submitted id
    MissingOutcome,
    /// Producer supplied an id that is already in flight
    DuplicateId,

    // Identity
    /// Could not stamp an incoming record
    IdGenerationFailed,
}

impl Event {
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::PipelineStart => "PIPELINE_START",
            Event::PipelineStop => "PIPELINE_STOP",
            Event::FlushComplete => "FLUSH_COMPLETE",
            Event::TransportFailed => "TRANSPORT_FAILED",
            Event::ItemFailed => "ITEM_FAILED",
            Event::RecordRetried => "RECORD_RETRIED",
            Event::RecordDropped => "RECORD_DROPPED",
            Event::UnknownId => "UNKNOWN_ID",
            Event::MissingOutcome => "MISSING_OUTCOME",
            Event::DuplicateId => "DUPLICATE_ID",
            Event::IdGenerationFailed => "ID_GENERATION_FAILED",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            Event::PipelineStart
            | Event::PipelineStop
            | Event::FlushComplete
            | Event::RecordRetried => Severity::Info,
            Event::ItemFailed | Event::DuplicateId => Severity::Warn,
            Event::TransportFailed
            | Event::RecordDropped
            | Event::UnknownId
            | Event::MissingOutcome => Severity::Error,
            Event::IdGenerationFailed => Severity::Fatal,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
