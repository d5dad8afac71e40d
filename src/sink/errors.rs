//! Batched sink error types
//!
//! Two families:
//! - [`SinkError`] is returned to callers (construction, submission, stop).
//! - [`PipelineError`] is never returned; the worker hands it to the failure
//!   callback and keeps running.
//!
//! [`TransportError`] is produced by bulk sink implementations.

use thiserror::Error;

use crate::id::{IdError, Identifier};
use crate::observability::{Event, Severity};

/// Result type for batched sink operations
pub type SinkResult<T> = Result<T, SinkError>;

/// Errors surfaced to the owner of a batched sink
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SinkError {
    /// Builder was started without a required collaborator
    #[error("missing required collaborator: {0}")]
    MissingCollaborator(&'static str),

    /// Configuration rejected before start
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Builder was started outside a tokio runtime
    #[error("batched sink must be started inside a tokio runtime")]
    NoRuntime,

    /// Worker has stopped; no more records are accepted
    #[error("batched sink is closed")]
    Closed,

    /// Ingestion channel at capacity (non-blocking submit only)
    #[error("ingestion channel is full")]
    Full,

    /// Worker task panicked
    #[error("worker task failed: {0}")]
    WorkerPanicked(String),
}

impl SinkError {
    pub fn code(&self) -> &'static str {
        match self {
            SinkError::MissingCollaborator(_) => "SNOW_SINK_MISSING_COLLABORATOR",
            SinkError::InvalidConfig(_) => "SNOW_SINK_INVALID_CONFIG",
            SinkError::NoRuntime => "SNOW_SINK_NO_RUNTIME",
            SinkError::Closed => "SNOW_SINK_CLOSED",
            SinkError::Full => "SNOW_SINK_FULL",
            SinkError::WorkerPanicked(_) => "SNOW_SINK_WORKER_PANICKED",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            SinkError::Full => Severity::Warn,
            SinkError::WorkerPanicked(_) => Severity::Fatal,
            _ => Severity::Error,
        }
    }
}

/// A bulk submission that failed as a whole. No per-item outcome exists.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct TransportError {
    message: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Recovered failures reported through the failure callback
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipelineError {
    /// Bulk call failed; every record of the batch is retried or dropped
    #[error("bulk request of {items} items failed: {message}")]
    Transport { items: usize, message: String },

    /// Sink rejected one record
    #[error(
        "insert {id} into {collection} failed, reason: {reason}, caused by: {}",
        .caused_by.as_deref().unwrap_or("unknown")
    )]
    ItemFailed {
        id: Identifier,
        collection: String,
        reason: String,
        caused_by: Option<String>,
    },

    /// Record exhausted its retry budget and was discarded
    #[error("record {id} for {collection} failed {retries} times, dropped")]
    Dropped {
        id: Identifier,
        collection: String,
        retries: u32,
    },

    /// Sink reported a failure for an id the worker is not tracking
    #[error("record {id} failed with data missing")]
    UnknownId { id: Identifier },

    /// Sink response lacked an outcome for a submitted id
    #[error("bulk response has no outcome for record {id}")]
    MissingOutcome { id: Identifier },

    /// Producer-supplied id is already in flight
    #[error("record {id} for {collection} rejected, id already in flight")]
    DuplicateId { id: Identifier, collection: String },

    /// No identifier could be issued for an incoming record
    #[error("cannot stamp record for {collection}: {source}")]
    IdGeneration {
        collection: String,
        #[source]
        source: IdError,
    },
}

impl PipelineError {
    /// The event this report is logged under
    pub fn event(&self) -> Event {
        match self {
            PipelineError::Transport { .. } => Event::TransportFailed,
            PipelineError::ItemFailed { .. } => Event::ItemFailed,
            PipelineError::Dropped { .. } => Event::RecordDropped,
            PipelineError::UnknownId { .. } => Event::UnknownId,
            PipelineError::MissingOutcome { .. } => Event::MissingOutcome,
            PipelineError::DuplicateId { .. } => Event::DuplicateId,
            PipelineError::IdGeneration { .. } => Event::IdGenerationFailed,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            PipelineError::Transport { .. } => "SNOW_PIPELINE_TRANSPORT",
            PipelineError::ItemFailed { .. } => "SNOW_PIPELINE_ITEM_FAILED",
            PipelineError::Dropped { .. } => "SNOW_PIPELINE_DROPPED",
            PipelineError::UnknownId { .. } => "SNOW_PIPELINE_UNKNOWN_ID",
            PipelineError::MissingOutcome { .. } => "SNOW_PIPELINE_MISSING_OUTCOME",
            PipelineError::DuplicateId { .. } => "SNOW_PIPELINE_DUPLICATE_ID",
            PipelineError::IdGeneration { .. } => "SNOW_PIPELINE_ID_GENERATION",
        }
    }

    pub fn severity(&self) -> Severity {
        self.event().severity()
    }

    /// Terminal for the record concerned
    pub fn is_drop(&self) -> bool {
        matches!(self, PipelineError::Dropped { .. })
    }
}
