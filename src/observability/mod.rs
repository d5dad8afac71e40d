//! Observability for the write pipeline
//!
//! - Structured logging through `tracing`, one line per event
//! - Stable event names (`Event`) on every pipeline log line
//! - Lock-free counters (`PipelineMetrics`)
//!
//! Observability never changes pipeline behaviour and never fails it.

mod events;
mod logger;
mod metrics;

pub use events::{Event, Severity};
pub use logger::{init_logging, log_event, LogFormat};
pub use metrics::{FlushTrigger, MetricsSnapshot, PipelineMetrics};

use thiserror::Error;

/// Result type for observability operations
pub type ObservabilityResult<T> = Result<T, ObservabilityError>;

/// Observability errors. Never fatal to the pipeline.
#[derive(Debug, Clone, Error)]
pub enum ObservabilityError {
    #[error("failed to install log subscriber: {0}")]
    Init(String),

    #[error("unknown log format {0:?} (expected \"human\" or \"json\")")]
    UnknownFormat(String),
}

impl ObservabilityError {
    pub fn code(&self) -> &'static str {
        match self {
            ObservabilityError::Init(_) => "SNOW_OBSERVABILITY_INIT",
            ObservabilityError::UnknownFormat(_) => "SNOW_OBSERVABILITY_FORMAT",
        }
    }

    pub fn is_fatal(&self) -> bool {
        false
    }
}
