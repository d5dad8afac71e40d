//! Identifier error types
//!
//! Error codes:
//! - SNOW_ID_INVALID_SITE (ERROR severity)
//! - SNOW_ID_INVALID_SHARD (ERROR severity)
//! - SNOW_ID_CLOCK_REGRESSION (FATAL severity)
//! - SNOW_ID_TIMESTAMP_OUT_OF_RANGE (FATAL severity)
//! - SNOW_ID_LOCK_POISONED (FATAL severity)
//! - SNOW_ID_PARSE (ERROR severity)

use thiserror::Error;

use crate::observability::Severity;

/// Result type for identifier operations
pub type IdResult<T> = Result<T, IdError>;

/// Identifier generation and decoding errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdError {
    /// Site id outside the 5-bit range
    #[error("site id must be between 0 and {max}, got {got}")]
    InvalidSiteId { got: i64, max: u8 },

    /// Shard id outside the 5-bit range
    #[error("shard id must be between 0 and {max}, got {got}")]
    InvalidShardId { got: i64, max: u8 },

    /// Wall clock observed earlier than the last issued timestamp
    #[error("clock moved backwards, refusing to generate id for {} ms", .last - .now)]
    ClockRegression { last: i64, now: i64 },

    /// Clock reading cannot be encoded in the timestamp field
    #[error("timestamp {now} ms cannot be encoded relative to epoch {epoch} ms")]
    TimestampOutOfRange { now: i64, epoch: i64 },

    /// Generator mutex poisoned by a panicking holder
    #[error("identity generator lock poisoned")]
    LockPoisoned,

    /// Textual identifier could not be parsed
    #[error("invalid identifier {0:?}")]
    Parse(String),
}

impl IdError {
    /// Returns the stable error code
    pub fn code(&self) -> &'static str {
        match self {
            IdError::InvalidSiteId { .. } => "SNOW_ID_INVALID_SITE",
            IdError::InvalidShardId { .. } => "SNOW_ID_INVALID_SHARD",
            IdError::ClockRegression { .. } => "SNOW_ID_CLOCK_REGRESSION",
            IdError::TimestampOutOfRange { .. } => "SNOW_ID_TIMESTAMP_OUT_OF_RANGE",
            IdError::LockPoisoned => "SNOW_ID_LOCK_POISONED",
            IdError::Parse(_) => "SNOW_ID_PARSE",
        }
    }

    /// Returns the severity level for this error
    pub fn severity(&self) -> Severity {
        match self {
            IdError::ClockRegression { .. }
            | IdError::TimestampOutOfRange { .. }
            | IdError::LockPoisoned => Severity::Fatal,
            IdError::InvalidSiteId { .. } | IdError::InvalidShardId { .. } | IdError::Parse(_) => {
                Severity::Error
            }
        }
    }

    /// Fatal errors mean the generator must not be used until the clock is fixed
    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }
}
