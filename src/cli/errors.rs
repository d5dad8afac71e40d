//! CLI-specific error types
//!
//! All CLI errors end the process with a non-zero status.

use std::fmt;
use std::io;

use crate::id::IdError;
use crate::observability::ObservabilityError;
use crate::sink::SinkError;

/// CLI error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CliErrorCode {
    /// Configuration file missing, malformed or invalid
    ConfigError,
    /// I/O error (stdin/stdout/output file)
    IoError,
    /// Identifier could not be generated or parsed
    IdError,
    /// Pipeline failed to start or stop
    PipelineError,
}

impl CliErrorCode {
    pub fn code(&self) -> &'static str {
        match self {
            Self::ConfigError => "SNOW_CLI_CONFIG_ERROR",
            Self::IoError => "SNOW_CLI_IO_ERROR",
            Self::IdError => "SNOW_CLI_ID_ERROR",
            Self::PipelineError => "SNOW_CLI_PIPELINE_ERROR",
        }
    }
}

/// CLI error
#[derive(Debug)]
pub struct CliError {
    code: CliErrorCode,
    message: String,
}

impl CliError {
    pub fn new(code: CliErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::ConfigError, msg)
    }

    pub fn io_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::IoError, msg)
    }

    pub fn pipeline_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::PipelineError, msg)
    }

    pub fn code(&self) -> CliErrorCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.code(), self.message)
    }
}

impl std::error::Error for CliError {}

impl From<io::Error> for CliError {
    fn from(e: io::Error) -> Self {
        Self::io_error(e.to_string())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        Self::io_error(format!("JSON error: {}", e))
    }
}

impl From<IdError> for CliError {
    fn from(e: IdError) -> Self {
        Self::new(CliErrorCode::IdError, format!("{}: {}", e.code(), e))
    }
}

impl From<SinkError> for CliError {
    fn from(e: SinkError) -> Self {
        Self::pipeline_error(format!("{}: {}", e.code(), e))
    }
}

impl From<ObservabilityError> for CliError {
    fn from(e: ObservabilityError) -> Self {
        Self::config_error(e.to_string())
    }
}

/// CLI result type
pub type CliResult<T> = Result<T, CliError>;
