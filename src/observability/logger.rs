//! Structured logging setup
//!
//! Installs a `tracing` subscriber that writes one line per event, either
//! human readable or JSON. Level filtering follows `RUST_LOG` and defaults
//! to `info`.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use super::events::{Event, Severity};
use super::{ObservabilityError, ObservabilityResult};

/// Output format for log lines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Human,
    Json,
}

impl FromStr for LogFormat {
    type Err = ObservabilityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "human" => Ok(LogFormat::Human),
            "json" => Ok(LogFormat::Json),
            other => Err(ObservabilityError::UnknownFormat(other.to_string())),
        }
    }
}

/// Installs the global subscriber. Fails if one is already installed.
pub fn init_logging(format: LogFormat) -> ObservabilityResult<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(filter);
    let result = match format {
        LogFormat::Human => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init(),
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .flatten_event(true)
                    .with_writer(std::io::stderr),
            )
            .try_init(),
    };

    result.map_err(|e| ObservabilityError::Init(e.to_string()))
}

/// Logs a lifecycle event at the event's own severity.
pub fn log_event(event: Event, message: &str) {
    match event.severity() {
        Severity::Info => tracing::info!(event = event.as_str(), "{}", message),
        Severity::Warn => tracing::warn!(event = event.as_str(), "{}", message),
        Severity::Error | Severity::Fatal => {
            tracing::error!(event = event.as_str(), "{}", message)
        }
    }
}
