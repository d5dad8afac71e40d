//! Configuration file for the `ingest` command
//!
//! ```json
//! {
//!   "generator": { "site_id": 1, "shard_id": 2 },
//!   "pipeline": { "batch_size": 500, "retry_limit": 3 }
//! }
//! ```
//!
//! `generator` is required; every `pipeline` field has a default.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::id::GeneratorConfig;
use crate::sink::PipelineConfig;

use super::errors::{CliError, CliResult};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Identity of the id generator (required)
    pub generator: GeneratorConfig,

    /// Batching, retry and queue tuning
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

impl AppConfig {
    /// Loads and validates a JSON configuration file.
    pub fn load(path: &Path) -> CliResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            CliError::config_error(format!("Failed to read config file {}: {}", path.display(), e))
        })?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> CliResult<Self> {
        let config: AppConfig = serde_json::from_str(content)
            .map_err(|e| CliError::config_error(format!("Invalid config JSON: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> CliResult<()> {
        self.generator
            .validate()
            .map_err(|e| CliError::config_error(e.to_string()))?;
        self.pipeline
            .validate()
            .map_err(|e| CliError::config_error(e.to_string()))?;
        Ok(())
    }
}
