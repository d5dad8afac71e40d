//! Batched sink configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::errors::{SinkError, SinkResult};

pub const DEFAULT_CHANNEL_CAPACITY: usize = 10_000;
pub const DEFAULT_BATCH_SIZE: usize = 100;
pub const DEFAULT_FLUSH_INTERVAL_SECS: u64 = 5;
/// Longest accepted flush period: one week
pub const MAX_FLUSH_INTERVAL_SECS: u64 = 7 * 24 * 60 * 60;

/// Tuning for one batched sink. Zero means "use the default" for the
/// capacity, batch size and interval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Bounded ingestion queue length (default: 10 000)
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,

    /// Flush as soon as the batch holds this many items (default: 100)
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Fixed flush period in seconds (default: 5)
    #[serde(default = "default_flush_interval_secs")]
    pub flush_interval_secs: u64,

    /// Retries allowed per record before it is dropped (default: 0)
    #[serde(default)]
    pub retry_limit: u32,
}

fn default_channel_capacity() -> usize {
    DEFAULT_CHANNEL_CAPACITY
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

fn default_flush_interval_secs() -> u64 {
    DEFAULT_FLUSH_INTERVAL_SECS
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            channel_capacity: default_channel_capacity(),
            batch_size: default_batch_size(),
            flush_interval_secs: default_flush_interval_secs(),
            retry_limit: 0,
        }
    }
}

impl PipelineConfig {
    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_flush_interval_secs(mut self, secs: u64) -> Self {
        self.flush_interval_secs = secs;
        self
    }

    pub fn with_retry_limit(mut self, retry_limit: u32) -> Self {
        self.retry_limit = retry_limit;
        self
    }

    /// Replaces zero values with defaults.
    pub fn normalized(mut self) -> Self {
        if self.channel_capacity == 0 {
            self.channel_capacity = DEFAULT_CHANNEL_CAPACITY;
        }
        if self.batch_size == 0 {
            self.batch_size = DEFAULT_BATCH_SIZE;
        }
        if self.flush_interval_secs == 0 {
            self.flush_interval_secs = DEFAULT_FLUSH_INTERVAL_SECS;
        }
        self
    }

    /// Rejects values the runtime cannot honour.
    pub fn validate(&self) -> SinkResult<()> {
        // tokio channels are capped at usize::MAX >> 3 permits
        if self.channel_capacity > usize::MAX >> 3 {
            return Err(SinkError::InvalidConfig(format!(
                "channel_capacity {} is too large",
                self.channel_capacity
            )));
        }
        if self.flush_interval_secs > MAX_FLUSH_INTERVAL_SECS {
            return Err(SinkError::InvalidConfig(format!(
                "flush_interval_secs {} exceeds the maximum of {}",
                self.flush_interval_secs, MAX_FLUSH_INTERVAL_SECS
            )));
        }
        Ok(())
    }

    pub fn flush_interval(&self) -> Duration {
        Duration::from_secs(self.flush_interval_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.channel_capacity, 10_000);
        assert_eq!(config.batch_size, 100);
        assert_eq!(config.flush_interval(), Duration::from_secs(5));
        assert_eq!(config.retry_limit, 0);
    }

    #[test]
    fn test_missing_fields_take_defaults() {
        let config: PipelineConfig = serde_json::from_str(r#"{"retry_limit": 3}"#).unwrap();
        assert_eq!(config.retry_limit, 3);
        assert_eq!(config.batch_size, DEFAULT_BATCH_SIZE);
    }

    #[test]
    fn test_zero_values_normalize_to_defaults() {
        let config = PipelineConfig::default()
            .with_channel_capacity(0)
            .with_batch_size(0)
            .with_flush_interval_secs(0)
            .normalized();
        assert_eq!(config, PipelineConfig::default());
    }

    #[test]
    fn test_validate_rejects_huge_capacity() {
        let config = PipelineConfig::default().with_channel_capacity(usize::MAX);
        assert!(matches!(config.validate(), Err(SinkError::InvalidConfig(_))));
        assert!(PipelineConfig::default().validate().is_ok());
    }

    #[test]
    fn test_validate_bounds_flush_interval() {
        let config: PipelineConfig =
            serde_json::from_str(r#"{"flush_interval_secs": 18446744073709551615}"#).unwrap();
        assert!(matches!(config.validate(), Err(SinkError::InvalidConfig(_))));

        let longest = PipelineConfig::default().with_flush_interval_secs(MAX_FLUSH_INTERVAL_SECS);
        assert!(longest.validate().is_ok());
        assert!(longest
            .with_flush_interval_secs(MAX_FLUSH_INTERVAL_SECS + 1)
            .validate()
            .is_err());
    }
}
