//! IdentityGenerator - snowflake-style identifier issuance
//!
//! The full read-clock / compare / bump-sequence / compose protocol runs
//! under one mutex. The lock is held for well under a millisecond except when
//! the 12-bit sequence overflows, in which case the holder spins on the clock
//! until the next millisecond begins.

use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use super::clock::{Clock, SystemClock};
use super::errors::{IdError, IdResult};
use super::layout::{
    decode, IdParts, Identifier, DEFAULT_EPOCH_MILLIS, MAX_ELAPSED_MILLIS, MAX_SEQUENCE,
    MAX_SHARD_ID, MAX_SITE_ID,
};

/// Anything that can hand out identifiers.
///
/// The pipeline takes its identifiers through this trait so a single shared
/// generator can be injected wherever ids are needed.
pub trait IdSource: Send + Sync + std::fmt::Debug {
    fn next_id(&self) -> IdResult<Identifier>;
}

/// Generator identity and epoch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// Site (datacenter) id, 0-31
    pub site_id: i64,

    /// Shard (machine) id, 0-31
    pub shard_id: i64,

    /// Reference instant in Unix milliseconds
    #[serde(default = "default_epoch_millis")]
    pub epoch_millis: i64,
}

fn default_epoch_millis() -> i64 {
    DEFAULT_EPOCH_MILLIS
}

impl GeneratorConfig {
    pub fn new(site_id: i64, shard_id: i64) -> Self {
        Self {
            site_id,
            shard_id,
            epoch_millis: DEFAULT_EPOCH_MILLIS,
        }
    }

    /// Checks site and shard bounds, returning them narrowed.
    pub fn validate(&self) -> IdResult<(u8, u8)> {
        if !(0..=i64::from(MAX_SITE_ID)).contains(&self.site_id) {
            return Err(IdError::InvalidSiteId {
                got: self.site_id,
                max: MAX_SITE_ID,
            });
        }
        if !(0..=i64::from(MAX_SHARD_ID)).contains(&self.shard_id) {
            return Err(IdError::InvalidShardId {
                got: self.shard_id,
                max: MAX_SHARD_ID,
            });
        }
        Ok((self.site_id as u8, self.shard_id as u8))
    }
}

#[derive(Debug)]
struct GeneratorState {
    last_timestamp: i64,
    sequence: u16,
}

/// Time-ordered identifier generator for one (site, shard) pair.
#[derive(Debug)]
pub struct IdentityGenerator {
    site_id: u8,
    shard_id: u8,
    epoch_millis: i64,
    clock: Arc<dyn Clock>,
    state: Mutex<GeneratorState>,
}

impl IdentityGenerator {
    /// Creates a generator on the system clock with the default epoch.
    pub fn new(site_id: i64, shard_id: i64) -> IdResult<Self> {
        Self::with_clock(GeneratorConfig::new(site_id, shard_id), Arc::new(SystemClock))
    }

    /// Creates a generator from configuration on the system clock.
    pub fn from_config(config: GeneratorConfig) -> IdResult<Self> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Creates a generator reading time from `clock`.
    pub fn with_clock(config: GeneratorConfig, clock: Arc<dyn Clock>) -> IdResult<Self> {
        let (site_id, shard_id) = config.validate()?;
        Ok(Self {
            site_id,
            shard_id,
            epoch_millis: config.epoch_millis,
            clock,
            state: Mutex::new(GeneratorState {
                last_timestamp: i64::MIN,
                sequence: 0,
            }),
        })
    }

    pub fn site_id(&self) -> u8 {
        self.site_id
    }

    pub fn shard_id(&self) -> u8 {
        self.shard_id
    }

    pub fn epoch_millis(&self) -> i64 {
        self.epoch_millis
    }

    /// Issues the next identifier.
    ///
    /// Fails with [`IdError::ClockRegression`] if the clock reads earlier than
    /// the last issued timestamp. No identifier is produced in that case and
    /// the caller must stop issuing from this generator until the clock is
    /// corrected.
    pub fn next_id(&self) -> IdResult<Identifier> {
        let mut state = self.state.lock().map_err(|_| IdError::LockPoisoned)?;

        let mut now = self.clock.now_millis();

        if now < state.last_timestamp {
            return Err(IdError::ClockRegression {
                last: state.last_timestamp,
                now,
            });
        }

        if now == state.last_timestamp {
            state.sequence = (state.sequence + 1) & MAX_SEQUENCE;
            if state.sequence == 0 {
                now = self.wait_next_millis(state.last_timestamp);
            }
        } else {
            state.sequence = 0;
        }

        let elapsed = now
            .checked_sub(self.epoch_millis)
            .filter(|e| (0..=MAX_ELAPSED_MILLIS as i64).contains(e))
            .ok_or(IdError::TimestampOutOfRange {
                now,
                epoch: self.epoch_millis,
            })?;

        state.last_timestamp = now;

        Ok(Identifier::compose(
            elapsed as u64,
            self.site_id,
            self.shard_id,
            state.sequence,
        ))
    }

    /// Issues the next identifier in decimal form.
    pub fn next_id_string(&self) -> IdResult<String> {
        self.next_id().map(|id| id.to_string())
    }

    /// Decodes an identifier issued under this generator's epoch.
    pub fn decode(&self, id: Identifier) -> IdParts {
        decode(id, self.epoch_millis)
    }

    /// Busy-polls until the clock passes `last`. Never sleeps: the wait is
    /// bounded by one millisecond and burns a core for that long.
    fn wait_next_millis(&self, last: i64) -> i64 {
        let mut now = self.clock.now_millis();
        while now <= last {
            std::hint::spin_loop();
            now = self.clock.now_millis();
        }
        now
    }
}

impl IdSource for IdentityGenerator {
    fn next_id(&self) -> IdResult<Identifier> {
        IdentityGenerator::next_id(self)
    }
}
