//! Identifier bit layout
//!
//! ```text
//! | 1 unused | 41 elapsed ms | 5 site | 5 shard | 12 sequence |
//! ```
//!
//! The elapsed field counts milliseconds since a configured epoch, which
//! gives roughly 69 years of range. Up to 4096 identifiers fit in one
//! millisecond for a given (site, shard) pair.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::errors::IdError;

/// Width of the elapsed-milliseconds field
pub const TIMESTAMP_BITS: u32 = 41;
/// Width of the site field
pub const SITE_BITS: u32 = 5;
/// Width of the shard field
pub const SHARD_BITS: u32 = 5;
/// Width of the per-millisecond sequence field
pub const SEQUENCE_BITS: u32 = 12;

pub const MAX_SITE_ID: u8 = (1 << SITE_BITS) - 1;
pub const MAX_SHARD_ID: u8 = (1 << SHARD_BITS) - 1;
pub const MAX_SEQUENCE: u16 = (1 << SEQUENCE_BITS) - 1;
pub const MAX_ELAPSED_MILLIS: u64 = (1 << TIMESTAMP_BITS) - 1;

pub const SHARD_SHIFT: u32 = SEQUENCE_BITS;
pub const SITE_SHIFT: u32 = SEQUENCE_BITS + SHARD_BITS;
pub const TIMESTAMP_SHIFT: u32 = SEQUENCE_BITS + SHARD_BITS + SITE_BITS;

/// Default epoch: 2020-01-01T00:00:00Z in Unix milliseconds
pub const DEFAULT_EPOCH_MILLIS: i64 = 1_577_836_800_000;

/// A time-ordered 64-bit identifier.
///
/// Ordering of identifiers from one generator follows issue order.
/// Serialized as a plain integer; displayed in decimal.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identifier(u64);

impl Identifier {
    /// Wraps a raw value, e.g. one read back from the sink.
    #[inline]
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    /// Packs the four components. Out-of-range components are masked.
    pub fn compose(elapsed_millis: u64, site_id: u8, shard_id: u8, sequence: u16) -> Self {
        Self(
            ((elapsed_millis & MAX_ELAPSED_MILLIS) << TIMESTAMP_SHIFT)
                | ((u64::from(site_id) & u64::from(MAX_SITE_ID)) << SITE_SHIFT)
                | ((u64::from(shard_id) & u64::from(MAX_SHARD_ID)) << SHARD_SHIFT)
                | (u64::from(sequence) & u64::from(MAX_SEQUENCE)),
        )
    }

    #[inline]
    pub fn value(&self) -> u64 {
        self.0
    }

    /// Milliseconds since the generator's epoch
    pub fn elapsed_millis(&self) -> u64 {
        (self.0 >> TIMESTAMP_SHIFT) & MAX_ELAPSED_MILLIS
    }

    pub fn site_id(&self) -> u8 {
        ((self.0 >> SITE_SHIFT) & u64::from(MAX_SITE_ID)) as u8
    }

    pub fn shard_id(&self) -> u8 {
        ((self.0 >> SHARD_SHIFT) & u64::from(MAX_SHARD_ID)) as u8
    }

    pub fn sequence(&self) -> u16 {
        (self.0 & u64::from(MAX_SEQUENCE)) as u16
    }

    /// Unix timestamp in milliseconds, given the epoch the id was issued under
    pub fn timestamp_millis(&self, epoch_millis: i64) -> i64 {
        epoch_millis + self.elapsed_millis() as i64
    }

    /// Splits the identifier into its components.
    pub fn decode(&self, epoch_millis: i64) -> IdParts {
        decode(*self, epoch_millis)
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Identifier {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u64>()
            .map(Identifier)
            .map_err(|_| IdError::Parse(s.to_string()))
    }
}

impl From<Identifier> for u64 {
    fn from(id: Identifier) -> Self {
        id.0
    }
}

/// Decoded identifier components
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdParts {
    /// Unix timestamp in milliseconds
    pub timestamp_millis: i64,
    pub site_id: u8,
    pub shard_id: u8,
    pub sequence: u16,
}

/// Pure bit unpacking of an identifier issued under `epoch_millis`.
pub fn decode(id: Identifier, epoch_millis: i64) -> IdParts {
    IdParts {
        timestamp_millis: id.timestamp_millis(epoch_millis),
        site_id: id.site_id(),
        shard_id: id.shard_id(),
        sequence: id.sequence(),
    }
}
