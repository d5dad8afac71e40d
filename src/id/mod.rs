//! Snowflake-style identifier generation
//!
//! Identifiers are 64-bit values ordered by issue time:
//! `[41-bit elapsed ms][5-bit site][5-bit shard][12-bit sequence]`.
//!
//! # Guarantees
//!
//! - Strictly increasing per generator under a non-decreasing clock
//! - Unique per (site, shard) pair at up to 4096 ids per millisecond
//! - A clock observed moving backwards fails the call; no id is issued
//!
//! There is no process-wide generator. Build one [`IdentityGenerator`],
//! wrap it in an `Arc`, and pass it to whatever needs ids.

mod clock;
mod errors;
mod generator;
mod layout;

pub use clock::{Clock, ManualClock, SystemClock};
pub use errors::{IdError, IdResult};
pub use generator::{GeneratorConfig, IdSource, IdentityGenerator};
pub use layout::{
    decode, IdParts, Identifier, DEFAULT_EPOCH_MILLIS, MAX_SEQUENCE, MAX_SHARD_ID, MAX_SITE_ID,
};
