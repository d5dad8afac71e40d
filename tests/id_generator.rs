//! Identity Generator Tests
//!
//! Ordering and uniqueness of issued identifiers:
//! - Strictly increasing per generator
//! - Site and shard recoverable from every id
//! - No duplicates across threads sharing one generator
//! - Clock regression yields an error, never an id

use std::collections::HashSet;
use std::sync::Arc;
use std::thread;

use snowbatch::id::{
    decode, GeneratorConfig, IdError, Identifier, IdentityGenerator, ManualClock,
    DEFAULT_EPOCH_MILLIS, MAX_SEQUENCE,
};

// =============================================================================
// Ordering Tests
// =============================================================================

/// Consecutive ids are strictly increasing.
#[test]
fn test_ids_strictly_increase() {
    let generator = IdentityGenerator::new(1, 2).unwrap();

    let ids: Vec<Identifier> = (0..10_000).map(|_| generator.next_id().unwrap()).collect();

    assert!(ids.windows(2).all(|w| w[0] < w[1]));
}

/// Every id carries the generator's site and shard.
#[test]
fn test_ids_decode_to_generator_identity() {
    let generator = IdentityGenerator::new(31, 0).unwrap();

    for _ in 0..100 {
        let id = generator.next_id().unwrap();
        let parts = generator.decode(id);
        assert_eq!(parts.site_id, 31);
        assert_eq!(parts.shard_id, 0);
        assert!(parts.timestamp_millis > DEFAULT_EPOCH_MILLIS);
        assert_eq!(decode(id, DEFAULT_EPOCH_MILLIS), parts);
    }
}

/// A custom epoch shifts the decoded timestamp, not the layout.
#[test]
fn test_custom_epoch_round_trips_timestamp() {
    let epoch = 1_600_000_000_000;
    let clock = Arc::new(ManualClock::new(epoch + 123));
    let config = GeneratorConfig {
        epoch_millis: epoch,
        ..GeneratorConfig::new(2, 3)
    };
    let generator = IdentityGenerator::with_clock(config, clock).unwrap();

    let id = generator.next_id().unwrap();
    assert_eq!(id.elapsed_millis(), 123);
    assert_eq!(generator.decode(id).timestamp_millis, epoch + 123);
}

/// 4096 ids fit in one millisecond; the next waits for the clock.
#[test]
fn test_full_millisecond_uses_whole_sequence() {
    let clock = Arc::new(ManualClock::new(DEFAULT_EPOCH_MILLIS + 50));
    let generator =
        IdentityGenerator::with_clock(GeneratorConfig::new(0, 0), clock.clone()).unwrap();

    for expected in 0..=MAX_SEQUENCE {
        assert_eq!(generator.next_id().unwrap().sequence(), expected);
    }

    clock.advance(1);
    let next = generator.next_id().unwrap();
    assert_eq!(next.sequence(), 0);
    assert_eq!(next.elapsed_millis(), 51);
}

// =============================================================================
// Concurrency Tests
// =============================================================================

/// Threads sharing one generator never see the same id.
#[test]
fn test_concurrent_ids_are_unique() {
    let generator = Arc::new(IdentityGenerator::new(5, 6).unwrap());

    let workers: Vec<_> = (0..10)
        .map(|_| {
            let generator = Arc::clone(&generator);
            thread::spawn(move || {
                (0..100)
                    .map(|_| generator.next_id().unwrap())
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let mut seen = HashSet::new();
    for worker in workers {
        let ids = worker.join().unwrap();
        // Each thread observes its own ids in order.
        assert!(ids.windows(2).all(|w| w[0] < w[1]));
        for id in ids {
            assert!(seen.insert(id), "duplicate id {}", id);
        }
    }
    assert_eq!(seen.len(), 1_000);
}

/// Different shards at the same instant never collide.
#[test]
fn test_distinct_shards_do_not_collide() {
    let clock = Arc::new(ManualClock::new(DEFAULT_EPOCH_MILLIS + 9));
    let a = IdentityGenerator::with_clock(GeneratorConfig::new(1, 1), clock.clone()).unwrap();
    let b = IdentityGenerator::with_clock(GeneratorConfig::new(1, 2), clock).unwrap();

    assert_ne!(a.next_id().unwrap(), b.next_id().unwrap());
}

// =============================================================================
// Clock Safety Tests
// =============================================================================

/// A backward clock fails until it catches up again.
#[test]
fn test_clock_regression_refuses_ids() {
    let start = DEFAULT_EPOCH_MILLIS + 1_000;
    let clock = Arc::new(ManualClock::new(start));
    let generator =
        IdentityGenerator::with_clock(GeneratorConfig::new(0, 0), clock.clone()).unwrap();

    let before = generator.next_id().unwrap();

    clock.set(start - 200);
    let err = generator.next_id().unwrap_err();
    assert_eq!(
        err,
        IdError::ClockRegression {
            last: start,
            now: start - 200,
        }
    );
    assert!(err.is_fatal());
    assert!(err.to_string().contains("200"));

    clock.set(start);
    let after = generator.next_id().unwrap();
    assert!(after > before);
}

/// Out-of-range identity is rejected at construction.
#[test]
fn test_identity_bounds() {
    assert!(IdentityGenerator::new(0, 0).is_ok());
    assert!(IdentityGenerator::new(31, 31).is_ok());
    assert!(matches!(
        IdentityGenerator::new(32, 0),
        Err(IdError::InvalidSiteId { got: 32, .. })
    ));
    assert!(matches!(
        IdentityGenerator::new(0, -1),
        Err(IdError::InvalidShardId { got: -1, .. })
    ));
}

/// Decimal form parses back to the same id.
#[test]
fn test_string_form_parses_back() {
    let generator = IdentityGenerator::new(4, 4).unwrap();
    let text = generator.next_id_string().unwrap();

    let id: Identifier = text.parse().unwrap();
    assert_eq!(id.to_string(), text);
    assert!("12ab".parse::<Identifier>().is_err());
}
