//! Pipeline counters
//!
//! - Counters only, monotonic
//! - Thread-safe, lock-free
//! - Reset only when a new pipeline is built

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Operational counters for one batched sink.
///
/// The worker increments; anyone holding the `Arc` may read.
/// Relaxed ordering: values are exact once the worker has stopped.
#[derive(Debug, Default)]
pub struct PipelineMetrics {
    records_accepted: AtomicU64,
    records_rejected: AtomicU64,
    flushes_by_size: AtomicU64,
    flushes_by_timer: AtomicU64,
    items_submitted: AtomicU64,
    items_succeeded: AtomicU64,
    items_failed: AtomicU64,
    items_retried: AtomicU64,
    items_dropped: AtomicU64,
    transport_failures: AtomicU64,
    inconsistencies: AtomicU64,
}

/// Which trigger started a flush cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushTrigger {
    Size,
    Timer,
}

impl PipelineMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record stamped and placed into the batch
    pub fn increment_accepted(&self) {
        self.records_accepted.fetch_add(1, Ordering::Relaxed);
    }

    /// Record discarded before entering the batch (no id, duplicate id)
    pub fn increment_rejected(&self) {
        self.records_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_flush(&self, trigger: FlushTrigger, items: usize) {
        match trigger {
            FlushTrigger::Size => self.flushes_by_size.fetch_add(1, Ordering::Relaxed),
            FlushTrigger::Timer => self.flushes_by_timer.fetch_add(1, Ordering::Relaxed),
        };
        self.items_submitted
            .fetch_add(items as u64, Ordering::Relaxed);
    }

    pub fn increment_succeeded(&self) {
        self.items_succeeded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_failed(&self) {
        self.items_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_retried(&self) {
        self.items_retried.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_dropped(&self) {
        self.items_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_transport_failures(&self) {
        self.transport_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Unknown or missing ids in a sink response
    pub fn increment_inconsistencies(&self) {
        self.inconsistencies.fetch_add(1, Ordering::Relaxed);
    }

    /// Copies all counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            records_accepted: self.records_accepted.load(Ordering::Relaxed),
            records_rejected: self.records_rejected.load(Ordering::Relaxed),
            flushes_by_size: self.flushes_by_size.load(Ordering::Relaxed),
            flushes_by_timer: self.flushes_by_timer.load(Ordering::Relaxed),
            items_submitted: self.items_submitted.load(Ordering::Relaxed),
            items_succeeded: self.items_succeeded.load(Ordering::Relaxed),
            items_failed: self.items_failed.load(Ordering::Relaxed),
            items_retried: self.items_retried.load(Ordering::Relaxed),
            items_dropped: self.items_dropped.load(Ordering::Relaxed),
            transport_failures: self.transport_failures.load(Ordering::Relaxed),
            inconsistencies: self.inconsistencies.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`PipelineMetrics`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub records_accepted: u64,
    pub records_rejected: u64,
    pub flushes_by_size: u64,
    pub flushes_by_timer: u64,
    pub items_submitted: u64,
    pub items_succeeded: u64,
    pub items_failed: u64,
    pub items_retried: u64,
    pub items_dropped: u64,
    pub transport_failures: u64,
    pub inconsistencies: u64,
}

impl MetricsSnapshot {
    /// Total flush cycles regardless of trigger
    pub fn flushes(&self) -> u64 {
        self.flushes_by_size + self.flushes_by_timer
    }

    /// Records whose fate is decided: confirmed or dropped
    pub fn settled(&self) -> u64 {
        self.items_succeeded + self.items_dropped
    }

    /// Accepted records not yet confirmed or dropped
    pub fn in_flight(&self) -> u64 {
        self.records_accepted.saturating_sub(self.settled())
    }
}
