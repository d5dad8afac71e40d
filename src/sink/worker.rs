//! The worker loop
//!
//! One task per batched sink. It is the only code touching the pending set
//! and the batch, so neither needs a lock. Three event sources are
//! multiplexed: the stop signal, the flush ticker, and the ingestion channel.
//!
//! # Flush cycle
//!
//! 1. Take the batch and hand it to the bulk sink
//! 2. Transport failure: every record of the batch counts one failed attempt
//! 3. Otherwise apply each outcome: confirm, retry, drop, or report unknown
//! 4. Submitted records with no outcome count one failed attempt
//!
//! Records that earn a retry land in the next batch, which otherwise starts
//! empty.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::id::{IdSource, Identifier};
use crate::observability::{log_event, Event, FlushTrigger, PipelineMetrics};

use super::batch::Batch;
use super::bulk::BulkSink;
use super::errors::PipelineError;
use super::pending::{PendingRecord, PendingSet, RetryDecision};
use super::record::{BulkItem, ItemOutcome, Record};

/// Failure callback. Runs on the worker; must return quickly and not panic.
pub type ErrorCallback = Arc<dyn Fn(&PipelineError) + Send + Sync>;

/// Work left behind when the worker returned
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StopSummary {
    /// Items accumulated for a flush that never happened
    pub abandoned_batch: usize,
    /// Records submitted or queued but never confirmed or dropped
    pub abandoned_pending: usize,
}

pub(crate) struct Worker {
    pub(crate) input: mpsc::Receiver<Record>,
    pub(crate) ids: Arc<dyn IdSource>,
    pub(crate) sink: Arc<dyn BulkSink>,
    pub(crate) on_error: ErrorCallback,
    pub(crate) metrics: Arc<PipelineMetrics>,
    pub(crate) batch_size: usize,
    pub(crate) flush_interval: Duration,
    pub(crate) retry_limit: u32,
    pub(crate) pending: PendingSet,
    pub(crate) batch: Batch,
}

impl Worker {
    /// Runs until stopped or until every producer handle is gone.
    pub(crate) async fn run(mut self, mut stop: oneshot::Receiver<()>) -> StopSummary {
        // Fixed period, first tick one period from now. Ticks missed during
        // a slow flush are skipped so the schedule stays on its multiples.
        let mut ticker = time::interval_at(Instant::now() + self.flush_interval, self.flush_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        log_event(Event::PipelineStart, "batched sink worker started");

        loop {
            tokio::select! {
                biased;

                // A dropped sender counts as a stop request.
                _ = &mut stop => break,

                _ = ticker.tick() => {
                    if !self.batch.is_empty() {
                        self.flush(FlushTrigger::Timer).await;
                    }
                }

                received = self.input.recv() => match received {
                    Some(record) => self.accept(record).await,
                    None => break,
                },
            }
        }

        let summary = StopSummary {
            abandoned_batch: self.batch.len(),
            abandoned_pending: self.pending.len(),
        };
        tracing::info!(
            event = Event::PipelineStop.as_str(),
            abandoned_batch = summary.abandoned_batch,
            abandoned_pending = summary.abandoned_pending,
            "batched sink worker stopped"
        );
        summary
    }

    async fn accept(&mut self, record: Record) {
        let id = match record.id {
            Some(id) => id,
            None => match self.ids.next_id() {
                Ok(id) => id,
                Err(source) => {
                    self.metrics.increment_rejected();
                    self.report(PipelineError::IdGeneration {
                        collection: record.collection,
                        source,
                    });
                    return;
                }
            },
        };

        if self.pending.contains(id) {
            self.metrics.increment_rejected();
            self.report(PipelineError::DuplicateId {
                id,
                collection: record.collection,
            });
            return;
        }

        self.pending.insert(PendingRecord::new(
            id,
            record.collection.clone(),
            record.document.clone(),
        ));
        self.batch.push(BulkItem {
            id,
            collection: record.collection,
            document: record.document,
        });
        self.metrics.increment_accepted();

        if self.batch.len() >= self.batch_size {
            self.flush(FlushTrigger::Size).await;
        }
    }

    async fn flush(&mut self, trigger: FlushTrigger) {
        let items = self.batch.take();
        if items.is_empty() {
            return;
        }
        self.metrics.record_flush(trigger, items.len());

        let result = self.sink.submit(&items).await;

        match result {
            Err(err) => {
                self.metrics.increment_transport_failures();
                self.report(PipelineError::Transport {
                    items: items.len(),
                    message: err.to_string(),
                });
                // No outcome is trustworthy: each record spends one attempt.
                for item in &items {
                    self.retry_or_drop(item.id);
                }
            }
            Ok(outcomes) => {
                let mut answered = HashSet::with_capacity(outcomes.len());
                for outcome in outcomes {
                    if !answered.insert(outcome.id) {
                        tracing::warn!(id = %outcome.id, "duplicate outcome in bulk response ignored");
                        continue;
                    }
                    self.apply_outcome(outcome);
                }

                for item in &items {
                    if !answered.contains(&item.id) && self.pending.contains(item.id) {
                        self.metrics.increment_inconsistencies();
                        self.report(PipelineError::MissingOutcome { id: item.id });
                        self.retry_or_drop(item.id);
                    }
                }
            }
        }

        tracing::debug!(
            event = Event::FlushComplete.as_str(),
            trigger = ?trigger,
            submitted = items.len(),
            requeued = self.batch.len(),
            pending = self.pending.len(),
            "flush cycle complete"
        );
    }

    fn apply_outcome(&mut self, outcome: ItemOutcome) {
        if outcome.success {
            if self.pending.remove(outcome.id).is_some() {
                self.metrics.increment_succeeded();
            }
            return;
        }

        let Some(record) = self.pending.get(outcome.id) else {
            self.metrics.increment_inconsistencies();
            self.report(PipelineError::UnknownId { id: outcome.id });
            return;
        };

        self.metrics.increment_failed();
        let (reason, caused_by) = match outcome.error {
            Some(error) => (error.reason, error.caused_by),
            None => ("unspecified".to_string(), None),
        };
        let report = PipelineError::ItemFailed {
            id: record.id,
            collection: record.collection.clone(),
            reason,
            caused_by,
        };
        self.report(report);
        self.retry_or_drop(outcome.id);
    }

    /// Spends one attempt of `id`: requeue it, or drop it once the budget is
    /// gone.
    fn retry_or_drop(&mut self, id: Identifier) {
        let collection = match self.pending.get(id) {
            Some(record) => record.collection.clone(),
            None => return,
        };

        match self.pending.record_failure(id, self.retry_limit) {
            Some(RetryDecision::Retry(attempt)) => {
                if let Some(record) = self.pending.get(id) {
                    self.batch.push(record.to_item());
                }
                self.metrics.increment_retried();
                tracing::debug!(
                    event = Event::RecordRetried.as_str(),
                    id = %id,
                    retry = attempt,
                    "record requeued"
                );
            }
            Some(RetryDecision::Drop(retries)) => {
                self.metrics.increment_dropped();
                self.report(PipelineError::Dropped {
                    id,
                    collection,
                    retries,
                });
            }
            None => {}
        }
    }

    fn report(&self, error: PipelineError) {
        log_event(error.event(), &error.to_string());
        (self.on_error)(&error);
    }
}
