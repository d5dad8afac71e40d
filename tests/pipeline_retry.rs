//! Retry and Failure Reporting Tests
//!
//! Per-item retry accounting of the batched sink:
//! - A failed item is retried exactly `retry_limit` times, then dropped
//! - A retried item that succeeds produces no further reports
//! - A failed bulk call spends one attempt for every record of the batch
//! - Inconsistent responses are reported and never strand a record
//! - Records that cannot be stamped are reported and discarded

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tokio::sync::mpsc;

use snowbatch::id::{
    Clock, GeneratorConfig, IdError, IdSource, Identifier, IdentityGenerator, ManualClock,
    DEFAULT_EPOCH_MILLIS,
};
use snowbatch::sink::{
    BatchedSink, ItemError, ItemOutcome, MemorySink, PipelineConfig, PipelineError, Record,
};

struct Harness {
    pipeline: BatchedSink,
    sink: Arc<MemorySink>,
    batches: mpsc::UnboundedReceiver<Vec<Identifier>>,
    errors: mpsc::UnboundedReceiver<PipelineError>,
}

fn start_with(sink: MemorySink, ids: Arc<dyn IdSource>, config: PipelineConfig) -> Harness {
    let sink = Arc::new(sink);
    let batches = sink.subscribe();
    let (err_tx, errors) = mpsc::unbounded_channel();

    let pipeline = BatchedSink::builder()
        .config(config)
        .id_source(ids)
        .bulk_sink(sink.clone())
        .on_error(move |e| {
            let _ = err_tx.send(e.clone());
        })
        .start()
        .unwrap();

    Harness {
        pipeline,
        sink,
        batches,
        errors,
    }
}

fn start(sink: MemorySink, config: PipelineConfig) -> Harness {
    start_with(sink, Arc::new(IdentityGenerator::new(3, 4).unwrap()), config)
}

fn record(n: u64) -> Record {
    Record::new("orders", json!({ "n": n }))
}

async fn next_errors(h: &mut Harness, count: usize) -> Vec<PipelineError> {
    let mut errors = Vec::with_capacity(count);
    for _ in 0..count {
        errors.push(h.errors.recv().await.unwrap());
    }
    errors
}

fn count_codes(errors: &[PipelineError], code: &str) -> usize {
    errors.iter().filter(|e| e.code() == code).count()
}

// =============================================================================
// Retry Budget Tests
// =============================================================================

/// Threshold 2, one retry, sink rejects both records twice: both dropped.
#[tokio::test(start_paused = true)]
async fn test_records_failing_twice_with_one_retry_are_dropped() {
    let mut h = start(
        MemorySink::failing_always("mapper_parsing_exception"),
        PipelineConfig::default()
            .with_batch_size(2)
            .with_retry_limit(1),
    );

    h.pipeline.submit(record(1)).await.unwrap();
    h.pipeline.submit(record(2)).await.unwrap();

    let first = h.batches.recv().await.unwrap();
    let second = h.batches.recv().await.unwrap();
    assert_eq!(first.len(), 2);
    assert_eq!(first, second);

    let errors = next_errors(&mut h, 6).await;
    assert_eq!(count_codes(&errors, "SNOW_PIPELINE_ITEM_FAILED"), 4);
    assert_eq!(count_codes(&errors, "SNOW_PIPELINE_DROPPED"), 2);
    assert!(errors[0].to_string().contains("mapper_parsing_exception"));

    // Nothing is left to resubmit.
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(h.sink.submission_count(), 2);
    assert!(h.errors.try_recv().is_err());

    let snapshot = h.pipeline.metrics().snapshot();
    assert_eq!(snapshot.items_dropped, 2);
    assert_eq!(snapshot.in_flight(), 0);

    let summary = h.pipeline.stop().await.unwrap();
    assert_eq!(summary.abandoned_pending, 0);
}

/// A record is attempted `retry_limit + 1` times before it is dropped.
#[tokio::test(start_paused = true)]
async fn test_retry_limit_bounds_attempts() {
    let mut h = start(
        MemorySink::failing_always("rejected"),
        PipelineConfig::default()
            .with_batch_size(1)
            .with_retry_limit(3),
    );

    h.pipeline.submit(record(1)).await.unwrap();

    let mut seen = Vec::new();
    for _ in 0..4 {
        seen.push(h.batches.recv().await.unwrap());
    }
    let id = seen[0][0];
    assert!(seen.iter().all(|batch| batch == &vec![id]));

    let errors = next_errors(&mut h, 5).await;
    assert_eq!(
        errors.last(),
        Some(&PipelineError::Dropped {
            id,
            collection: "orders".into(),
            retries: 3,
        })
    );
    assert_eq!(h.sink.attempts(id), 4);
    assert_eq!(h.pipeline.metrics().snapshot().items_retried, 3);
}

/// With the default limit of zero the first failure drops the record.
#[tokio::test(start_paused = true)]
async fn test_zero_retry_limit_drops_on_first_failure() {
    let mut h = start(
        MemorySink::failing_always("rejected"),
        PipelineConfig::default().with_batch_size(1),
    );

    h.pipeline.submit(record(1)).await.unwrap();

    let errors = next_errors(&mut h, 2).await;
    assert_eq!(errors[0].code(), "SNOW_PIPELINE_ITEM_FAILED");
    assert!(errors[1].is_drop());

    tokio::time::sleep(Duration::from_secs(20)).await;
    assert_eq!(h.sink.submission_count(), 1);
}

/// A retry that succeeds ends the record's failure reports.
#[tokio::test(start_paused = true)]
async fn test_successful_retry_stops_reporting() {
    let mut h = start(
        MemorySink::failing_first(1, "version_conflict"),
        PipelineConfig::default()
            .with_batch_size(1)
            .with_retry_limit(2),
    );

    h.pipeline.submit(record(1)).await.unwrap();

    let first = h.batches.recv().await.unwrap();
    let second = h.batches.recv().await.unwrap();
    assert_eq!(first, second);

    let errors = next_errors(&mut h, 1).await;
    assert_eq!(errors[0].code(), "SNOW_PIPELINE_ITEM_FAILED");

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert!(h.errors.try_recv().is_err());
    assert_eq!(h.sink.submission_count(), 2);
    assert_eq!(h.sink.stored_len(), 1);
    assert_eq!(h.pipeline.metrics().snapshot().items_succeeded, 1);
}

/// Only the rejected records of a mixed batch come back.
#[tokio::test(start_paused = true)]
async fn test_retry_batch_holds_only_failed_items() {
    let sink = MemorySink::with_policy(|item, attempt| {
        (item.document["n"] == json!(2) && attempt == 1).then(|| ItemError::new("busy"))
    });
    let mut h = start(
        sink,
        PipelineConfig::default()
            .with_batch_size(3)
            .with_retry_limit(1),
    );

    for n in 1..=3 {
        h.pipeline.submit(record(n)).await.unwrap();
    }

    let first = h.batches.recv().await.unwrap();
    let second = h.batches.recv().await.unwrap();
    assert_eq!(first.len(), 3);
    assert_eq!(second, vec![first[1]]);
    assert_eq!(h.sink.stored_len(), 3);
}

// =============================================================================
// Transport Failure Tests
// =============================================================================

/// A failed bulk call requeues the whole batch as one attempt each.
#[tokio::test(start_paused = true)]
async fn test_transport_failure_requeues_batch() {
    let sink = MemorySink::new();
    sink.fail_next_transport(1);
    let mut h = start(
        sink,
        PipelineConfig::default()
            .with_batch_size(2)
            .with_retry_limit(1),
    );

    h.pipeline.submit(record(1)).await.unwrap();
    h.pipeline.submit(record(2)).await.unwrap();

    let failed = h.batches.recv().await.unwrap();
    let retried = h.batches.recv().await.unwrap();
    assert_eq!(failed, retried);

    let errors = next_errors(&mut h, 1).await;
    assert!(matches!(errors[0], PipelineError::Transport { items: 2, .. }));

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert!(h.errors.try_recv().is_err());
    assert_eq!(h.sink.stored_len(), 2);

    let snapshot = h.pipeline.metrics().snapshot();
    assert_eq!(snapshot.transport_failures, 1);
    assert_eq!(snapshot.items_retried, 2);
}

/// Records without retry budget are dropped by a failed bulk call.
#[tokio::test(start_paused = true)]
async fn test_transport_failure_without_budget_drops() {
    let sink = MemorySink::new();
    sink.fail_next_transport(1);
    let mut h = start(sink, PipelineConfig::default().with_batch_size(2));

    h.pipeline.submit(record(1)).await.unwrap();
    h.pipeline.submit(record(2)).await.unwrap();

    let errors = next_errors(&mut h, 3).await;
    assert_eq!(errors[0].code(), "SNOW_PIPELINE_TRANSPORT");
    assert_eq!(count_codes(&errors, "SNOW_PIPELINE_DROPPED"), 2);
    assert_eq!(h.pipeline.metrics().snapshot().in_flight(), 0);
}

// =============================================================================
// Inconsistent Response Tests
// =============================================================================

/// A failure for an id nobody is tracking is reported and ignored.
#[tokio::test(start_paused = true)]
async fn test_unknown_id_in_response_is_reported() {
    let ghost = Identifier::new(42);
    let sink = MemorySink::new().with_response_hook(move |outcomes| {
        outcomes.push(ItemOutcome {
            id: ghost,
            collection: "orders".into(),
            success: false,
            error: Some(ItemError::new("not_found")),
        });
    });
    let mut h = start(sink, PipelineConfig::default().with_batch_size(1));

    h.pipeline.submit(record(1)).await.unwrap();

    let errors = next_errors(&mut h, 1).await;
    assert_eq!(errors[0], PipelineError::UnknownId { id: ghost });
    assert_eq!(h.sink.stored_len(), 1);

    let snapshot = h.pipeline.metrics().snapshot();
    assert_eq!(snapshot.inconsistencies, 1);
    assert_eq!(snapshot.items_succeeded, 1);
}

/// A submitted record missing from the response counts as failed.
#[tokio::test(start_paused = true)]
async fn test_missing_outcome_counts_as_failure() {
    let sink = MemorySink::new().with_response_hook(|outcomes| outcomes.clear());
    let mut h = start(sink, PipelineConfig::default().with_batch_size(1));

    h.pipeline.submit(record(1)).await.unwrap();
    let batch = h.batches.recv().await.unwrap();

    let errors = next_errors(&mut h, 2).await;
    assert_eq!(errors[0], PipelineError::MissingOutcome { id: batch[0] });
    assert!(errors[1].is_drop());
    assert_eq!(h.pipeline.metrics().snapshot().in_flight(), 0);
}

/// A producer id that is already pending is rejected.
#[tokio::test(start_paused = true)]
async fn test_duplicate_pending_id_is_rejected() {
    let mut h = start(MemorySink::new(), PipelineConfig::default());
    let id = Identifier::new(7);

    h.pipeline.submit(record(1).with_id(id)).await.unwrap();
    h.pipeline.submit(record(2).with_id(id)).await.unwrap();

    let errors = next_errors(&mut h, 1).await;
    assert_eq!(
        errors[0],
        PipelineError::DuplicateId {
            id,
            collection: "orders".into(),
        }
    );

    // The first record still flushes on the tick.
    assert_eq!(h.batches.recv().await.unwrap(), vec![id]);
    assert_eq!(h.sink.document(id).unwrap().1, json!({ "n": 1 }));
    assert_eq!(h.pipeline.metrics().snapshot().records_rejected, 1);
}

// =============================================================================
// Id Stamping Tests
// =============================================================================

/// A clock regression discards the record; the pipeline keeps running.
#[tokio::test(start_paused = true)]
async fn test_clock_regression_discards_record() {
    let now = DEFAULT_EPOCH_MILLIS + 10_000;
    let clock = Arc::new(ManualClock::new(now));
    let generator = IdentityGenerator::with_clock(GeneratorConfig::new(1, 1), clock.clone())
        .unwrap();
    let mut h = start_with(
        MemorySink::new(),
        Arc::new(generator),
        PipelineConfig::default().with_batch_size(1),
    );

    h.pipeline.submit(record(1)).await.unwrap();
    h.batches.recv().await.unwrap();

    clock.set(now - 5);
    h.pipeline.submit(record(2)).await.unwrap();

    let errors = next_errors(&mut h, 1).await;
    match &errors[0] {
        PipelineError::IdGeneration { collection, source } => {
            assert_eq!(collection, "orders");
            assert_eq!(
                source,
                &IdError::ClockRegression {
                    last: now,
                    now: now - 5,
                }
            );
        }
        other => panic!("unexpected report {:?}", other),
    }

    clock.set(now + 1);
    h.pipeline.submit(record(3)).await.unwrap();
    h.batches.recv().await.unwrap();

    assert_eq!(h.sink.stored_len(), 2);
    assert_eq!(clock.now_millis(), now + 1);
    assert_eq!(h.pipeline.metrics().snapshot().records_rejected, 1);
}
