//! BatchedSink - the producer-facing side of the pipeline
//!
//! Producers submit [`Record`]s into a bounded channel. When the channel is
//! full, `submit` waits; that wait is the backpressure mechanism, and nothing
//! is dropped to make room.
//!
//! `stop` does not drain. Whatever sits in the batch or the pending set when
//! the worker returns is abandoned; callers that need every record settled
//! must wait for that (see [`MetricsSnapshot::in_flight`]) before stopping.
//!
//! [`MetricsSnapshot::in_flight`]: crate::observability::MetricsSnapshot::in_flight

use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::id::IdSource;
use crate::observability::PipelineMetrics;

use super::batch::Batch;
use super::bulk::BulkSink;
use super::config::PipelineConfig;
use super::errors::{PipelineError, SinkError, SinkResult};
use super::pending::PendingSet;
use super::record::Record;
use super::worker::{ErrorCallback, StopSummary, Worker};

/// Cloneable submission handle for producers on other tasks or threads.
#[derive(Debug, Clone)]
pub struct SinkHandle {
    tx: mpsc::Sender<Record>,
}

impl SinkHandle {
    /// Enqueues a record, waiting while the channel is full.
    pub async fn submit(&self, record: Record) -> SinkResult<()> {
        self.tx.send(record).await.map_err(|_| SinkError::Closed)
    }

    /// Enqueues a record without waiting.
    pub fn try_submit(&self, record: Record) -> SinkResult<()> {
        self.tx.try_send(record).map_err(|err| match err {
            TrySendError::Full(_) => SinkError::Full,
            TrySendError::Closed(_) => SinkError::Closed,
        })
    }

    /// Enqueues a record from outside the runtime, blocking the thread while
    /// the channel is full. Panics if called from within an async context.
    pub fn blocking_submit(&self, record: Record) -> SinkResult<()> {
        self.tx.blocking_send(record).map_err(|_| SinkError::Closed)
    }

    /// Free slots in the ingestion channel
    pub fn capacity(&self) -> usize {
        self.tx.capacity()
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Assembles a [`BatchedSink`]. All three collaborators are required.
#[derive(Default)]
pub struct BatchedSinkBuilder {
    config: PipelineConfig,
    ids: Option<Arc<dyn IdSource>>,
    sink: Option<Arc<dyn BulkSink>>,
    on_error: Option<ErrorCallback>,
}

impl BatchedSinkBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    /// Identifier source for records submitted without an id
    pub fn id_source(mut self, ids: Arc<dyn IdSource>) -> Self {
        self.ids = Some(ids);
        self
    }

    pub fn bulk_sink(mut self, sink: Arc<dyn BulkSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Invoked for every recovered failure, on the worker task.
    pub fn on_error<F>(mut self, callback: F) -> Self
    where
        F: Fn(&PipelineError) + Send + Sync + 'static,
    {
        self.on_error = Some(Arc::new(callback));
        self
    }

    /// Validates the setup and spawns the worker on the current runtime.
    pub fn start(self) -> SinkResult<BatchedSink> {
        let ids = self.ids.ok_or(SinkError::MissingCollaborator("id source"))?;
        let sink = self.sink.ok_or(SinkError::MissingCollaborator("bulk sink"))?;
        let on_error = self
            .on_error
            .ok_or(SinkError::MissingCollaborator("failure callback"))?;

        let config = self.config.normalized();
        config.validate()?;

        let runtime = Handle::try_current().map_err(|_| SinkError::NoRuntime)?;

        let (tx, rx) = mpsc::channel(config.channel_capacity);
        let (stop_tx, stop_rx) = oneshot::channel();
        let metrics = Arc::new(PipelineMetrics::new());

        let worker = Worker {
            input: rx,
            ids,
            sink,
            on_error,
            metrics: Arc::clone(&metrics),
            batch_size: config.batch_size,
            flush_interval: config.flush_interval(),
            retry_limit: config.retry_limit,
            pending: PendingSet::new(),
            batch: Batch::with_capacity(config.batch_size),
        };

        tracing::info!(
            channel_capacity = config.channel_capacity,
            batch_size = config.batch_size,
            flush_interval_secs = config.flush_interval_secs,
            retry_limit = config.retry_limit,
            "starting batched sink"
        );

        let task = runtime.spawn(worker.run(stop_rx));

        Ok(BatchedSink {
            handle: SinkHandle { tx },
            stop_tx,
            task,
            metrics,
            config,
        })
    }
}

/// A running batched write pipeline.
///
/// Dropping it without calling [`stop`](Self::stop) also stops the worker,
/// without waiting for it.
pub struct BatchedSink {
    handle: SinkHandle,
    stop_tx: oneshot::Sender<()>,
    task: JoinHandle<StopSummary>,
    metrics: Arc<PipelineMetrics>,
    config: PipelineConfig,
}

impl BatchedSink {
    pub fn builder() -> BatchedSinkBuilder {
        BatchedSinkBuilder::new()
    }

    /// Enqueues a record, waiting while the channel is full.
    pub async fn submit(&self, record: Record) -> SinkResult<()> {
        self.handle.submit(record).await
    }

    /// Enqueues a record without waiting; `SinkError::Full` at capacity.
    pub fn try_submit(&self, record: Record) -> SinkResult<()> {
        self.handle.try_submit(record)
    }

    /// A cloneable handle for other producers
    pub fn handle(&self) -> SinkHandle {
        self.handle.clone()
    }

    pub fn metrics(&self) -> Arc<PipelineMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Effective configuration, defaults applied
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Signals the worker and waits for it to return.
    ///
    /// The cycle in progress completes; no final flush is made.
    pub async fn stop(self) -> SinkResult<StopSummary> {
        let BatchedSink {
            handle,
            stop_tx,
            task,
            ..
        } = self;

        // The worker may already be gone if every handle was dropped.
        let _ = stop_tx.send(());
        drop(handle);

        task.await
            .map_err(|err| SinkError::WorkerPanicked(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::IdentityGenerator;
    use crate::sink::MemorySink;

    fn generator() -> Arc<IdentityGenerator> {
        Arc::new(IdentityGenerator::new(1, 1).unwrap())
    }

    #[tokio::test]
    async fn test_missing_collaborators_are_rejected() {
        let err = BatchedSink::builder()
            .bulk_sink(Arc::new(MemorySink::new()))
            .on_error(|_| {})
            .start()
            .err()
            .unwrap();
        assert_eq!(err, SinkError::MissingCollaborator("id source"));

        let err = BatchedSink::builder()
            .id_source(generator())
            .on_error(|_| {})
            .start()
            .err()
            .unwrap();
        assert_eq!(err, SinkError::MissingCollaborator("bulk sink"));

        let err = BatchedSink::builder()
            .id_source(generator())
            .bulk_sink(Arc::new(MemorySink::new()))
            .start()
            .err()
            .unwrap();
        assert_eq!(err, SinkError::MissingCollaborator("failure callback"));
    }

    #[test]
    fn test_start_outside_runtime_fails() {
        let err = BatchedSink::builder()
            .id_source(generator())
            .bulk_sink(Arc::new(MemorySink::new()))
            .on_error(|_| {})
            .start()
            .err()
            .unwrap();
        assert_eq!(err, SinkError::NoRuntime);
    }

    #[tokio::test]
    async fn test_zero_config_values_use_defaults() {
        let sink = BatchedSink::builder()
            .config(PipelineConfig::default().with_batch_size(0))
            .id_source(generator())
            .bulk_sink(Arc::new(MemorySink::new()))
            .on_error(|_| {})
            .start()
            .unwrap();
        assert_eq!(sink.config().batch_size, 100);
        sink.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_oversized_flush_interval_fails_before_start() {
        let err = BatchedSink::builder()
            .config(PipelineConfig::default().with_flush_interval_secs(u64::MAX))
            .id_source(generator())
            .bulk_sink(Arc::new(MemorySink::new()))
            .on_error(|_| {})
            .start()
            .err()
            .unwrap();
        assert!(matches!(err, SinkError::InvalidConfig(_)));
    }

    #[tokio::test]
    async fn test_submit_after_stop_is_closed() {
        let sink = BatchedSink::builder()
            .id_source(generator())
            .bulk_sink(Arc::new(MemorySink::new()))
            .on_error(|_| {})
            .start()
            .unwrap();
        let handle = sink.handle();
        sink.stop().await.unwrap();

        let err = handle
            .submit(Record::new("logs", serde_json::json!({})))
            .await
            .unwrap_err();
        assert_eq!(err, SinkError::Closed);
    }

    #[tokio::test]
    async fn test_try_submit_reports_full_channel() {
        // Current-thread runtime: the worker cannot drain until we yield.
        let sink = BatchedSink::builder()
            .config(PipelineConfig::default().with_channel_capacity(2))
            .id_source(generator())
            .bulk_sink(Arc::new(MemorySink::new()))
            .on_error(|_| {})
            .start()
            .unwrap();

        sink.try_submit(Record::new("logs", serde_json::json!(1))).unwrap();
        sink.try_submit(Record::new("logs", serde_json::json!(2))).unwrap();
        assert_eq!(
            sink.try_submit(Record::new("logs", serde_json::json!(3))),
            Err(SinkError::Full)
        );
        sink.stop().await.unwrap();
    }
}
