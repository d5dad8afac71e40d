//! CLI command implementations
//!
//! `generate` and `decode` are synchronous. `ingest` owns a tokio runtime
//! for the lifetime of the pipeline.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{SecondsFormat, TimeZone, Utc};
use serde::Serialize;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::id::{decode as decode_id, GeneratorConfig, IdParts, Identifier, IdentityGenerator};
use crate::observability::{init_logging, MetricsSnapshot};
use crate::sink::{BatchedSink, JsonLinesSink, PipelineConfig};

use super::args::{Cli, Command};
use super::config::AppConfig;
use super::errors::{CliError, CliResult};
use super::io::{parse_record, write_json};

/// How often `ingest` checks whether the pipeline has settled
const SETTLE_POLL: Duration = Duration::from_millis(50);

/// Entry point used by the binary
pub fn run() -> CliResult<()> {
    let cli = Cli::parse_args();
    init_logging(cli.log_format)?;
    run_command(cli.command)
}

/// Run a CLI command
pub fn run_command(command: Command) -> CliResult<()> {
    match command {
        Command::Generate {
            site,
            shard,
            count,
            epoch,
        } => {
            for id in generate(site, shard, count, epoch)? {
                println!("{}", id);
            }
            Ok(())
        }
        Command::Decode { id, epoch } => write_json(&decode(&id, epoch)?),
        Command::Ingest {
            config,
            output,
            fail_rate,
        } => {
            let summary = ingest(&config, &output, fail_rate)?;
            write_json(&summary)
        }
    }
}

/// Generates `count` identifiers from a fresh generator.
pub fn generate(site: i64, shard: i64, count: usize, epoch: i64) -> CliResult<Vec<Identifier>> {
    let config = GeneratorConfig {
        epoch_millis: epoch,
        ..GeneratorConfig::new(site, shard)
    };
    let generator = IdentityGenerator::from_config(config)?;

    let mut ids = Vec::with_capacity(count);
    for _ in 0..count {
        ids.push(generator.next_id()?);
    }
    Ok(ids)
}

/// Decoded identifier as printed by `decode`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecodedId {
    pub id: Identifier,
    #[serde(flatten)]
    pub parts: IdParts,
    /// Issue time in RFC 3339
    pub time: String,
}

pub fn decode(raw: &str, epoch: i64) -> CliResult<DecodedId> {
    let id: Identifier = raw.trim().parse()?;
    let parts = decode_id(id, epoch);
    let time = Utc
        .timestamp_millis_opt(parts.timestamp_millis)
        .single()
        .map(|t| t.to_rfc3339_opts(SecondsFormat::Millis, true))
        .ok_or_else(|| {
            CliError::io_error(format!(
                "timestamp {} ms is not representable",
                parts.timestamp_millis
            ))
        })?;

    Ok(DecodedId { id, parts, time })
}

/// Result of an `ingest` run
#[derive(Debug, Clone, Serialize)]
pub struct IngestSummary {
    /// Records read from the input
    pub records_read: u64,
    /// Failure reports delivered to the callback
    pub errors_reported: u64,
    /// Records still pending when the pipeline stopped
    pub abandoned_pending: usize,
    pub metrics: MetricsSnapshot,
}

/// Streams stdin records through a pipeline into `output`.
pub fn ingest(config_path: &Path, output: &Path, fail_rate: f64) -> CliResult<IngestSummary> {
    let config = AppConfig::load(config_path)?;

    let runtime = tokio::runtime::Runtime::new()
        .map_err(|e| CliError::pipeline_error(format!("Failed to create runtime: {}", e)))?;

    runtime.block_on(async move {
        let stdin = BufReader::new(tokio::io::stdin());
        ingest_from(config, output, fail_rate, stdin).await
    })
}

/// Runs the pipeline over any line source. Waits until every accepted
/// record is stored or dropped, bounded by a deadline derived from the
/// flush interval and retry limit.
pub async fn ingest_from<R>(
    config: AppConfig,
    output: &Path,
    fail_rate: f64,
    input: R,
) -> CliResult<IngestSummary>
where
    R: tokio::io::AsyncBufRead + Unpin,
{
    let generator = Arc::new(IdentityGenerator::from_config(config.generator.clone())?);
    let sink = JsonLinesSink::open(output)
        .await
        .map_err(|e| CliError::io_error(format!("Failed to open {}: {}", output.display(), e)))?
        .with_fail_rate(fail_rate);

    let errors = Arc::new(AtomicU64::new(0));
    let errors_cb = Arc::clone(&errors);

    let pipeline = BatchedSink::builder()
        .config(config.pipeline.clone())
        .id_source(generator)
        .bulk_sink(Arc::new(sink))
        .on_error(move |_| {
            errors_cb.fetch_add(1, Ordering::Relaxed);
        })
        .start()?;

    let mut lines = input.lines();
    let mut records_read = 0u64;
    while let Some(line) = lines.next_line().await? {
        let Some(record) = parse_record(&line)? else {
            continue;
        };
        pipeline.submit(record).await?;
        records_read += 1;
    }

    let metrics = pipeline.metrics();
    let deadline = settle_deadline(pipeline.config(), tokio::time::Instant::now());
    loop {
        let snapshot = metrics.snapshot();
        let received = snapshot.records_accepted + snapshot.records_rejected;
        if received >= records_read && snapshot.in_flight() == 0 {
            break;
        }
        if deadline.is_some_and(|d| tokio::time::Instant::now() >= d) {
            tracing::warn!(
                in_flight = snapshot.in_flight(),
                "Pipeline did not settle before deadline"
            );
            break;
        }
        tokio::time::sleep(SETTLE_POLL).await;
    }

    let stop = pipeline.stop().await?;

    Ok(IngestSummary {
        records_read,
        errors_reported: errors.load(Ordering::Relaxed),
        abandoned_pending: stop.abandoned_pending,
        metrics: metrics.snapshot(),
    })
}

/// Latest instant `ingest` waits for the pipeline to settle: one flush
/// interval per attempt plus one. `None` when that lies beyond what
/// `Instant` can represent.
pub fn settle_deadline(
    config: &PipelineConfig,
    from: tokio::time::Instant,
) -> Option<tokio::time::Instant> {
    let rounds = config.retry_limit.saturating_add(2);
    from.checked_add(config.flush_interval().saturating_mul(rounds))
}
