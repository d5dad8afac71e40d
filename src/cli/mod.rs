//! CLI module for snowbatch
//!
//! Provides command-line interface for:
//! - generate: Print new identifiers
//! - decode: Split an identifier into its components
//! - ingest: Stream NDJSON records through a batched pipeline

mod args;
mod commands;
mod config;
mod errors;
mod io;

pub use args::{Cli, Command};
pub use commands::{decode, generate, ingest, ingest_from, run, run_command, DecodedId, IngestSummary};
pub use config::AppConfig;
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{parse_record, write_json};
