//! CLI argument definitions using clap
//!
//! Commands:
//! - snowbatch generate --site <n> --shard <n> [--count <n>]
//! - snowbatch decode <id> [--epoch <ms>]
//! - snowbatch ingest --config <path> --output <path> [--fail-rate <f>]

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::id::DEFAULT_EPOCH_MILLIS;
use crate::observability::LogFormat;

/// snowbatch - batched bulk writes with snowflake identifiers
#[derive(Parser, Debug)]
#[command(name = "snowbatch")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Log output format: human or json
    #[arg(long, global = true, default_value = "human")]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print freshly generated identifiers, one per line
    Generate {
        /// Site id (0-31)
        #[arg(long)]
        site: i64,

        /// Shard id (0-31)
        #[arg(long)]
        shard: i64,

        /// Number of identifiers
        #[arg(long, default_value_t = 1)]
        count: usize,

        /// Epoch in Unix milliseconds
        #[arg(long, default_value_t = DEFAULT_EPOCH_MILLIS)]
        epoch: i64,
    },

    /// Split an identifier into its components
    Decode {
        /// Identifier in decimal form
        id: String,

        /// Epoch the identifier was issued under, in Unix milliseconds
        #[arg(long, default_value_t = DEFAULT_EPOCH_MILLIS)]
        epoch: i64,
    },

    /// Stream NDJSON records from stdin into a JSON-lines file
    Ingest {
        /// Path to configuration file
        #[arg(long, default_value = "./snowbatch.json")]
        config: PathBuf,

        /// Output file, appended to
        #[arg(long)]
        output: PathBuf,

        /// Share of items the output sink rejects (0.0-1.0)
        #[arg(long, default_value_t = 0.0)]
        fail_rate: f64,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
