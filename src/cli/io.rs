//! JSON I/O handling for the CLI
//!
//! - Input: one record per line (NDJSON) via stdin
//! - Output: JSON objects via stdout, one per line
//! - UTF-8 only

use std::io::{self, Write};

use serde::Serialize;

use crate::sink::Record;

use super::errors::{CliError, CliResult};

/// Parses one NDJSON input line. Blank lines yield `None`.
pub fn parse_record(line: &str) -> CliResult<Option<Record>> {
    if line.trim().is_empty() {
        return Ok(None);
    }
    serde_json::from_str(line)
        .map(Some)
        .map_err(|e| CliError::io_error(format!("Invalid record: {}", e)))
}

/// Writes a value as one JSON line to stdout
pub fn write_json<T: Serialize>(value: &T) -> CliResult<()> {
    let mut stdout = io::stdout();
    serde_json::to_writer(&mut stdout, value)?;
    writeln!(stdout)?;
    stdout.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_record_line() {
        let record = parse_record(r#"{"collection":"logs","document":{"a":1}}"#)
            .unwrap()
            .unwrap();
        assert_eq!(record.collection, "logs");
    }

    #[test]
    fn test_blank_line_is_skipped() {
        assert!(parse_record("   ").unwrap().is_none());
    }

    #[test]
    fn test_malformed_line_is_io_error() {
        let err = parse_record("{not json").unwrap_err();
        assert!(err.message().starts_with("Invalid record"));
    }
}
