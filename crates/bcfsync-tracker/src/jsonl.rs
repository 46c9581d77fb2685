//! JSONL storage: one issue per line.
//!
//! Blank lines and `#` comment lines are skipped on read. Writes replace
//! the file atomically (see [`bcfsync_fsio::write_atomic`]).

use crate::issue::Issue;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

/// Errors from JSONL operations.
#[derive(Debug, thiserror::Error)]
pub enum JsonlError {
    #[error("line {0}: I/O error: {1}")]
    Io(usize, String),

    #[error("line {0}: parse error: {1}")]
    Parse(usize, String),

    #[error("serialization error: {0}")]
    Serialize(String),

    #[error("corrupted issues file: {0}")]
    Corrupt(String),
}

fn read_records<T: DeserializeOwned>(reader: impl BufRead) -> Result<Vec<T>, JsonlError> {
    let mut records = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line_no = index + 1;
        let line = line.map_err(|e| JsonlError::Io(line_no, e.to_string()))?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let record =
            serde_json::from_str(trimmed).map_err(|e| JsonlError::Parse(line_no, e.to_string()))?;
        records.push(record);
    }
    Ok(records)
}

fn write_records<T: Serialize>(writer: &mut impl Write, records: &[T]) -> Result<(), JsonlError> {
    for record in records {
        let line =
            serde_json::to_string(record).map_err(|e| JsonlError::Serialize(e.to_string()))?;
        writeln!(writer, "{line}").map_err(|e| JsonlError::Io(0, e.to_string()))?;
    }
    Ok(())
}

pub fn read_issues(reader: impl BufRead) -> Result<Vec<Issue>, JsonlError> {
    read_records(reader)
}

pub fn write_issues(writer: &mut impl Write, issues: &[Issue]) -> Result<(), JsonlError> {
    write_records(writer, issues)
}

/// Read issues from a JSONL file. A missing file reads as empty.
pub fn read_issues_from_path(path: impl AsRef<Path>) -> Result<Vec<Issue>, JsonlError> {
    let path = path.as_ref();
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(JsonlError::Io(0, format!("{}: {e}", path.display()))),
    };
    if bytes.contains(&0) {
        return Err(JsonlError::Corrupt(format!(
            "{}: contains NUL byte(s)",
            path.display()
        )));
    }
    if std::str::from_utf8(&bytes).is_err() {
        return Err(JsonlError::Corrupt(format!(
            "{}: contains non-UTF-8 byte sequence(s)",
            path.display()
        )));
    }
    read_issues(BufReader::new(bytes.as_slice()))
}

/// Replace the JSONL file at `path` with `issues`.
pub fn write_issues_to_path(path: impl AsRef<Path>, issues: &[Issue]) -> Result<(), JsonlError> {
    let mut payload = Vec::new();
    write_issues(&mut payload, issues)?;
    bcfsync_fsio::write_atomic(path.as_ref(), &payload)
        .map_err(|e| JsonlError::Io(0, e.to_string()))
}
