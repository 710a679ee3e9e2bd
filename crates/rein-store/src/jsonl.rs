//! Append-only JSON Lines files.

use serde::Serialize;
use serde::de::DeserializeOwned;
use std::io::Write;
use std::path::Path;
use tracing::debug;

use rein_core::{ReinError, Result};

/// Append one record as a single line, creating the file and its parents.
pub fn append<T: Serialize>(path: &Path, record: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| ReinError::store(path, e))?;
    }
    let mut line = serde_json::to_string(record)?;
    line.push('\n');
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| ReinError::store(path, e))?;
    file.write_all(line.as_bytes())
        .map_err(|e| ReinError::store(path, e))?;
    Ok(())
}

/// Read every parseable record. Missing files read as empty; malformed
/// lines are skipped.
pub fn read_all<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(ReinError::store(path, e)),
    };

    let mut records = Vec::new();
    for (lineno, line) in raw.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str(line) {
            Ok(record) => records.push(record),
            Err(e) => debug!(?path, line = lineno + 1, error = %e, "skipping malformed record"),
        }
    }
    Ok(records)
}
