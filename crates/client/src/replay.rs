//! Recorded gateway traffic: one `{"t": NAME, "d": PAYLOAD}` object per line.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};

/// One dispatch as the gateway delivered it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedEvent {
    /// Event name, e.g. `MESSAGE_CREATE`.
    pub t: String,
    /// Event payload.
    #[serde(default)]
    pub d: Value,
}

#[derive(Debug, thiserror::Error)]
pub enum ReplayError {
    #[error("Failed to read event log at {path}: {reason}")]
    Read { path: PathBuf, reason: String },

    #[error("Invalid record on line {line}: {reason}")]
    Parse { line: usize, reason: String },
}

/// Parse a JSON-lines event log. Blank lines and lines starting with `#`
/// are skipped; line numbers in errors are 1-based.
pub fn parse_log(input: &str) -> Result<Vec<RecordedEvent>, ReplayError> {
    input
        .lines()
        .enumerate()
        .filter(|(_, line)| {
            let line = line.trim();
            !line.is_empty() && !line.starts_with('#')
        })
        .map(|(index, line)| {
            serde_json::from_str(line).map_err(|e| ReplayError::Parse {
                line: index + 1,
                reason: e.to_string(),
            })
        })
        .collect()
}

pub fn read_log(path: &Path) -> Result<Vec<RecordedEvent>, ReplayError> {
    let content = std::fs::read_to_string(path).map_err(|e| ReplayError::Read {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    parse_log(&content)
}
