//! Restore journal
//!
//! Every completed restore is appended to the journal as a single JSON line
//! and flushed immediately.

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AeonError, AeonResult};
use crate::models::SnapshotId;

/// One completed restore
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestoreRecord {
    pub timestamp: DateTime<Utc>,
    pub snapshot: SnapshotId,
    /// Path inside the snapshot
    pub source: PathBuf,
    /// Local path written
    pub destination: PathBuf,
    #[serde(default)]
    pub is_dir: bool,
}

/// Append-only JSONL log of restores
pub struct RestoreJournal {
    log_path: PathBuf,
}

impl RestoreJournal {
    pub fn new(log_path: PathBuf) -> Self {
        Self { log_path }
    }

    /// Append a record
    pub fn record(&self, record: &RestoreRecord) -> AeonResult<()> {
        if let Some(parent) = self.log_path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| AeonError::Io(format!("Failed to create log directory: {}", e)))?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_path)
            .map_err(|e| AeonError::Io(format!("Failed to open restore log: {}", e)))?;

        let json = serde_json::to_string(record)
            .map_err(|e| AeonError::Json(format!("Failed to serialize restore record: {}", e)))?;

        writeln!(file, "{}", json)
            .map_err(|e| AeonError::Io(format!("Failed to write restore record: {}", e)))?;

        file.flush()
            .map_err(|e| AeonError::Io(format!("Failed to flush restore log: {}", e)))?;

        Ok(())
    }

    /// All records, oldest first
    pub fn read_all(&self) -> AeonResult<Vec<RestoreRecord>> {
        if !self.log_path.exists() {
            return Ok(Vec::new());
        }

        let file = File::open(&self.log_path)
            .map_err(|e| AeonError::Io(format!("Failed to open restore log: {}", e)))?;

        let mut records = Vec::new();
        for (line_num, line) in BufReader::new(file).lines().enumerate() {
            let line = line.map_err(|e| {
                AeonError::Io(format!("Failed to read restore log line {}: {}", line_num + 1, e))
            })?;
            if line.trim().is_empty() {
                continue;
            }

            let record = serde_json::from_str(&line).map_err(|e| {
                AeonError::Json(format!(
                    "Failed to parse restore record at line {}: {}",
                    line_num + 1,
                    e
                ))
            })?;
            records.push(record);
        }

        Ok(records)
    }

    pub fn path(&self) -> &Path {
        &self.log_path
    }
}
