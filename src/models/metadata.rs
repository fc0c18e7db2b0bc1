//! Snapshot metadata records
//!
//! Every successful sync leaves a `backup_metadata.json` in the snapshot
//! directory. A sync that has not (yet) succeeded leaves an incomplete marker
//! instead, so an interrupted or failed transfer is never mistaken for a
//! restorable snapshot.
//!
//! Both documents are pretty-printed JSON. Unknown fields are ignored on read
//! so newer writers stay readable by older readers.

use std::path::PathBuf;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::retention::RetentionPolicy;
use super::snapshot_id::SnapshotId;
use crate::error::AeonResult;

/// Fixed file name of the metadata record inside a snapshot directory
pub const METADATA_FILE_NAME: &str = "backup_metadata.json";

/// Fixed file name of the incomplete marker inside a snapshot directory
pub const INCOMPLETE_MARKER_NAME: &str = ".aeonsync-incomplete.json";

/// Counters reported by the transfer tool
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferStats {
    /// Number of files in the transferred tree
    pub file_count: u64,
    /// Total size of those files in bytes
    pub total_size: u64,
}

/// Description of one completed snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotMetadata {
    /// Snapshot this record belongs to
    pub id: SnapshotId,
    /// Machine the snapshot was taken from
    #[serde(default)]
    pub hostname: String,
    /// When the sync started
    pub created_at: DateTime<Utc>,
    /// When the transfer finished
    pub completed_at: DateTime<Utc>,
    /// Absolute source paths that were backed up
    #[serde(default)]
    pub sources: Vec<PathBuf>,
    /// Exclusion patterns that were applied
    #[serde(default)]
    pub exclusions: Vec<String>,
    /// Total number of files
    #[serde(default)]
    pub file_count: u64,
    /// Total size in bytes
    #[serde(default)]
    pub total_size: u64,
    /// Creation date plus the retention period in force at creation
    pub expires_on: NaiveDate,
}

impl SnapshotMetadata {
    /// Build the record for a finished transfer
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: SnapshotId,
        hostname: impl Into<String>,
        created_at: DateTime<Utc>,
        completed_at: DateTime<Utc>,
        sources: Vec<PathBuf>,
        exclusions: Vec<String>,
        stats: TransferStats,
        retention: RetentionPolicy,
    ) -> Self {
        let expires_on = retention.expiry_date(created_at.date_naive());

        Self {
            id,
            hostname: hostname.into(),
            created_at,
            completed_at,
            sources,
            exclusions,
            file_count: stats.file_count,
            total_size: stats.total_size,
            expires_on,
        }
    }

    /// Calendar day the snapshot was created
    pub fn creation_date(&self) -> NaiveDate {
        self.created_at.date_naive()
    }

    /// Wall-clock duration of the transfer
    pub fn duration(&self) -> Duration {
        self.completed_at - self.created_at
    }

    /// Serialize for storage
    pub fn to_json(&self) -> AeonResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse a stored record; unparseable content yields `None`
    pub fn from_json(contents: &str) -> Option<Self> {
        match serde_json::from_str(contents) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!("Ignoring unreadable snapshot metadata: {}", e);
                None
            }
        }
    }
}

/// Why a snapshot directory is not restorable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IncompleteState {
    /// Transfer started and never reported back
    InProgress,
    /// Transfer finished with warnings
    Partial,
    /// Transfer failed
    Failed,
}

impl std::fmt::Display for IncompleteState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InProgress => write!(f, "in progress"),
            Self::Partial => write!(f, "partial"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Marker left in a snapshot directory until its metadata is written
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncompleteMarker {
    pub id: SnapshotId,
    pub started_at: DateTime<Utc>,
    pub state: IncompleteState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default)]
    pub warnings: u32,
}

impl IncompleteMarker {
    /// Marker for a transfer that is about to start
    pub fn in_progress(id: SnapshotId, started_at: DateTime<Utc>) -> Self {
        Self {
            id,
            started_at,
            state: IncompleteState::InProgress,
            reason: None,
            warnings: 0,
        }
    }

    /// The same marker, updated with the transfer's failure
    pub fn failed(self, reason: impl Into<String>) -> Self {
        Self {
            state: IncompleteState::Failed,
            reason: Some(reason.into()),
            ..self
        }
    }

    /// The same marker, updated with the transfer's warning count
    pub fn partial(self, warnings: u32) -> Self {
        Self {
            state: IncompleteState::Partial,
            reason: Some(format!("transfer finished with {} warning(s)", warnings)),
            warnings,
            ..self
        }
    }

    /// Serialize for storage
    pub fn to_json(&self) -> AeonResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse a stored marker; unparseable content yields `None`
    pub fn from_json(contents: &str) -> Option<Self> {
        serde_json::from_str(contents).ok()
    }
}
