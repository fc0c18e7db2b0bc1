//! The backup store seam
//!
//! Everything the core needs from the filesystem holding the snapshots goes
//! through [`SnapshotStore`]. Paths inside a snapshot are always relative to
//! the snapshot directory.

use std::path::Path;

use chrono::{DateTime, Utc};

use crate::error::AeonResult;
use crate::models::SnapshotId;

/// Name of the alias pointing at the newest snapshot
pub const LATEST_ALIAS: &str = "latest";

/// One child of the host directory as found by a scan
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawEntry {
    /// Directory name, not yet validated as a snapshot id
    pub name: String,
    /// Contents of the metadata record, if the file exists
    pub metadata: Option<String>,
    /// Contents of the incomplete marker, if the file exists
    pub marker: Option<String>,
}

/// What a path inside a snapshot is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathInfo {
    pub is_dir: bool,
    pub size: u64,
    pub modified: Option<DateTime<Utc>>,
}

/// Filesystem holding `<root>/<hostname>/<snapshot id>/...`
pub trait SnapshotStore {
    /// Human-readable location of the host directory
    fn location(&self) -> String;

    /// List the immediate children of the host directory in one pass
    ///
    /// A missing host directory is an empty store, not an error.
    fn scan(&self) -> AeonResult<Vec<RawEntry>>;

    /// Create a fresh snapshot directory
    ///
    /// Fails with `ConcurrentSync` if the directory already exists.
    fn create_snapshot_dir(&self, id: &SnapshotId) -> AeonResult<()>;

    /// Write a file at the top of a snapshot directory with an atomic replace
    fn write_file(&self, id: &SnapshotId, name: &str, contents: &[u8]) -> AeonResult<()>;

    /// Remove a file at the top of a snapshot directory; missing is fine
    fn remove_file(&self, id: &SnapshotId, name: &str) -> AeonResult<()>;

    /// Remove a whole snapshot directory
    fn remove_snapshot(&self, id: &SnapshotId) -> AeonResult<()>;

    /// Point the `latest` alias at a snapshot
    fn update_latest(&self, id: &SnapshotId) -> AeonResult<()>;

    /// Stat a path inside a snapshot; `None` when it does not exist
    fn stat(&self, id: &SnapshotId, rel: &Path) -> AeonResult<Option<PathInfo>>;

    /// Read at most `limit` bytes from the start of a file inside a snapshot
    fn read(&self, id: &SnapshotId, rel: &Path, limit: usize) -> AeonResult<Vec<u8>>;

    /// Absolute path of a snapshot directory on the store's filesystem
    fn snapshot_path(&self, id: &SnapshotId) -> String;

    /// Location of a snapshot (or a path inside it) as the transfer tool expects it
    fn transfer_location(&self, id: &SnapshotId, rel: Option<&Path>) -> String;
}

/// Join a snapshot-relative path onto a base using `/` separators
pub(crate) fn join_remote(base: &str, rel: &Path) -> String {
    let rel = rel.to_string_lossy();
    let rel = rel.trim_start_matches('/');
    if rel.is_empty() {
        base.to_string()
    } else {
        format!("{}/{}", base.trim_end_matches('/'), rel)
    }
}
