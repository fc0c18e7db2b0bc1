//! Store backed by a directory on this machine
//!
//! Used for backup roots on locally mounted disks and network shares.

use std::fs::{self, File};
use std::io::{ErrorKind, Read};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::debug;

use super::file_io::write_atomic;
use super::store::{PathInfo, RawEntry, SnapshotStore, LATEST_ALIAS};
use crate::error::{AeonError, AeonResult};
use crate::models::{SnapshotId, INCOMPLETE_MARKER_NAME, METADATA_FILE_NAME};

/// Snapshot store rooted at a local host directory
#[derive(Debug, Clone)]
pub struct LocalStore {
    host_root: PathBuf,
}

impl LocalStore {
    /// Create a store for `<backup root>/<hostname>`
    pub fn new(host_root: impl Into<PathBuf>) -> Self {
        Self {
            host_root: host_root.into(),
        }
    }

    /// The host directory
    pub fn host_root(&self) -> &Path {
        &self.host_root
    }

    fn dir(&self, id: &SnapshotId) -> PathBuf {
        self.host_root.join(id.to_string())
    }
}

impl SnapshotStore for LocalStore {
    fn location(&self) -> String {
        self.host_root.display().to_string()
    }

    fn scan(&self) -> AeonResult<Vec<RawEntry>> {
        let entries = match fs::read_dir(&self.host_root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(AeonError::Io(format!(
                    "Failed to read backup directory {}: {}",
                    self.host_root.display(),
                    e
                )))
            }
        };

        let mut raw = Vec::new();
        for entry in entries {
            let entry = entry
                .map_err(|e| AeonError::Io(format!("Failed to read directory entry: {}", e)))?;

            // The latest alias is a symlink and never a snapshot
            if !entry.file_type().map(|t| t.is_dir()).unwrap_or(false) {
                continue;
            }

            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };

            let path = entry.path();
            raw.push(RawEntry {
                name,
                metadata: fs::read_to_string(path.join(METADATA_FILE_NAME)).ok(),
                marker: fs::read_to_string(path.join(INCOMPLETE_MARKER_NAME)).ok(),
            });
        }

        Ok(raw)
    }

    fn create_snapshot_dir(&self, id: &SnapshotId) -> AeonResult<()> {
        fs::create_dir_all(&self.host_root).map_err(|e| {
            AeonError::Io(format!(
                "Failed to create backup directory {}: {}",
                self.host_root.display(),
                e
            ))
        })?;

        let dir = self.dir(id);
        match fs::create_dir(&dir) {
            Ok(()) => {
                debug!("Created snapshot directory {}", dir.display());
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                Err(AeonError::ConcurrentSync(dir.display().to_string()))
            }
            Err(e) => Err(AeonError::Io(format!(
                "Failed to create snapshot directory {}: {}",
                dir.display(),
                e
            ))),
        }
    }

    fn write_file(&self, id: &SnapshotId, name: &str, contents: &[u8]) -> AeonResult<()> {
        write_atomic(self.dir(id).join(name), contents)
    }

    fn remove_file(&self, id: &SnapshotId, name: &str) -> AeonResult<()> {
        match fs::remove_file(self.dir(id).join(name)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AeonError::Io(format!("Failed to remove {}: {}", name, e))),
        }
    }

    fn remove_snapshot(&self, id: &SnapshotId) -> AeonResult<()> {
        let dir = self.dir(id);
        fs::remove_dir_all(&dir).map_err(|e| {
            AeonError::Io(format!(
                "Failed to remove snapshot {}: {}",
                dir.display(),
                e
            ))
        })
    }

    fn update_latest(&self, id: &SnapshotId) -> AeonResult<()> {
        let alias = self.host_root.join(LATEST_ALIAS);
        let staging = self.host_root.join(format!("{}.tmp", LATEST_ALIAS));
        let _ = fs::remove_file(&staging);

        link_alias(&id.to_string(), &staging)
            .map_err(|e| AeonError::Io(format!("Failed to create latest alias: {}", e)))?;

        fs::rename(&staging, &alias).map_err(|e| {
            let _ = fs::remove_file(&staging);
            AeonError::Io(format!("Failed to update latest alias: {}", e))
        })
    }

    fn stat(&self, id: &SnapshotId, rel: &Path) -> AeonResult<Option<PathInfo>> {
        let path = self.dir(id).join(rel);
        match fs::metadata(&path) {
            Ok(meta) => Ok(Some(PathInfo {
                is_dir: meta.is_dir(),
                size: meta.len(),
                modified: meta.modified().ok().map(DateTime::<Utc>::from),
            })),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AeonError::Io(format!(
                "Failed to stat {}: {}",
                path.display(),
                e
            ))),
        }
    }

    fn read(&self, id: &SnapshotId, rel: &Path, limit: usize) -> AeonResult<Vec<u8>> {
        let path = self.dir(id).join(rel);
        let file = File::open(&path)
            .map_err(|e| AeonError::Io(format!("Failed to open {}: {}", path.display(), e)))?;

        let mut buf = Vec::new();
        file.take(limit as u64)
            .read_to_end(&mut buf)
            .map_err(|e| AeonError::Io(format!("Failed to read {}: {}", path.display(), e)))?;
        Ok(buf)
    }

    fn snapshot_path(&self, id: &SnapshotId) -> String {
        self.dir(id).display().to_string()
    }

    fn transfer_location(&self, id: &SnapshotId, rel: Option<&Path>) -> String {
        match rel {
            Some(rel) => self.dir(id).join(rel).display().to_string(),
            None => self.snapshot_path(id),
        }
    }
}

#[cfg(unix)]
fn link_alias(target: &str, link: &Path) -> std::io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

// Without symlinks the alias is a plain file naming the snapshot.
#[cfg(not(unix))]
fn link_alias(target: &str, link: &Path) -> std::io::Result<()> {
    fs::write(link, target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn id(s: &str) -> SnapshotId {
        SnapshotId::parse(s).unwrap()
    }

    #[test]
    fn test_scan_missing_root_is_empty() {
        let temp = TempDir::new().unwrap();
        let store = LocalStore::new(temp.path().join("laptop"));
        assert!(store.scan().unwrap().is_empty());
    }

    #[test]
    fn test_scan_reads_metadata_and_marker() {
        let temp = TempDir::new().unwrap();
        let store = LocalStore::new(temp.path().join("laptop"));

        store.create_snapshot_dir(&id("2024-03-13")).unwrap();
        store.write_file(&id("2024-03-13"), METADATA_FILE_NAME, b"{}").unwrap();
        store.create_snapshot_dir(&id("2024-03-14")).unwrap();
        store.write_file(&id("2024-03-14"), INCOMPLETE_MARKER_NAME, b"marker").unwrap();
        fs::write(store.host_root().join("notes.txt"), "not a snapshot").unwrap();

        let mut entries = store.scan().unwrap();
        entries.sort_by(|a, b| a.name.cmp(&b.name));

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].metadata.as_deref(), Some("{}"));
        assert!(entries[0].marker.is_none());
        assert_eq!(entries[1].marker.as_deref(), Some("marker"));
    }

    #[test]
    fn test_create_existing_dir_is_concurrent_sync() {
        let temp = TempDir::new().unwrap();
        let store = LocalStore::new(temp.path().join("laptop"));

        store.create_snapshot_dir(&id("2024-03-13")).unwrap();
        let err = store.create_snapshot_dir(&id("2024-03-13")).unwrap_err();
        assert!(matches!(err, AeonError::ConcurrentSync(_)));
    }

    #[cfg(unix)]
    #[test]
    fn test_latest_alias_is_replaced_and_skipped_by_scan() {
        let temp = TempDir::new().unwrap();
        let store = LocalStore::new(temp.path().join("laptop"));

        store.create_snapshot_dir(&id("2024-03-13")).unwrap();
        store.create_snapshot_dir(&id("2024-03-14")).unwrap();
        store.update_latest(&id("2024-03-13")).unwrap();
        store.update_latest(&id("2024-03-14")).unwrap();

        let alias = store.host_root().join(LATEST_ALIAS);
        assert_eq!(fs::read_link(&alias).unwrap(), PathBuf::from("2024-03-14"));
        assert_eq!(store.scan().unwrap().len(), 2);
    }

    #[test]
    fn test_stat_and_read() {
        let temp = TempDir::new().unwrap();
        let store = LocalStore::new(temp.path().join("laptop"));
        let snap = id("2024-03-13");
        store.create_snapshot_dir(&snap).unwrap();

        let file = Path::new("user/notes.txt");
        fs::create_dir_all(store.host_root().join("2024-03-13/user")).unwrap();
        fs::write(store.host_root().join("2024-03-13/user/notes.txt"), "hello world").unwrap();

        let info = store.stat(&snap, file).unwrap().unwrap();
        assert!(!info.is_dir);
        assert_eq!(info.size, 11);
        assert!(store.stat(&snap, Path::new("user")).unwrap().unwrap().is_dir);
        assert!(store.stat(&snap, Path::new("user/missing")).unwrap().is_none());

        assert_eq!(store.read(&snap, file, 5).unwrap(), b"hello");
    }

    #[test]
    fn test_remove_snapshot() {
        let temp = TempDir::new().unwrap();
        let store = LocalStore::new(temp.path().join("laptop"));
        let snap = id("2024-03-13");
        store.create_snapshot_dir(&snap).unwrap();
        store.write_file(&snap, METADATA_FILE_NAME, b"{}").unwrap();

        store.remove_file(&snap, INCOMPLETE_MARKER_NAME).unwrap();
        store.remove_snapshot(&snap).unwrap();
        assert!(store.scan().unwrap().is_empty());
    }
}
