//! Restore resolution
//!
//! Turns a (file, optional date) request into a concrete snapshot and path.
//! Paths handed to the resolver are relative to a snapshot directory, in the
//! `<source basename>/<path under that source>` layout the sync produces.

use std::path::{Component, Path, PathBuf};

use chrono::{NaiveDate, Utc};
use tracing::{debug, info};

use super::diff::{diff_bytes, preview_bytes, FileDiff, Preview, DIFF_READ_LIMIT, PREVIEW_BYTES};
use super::journal::{RestoreJournal, RestoreRecord};
use crate::catalog::Catalog;
use crate::error::{AeonError, AeonResult};
use crate::models::SnapshotId;
use crate::storage::{PathInfo, SnapshotStore};
use crate::transfer::{FetchRequest, Transfer, TransferOutcome};

/// Map a local absolute path to its location inside a snapshot
///
/// The innermost configured source containing `local` wins.
pub fn map_path(sources: &[PathBuf], local: &Path) -> AeonResult<PathBuf> {
    let local = normalize(local);

    sources
        .iter()
        .filter_map(|source| {
            let source = normalize(source);
            let rest = local.strip_prefix(&source).ok()?;
            let mut mapped = PathBuf::from(source.file_name()?);
            if !rest.as_os_str().is_empty() {
                mapped.push(rest);
            }
            Some((source.components().count(), mapped))
        })
        .max_by_key(|(depth, _)| *depth)
        .map(|(_, mapped)| mapped)
        .ok_or_else(|| {
            AeonError::Validation(format!(
                "{} is not inside any configured source directory",
                local.display()
            ))
        })
}

/// Lexically drop `.` and resolve `..` without touching the filesystem
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Where a restore writes by default
pub fn default_destination(local: &Path, output_dir: Option<&Path>) -> PathBuf {
    match (output_dir, local.file_name()) {
        (Some(dir), Some(name)) => dir.join(name),
        _ => local.to_path_buf(),
    }
}

/// A fully resolved restore, ready to confirm and run
#[derive(Debug, Clone, PartialEq)]
pub struct RestorePlan {
    pub snapshot: SnapshotId,
    /// Path inside the snapshot
    pub source: PathBuf,
    pub destination: PathBuf,
    /// The snapshot copy
    pub info: PathInfo,
}

/// Resolves restore requests against one catalog
pub struct RestoreResolver<'a> {
    store: &'a dyn SnapshotStore,
    catalog: &'a Catalog,
}

impl<'a> RestoreResolver<'a> {
    pub fn new(store: &'a dyn SnapshotStore, catalog: &'a Catalog) -> Self {
        Self { store, catalog }
    }

    pub fn catalog(&self) -> &Catalog {
        self.catalog
    }

    /// Stat `file` in `id`, failing if it is not there
    pub fn locate(&self, file: &Path, id: &SnapshotId) -> AeonResult<PathInfo> {
        self.store
            .stat(id, file)?
            .ok_or_else(|| AeonError::file_not_found(file.display().to_string(), id))
    }

    /// Snapshot to restore `file` from, as of `date` or the latest
    pub fn resolve_version(&self, file: &Path, date: Option<NaiveDate>) -> AeonResult<SnapshotId> {
        let id = self.catalog.resolve(date)?;
        self.locate(file, &id)?;
        debug!("Resolved {} to snapshot {}", file.display(), id);
        Ok(id)
    }

    /// Every restorable snapshot holding `file`, oldest first
    pub fn list_versions(&self, file: &Path) -> AeonResult<Vec<SnapshotId>> {
        let mut versions = Vec::new();
        for entry in self.catalog.restorable() {
            if self.store.stat(&entry.id, file)?.is_some() {
                versions.push(entry.id);
            }
        }
        Ok(versions)
    }

    /// Compare `file` between two snapshots
    pub fn diff(&self, file: &Path, a: &SnapshotId, b: &SnapshotId) -> AeonResult<FileDiff> {
        let old = self.read_for_diff(file, a)?;
        let new = self.read_for_diff(file, b)?;
        Ok(compare(
            old,
            new,
            &format!("{}/{}", a, file.display()),
            &format!("{}/{}", b, file.display()),
        ))
    }

    /// Compare the snapshot copy of `file` with the file on disk now
    pub fn diff_local(&self, file: &Path, id: &SnapshotId, local: &Path) -> AeonResult<FileDiff> {
        let old = self.read_for_diff(file, id)?;
        let current = read_local_for_diff(local)?;
        Ok(compare(
            old,
            current,
            &format!("{}/{}", id, file.display()),
            &local.display().to_string(),
        ))
    }

    /// First lines of the snapshot copy of `file`
    pub fn preview(&self, file: &Path, id: &SnapshotId) -> AeonResult<Preview> {
        let info = self.locate(file, id)?;
        if info.is_dir {
            return Ok(Preview::NotPreviewable);
        }
        // One extra byte tells a capped file from one that fits exactly
        let prefix = self.store.read(id, file, PREVIEW_BYTES + 1)?;
        Ok(preview_bytes(&prefix))
    }

    /// Resolve everything a restore needs without copying anything
    pub fn plan(
        &self,
        file: &Path,
        id: SnapshotId,
        destination: PathBuf,
    ) -> AeonResult<RestorePlan> {
        let info = self.locate(file, &id)?;
        Ok(RestorePlan {
            snapshot: id,
            source: file.to_path_buf(),
            destination,
            info,
        })
    }

    /// Copy the planned path out of its snapshot and journal it
    pub fn restore(
        &self,
        plan: &RestorePlan,
        transfer: &dyn Transfer,
        journal: &RestoreJournal,
        verbose: bool,
    ) -> AeonResult<RestoreRecord> {
        let parent = if plan.info.is_dir {
            Some(plan.destination.as_path())
        } else {
            plan.destination.parent()
        };
        if let Some(dir) = parent.filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir).map_err(|e| {
                AeonError::Io(format!("Failed to create {}: {}", dir.display(), e))
            })?;
        }

        let request = FetchRequest {
            source: self
                .store
                .transfer_location(&plan.snapshot, Some(&plan.source)),
            destination: plan.destination.clone(),
            is_dir: plan.info.is_dir,
            verbose,
        };

        match transfer.fetch(&request)? {
            TransferOutcome::Success(_) => {}
            TransferOutcome::Partial { warnings, .. } => {
                return Err(AeonError::TransferFailed(format!(
                    "restore finished with {} warning(s)",
                    warnings
                )))
            }
            TransferOutcome::Failed(reason) => return Err(AeonError::TransferFailed(reason)),
        }

        let record = RestoreRecord {
            timestamp: Utc::now(),
            snapshot: plan.snapshot,
            source: plan.source.clone(),
            destination: plan.destination.clone(),
            is_dir: plan.info.is_dir,
        };
        journal.record(&record)?;

        info!(
            "Restored {} from {} to {}",
            plan.source.display(),
            plan.snapshot,
            plan.destination.display()
        );
        Ok(record)
    }

    /// Size of the snapshot copy and its content when under the diff cap
    fn read_for_diff(&self, file: &Path, id: &SnapshotId) -> AeonResult<(u64, Option<Vec<u8>>)> {
        let info = self.locate(file, id)?;
        if info.is_dir {
            return Err(AeonError::Validation(format!(
                "{} is a directory in snapshot {}",
                file.display(),
                id
            )));
        }
        if info.size > DIFF_READ_LIMIT as u64 {
            return Ok((info.size, None));
        }
        // One extra byte catches a file that grew after it was listed
        let content = self.store.read(id, file, DIFF_READ_LIMIT + 1)?;
        Ok(within_diff_limit(content))
    }
}

fn read_local_for_diff(local: &Path) -> AeonResult<(u64, Option<Vec<u8>>)> {
    let unreadable = |e: std::io::Error| {
        AeonError::Validation(format!("Cannot read local file {}: {}", local.display(), e))
    };
    let size = std::fs::metadata(local).map_err(unreadable)?.len();
    if size > DIFF_READ_LIMIT as u64 {
        return Ok((size, None));
    }
    let content = std::fs::read(local).map_err(unreadable)?;
    Ok(within_diff_limit(content))
}

fn within_diff_limit(content: Vec<u8>) -> (u64, Option<Vec<u8>>) {
    let size = content.len() as u64;
    if content.len() > DIFF_READ_LIMIT {
        (size, None)
    } else {
        (size, Some(content))
    }
}

fn compare(
    old: (u64, Option<Vec<u8>>),
    new: (u64, Option<Vec<u8>>),
    old_label: &str,
    new_label: &str,
) -> FileDiff {
    match (old, new) {
        ((_, Some(old)), (_, Some(new))) => diff_bytes(&old, &new, old_label, new_label),
        ((old_size, _), (new_size, _)) => FileDiff::TooLarge { old_size, new_size },
    }
}
