//! Sync planning and execution
//!
//! A sync allocates a fresh snapshot id, links it against the newest
//! restorable snapshot and hands the copy to the transfer tool. The snapshot
//! directory carries an incomplete marker from the moment it is created
//! until its metadata record is on disk.

use chrono::{DateTime, NaiveDate, Utc};
use tracing::{info, warn};

use crate::catalog::Catalog;
use crate::config::BackupConfig;
use crate::error::{AeonError, AeonResult};
use crate::models::{
    IncompleteMarker, SnapshotId, SnapshotMetadata, TransferStats, INCOMPLETE_MARKER_NAME,
    METADATA_FILE_NAME,
};
use crate::storage::SnapshotStore;
use crate::transfer::{PushRequest, Transfer, TransferOutcome};

/// What a sync did
#[derive(Debug, Clone, PartialEq)]
pub enum SyncStatus {
    /// A new snapshot was written
    Created(SnapshotMetadata),
    /// Daily mode found today's snapshot and only re-pointed the alias
    AlreadyCurrent,
    /// Nothing was written
    DryRun(TransferStats),
}

/// Result of a sync
#[derive(Debug, Clone, PartialEq)]
pub struct SyncReport {
    pub id: SnapshotId,
    pub link_source: Option<SnapshotId>,
    pub status: SyncStatus,
}

/// Runs one backup cycle against a store
pub struct SyncPlanner<'a> {
    store: &'a dyn SnapshotStore,
    transfer: &'a dyn Transfer,
    config: &'a BackupConfig,
}

impl<'a> SyncPlanner<'a> {
    pub fn new(
        store: &'a dyn SnapshotStore,
        transfer: &'a dyn Transfer,
        config: &'a BackupConfig,
    ) -> Self {
        Self {
            store,
            transfer,
            config,
        }
    }

    /// Snapshot the new one is hard-linked against; `None` means a full copy
    pub fn plan(catalog: &Catalog) -> Option<SnapshotId> {
        catalog.latest()
    }

    /// Id the next sync writes to, or `None` when daily mode finds today done
    pub fn allocate(&self, catalog: &Catalog, today: NaiveDate) -> Option<SnapshotId> {
        let id = catalog.next_id(today, self.config.daily);
        match catalog.get(&id) {
            None => Some(id),
            Some(entry) if entry.is_restorable() => None,
            // Today's snapshot never finished; start a new one beside it
            Some(_) => Some(catalog.next_id(today, false)),
        }
    }

    /// Run a sync started at `now` on local calendar day `today`
    pub fn sync(
        &self,
        catalog: &Catalog,
        today: NaiveDate,
        now: DateTime<Utc>,
    ) -> AeonResult<SyncReport> {
        let link_source = Self::plan(catalog);

        let Some(id) = self.allocate(catalog, today) else {
            let id = catalog.next_id(today, true);
            info!("Snapshot {} already exists for today", id);
            if !self.config.dry_run {
                self.store.update_latest(&id)?;
            }
            return Ok(SyncReport {
                id,
                link_source,
                status: SyncStatus::AlreadyCurrent,
            });
        };

        let request = PushRequest {
            sources: self.config.sources.clone(),
            destination: self.store.transfer_location(&id, None),
            link_source: link_source.map(|link| self.store.snapshot_path(&link)),
            exclusions: self.config.exclusions.clone(),
            verbose: self.config.verbose,
            dry_run: self.config.dry_run,
        };

        if self.config.dry_run {
            return match self.transfer.push(&request)? {
                TransferOutcome::Failed(reason) => Err(AeonError::TransferFailed(reason)),
                TransferOutcome::Success(stats) | TransferOutcome::Partial { stats, .. } => {
                    Ok(SyncReport {
                        id,
                        link_source,
                        status: SyncStatus::DryRun(stats),
                    })
                }
            };
        }

        self.store.create_snapshot_dir(&id)?;
        let marker = IncompleteMarker::in_progress(id, now);
        self.store
            .write_file(&id, INCOMPLETE_MARKER_NAME, marker.to_json()?.as_bytes())?;

        info!(
            "Starting snapshot {} (link source: {})",
            id,
            link_source.map_or_else(|| "none".to_string(), |l| l.to_string())
        );

        let outcome = match self.transfer.push(&request) {
            Ok(outcome) => outcome,
            Err(e) => {
                self.mark_incomplete(marker.failed(e.to_string()));
                return Err(e);
            }
        };

        let stats = match outcome {
            TransferOutcome::Success(stats) => stats,
            TransferOutcome::Partial { warnings, .. } => {
                self.mark_incomplete(marker.partial(warnings));
                return Err(AeonError::TransferFailed(format!(
                    "transfer finished with {} warning(s); snapshot {} left incomplete",
                    warnings, id
                )));
            }
            TransferOutcome::Failed(reason) => {
                self.mark_incomplete(marker.failed(reason.clone()));
                return Err(AeonError::TransferFailed(reason));
            }
        };

        let metadata = SnapshotMetadata::new(
            id,
            self.config.hostname.clone(),
            now,
            Utc::now(),
            self.config.sources.clone(),
            self.config.exclusions.clone(),
            stats,
            self.config.retention,
        );
        self.store
            .write_file(&id, METADATA_FILE_NAME, metadata.to_json()?.as_bytes())?;
        self.store.remove_file(&id, INCOMPLETE_MARKER_NAME)?;
        self.store.update_latest(&id)?;

        info!("Snapshot {} complete", id);
        Ok(SyncReport {
            id,
            link_source,
            status: SyncStatus::Created(metadata),
        })
    }

    fn mark_incomplete(&self, marker: IncompleteMarker) {
        let result = marker
            .to_json()
            .and_then(|json| {
                self.store
                    .write_file(&marker.id, INCOMPLETE_MARKER_NAME, json.as_bytes())
            });
        if let Err(e) = result {
            warn!("Failed to update incomplete marker for {}: {}", marker.id, e);
        }
    }
}
