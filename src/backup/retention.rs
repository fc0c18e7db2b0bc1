//! Retention enforcement
//!
//! Snapshots are independent directories once created: `--link-dest` hard
//! links share inodes, not directory structure, so removal order does not
//! matter and any subset can be removed without touching the others.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::catalog::Catalog;
use crate::error::{AeonError, AeonResult};
use crate::models::{RetentionPolicy, SnapshotId};
use crate::storage::SnapshotStore;

/// Snapshots older than the policy allows
///
/// Age is the number of whole UTC days between the creation date and the
/// reference date. Entries without metadata are never expired.
pub fn expired(
    catalog: &Catalog,
    policy: RetentionPolicy,
    reference_time: DateTime<Utc>,
) -> BTreeSet<SnapshotId> {
    let reference = reference_time.date_naive();
    catalog
        .iter()
        .filter_map(|entry| {
            let metadata = entry.metadata()?;
            let age = (reference - metadata.creation_date()).num_days();
            (age > policy.days).then_some(entry.id)
        })
        .collect()
}

/// Removes expired snapshots from a store
pub struct RetentionEnforcer<'a> {
    store: &'a dyn SnapshotStore,
    policy: RetentionPolicy,
}

impl<'a> RetentionEnforcer<'a> {
    pub fn new(store: &'a dyn SnapshotStore, policy: RetentionPolicy) -> Self {
        Self { store, policy }
    }

    /// Snapshots `enforce` would remove
    pub fn candidates(&self, catalog: &Catalog, reference_time: DateTime<Utc>) -> BTreeSet<SnapshotId> {
        let mut doomed = expired(catalog, self.policy, reference_time);
        if let Some(latest) = catalog.latest() {
            if doomed.remove(&latest) {
                warn!(
                    "Retention of {} day(s) would expire the latest snapshot {}; keeping it",
                    self.policy.days, latest
                );
            }
        }
        doomed
    }

    /// Remove every expired snapshot except the latest; returns what was removed
    pub fn enforce(
        &self,
        catalog: &Catalog,
        reference_time: DateTime<Utc>,
    ) -> AeonResult<Vec<SnapshotId>> {
        let latest = catalog.latest();
        let mut removed = Vec::new();

        for id in self.candidates(catalog, reference_time) {
            if Some(id) == latest {
                return Err(AeonError::RetentionInvariantViolation(id.to_string()));
            }
            info!("Removing expired snapshot {}", id);
            self.store.remove_snapshot(&id)?;
            removed.push(id);
        }

        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::tests::{complete, id, incomplete, metadata_for, unknown};
    use crate::catalog::EntryState;
    use crate::models::METADATA_FILE_NAME;
    use crate::storage::LocalStore;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn reference() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 4, 15, 8, 0, 0).unwrap()
    }

    #[test]
    fn test_thirty_day_policy() {
        let catalog = Catalog::from_entries(vec![
            complete("2024-02-01"),
            complete("2024-03-16"),
            complete("2024-03-15"),
            complete("2024-04-14"),
        ]);

        let expired = expired(&catalog, RetentionPolicy::new(30), reference());
        assert_eq!(expired.into_iter().collect::<Vec<_>>(), vec![id("2024-02-01"), id("2024-03-15")]);
    }

    #[test]
    fn test_metadata_less_entries_never_expire() {
        let catalog = Catalog::from_entries(vec![
            unknown("2020-01-01"),
            incomplete("2020-01-02"),
            complete("2024-04-14"),
        ]);

        let zero = expired(&catalog, RetentionPolicy::new(0), reference());
        assert_eq!(zero.into_iter().collect::<Vec<_>>(), vec![id("2024-04-14")]);
        assert!(expired(&catalog, RetentionPolicy::new(30), reference()).is_empty());
    }

    #[test]
    fn test_zero_or_negative_policy_keeps_latest() {
        let catalog = Catalog::from_entries(vec![complete("2024-04-13"), complete("2024-04-14")]);

        for days in [0, -5] {
            let all = expired(&catalog, RetentionPolicy::new(days), reference());
            assert!(all.contains(&id("2024-04-14")));

            let temp = TempDir::new().unwrap();
            let store = LocalStore::new(temp.path());
            for entry in catalog.iter() {
                store.create_snapshot_dir(&entry.id).unwrap();
            }

            let enforcer = RetentionEnforcer::new(&store, RetentionPolicy::new(days));
            let removed = enforcer.enforce(&catalog, reference()).unwrap();

            assert_eq!(removed, vec![id("2024-04-13")]);
            assert!(temp.path().join("2024-04-14").exists());
        }
    }

    #[test]
    fn test_latest_is_restorable_entry_not_newest_directory() {
        // The newest directory is incomplete, so the latest restorable one is protected
        let catalog = Catalog::from_entries(vec![complete("2024-04-01"), incomplete("2024-04-14")]);
        let temp = TempDir::new().unwrap();
        let store = LocalStore::new(temp.path());
        store.create_snapshot_dir(&id("2024-04-01")).unwrap();

        let removed = RetentionEnforcer::new(&store, RetentionPolicy::new(0))
            .enforce(&catalog, reference())
            .unwrap();
        assert!(removed.is_empty());
        assert!(temp.path().join("2024-04-01").exists());
    }

    #[test]
    fn test_enforce_removes_from_store() {
        let temp = TempDir::new().unwrap();
        let store = LocalStore::new(temp.path());
        for name in ["2024-02-01", "2024-04-10", "2024-04-14"] {
            let id = id(name);
            store.create_snapshot_dir(&id).unwrap();
            store
                .write_file(&id, METADATA_FILE_NAME, metadata_for(id).to_json().unwrap().as_bytes())
                .unwrap();
        }
        // A directory with no metadata from long ago survives
        store.create_snapshot_dir(&id("2023-01-01")).unwrap();

        let catalog = Catalog::load(&store).unwrap();
        let removed = RetentionEnforcer::new(&store, RetentionPolicy::new(30))
            .enforce(&catalog, reference())
            .unwrap();

        assert_eq!(removed, vec![id("2024-02-01")]);
        let remaining = Catalog::load(&store).unwrap();
        let ids: Vec<String> = remaining.iter().map(|e| e.id.to_string()).collect();
        assert_eq!(ids, vec!["2023-01-01", "2024-04-10", "2024-04-14"]);
        assert!(matches!(remaining.list()[0].state, EntryState::Unknown));
    }
}
