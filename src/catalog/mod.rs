//! Snapshot catalog
//!
//! The catalog is derived from one scan of the host directory and is never
//! persisted. Each operation loads it once and passes it by reference, so the
//! listing cannot change underneath a computation.
//!
//! An entry is restorable unless its directory carries an incomplete marker
//! and no metadata record. Directories holding neither file (for example,
//! snapshots written by older tools) are restorable but metadata-less.

use chrono::NaiveDate;
use tracing::{debug, warn};

use crate::error::{AeonError, AeonResult};
use crate::models::{next_id, IncompleteMarker, SnapshotId, SnapshotMetadata};
use crate::storage::SnapshotStore;

/// What is known about one snapshot directory
#[derive(Debug, Clone, PartialEq)]
pub enum EntryState {
    /// Metadata record present
    Complete(SnapshotMetadata),
    /// Incomplete marker present and no metadata
    Incomplete(IncompleteMarker),
    /// Neither record is present or readable
    Unknown,
}

/// One snapshot in the catalog
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogEntry {
    pub id: SnapshotId,
    pub state: EntryState,
}

impl CatalogEntry {
    /// Metadata record, if present
    pub fn metadata(&self) -> Option<&SnapshotMetadata> {
        match &self.state {
            EntryState::Complete(metadata) => Some(metadata),
            _ => None,
        }
    }

    /// Whether restores and link-sources may use this entry
    pub fn is_restorable(&self) -> bool {
        !matches!(self.state, EntryState::Incomplete(_))
    }

    /// Short state label for listings
    pub fn state_label(&self) -> String {
        match &self.state {
            EntryState::Complete(_) => "complete".to_string(),
            EntryState::Incomplete(marker) => marker.state.to_string(),
            EntryState::Unknown => "no metadata".to_string(),
        }
    }
}

/// Ordered view of the snapshots on a store, oldest first
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Catalog {
    entries: Vec<CatalogEntry>,
}

impl Catalog {
    /// Scan the store once and build the catalog
    pub fn load(store: &dyn SnapshotStore) -> AeonResult<Self> {
        let raw = store.scan()?;
        let mut entries = Vec::with_capacity(raw.len());

        for entry in raw {
            let id = match SnapshotId::parse(&entry.name) {
                Ok(id) => id,
                Err(e) => {
                    warn!("Skipping {} in {}: {}", entry.name, store.location(), e);
                    continue;
                }
            };

            let metadata = entry.metadata.as_deref().and_then(SnapshotMetadata::from_json);
            let marker = entry.marker.as_deref().and_then(IncompleteMarker::from_json);

            let state = match (metadata, marker, entry.marker.is_some()) {
                (Some(metadata), _, _) => EntryState::Complete(metadata),
                (None, Some(marker), _) => EntryState::Incomplete(marker),
                // An unreadable marker still means the transfer never finished
                (None, None, true) => EntryState::Incomplete(IncompleteMarker::in_progress(
                    id,
                    chrono::DateTime::<chrono::Utc>::MIN_UTC,
                )),
                (None, None, false) => EntryState::Unknown,
            };
            entries.push(CatalogEntry { id, state });
        }

        debug!("Loaded {} snapshot(s) from {}", entries.len(), store.location());
        Ok(Self::from_entries(entries))
    }

    /// Build a catalog from already-known entries
    pub fn from_entries(mut entries: Vec<CatalogEntry>) -> Self {
        entries.sort_by(|a, b| a.id.cmp(&b.id));
        entries.dedup_by(|a, b| a.id == b.id);
        Self { entries }
    }

    /// All entries, oldest first
    pub fn list(&self) -> &[CatalogEntry] {
        &self.entries
    }

    /// Iterate over all entries, oldest first
    pub fn iter(&self) -> impl Iterator<Item = &CatalogEntry> + '_ {
        self.entries.iter()
    }

    /// Iterate over restorable entries, oldest first
    pub fn restorable(&self) -> impl Iterator<Item = &CatalogEntry> + '_ {
        self.entries.iter().filter(|e| e.is_restorable())
    }

    /// Look up an entry by id
    pub fn get(&self, id: &SnapshotId) -> Option<&CatalogEntry> {
        self.entries
            .binary_search_by(|e| e.id.cmp(id))
            .ok()
            .map(|i| &self.entries[i])
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Newest restorable snapshot; `None` for a store with nothing restorable
    pub fn latest(&self) -> Option<SnapshotId> {
        self.restorable().last().map(|e| e.id)
    }

    /// Newest restorable snapshot or `EmptyCatalog`
    pub fn require_latest(&self) -> AeonResult<SnapshotId> {
        self.latest().ok_or(AeonError::EmptyCatalog)
    }

    /// Resolve a restore date to a snapshot
    ///
    /// `None` is the latest snapshot. A date yields the newest snapshot dated
    /// on or before it, which is the highest sequence of that day when the
    /// day has any.
    pub fn resolve(&self, date: Option<NaiveDate>) -> AeonResult<SnapshotId> {
        let Some(date) = date else {
            return self.require_latest();
        };

        if self.latest().is_none() {
            return Err(AeonError::EmptyCatalog);
        }

        self.restorable()
            .filter(|e| e.id.date() <= date)
            .last()
            .map(|e| e.id)
            .ok_or(AeonError::NoSnapshotBeforeDate(date))
    }

    /// Id for a new sync started on `today`
    pub fn next_id(&self, today: NaiveDate, daily_mode: bool) -> SnapshotId {
        next_id(self.entries.iter().map(|e| &e.id), today, daily_mode)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::{RetentionPolicy, TransferStats, INCOMPLETE_MARKER_NAME, METADATA_FILE_NAME};
    use crate::storage::LocalStore;
    use chrono::{TimeZone, Utc};
    use std::path::PathBuf;
    use tempfile::TempDir;

    pub(crate) fn id(s: &str) -> SnapshotId {
        SnapshotId::parse(s).unwrap()
    }

    pub(crate) fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    /// Metadata for `id` created at noon UTC on its own date
    pub(crate) fn metadata_for(id: SnapshotId) -> SnapshotMetadata {
        let d = id.date();
        let created = Utc
            .with_ymd_and_hms(
                chrono::Datelike::year(&d),
                chrono::Datelike::month(&d),
                chrono::Datelike::day(&d),
                12,
                0,
                0,
            )
            .unwrap();
        SnapshotMetadata::new(
            id,
            "laptop",
            created,
            created + chrono::Duration::minutes(3),
            vec![PathBuf::from("/home/user")],
            Vec::new(),
            TransferStats {
                file_count: 10,
                total_size: 2048,
            },
            RetentionPolicy::new(7),
        )
    }

    pub(crate) fn complete(s: &str) -> CatalogEntry {
        let id = id(s);
        CatalogEntry {
            id,
            state: EntryState::Complete(metadata_for(id)),
        }
    }

    pub(crate) fn incomplete(s: &str) -> CatalogEntry {
        let id = id(s);
        CatalogEntry {
            id,
            state: EntryState::Incomplete(IncompleteMarker::in_progress(id, Utc::now()).failed("boom")),
        }
    }

    pub(crate) fn unknown(s: &str) -> CatalogEntry {
        CatalogEntry {
            id: id(s),
            state: EntryState::Unknown,
        }
    }

    fn scenario() -> Catalog {
        Catalog::from_entries(vec![
            complete("2024-03-14"),
            complete("2024-03-13.1"),
            complete("2024-03-13"),
        ])
    }

    #[test]
    fn test_list_is_sorted_ascending() {
        let ids: Vec<String> = scenario().iter().map(|e| e.id.to_string()).collect();
        assert_eq!(ids, vec!["2024-03-13", "2024-03-13.1", "2024-03-14"]);
    }

    #[test]
    fn test_latest_and_resolve_none_agree() {
        let catalog = scenario();
        assert_eq!(catalog.latest(), Some(id("2024-03-14")));
        assert_eq!(catalog.resolve(None).unwrap(), catalog.latest().unwrap());
    }

    #[test]
    fn test_empty_catalog() {
        let catalog = Catalog::default();
        assert_eq!(catalog.latest(), None);
        assert!(matches!(catalog.require_latest(), Err(AeonError::EmptyCatalog)));
        assert!(matches!(catalog.resolve(None), Err(AeonError::EmptyCatalog)));
        assert!(matches!(
            catalog.resolve(Some(date("2024-03-13"))),
            Err(AeonError::EmptyCatalog)
        ));
    }

    #[test]
    fn test_resolve_exact_day_picks_highest_sequence() {
        assert_eq!(scenario().resolve(Some(date("2024-03-13"))).unwrap(), id("2024-03-13.1"));
    }

    #[test]
    fn test_resolve_floor() {
        let catalog = scenario();
        assert_eq!(catalog.resolve(Some(date("2024-03-15"))).unwrap(), id("2024-03-14"));

        let err = catalog.resolve(Some(date("2024-03-12"))).unwrap_err();
        assert!(matches!(err, AeonError::NoSnapshotBeforeDate(d) if d == date("2024-03-12")));
    }

    #[test]
    fn test_incomplete_entries_are_skipped() {
        let catalog = Catalog::from_entries(vec![
            complete("2024-03-13"),
            unknown("2024-03-14"),
            incomplete("2024-03-15"),
        ]);

        assert_eq!(catalog.latest(), Some(id("2024-03-14")));
        assert_eq!(catalog.resolve(Some(date("2024-03-15"))).unwrap(), id("2024-03-14"));
        // Incomplete ids still count when allocating
        assert_eq!(catalog.next_id(date("2024-03-15"), false), id("2024-03-15.1"));
    }

    #[test]
    fn test_next_id_from_catalog() {
        let catalog = scenario();
        assert_eq!(catalog.next_id(date("2024-03-13"), false), id("2024-03-13.2"));
        assert_eq!(catalog.next_id(date("2024-03-13"), true), id("2024-03-13.1"));
        assert_eq!(catalog.next_id(date("2024-03-16"), true), id("2024-03-16"));
    }

    #[test]
    fn test_load_from_store() {
        let temp = TempDir::new().unwrap();
        let store = LocalStore::new(temp.path().join("laptop"));

        for name in ["2024-03-13", "2024-03-13.1", "2024-03-14"] {
            store.create_snapshot_dir(&id(name)).unwrap();
        }
        let meta = metadata_for(id("2024-03-13"));
        store
            .write_file(&id("2024-03-13"), METADATA_FILE_NAME, meta.to_json().unwrap().as_bytes())
            .unwrap();
        let marker = IncompleteMarker::in_progress(id("2024-03-14"), Utc::now());
        store
            .write_file(&id("2024-03-14"), INCOMPLETE_MARKER_NAME, marker.to_json().unwrap().as_bytes())
            .unwrap();
        std::fs::create_dir_all(store.host_root().join("lost+found")).unwrap();
        std::fs::create_dir_all(store.host_root().join("2024-03-15.0")).unwrap();

        let catalog = Catalog::load(&store).unwrap();

        assert_eq!(catalog.len(), 3);
        assert_eq!(catalog.list()[0].metadata(), Some(&meta));
        assert_eq!(catalog.list()[1].state, EntryState::Unknown);
        assert!(!catalog.list()[2].is_restorable());
        assert_eq!(catalog.latest(), Some(id("2024-03-13.1")));
    }

    #[test]
    fn test_corrupt_marker_is_still_incomplete() {
        let temp = TempDir::new().unwrap();
        let store = LocalStore::new(temp.path().join("laptop"));
        store.create_snapshot_dir(&id("2024-03-13")).unwrap();
        store
            .write_file(&id("2024-03-13"), INCOMPLETE_MARKER_NAME, b"{ truncated")
            .unwrap();

        let catalog = Catalog::load(&store).unwrap();
        assert!(!catalog.list()[0].is_restorable());
        assert_eq!(catalog.latest(), None);
    }
}
