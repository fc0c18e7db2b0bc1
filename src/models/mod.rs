//! Core data models for AeonSync
//!
//! This module contains the snapshot data structures:
//! - Snapshot identifiers and same-day sequencing
//! - Metadata records and incomplete markers
//! - Retention policy

pub mod metadata;
pub mod retention;
pub mod snapshot_id;

pub use metadata::{
    IncompleteMarker, IncompleteState, SnapshotMetadata, TransferStats, INCOMPLETE_MARKER_NAME,
    METADATA_FILE_NAME,
};
pub use retention::{RetentionPolicy, MAX_RETENTION_DAYS};
pub use snapshot_id::{next_id, SnapshotId};
