//! AeonSync - incremental remote backups with point-in-time restore
//!
//! Every sync produces a dated snapshot directory on the backup root.
//! Unchanged files are hard-linked against the previous snapshot, so each
//! snapshot is a complete tree while only changed files take space.
//!
//! # Architecture
//!
//! The crate is organized into the following modules:
//!
//! - `config`: Persisted settings, path management and per-run resolution
//! - `error`: Custom error types
//! - `models`: Snapshot ids, metadata records and the retention policy
//! - `storage`: The `SnapshotStore` seam over a local or SSH backup root
//! - `catalog`: Ordered view of the snapshots present on the backup root
//! - `transfer`: rsync-backed push and fetch
//! - `backup`: Sync planning and retention enforcement
//! - `restore`: Version resolution, diff, preview and the restore wizard
//! - `display`: Terminal output formatting
//! - `cli`: Command handlers
//!
//! # Example
//!
//! ```rust,ignore
//! use aeonsync::catalog::Catalog;
//! use aeonsync::storage::LocalStore;
//!
//! let store = LocalStore::new("/mnt/backups/laptop");
//! let catalog = Catalog::load(&store)?;
//! println!("latest: {:?}", catalog.latest());
//! ```

pub mod backup;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod display;
pub mod error;
pub mod models;
pub mod restore;
pub mod storage;
pub mod transfer;

pub use error::{AeonError, AeonResult};
