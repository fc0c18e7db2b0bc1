//! Storage layer for AeonSync
//!
//! Provides atomic local file writes and the [`SnapshotStore`] seam with its
//! two implementations: a local directory and a host reached over SSH.

pub mod file_io;
pub mod local;
pub mod remote;
pub mod ssh;
pub mod store;

pub use file_io::{write_atomic, write_json_atomic};
pub use local::LocalStore;
pub use remote::RemoteStore;
pub use ssh::SshExecutor;
pub use store::{PathInfo, RawEntry, SnapshotStore, LATEST_ALIAS};

use crate::config::BackupConfig;

/// SSH executor for a remote target; `None` for a local backup root
pub fn ssh_executor(config: &BackupConfig) -> Option<SshExecutor> {
    config
        .target
        .login()
        .map(|login| SshExecutor::new(login, config.remote_port, config.ssh_key.clone()))
}

/// Open the store a configuration points at
pub fn open_store(config: &BackupConfig) -> Box<dyn SnapshotStore> {
    match ssh_executor(config) {
        Some(executor) => Box::new(RemoteStore::new(executor, config.host_root())),
        None => Box::new(LocalStore::new(config.host_root())),
    }
}
