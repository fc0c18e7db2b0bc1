//! Byte-level transfer
//!
//! Copying and hard-linking are delegated to an external tool. The core
//! hands it a [`PushRequest`] (backup) or [`FetchRequest`] (restore) and gets
//! back a [`TransferOutcome`].

pub mod rsync;

use std::path::PathBuf;

use crate::error::AeonResult;
use crate::models::TransferStats;

pub use rsync::RsyncTransfer;

/// Copy the sources into a new snapshot directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushRequest {
    /// Absolute source directories, in configured order
    pub sources: Vec<PathBuf>,
    /// Snapshot directory as the tool addresses it (`host:path` or a path)
    pub destination: String,
    /// Absolute path of the previous snapshot on the backup filesystem
    pub link_source: Option<String>,
    /// Exclusion globs, in configured order
    pub exclusions: Vec<String>,
    pub verbose: bool,
    pub dry_run: bool,
}

/// Copy a file or directory out of a snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    /// Path inside the snapshot as the tool addresses it
    pub source: String,
    /// Local destination path
    pub destination: PathBuf,
    /// Whether `source` is a directory
    pub is_dir: bool,
    pub verbose: bool,
}

/// How a transfer ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferOutcome {
    /// Everything was copied
    Success(TransferStats),
    /// Finished, but some files could not be copied
    Partial { stats: TransferStats, warnings: u32 },
    /// The tool gave up
    Failed(String),
}

/// External transfer collaborator
pub trait Transfer {
    /// Create a snapshot from the sources, hard-linking unchanged files
    /// against the link-source when one is given
    fn push(&self, request: &PushRequest) -> AeonResult<TransferOutcome>;

    /// Copy a path out of a snapshot
    fn fetch(&self, request: &FetchRequest) -> AeonResult<TransferOutcome>;
}

#[cfg(test)]
pub(crate) mod scripted {
    //! In-process transfer for tests: copies local trees with `std::fs`

    use std::cell::RefCell;
    use std::fs;
    use std::path::Path;

    use super::*;

    pub(crate) struct ScriptedTransfer {
        outcome: TransferOutcome,
        pub pushes: RefCell<Vec<PushRequest>>,
        pub fetches: RefCell<Vec<FetchRequest>>,
    }

    impl ScriptedTransfer {
        pub(crate) fn succeeding() -> Self {
            Self::with_outcome(TransferOutcome::Success(TransferStats {
                file_count: 3,
                total_size: 1024,
            }))
        }

        pub(crate) fn with_outcome(outcome: TransferOutcome) -> Self {
            Self {
                outcome,
                pushes: RefCell::new(Vec::new()),
                fetches: RefCell::new(Vec::new()),
            }
        }
    }

    impl Transfer for ScriptedTransfer {
        fn push(&self, request: &PushRequest) -> AeonResult<TransferOutcome> {
            self.pushes.borrow_mut().push(request.clone());
            if !request.dry_run && !matches!(self.outcome, TransferOutcome::Failed(_)) {
                for source in &request.sources {
                    let name = source.file_name().unwrap();
                    copy_tree(source, &Path::new(&request.destination).join(name));
                }
            }
            Ok(self.outcome.clone())
        }

        fn fetch(&self, request: &FetchRequest) -> AeonResult<TransferOutcome> {
            self.fetches.borrow_mut().push(request.clone());
            copy_tree(Path::new(&request.source), &request.destination);
            Ok(self.outcome.clone())
        }
    }

    pub(crate) fn copy_tree(from: &Path, to: &Path) {
        if from.is_dir() {
            fs::create_dir_all(to).unwrap();
            for entry in fs::read_dir(from).unwrap() {
                let entry = entry.unwrap();
                copy_tree(&entry.path(), &to.join(entry.file_name()));
            }
        } else {
            if let Some(parent) = to.parent() {
                fs::create_dir_all(parent).unwrap();
            }
            fs::copy(from, to).unwrap();
        }
    }
}
