//! Custom error types for AeonSync
//!
//! This module defines the error hierarchy for the application using thiserror
//! for ergonomic error definitions. Every kind maps to its own exit status so
//! scripts driving the CLI can tell failures apart.

use chrono::NaiveDate;
use thiserror::Error;

/// The main error type for AeonSync operations
#[derive(Error, Debug)]
pub enum AeonError {
    /// A string could not be parsed as a snapshot id
    #[error("Malformed snapshot id '{0}': expected YYYY-MM-DD or YYYY-MM-DD.N")]
    MalformedId(String),

    /// The backup store holds no restorable snapshot
    #[error("No snapshots found in the backup store")]
    EmptyCatalog,

    /// Floor resolution found nothing at or before the requested date
    #[error("No snapshot exists on or before {0}")]
    NoSnapshotBeforeDate(NaiveDate),

    /// The resolved snapshot does not hold the requested path
    #[error("'{path}' does not exist in snapshot {snapshot}")]
    FileNotFoundInSnapshot { path: String, snapshot: String },

    /// Another sync allocated the same snapshot directory first
    #[error("Snapshot directory {0} already exists; another sync may be running")]
    ConcurrentSync(String),

    /// The SSH transport could not reach the backup host
    #[error("Remote host unreachable: {0}")]
    RemoteUnreachable(String),

    /// The external transfer tool reported a failure
    #[error("Transfer failed: {0}")]
    TransferFailed(String),

    /// Retention tried to remove the newest restorable snapshot
    #[error("Retention invariant violated: refusing to delete latest snapshot {0}")]
    RetentionInvariantViolation(String),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(String),

    /// Invalid user input
    #[error("Validation error: {0}")]
    Validation(String),

    /// An external command could not be run
    #[error("Command error: {0}")]
    Command(String),
}

impl AeonError {
    /// Create a "file not found in snapshot" error
    pub fn file_not_found(path: impl Into<String>, snapshot: impl ToString) -> Self {
        Self::FileNotFoundInSnapshot {
            path: path.into(),
            snapshot: snapshot.to_string(),
        }
    }

    /// Check if this is a "not found" kind of error
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::EmptyCatalog | Self::NoSnapshotBeforeDate(_) | Self::FileNotFoundInSnapshot { .. }
        )
    }

    /// Process exit status for this error kind
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::MalformedId(_) => 12,
            Self::EmptyCatalog => 3,
            Self::NoSnapshotBeforeDate(_) => 4,
            Self::FileNotFoundInSnapshot { .. } => 5,
            Self::ConcurrentSync(_) => 6,
            Self::RemoteUnreachable(_) => 7,
            Self::TransferFailed(_) => 8,
            Self::RetentionInvariantViolation(_) => 9,
            Self::Config(_) => 10,
            Self::Validation(_) => 11,
            Self::Io(_) | Self::Json(_) | Self::Command(_) => 1,
        }
    }
}

impl From<std::io::Error> for AeonError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for AeonError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}

/// Result type alias for AeonSync operations
pub type AeonResult<T> = Result<T, AeonError>;
