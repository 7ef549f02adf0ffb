//! Backup error types.

use fpt_core::errors::CoreError;
use fpt_core::snapshot::SnapshotId;
use fpt_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BackupError {
    /// Snapshot storage (local directory or object store) failed.
    #[error("Snapshot storage error: {0}")]
    Storage(#[from] object_store::Error),

    /// The remote store failed outside a per-table operation.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Snapshot document encoding or an invalid snapshot id.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// The snapshot has no `backup.json`.
    #[error("Snapshot not found: {0}")]
    NotFound(SnapshotId),

    /// A path given on the command line does not name a snapshot.
    #[error("Not a snapshot path: {0}")]
    InvalidPath(String),

    /// Local filesystem error while preparing the backup directory.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for BackupError {
    fn from(error: serde_json::Error) -> Self {
        Self::Core(CoreError::Serialization(error))
    }
}
