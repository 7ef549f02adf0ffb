//! Cross-cutting error types for fpt.
//!
//! Domain-specific errors (`StoreError`, `BackupError`, `NotifyError`) live in
//! their own crates. The CLI converges them through `anyhow`.

use thiserror::Error;

/// Errors that can be raised by any fpt crate.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A state machine transition was attempted that is not allowed.
    #[error("Invalid state transition: {entity_type} {id} from {from} to {to}")]
    InvalidTransition {
        entity_type: String,
        id: String,
        from: String,
        to: String,
    },

    /// A snapshot identifier does not follow the `backup-<timestamp>` format.
    #[error("Invalid snapshot id: {0}")]
    InvalidSnapshotId(String),

    /// Data failed validation (format, constraints).
    #[error("Validation error: {0}")]
    Validation(String),

    /// JSON encoding or decoding failed.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
