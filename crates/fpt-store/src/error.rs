//! Remote store error types.

use thiserror::Error;

/// Errors raised by a [`crate::RemoteStore`] implementation.
///
/// A store error surfacing from a read is a fetch failure for that table; from
/// an upsert it is a batch failure. Callers decide the blast radius.
#[derive(Debug, Error)]
pub enum StoreError {
    /// HTTP transport error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The store API returned a non-success status code.
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code returned by the store.
        status: u16,
        /// Error message or response body.
        message: String,
    },

    /// The store returned a 429 Too Many Requests response.
    #[error("rate limited, retry after {retry_after_secs}s")]
    RateLimited {
        /// Seconds to wait before retrying.
        retry_after_secs: u64,
    },

    /// Failed to parse a store response.
    #[error("parse error: {0}")]
    Parse(String),

    /// The table does not exist.
    #[error("relation \"{0}\" does not exist")]
    UnknownTable(String),

    /// The remote procedure does not exist.
    #[error("function {0} does not exist")]
    UnknownFunction(String),

    /// Store credentials are missing.
    #[error("store is not configured (set SUPABASE_URL and a service or anon key)")]
    NotConfigured,

    /// A failure injected into [`crate::MemoryStore`].
    #[error("{0}")]
    Simulated(String),
}

impl StoreError {
    /// Read a 404 from a table endpoint as a missing table.
    #[must_use]
    pub fn for_table(self, table: &str) -> Self {
        match self {
            Self::Api { status: 404, .. } => Self::UnknownTable(table.to_string()),
            other => other,
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(error: serde_json::Error) -> Self {
        Self::Parse(error.to_string())
    }
}
