//! Notification pipeline error types.

use fpt_core::errors::CoreError;
use fpt_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NotifyError {
    /// HTTP transport error talking to an email provider.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// An email provider rejected the request.
    #[error("{transport} API error ({status}): {message}")]
    Provider {
        /// Transport name (`resend`, `sendgrid`).
        transport: String,
        /// HTTP status code returned by the provider.
        status: u16,
        /// Response body.
        message: String,
    },

    /// An email provider returned 429 Too Many Requests.
    #[error("{transport} rate limited, retry after {retry_after_secs}s")]
    RateLimited {
        transport: String,
        retry_after_secs: u64,
    },

    /// Every transport in the chain failed for one message.
    #[error("Failed to send email via all providers: {last_error}")]
    AllTransportsFailed {
        /// Error reported by the last transport tried.
        last_error: String,
    },

    /// No transport has credentials.
    #[error("no email transport configured (set RESEND_API_KEY or SENDGRID_API_KEY)")]
    NoTransport,

    /// The record has no address to deliver to.
    #[error("notification {0} has no recipient email")]
    MissingRecipient(String),

    /// The record already left `pending` and must not be sent again.
    #[error("notification {id} is already {status}")]
    AlreadyDispatched { id: String, status: String },

    /// Unknown function name.
    #[error("unknown function '{0}'")]
    UnknownEntrypoint(String),

    /// Remote store failure (scan, queue read, aggregation query).
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Core(#[from] CoreError),

    /// A store row did not decode into the expected shape.
    #[error("malformed {what}: {message}")]
    Malformed { what: &'static str, message: String },
}
