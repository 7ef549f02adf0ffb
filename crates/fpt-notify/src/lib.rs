//! # fpt-notify
//!
//! Notification scanning, digest aggregation and email dispatch.
//!
//! - [`Scanner`] triggers the remote deadline and budget rules
//! - [`NotificationQueue`] reads pending records
//! - [`Dispatcher`] delivers through a [`TransportChain`] (Resend, then
//!   SendGrid) and marks each record `sent` or `failed`
//! - [`DigestAggregator`] / [`DigestRunner`] build and send activity digests
//! - [`Pipeline`] runs one scheduled [`Entrypoint`] end to end

mod digest;
mod dispatcher;
mod error;
mod pipeline;
mod queue;
pub mod render;
mod resend;
mod scanner;
mod sendgrid;
mod transport;

pub use digest::{DigestAggregator, DigestRunner};
pub use dispatcher::Dispatcher;
pub use error::NotifyError;
pub use pipeline::{Entrypoint, Pipeline, RunItem, RunSummary};
pub use queue::NotificationQueue;
pub use render::Renderer;
pub use resend::ResendTransport;
pub use scanner::{ScanRule, Scanner};
pub use sendgrid::SendGridTransport;
pub use transport::{Email, EmailTransport, TransportChain};
