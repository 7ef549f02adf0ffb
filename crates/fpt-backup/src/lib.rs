//! # fpt-backup
//!
//! Disaster-recovery snapshots of the project tables.
//!
//! - [`BackupWriter`] captures tables into `<id>/backup.json` plus
//!   `<id>/metadata.json`
//! - [`BackupCatalog`] lists, verifies, loads and prunes snapshots
//! - [`Restorer`] replays a snapshot into the live store in batches
//!
//! Snapshots are stored through any [`object_store::ObjectStore`]; the CLI
//! uses a local directory (see [`layout::open_local`]).

mod catalog;
mod error;
pub mod layout;
mod restore;
mod writer;

pub use catalog::{BackupCatalog, CatalogEntry, PruneReport, VerifyReport};
pub use error::BackupError;
pub use restore::{BatchProgress, DEFAULT_BATCH_SIZE, ProgressFn, Restorer};
pub use writer::{BackupOutcome, BackupWriter, DEFAULT_PAGE_SIZE};
