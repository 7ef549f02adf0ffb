//! Where snapshot artifacts live.
//!
//! ```text
//! <root>/
//!   backup-2026-10-18T08-00-00-000Z/
//!     backup.json
//!     metadata.json
//! ```

use std::path::{Path as FsPath, PathBuf};
use std::sync::Arc;

use fpt_core::snapshot::{SNAPSHOT_PREFIX, SnapshotId};
use object_store::ObjectStore;
use object_store::local::LocalFileSystem;
use object_store::path::Path;

use crate::error::BackupError;

pub const BODY_FILE: &str = "backup.json";
pub const METADATA_FILE: &str = "metadata.json";

#[must_use]
pub fn snapshot_prefix(id: &SnapshotId) -> Path {
    Path::from(id.as_str())
}

#[must_use]
pub fn body_path(id: &SnapshotId) -> Path {
    snapshot_prefix(id).child(BODY_FILE)
}

#[must_use]
pub fn metadata_path(id: &SnapshotId) -> Path {
    snapshot_prefix(id).child(METADATA_FILE)
}

/// Open a local backup directory as an object store, creating it if needed.
/// Empty snapshot directories are removed when their last file is deleted.
///
/// # Errors
///
/// Returns [`BackupError::Io`] if the directory cannot be created and
/// [`BackupError::Storage`] if it cannot be opened.
pub fn open_local(dir: &FsPath) -> Result<Arc<dyn ObjectStore>, BackupError> {
    std::fs::create_dir_all(dir)?;
    let store = LocalFileSystem::new_with_prefix(dir)?.with_automatic_cleanup(true);
    Ok(Arc::new(store))
}

/// Resolve a snapshot reference given on the command line.
///
/// Accepts a bare id (`backup-...`), a snapshot directory, or the
/// `backup.json` inside it. Returns the directory holding the snapshot and
/// the snapshot id; bare ids resolve against `default_root`.
///
/// # Errors
///
/// Returns [`BackupError::InvalidPath`] when no path component is a
/// snapshot directory name.
pub fn locate(raw: &str, default_root: &FsPath) -> Result<(PathBuf, SnapshotId), BackupError> {
    let mut path = PathBuf::from(raw.trim());
    if path
        .file_name()
        .is_some_and(|name| name == BODY_FILE || name == METADATA_FILE)
    {
        path.pop();
    }

    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .filter(|n| n.starts_with(SNAPSHOT_PREFIX))
        .ok_or_else(|| BackupError::InvalidPath(raw.to_string()))?;
    let id = SnapshotId::parse(name)?;

    let root = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => default_root.to_path_buf(),
    };
    Ok((root, id))
}
