//! Backup Catalog: list, inspect, verify and prune snapshots.

use std::sync::Arc;

use fpt_core::checksum::compute_checksum;
use fpt_core::report::Reporter;
use fpt_core::snapshot::{SNAPSHOT_PREFIX, SnapshotBody, SnapshotId, SnapshotMetadata};
use futures_util::TryStreamExt;
use object_store::ObjectStore;
use object_store::path::Path;
use serde::Serialize;

use crate::error::BackupError;
use crate::layout;

/// A listed snapshot and its metadata, when readable.
#[derive(Debug, Clone, Serialize)]
pub struct CatalogEntry {
    pub id: SnapshotId,
    pub metadata: Option<SnapshotMetadata>,
}

/// Result of a retention pass.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PruneReport {
    pub kept: Vec<SnapshotId>,
    pub deleted: Vec<SnapshotId>,
    /// Snapshots that could not be deleted, with the error.
    pub failed: Vec<(SnapshotId, String)>,
}

/// Result of recomputing a snapshot's integrity data.
#[derive(Debug, Clone, Serialize)]
pub struct VerifyReport {
    pub id: SnapshotId,
    pub size: u64,
    pub checksum: String,
    pub metadata: Option<SnapshotMetadata>,
    /// Every disagreement found; empty when the snapshot is intact.
    pub problems: Vec<String>,
}

impl VerifyReport {
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.problems.is_empty()
    }
}

pub struct BackupCatalog {
    objects: Arc<dyn ObjectStore>,
    reporter: Arc<dyn Reporter>,
}

impl BackupCatalog {
    pub fn new(objects: Arc<dyn ObjectStore>, reporter: Arc<dyn Reporter>) -> Self {
        Self { objects, reporter }
    }

    /// Snapshot ids, most recent first.
    ///
    /// # Errors
    ///
    /// Returns [`BackupError::Storage`] if the root cannot be listed.
    pub async fn list(&self) -> Result<Vec<SnapshotId>, BackupError> {
        let listing = self.objects.list_with_delimiter(None).await?;
        let mut ids: Vec<SnapshotId> = listing
            .common_prefixes
            .iter()
            .filter_map(|prefix| prefix.filename())
            .filter(|name| name.starts_with(SNAPSHOT_PREFIX))
            .filter_map(|name| SnapshotId::parse(name).ok())
            .collect();
        ids.sort_unstable_by(|a, b| b.cmp(a));
        Ok(ids)
    }

    /// Snapshots with their metadata, most recent first. A snapshot whose
    /// metadata is missing or unreadable is listed without it.
    ///
    /// # Errors
    ///
    /// Returns [`BackupError::Storage`] if the root cannot be listed.
    pub async fn list_entries(&self) -> Result<Vec<CatalogEntry>, BackupError> {
        let mut entries = Vec::new();
        for id in self.list().await? {
            let metadata = match self.read_metadata(&id).await {
                Ok(metadata) => Some(metadata),
                Err(error) => {
                    tracing::debug!(snapshot = %id, %error, "metadata unreadable");
                    None
                }
            };
            entries.push(CatalogEntry { id, metadata });
        }
        Ok(entries)
    }

    /// Parse a snapshot's `backup.json`.
    ///
    /// # Errors
    ///
    /// Returns [`BackupError::NotFound`] when the body does not exist and
    /// [`BackupError::Core`] when it does not parse.
    pub async fn load(&self, id: &SnapshotId) -> Result<SnapshotBody, BackupError> {
        let bytes = self.read(id, &layout::body_path(id)).await?;
        Ok(SnapshotBody::from_bytes(&bytes)?)
    }

    /// Parse a snapshot's `metadata.json`.
    ///
    /// # Errors
    ///
    /// Returns [`BackupError::NotFound`] when the file does not exist.
    pub async fn read_metadata(&self, id: &SnapshotId) -> Result<SnapshotMetadata, BackupError> {
        let bytes = self.read(id, &layout::metadata_path(id)).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Recompute size, checksum and record counts from the persisted body
    /// and compare them with `metadata.json`.
    ///
    /// # Errors
    ///
    /// Returns [`BackupError::NotFound`] when the body does not exist.
    /// Every other disagreement is reported in [`VerifyReport::problems`].
    pub async fn verify(&self, id: &SnapshotId) -> Result<VerifyReport, BackupError> {
        let bytes = self.read(id, &layout::body_path(id)).await?;
        let size = bytes.len() as u64;
        let checksum = compute_checksum(&bytes);
        let mut problems = Vec::new();

        let metadata = match self.read_metadata(id).await {
            Ok(metadata) => Some(metadata),
            Err(error) => {
                problems.push(format!("metadata.json unreadable: {error}"));
                None
            }
        };

        if let Some(metadata) = &metadata {
            if metadata.size != size {
                problems.push(format!(
                    "size mismatch: metadata says {} bytes, body has {size}",
                    metadata.size
                ));
            }
            if metadata.checksum != checksum {
                problems.push(format!(
                    "checksum mismatch: metadata says {}, body hashes to {checksum}",
                    metadata.checksum
                ));
            }
        }

        match SnapshotBody::from_bytes(&bytes) {
            Ok(body) => {
                if let Some(metadata) = &metadata {
                    let actual = body.record_counts();
                    for (table, expected) in &metadata.record_counts {
                        let found = actual.get(table).copied().unwrap_or(0);
                        if found != *expected {
                            problems.push(format!(
                                "{table}: metadata says {expected} records, body has {found}"
                            ));
                        }
                    }
                }
            }
            Err(error) => problems.push(format!("backup.json does not parse: {error}")),
        }

        Ok(VerifyReport {
            id: id.clone(),
            size,
            checksum,
            metadata,
            problems,
        })
    }

    /// Delete all but the `keep` most recent snapshots.
    ///
    /// A snapshot that fails to delete is recorded and the pass continues
    /// with the next one.
    ///
    /// # Errors
    ///
    /// Returns [`BackupError::Storage`] only if the catalog cannot be listed.
    pub async fn prune(&self, keep: usize) -> Result<PruneReport, BackupError> {
        let ids = self.list().await?;
        let mut report = PruneReport::default();

        for (index, id) in ids.into_iter().enumerate() {
            if index < keep {
                report.kept.push(id);
                continue;
            }
            match self.delete(&id).await {
                Ok(()) => {
                    self.reporter.info(&format!("Deleted old backup: {id}"));
                    report.deleted.push(id);
                }
                Err(error) => {
                    self.reporter
                        .warn(&format!("Failed to delete backup {id}: {error}"));
                    report.failed.push((id, error.to_string()));
                }
            }
        }

        Ok(report)
    }

    /// Delete every object of one snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`BackupError::Storage`] on the first object that cannot be
    /// listed or deleted.
    pub async fn delete(&self, id: &SnapshotId) -> Result<(), BackupError> {
        let prefix = layout::snapshot_prefix(id);
        let objects: Vec<_> = self.objects.list(Some(&prefix)).try_collect().await?;
        for object in objects {
            self.objects.delete(&object.location).await?;
        }
        Ok(())
    }

    async fn read(&self, id: &SnapshotId, path: &Path) -> Result<Vec<u8>, BackupError> {
        match self.objects.get(path).await {
            Ok(result) => Ok(result.bytes().await?.to_vec()),
            Err(object_store::Error::NotFound { .. }) => Err(BackupError::NotFound(id.clone())),
            Err(error) => Err(error.into()),
        }
    }
}
