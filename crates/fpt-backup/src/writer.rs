//! Backup Writer: capture tables into a new snapshot.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use fpt_core::report::Reporter;
use fpt_core::snapshot::{SnapshotBody, SnapshotId, SnapshotMetadata, TableData, TableSet};
use fpt_store::{RemoteStore, fetch_all};
use object_store::{ObjectStore, PutPayload};

use crate::error::BackupError;
use crate::layout;

/// Default rows per page.
pub const DEFAULT_PAGE_SIZE: usize = 1000;

/// A snapshot that was written, with its per-table failures.
#[derive(Debug, Clone)]
pub struct BackupOutcome {
    pub id: SnapshotId,
    pub metadata: SnapshotMetadata,
    /// `(table, error)` for every table whose fetch failed.
    pub failed_tables: Vec<(String, String)>,
}

impl BackupOutcome {
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.failed_tables.is_empty()
    }
}

pub struct BackupWriter {
    store: Arc<dyn RemoteStore>,
    objects: Arc<dyn ObjectStore>,
    reporter: Arc<dyn Reporter>,
    page_size: usize,
}

impl BackupWriter {
    pub fn new(
        store: Arc<dyn RemoteStore>,
        objects: Arc<dyn ObjectStore>,
        reporter: Arc<dyn Reporter>,
    ) -> Self {
        Self {
            store,
            objects,
            reporter,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    #[must_use]
    pub const fn page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    /// Capture `tables` into a snapshot stamped with the current time.
    ///
    /// # Errors
    ///
    /// See [`Self::create_at`].
    pub async fn create(&self, tables: &[String]) -> Result<BackupOutcome, BackupError> {
        self.create_at(tables, Utc::now()).await
    }

    /// Capture `tables` into a snapshot stamped `at`.
    ///
    /// Tables are read one after another. A table whose read fails is stored
    /// as `{error}` with a record count of zero and the run moves on, so the
    /// snapshot is still written. `backup.json` is persisted before
    /// `metadata.json`.
    ///
    /// # Errors
    ///
    /// Returns [`BackupError`] only when the snapshot itself cannot be
    /// serialized or persisted.
    pub async fn create_at(
        &self,
        tables: &[String],
        at: DateTime<Utc>,
    ) -> Result<BackupOutcome, BackupError> {
        let id = SnapshotId::from_timestamp(at);
        let run = self.reporter.scoped("snapshot", id.as_str());
        run.info(&format!("Starting backup of {} tables", tables.len()));

        let mut data = TableSet::new();
        for table in tables {
            let reporter = run.scoped("table", table);
            match fetch_all(self.store.as_ref(), table, self.page_size).await {
                Ok(rows) => {
                    reporter.info(&format!("Backed up {} records", rows.len()));
                    data.insert(table.clone(), TableData::Rows(rows));
                }
                Err(error) => {
                    reporter.error(&format!("Failed to back up: {error}"));
                    data.insert(
                        table.clone(),
                        TableData::Failed {
                            error: error.to_string(),
                        },
                    );
                }
            }
        }

        let body = SnapshotBody::new(at, tables.to_vec(), data);
        let bytes = body.to_bytes()?;
        let metadata = SnapshotMetadata::build(&body, &bytes);
        let failed_tables = body
            .failed_tables()
            .into_iter()
            .map(|(table, error)| (table.to_string(), error.to_string()))
            .collect();

        self.objects
            .put(&layout::body_path(&id), PutPayload::from(bytes))
            .await?;
        let metadata_bytes = serde_json::to_vec_pretty(&metadata)?;
        self.objects
            .put(&layout::metadata_path(&id), PutPayload::from(metadata_bytes))
            .await?;

        run.info(&format!(
            "Backup written: {} records, {} bytes, checksum {}",
            metadata.total_records(),
            metadata.size,
            metadata.checksum
        ));

        Ok(BackupOutcome {
            id,
            metadata,
            failed_tables,
        })
    }
}
