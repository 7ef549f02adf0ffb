//! Batched Restorer: replay a snapshot into the live store.

use std::sync::Arc;

use fpt_core::enums::RestoreMode;
use fpt_core::report::Reporter;
use fpt_core::restore::{RestoreOptions, RestoreReport, TableRestoreOutcome};
use fpt_core::row::Row;
use fpt_core::snapshot::{SnapshotBody, SnapshotId, TableData};
use fpt_store::RemoteStore;

/// Default rows per upsert.
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Progress of one table after each successful batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchProgress {
    pub table: String,
    /// One-based number of the batch just written.
    pub batch: usize,
    pub batches: usize,
    pub restored: u64,
    pub total: u64,
}

impl BatchProgress {
    #[must_use]
    pub fn percent(&self) -> u64 {
        if self.total == 0 {
            100
        } else {
            self.restored * 100 / self.total
        }
    }
}

pub type ProgressFn = Arc<dyn Fn(&BatchProgress) + Send + Sync>;

pub struct Restorer {
    store: Arc<dyn RemoteStore>,
    reporter: Arc<dyn Reporter>,
    batch_size: usize,
    conflict_column: String,
    on_progress: Option<ProgressFn>,
}

impl Restorer {
    pub fn new(store: Arc<dyn RemoteStore>, reporter: Arc<dyn Reporter>) -> Self {
        Self {
            store,
            reporter,
            batch_size: DEFAULT_BATCH_SIZE,
            conflict_column: "id".to_string(),
            on_progress: None,
        }
    }

    #[must_use]
    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    #[must_use]
    pub fn conflict_column(mut self, column: &str) -> Self {
        self.conflict_column = column.to_string();
        self
    }

    #[must_use]
    pub fn on_progress(mut self, progress: ProgressFn) -> Self {
        self.on_progress = Some(progress);
        self
    }

    /// Restore the selected tables of `body`.
    ///
    /// Tables are processed one after another; a failure in one table is
    /// recorded in its outcome and the next table still runs. The job
    /// succeeds only if no table recorded an error (see
    /// [`RestoreReport::success`]).
    pub async fn restore(
        &self,
        snapshot_id: &SnapshotId,
        body: &SnapshotBody,
        options: &RestoreOptions,
    ) -> RestoreReport {
        let mode = options.mode();
        let selection: Vec<String> = match &options.tables {
            Some(tables) => tables.clone(),
            None => body.data.names().map(String::from).collect(),
        };
        let run = self.reporter.scoped("snapshot", snapshot_id.as_str());
        run.info(&format!("Restoring {} tables ({mode})", selection.len()));

        let mut tables = Vec::with_capacity(selection.len());
        for table in &selection {
            let reporter = run.scoped("table", table);
            let outcome = match body.data.get(table) {
                None => {
                    reporter.warn("Table not found in backup");
                    TableRestoreOutcome::skipped(table, "Table not found in backup")
                }
                Some(TableData::Failed { error }) => {
                    reporter.warn(&format!("Table backup had error: {error}"));
                    TableRestoreOutcome::skipped(table, format!("Table backup had error: {error}"))
                }
                Some(TableData::Rows(rows)) => {
                    self.restore_table(table, rows, mode, reporter.as_ref()).await
                }
            };
            tables.push(outcome);
        }

        let report = RestoreReport {
            snapshot_id: snapshot_id.clone(),
            mode,
            tables,
        };
        run.info(&format!(
            "Restore finished: {} records, {} errors",
            report.total_restored(),
            report.error_count()
        ));
        report
    }

    async fn restore_table(
        &self,
        table: &str,
        rows: &[Row],
        mode: RestoreMode,
        reporter: &dyn Reporter,
    ) -> TableRestoreOutcome {
        let attempted = rows.len() as u64;
        let mut outcome = TableRestoreOutcome {
            table: table.to_string(),
            attempted,
            restored: 0,
            verified: None,
            error: None,
        };

        if mode == RestoreMode::DryRun {
            reporter.info(&format!("Would restore {attempted} records"));
            return outcome;
        }

        if mode == RestoreMode::ClearThenRestore {
            match self.store.delete_all(table).await {
                Ok(()) => reporter.info("Cleared existing data"),
                Err(error) => reporter.warn(&format!("Could not clear table: {error}")),
            }
        }

        let batches = rows.len().div_ceil(self.batch_size);
        for (index, batch) in rows.chunks(self.batch_size).enumerate() {
            if let Err(error) = self
                .store
                .upsert(table, batch, &self.conflict_column)
                .await
            {
                reporter.error(&format!("Batch {} of {batches} failed: {error}", index + 1));
                outcome.error = Some(format!("batch {} of {batches}: {error}", index + 1));
                return outcome;
            }
            outcome.restored += batch.len() as u64;

            let progress = BatchProgress {
                table: table.to_string(),
                batch: index + 1,
                batches,
                restored: outcome.restored,
                total: attempted,
            };
            reporter.debug(&format!(
                "Progress: {}% ({}/{attempted})",
                progress.percent(),
                outcome.restored
            ));
            if let Some(callback) = &self.on_progress {
                callback(&progress);
            }
        }

        match self.store.count(table).await {
            Ok(live) => {
                let verified = live == attempted;
                if verified {
                    reporter.info(&format!("Restored {} records (verified)", outcome.restored));
                } else {
                    reporter.warn(&format!(
                        "Restored {} records; live count {live} differs from {attempted}",
                        outcome.restored
                    ));
                }
                outcome.verified = Some(verified);
            }
            Err(error) => {
                reporter.warn(&format!("Could not verify row count: {error}"));
                outcome.verified = Some(false);
            }
        }

        outcome
    }
}
