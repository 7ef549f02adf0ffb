//! Restore job options and per-table outcomes.

use serde::{Deserialize, Serialize};

use crate::enums::RestoreMode;
use crate::snapshot::SnapshotId;

/// Caller-supplied knobs for a restore job.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestoreOptions {
    /// Tables to restore. `None` restores every table in the snapshot.
    pub tables: Option<Vec<String>>,
    pub clear_before_restore: bool,
    pub dry_run: bool,
}

impl RestoreOptions {
    #[must_use]
    pub const fn mode(&self) -> RestoreMode {
        RestoreMode::from_flags(self.dry_run, self.clear_before_restore)
    }
}

/// What happened to one table during a restore.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableRestoreOutcome {
    pub table: String,
    /// Records the restore intended to write.
    pub attempted: u64,
    /// Records written by batches that succeeded.
    pub restored: u64,
    /// Live count equals `attempted` after the restore. `Some(false)` also
    /// when the live count could not be read. `None` when no verification
    /// ran (dry run, skipped or aborted table).
    pub verified: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TableRestoreOutcome {
    #[must_use]
    pub fn skipped(table: &str, error: impl Into<String>) -> Self {
        Self {
            table: table.to_string(),
            attempted: 0,
            restored: 0,
            verified: None,
            error: Some(error.into()),
        }
    }

    #[must_use]
    pub const fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Result of a whole restore job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestoreReport {
    pub snapshot_id: SnapshotId,
    pub mode: RestoreMode,
    pub tables: Vec<TableRestoreOutcome>,
}

impl RestoreReport {
    /// True only when no table recorded an error.
    #[must_use]
    pub fn success(&self) -> bool {
        self.tables.iter().all(TableRestoreOutcome::is_ok)
    }

    #[must_use]
    pub fn error_count(&self) -> usize {
        self.tables.iter().filter(|t| !t.is_ok()).count()
    }

    #[must_use]
    pub fn total_restored(&self) -> u64 {
        self.tables.iter().map(|t| t.restored).sum()
    }

    #[must_use]
    pub fn table(&self, name: &str) -> Option<&TableRestoreOutcome> {
        self.tables.iter().find(|t| t.table == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_succeeds_only_without_table_errors() {
        let ok = TableRestoreOutcome {
            table: "clients".into(),
            attempted: 3,
            restored: 3,
            verified: Some(false),
            error: None,
        };
        let mut report = RestoreReport {
            snapshot_id: SnapshotId::parse("backup-2026-10-18T08-00-00-000Z").unwrap(),
            mode: RestoreMode::UpsertOnly,
            tables: vec![ok],
        };
        // A verification mismatch is reported, not counted as an error.
        assert!(report.success());

        report
            .tables
            .push(TableRestoreOutcome::skipped("tasks", "Table not found in backup"));
        assert!(!report.success());
        assert_eq!(report.error_count(), 1);
        assert_eq!(report.total_restored(), 3);
    }
}
