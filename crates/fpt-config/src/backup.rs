//! Backup and restore configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

fn default_dir() -> PathBuf {
    PathBuf::from("./backups")
}

fn default_tables() -> Vec<String> {
    [
        "profiles",
        "documents",
        "projects",
        "tasks",
        "clients",
        "time_entries",
        "templates",
        "document_versions",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

/// Snapshots kept after pruning.
const fn default_keep() -> usize {
    7
}

const fn default_page_size() -> usize {
    1000
}

const fn default_batch_size() -> usize {
    100
}

/// Pause before a destructive clear-and-restore, in seconds.
const fn default_clear_delay_secs() -> u64 {
    5
}

fn default_conflict_column() -> String {
    "id".to_string()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BackupConfig {
    /// Directory holding one sub-directory per snapshot.
    #[serde(default = "default_dir")]
    pub dir: PathBuf,

    /// Tables captured by `fpt backup`, in capture order.
    #[serde(default = "default_tables")]
    pub tables: Vec<String>,

    #[serde(default = "default_keep")]
    pub keep: usize,

    /// Rows per page when reading a table.
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Rows per upsert when restoring.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    #[serde(default = "default_clear_delay_secs")]
    pub clear_delay_secs: u64,

    /// Primary key column used for idempotent upserts.
    #[serde(default = "default_conflict_column")]
    pub conflict_column: String,
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            dir: default_dir(),
            tables: default_tables(),
            keep: default_keep(),
            page_size: default_page_size(),
            batch_size: default_batch_size(),
            clear_delay_secs: default_clear_delay_secs(),
            conflict_column: default_conflict_column(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_operational_constants() {
        let config = BackupConfig::default();
        assert_eq!(config.dir, PathBuf::from("./backups"));
        assert_eq!(config.tables.len(), 8);
        assert_eq!(config.tables[0], "profiles");
        assert_eq!(config.keep, 7);
        assert_eq!(config.page_size, 1000);
        assert_eq!(config.batch_size, 100);
        assert_eq!(config.clear_delay_secs, 5);
        assert_eq!(config.conflict_column, "id");
    }
}
