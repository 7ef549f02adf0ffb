use clap::Subcommand;

/// Snapshot catalog maintenance.
#[derive(Clone, Debug, Subcommand)]
pub enum BackupsCommands {
    /// List snapshots, most recent first.
    List,
    /// Delete all but the most recent snapshots.
    Prune {
        /// Snapshots to keep (defaults to `backup.keep`).
        #[arg(long)]
        keep: Option<usize>,
    },
    /// Recompute size and checksum of a snapshot and compare with its metadata.
    Verify {
        /// Snapshot id, directory or `backup.json`.
        backup: String,
    },
}
