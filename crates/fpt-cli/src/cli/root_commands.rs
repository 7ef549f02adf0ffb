use clap::{Args, Subcommand};

use crate::cli::subcommands::{BackupsCommands, NotifyCommands};

/// Top-level command tree.
#[derive(Clone, Debug, Subcommand)]
pub enum Commands {
    /// Snapshot the configured tables, then prune old snapshots.
    Backup(BackupArgs),
    /// Inspect and maintain stored snapshots.
    Backups {
        #[command(subcommand)]
        action: BackupsCommands,
    },
    /// Replay a snapshot into the live store.
    Restore(RestoreArgs),
    /// Run a notification function once.
    Notify {
        #[command(subcommand)]
        action: NotifyCommands,
    },
    /// Check configuration, store access and the backup directory.
    Health,
    /// Check that every required table exists.
    Validate,
    /// Serve the notification functions over HTTP.
    Serve(ServeArgs),
}

#[derive(Clone, Debug, Args)]
pub struct BackupArgs {
    /// Tables to capture (defaults to `backup.tables`).
    #[arg(long, value_delimiter = ',')]
    pub tables: Vec<String>,

    /// Snapshots to keep after the backup (defaults to `backup.keep`).
    #[arg(long)]
    pub keep: Option<usize>,

    /// Keep every snapshot.
    #[arg(long)]
    pub no_prune: bool,
}

#[derive(Clone, Debug, Args)]
pub struct RestoreArgs {
    /// Snapshot id, directory or `backup.json`. Lists snapshots when omitted.
    pub backup: Option<String>,

    /// Report what would be restored without writing.
    #[arg(long)]
    pub dry_run: bool,

    /// Delete live rows before restoring each table.
    #[arg(long)]
    pub clear: bool,

    /// Tables to restore (defaults to every table in the snapshot).
    #[arg(long, value_delimiter = ',')]
    pub tables: Vec<String>,
}

#[derive(Clone, Debug, Args)]
pub struct ServeArgs {
    /// Address to listen on (defaults to `server.bind`).
    #[arg(long)]
    pub bind: Option<String>,
}
