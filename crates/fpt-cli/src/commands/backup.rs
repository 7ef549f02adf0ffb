use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use fpt_backup::{BackupCatalog, BackupWriter, PruneReport, layout};
use fpt_core::snapshot::{SnapshotId, SnapshotMetadata};
use serde::Serialize;

use crate::cli::GlobalFlags;
use crate::cli::root_commands::BackupArgs;
use crate::commands::Status;
use crate::context::AppContext;
use crate::output::{self, text};
use crate::progress::Progress;

#[derive(Debug, Serialize)]
struct FailedTable {
    table: String,
    error: String,
}

#[derive(Debug, Serialize)]
struct BackupResponse {
    success: bool,
    id: SnapshotId,
    location: PathBuf,
    metadata: SnapshotMetadata,
    failed_tables: Vec<FailedTable>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pruned: Option<PruneReport>,
}

/// Handle `fpt backup`.
pub async fn handle(
    args: &BackupArgs,
    ctx: &mut AppContext,
    flags: &GlobalFlags,
) -> anyhow::Result<Status> {
    let store = ctx.store()?;
    let tables = if args.tables.is_empty() {
        ctx.config.backup.tables.clone()
    } else {
        args.tables.clone()
    };
    let dir = ctx.backup_dir();
    let objects = layout::open_local(&dir)
        .with_context(|| format!("failed to open backup directory {}", dir.display()))?;

    let spinner = Progress::spinner(
        flags.show_progress(),
        &format!("Backing up {} tables", tables.len()),
    );
    let outcome = BackupWriter::new(store, Arc::clone(&objects), Arc::clone(&ctx.reporter))
        .page_size(ctx.config.backup.page_size)
        .create(&tables)
        .await;
    spinner.finish_clear();
    let outcome = outcome.context("failed to write backup")?;

    let pruned = if args.no_prune {
        None
    } else {
        let keep = args.keep.unwrap_or(ctx.config.backup.keep);
        let catalog = BackupCatalog::new(objects, Arc::clone(&ctx.reporter));
        Some(
            catalog
                .prune(keep)
                .await
                .context("failed to prune old backups")?,
        )
    };

    let response = BackupResponse {
        success: outcome.is_complete(),
        location: dir.join(outcome.id.as_str()),
        id: outcome.id,
        metadata: outcome.metadata,
        failed_tables: outcome
            .failed_tables
            .into_iter()
            .map(|(table, error)| FailedTable { table, error })
            .collect(),
        pruned,
    };
    output::output(&response, flags.format, render)?;
    Ok(Status::from_ok(response.success))
}

fn render(response: &BackupResponse) -> Vec<String> {
    let mut lines = vec![text::rule()];
    if response.success {
        lines.push(text::line(text::Mark::Pass, "Backup completed successfully!"));
    } else {
        lines.push(text::line(
            text::Mark::Warn,
            &format!(
                "Backup completed with {} failed tables",
                response.failed_tables.len()
            ),
        ));
    }
    lines.push(format!("Location: {}", response.location.display()));
    lines.push(format!("Size: {}", text::megabytes(response.metadata.size)));
    lines.push("Record counts:".to_string());
    for table in &response.metadata.tables {
        match response.failed_tables.iter().find(|f| &f.table == table) {
            Some(failed) => lines.push(format!("  ✗ {table}: {}", failed.error)),
            None => {
                let count = response
                    .metadata
                    .record_counts
                    .get(table)
                    .copied()
                    .unwrap_or(0);
                lines.push(format!("  - {table}: {count}"));
            }
        }
    }
    if let Some(pruned) = &response.pruned {
        lines.push(format!("Cleaned {} old backups", pruned.deleted.len()));
        for (id, error) in &pruned.failed {
            lines.push(text::line(
                text::Mark::Warn,
                &format!("Could not delete {id}: {error}"),
            ));
        }
    }
    lines
}
