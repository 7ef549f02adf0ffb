use anyhow::Context;
use fpt_backup::{CatalogEntry, PruneReport, VerifyReport, layout};

use crate::cli::GlobalFlags;
use crate::cli::subcommands::BackupsCommands;
use crate::commands::Status;
use crate::context::AppContext;
use crate::output::{self, text};

/// Handle `fpt backups`.
pub async fn handle(
    action: &BackupsCommands,
    ctx: &mut AppContext,
    flags: &GlobalFlags,
) -> anyhow::Result<Status> {
    match action {
        BackupsCommands::List => {
            let entries = ctx
                .catalog()?
                .list_entries()
                .await
                .context("failed to list backups")?;
            output::output(&entries, flags.format, |entries| render_entries(entries))?;
            Ok(Status::Success)
        }
        BackupsCommands::Prune { keep } => {
            let keep = keep.unwrap_or(ctx.config.backup.keep);
            let report = ctx
                .catalog()?
                .prune(keep)
                .await
                .context("failed to prune backups")?;
            output::output(&report, flags.format, render_prune)?;
            Ok(Status::from_ok(report.failed.is_empty()))
        }
        BackupsCommands::Verify { backup } => {
            let (root, id) = layout::locate(backup, &ctx.backup_dir())?;
            let report = ctx
                .catalog_at(&root)?
                .verify(&id)
                .await
                .with_context(|| format!("failed to verify {id}"))?;
            output::output(&report, flags.format, render_verify)?;
            Ok(Status::from_ok(report.is_valid()))
        }
    }
}

/// Numbered snapshot listing, shared with `fpt restore` without a path.
pub fn render_entries(entries: &[CatalogEntry]) -> Vec<String> {
    if entries.is_empty() {
        return vec!["No backups found".to_string()];
    }
    let mut lines = Vec::new();
    for (index, entry) in entries.iter().enumerate() {
        lines.push(format!("  {}. {}", index + 1, entry.id));
        match &entry.metadata {
            Some(metadata) => {
                lines.push(format!("     Date: {}", metadata.timestamp.to_rfc3339()));
                lines.push(format!("     Size: {}", text::megabytes(metadata.size)));
                lines.push(format!("     Records: {}", metadata.total_records()));
            }
            None => lines.push("     Metadata: unreadable".to_string()),
        }
        lines.push(String::new());
    }
    lines
}

fn render_prune(report: &PruneReport) -> Vec<String> {
    let mut lines: Vec<String> = report
        .deleted
        .iter()
        .map(|id| format!("Deleting old backup: {id}"))
        .collect();
    for (id, error) in &report.failed {
        lines.push(text::line(
            text::Mark::Fail,
            &format!("Could not delete {id}: {error}"),
        ));
    }
    lines.push(text::line(
        text::Mark::from_ok(report.failed.is_empty()),
        &format!(
            "Cleaned {} old backups, kept {}",
            report.deleted.len(),
            report.kept.len()
        ),
    ));
    lines
}

fn render_verify(report: &VerifyReport) -> Vec<String> {
    let mut lines = vec![
        format!("Backup: {}", report.id),
        format!("Size: {} ({} bytes)", text::megabytes(report.size), report.size),
        format!("Checksum: {}", report.checksum),
    ];
    if report.is_valid() {
        lines.push(text::line(text::Mark::Pass, "Integrity check passed"));
    } else {
        for problem in &report.problems {
            lines.push(text::line(text::Mark::Fail, problem));
        }
    }
    lines
}
