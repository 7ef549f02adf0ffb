use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use fpt_backup::{BatchProgress, Restorer, layout};
use fpt_core::enums::RestoreMode;
use fpt_core::restore::{RestoreOptions, RestoreReport};

use crate::cli::root_commands::RestoreArgs;
use crate::cli::{GlobalFlags, OutputFormat};
use crate::commands::{Status, backups};
use crate::context::AppContext;
use crate::output::{self, text};
use crate::progress::Progress;

const USAGE: &str = "Usage: fpt restore <backup-path> [--dry-run] [--clear] [--tables=table1,table2]";

/// Handle `fpt restore`.
pub async fn handle(
    args: &RestoreArgs,
    ctx: &mut AppContext,
    flags: &GlobalFlags,
) -> anyhow::Result<Status> {
    let Some(raw) = args.backup.as_deref() else {
        return list_available(ctx, flags).await;
    };

    let store = ctx.store()?;
    let (root, id) = layout::locate(raw, &ctx.backup_dir())?;
    let catalog = ctx.catalog_at(&root)?;
    let body = catalog
        .load(&id)
        .await
        .with_context(|| format!("failed to load backup {}", root.join(id.as_str()).display()))?;

    let options = RestoreOptions {
        tables: (!args.tables.is_empty()).then(|| args.tables.clone()),
        clear_before_restore: args.clear,
        dry_run: args.dry_run,
    };
    let tables = options
        .tables
        .clone()
        .unwrap_or_else(|| body.data.names().map(String::from).collect());

    let chatty = flags.format == OutputFormat::Text && !flags.quiet;
    if chatty {
        println!("Loading backup from: {}", root.join(id.as_str()).display());
        if let Ok(metadata) = catalog.read_metadata(&id).await {
            println!("Backup created: {}", metadata.timestamp.to_rfc3339());
            println!("Backup version: {}", metadata.version);
            println!("Backup size: {}", text::megabytes(metadata.size));
        }
        println!("Restoring {} tables:", tables.len());
        for table in &tables {
            println!("  - {table}");
        }
        println!();
        if options.dry_run {
            println!("DRY RUN MODE - No changes will be made");
            println!();
        }
    }

    if options.clear_before_restore && !options.dry_run {
        let delay = ctx.config.backup.clear_delay_secs;
        tracing::warn!(
            delay_secs = delay,
            "existing rows will be deleted before restoring; press Ctrl+C to cancel"
        );
        tokio::time::sleep(Duration::from_secs(delay)).await;
    }

    let progress = Progress::percent(flags.show_progress() && !options.dry_run, "Restoring");
    let bar = progress.clone();
    let report = Restorer::new(store, Arc::clone(&ctx.reporter))
        .batch_size(ctx.config.backup.batch_size)
        .conflict_column(&ctx.config.backup.conflict_column)
        .on_progress(Arc::new(move |step: &BatchProgress| {
            bar.update(
                step.percent(),
                &format!("{} ({}/{})", step.table, step.restored, step.total),
            );
        }))
        .restore(&id, &body, &options)
        .await;
    if report.success() {
        progress.finish_clear();
    } else {
        progress.finish_err("Restore completed with errors");
    }

    output::output(&report, flags.format, render)?;
    Ok(Status::from_ok(report.success()))
}

async fn list_available(ctx: &AppContext, flags: &GlobalFlags) -> anyhow::Result<Status> {
    eprintln!("{USAGE}");
    eprintln!();
    eprintln!("Available backups:");
    let entries = ctx
        .catalog()?
        .list_entries()
        .await
        .context("failed to list backups")?;
    output::output(&entries, flags.format, |entries| backups::render_entries(entries))?;
    Ok(Status::Failure)
}

fn render(report: &RestoreReport) -> Vec<String> {
    let mut lines = Vec::new();
    for table in &report.tables {
        let line = match (&table.error, table.verified) {
            (Some(error), _) => text::line(
                text::Mark::Fail,
                &format!(
                    "{}: {error} ({}/{} restored)",
                    table.table, table.restored, table.attempted
                ),
            ),
            (None, _) if report.mode == RestoreMode::DryRun => format!(
                "[DRY RUN] Would restore {} records to {}",
                table.attempted, table.table
            ),
            (None, Some(true)) => text::line(
                text::Mark::Pass,
                &format!(
                    "{}: restored {} records, verification passed",
                    table.table, table.restored
                ),
            ),
            (None, _) => text::line(
                text::Mark::Warn,
                &format!(
                    "{}: restored {} records, verification failed",
                    table.table, table.restored
                ),
            ),
        };
        lines.push(line);
    }

    let restored = report.tables.iter().filter(|t| t.is_ok()).count();
    lines.push(text::rule());
    lines.push("Restore Summary:".to_string());
    lines.push(format!("  Mode: {}", report.mode));
    lines.push(format!("  Tables restored: {restored}"));
    lines.push(format!("  Total records: {}", report.total_restored()));
    if !report.success() {
        lines.push(format!("  Errors: {}", report.error_count()));
    }
    lines.push(String::new());
    let unverified = report
        .tables
        .iter()
        .filter(|t| t.verified == Some(false))
        .count();
    if !report.success() {
        lines.push(text::line(text::Mark::Warn, "Restore completed with errors"));
    } else if unverified > 0 {
        lines.push(text::line(
            text::Mark::Warn,
            &format!("Restore completed; {unverified} tables failed verification"),
        ));
    } else {
        lines.push(text::line(text::Mark::Pass, "Restore completed successfully!"));
    }
    lines
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use fpt_backup::BackupWriter;
    use fpt_core::restore::TableRestoreOutcome;
    use fpt_core::row::{Row, from_pairs};
    use fpt_core::snapshot::SnapshotId;
    use fpt_store::MemoryStore;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::commands::test_support;

    async fn snapshot(ctx: &mut AppContext) -> String {
        let objects = layout::open_local(&ctx.backup_dir()).unwrap();
        let outcome = BackupWriter::new(ctx.store().unwrap(), objects, Arc::clone(&ctx.reporter))
            .create(&["clients".to_string(), "tasks".to_string()])
            .await
            .unwrap();
        outcome.id.to_string()
    }

    fn store() -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::new());
        store.insert_table(
            "clients",
            (1..=3).map(|i| from_pairs([("id", json!(format!("c-{i}")))])),
        );
        store.insert_table(
            "tasks",
            (1..=250).map(|i| from_pairs([("id", json!(format!("t-{i}")))])),
        );
        store
    }

    fn args(backup: Option<String>, clear: bool, dry_run: bool, tables: &[&str]) -> RestoreArgs {
        RestoreArgs {
            backup,
            dry_run,
            clear,
            tables: tables.iter().map(|t| (*t).to_string()).collect(),
        }
    }

    #[tokio::test]
    async fn clear_restore_replays_in_batches() {
        let dir = tempfile::tempdir().unwrap();
        let store = store();
        let mut ctx = test_support::context(dir.path(), &store);
        let id = snapshot(&mut ctx).await;
        store.insert_table("tasks", Vec::<Row>::new());

        let status = handle(&args(Some(id), true, false, &["tasks"]), &mut ctx, &test_support::flags())
            .await
            .unwrap();

        assert_eq!(status, Status::Success);
        assert_eq!(store.delete_calls("tasks"), 1);
        assert_eq!(store.upsert_batches("tasks"), [100, 100, 50]);
        assert_eq!(store.rows("tasks").len(), 250);
        assert!(store.upsert_batches("clients").is_empty());
    }

    #[tokio::test]
    async fn dry_run_never_writes() {
        let dir = tempfile::tempdir().unwrap();
        let store = store();
        let mut ctx = test_support::context(dir.path(), &store);
        let id = snapshot(&mut ctx).await;
        let writes = store.writes();

        let status = handle(&args(Some(id), true, true, &[]), &mut ctx, &test_support::flags())
            .await
            .unwrap();

        assert_eq!(status, Status::Success);
        assert_eq!(store.writes(), writes);
    }

    #[tokio::test]
    async fn batch_failure_sets_failure_status() {
        let dir = tempfile::tempdir().unwrap();
        let store = store();
        let mut ctx = test_support::context(dir.path(), &store);
        let id = snapshot(&mut ctx).await;
        store.faults(|f| f.fail_upsert_at("tasks", 1, "statement timeout"));

        let status = handle(&args(Some(id), false, false, &[]), &mut ctx, &test_support::flags())
            .await
            .unwrap();

        assert_eq!(status, Status::Failure);
        assert_eq!(store.upsert_batches("clients"), [3]);
    }

    #[tokio::test]
    async fn missing_path_lists_snapshots_and_fails() {
        let dir = tempfile::tempdir().unwrap();
        let store = store();
        let mut ctx = test_support::context(dir.path(), &store);
        snapshot(&mut ctx).await;

        let status = handle(&args(None, false, false, &[]), &mut ctx, &test_support::flags())
            .await
            .unwrap();

        assert_eq!(status, Status::Failure);
        assert_eq!(store.writes(), 0);
    }

    #[tokio::test]
    async fn unknown_snapshot_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = store();
        let mut ctx = test_support::context(dir.path(), &store);

        let result = handle(
            &args(Some("backup-2020-01-01T00-00-00-000Z".into()), false, false, &[]),
            &mut ctx,
            &test_support::flags(),
        )
        .await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn unreadable_count_is_reported_as_unverified_write() {
        let dir = tempfile::tempdir().unwrap();
        let store = store();
        let mut ctx = test_support::context(dir.path(), &store);
        let id = snapshot(&mut ctx).await;
        store.faults(|f| f.fail_count("clients", "statement timeout"));

        let restore = args(Some(id), false, false, &["clients"]);
        let status = handle(&restore, &mut ctx, &test_support::flags())
            .await
            .unwrap();

        assert_eq!(status, Status::Success);
        assert_eq!(store.upsert_batches("clients"), [3]);
    }

    #[test]
    fn written_rows_are_never_labelled_dry_run() {
        let report = RestoreReport {
            snapshot_id: SnapshotId::parse("backup-2026-10-18T08-00-00-000Z").unwrap(),
            mode: RestoreMode::UpsertOnly,
            tables: vec![TableRestoreOutcome {
                table: "clients".into(),
                attempted: 3,
                restored: 3,
                verified: Some(false),
                error: None,
            }],
        };

        let lines = render(&report);

        assert!(lines.iter().all(|l| !l.contains("[DRY RUN]")));
        assert!(lines.contains(&"⚠ clients: restored 3 records, verification failed".to_string()));
        assert_eq!(
            lines.last().unwrap(),
            "⚠ Restore completed; 1 tables failed verification"
        );
    }

    #[test]
    fn dry_run_rows_follow_the_mode() {
        let report = RestoreReport {
            snapshot_id: SnapshotId::parse("backup-2026-10-18T08-00-00-000Z").unwrap(),
            mode: RestoreMode::DryRun,
            tables: vec![TableRestoreOutcome {
                table: "tasks".into(),
                attempted: 250,
                restored: 0,
                verified: None,
                error: None,
            }],
        };

        let lines = render(&report);

        assert_eq!(lines[0], "[DRY RUN] Would restore 250 records to tasks");
        assert_eq!(lines.last().unwrap(), "✓ Restore completed successfully!");
    }
}
