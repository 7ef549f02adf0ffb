use std::path::Path;

use fpt_config::KeyKind;
use serde::Serialize;

use crate::cli::GlobalFlags;
use crate::commands::Status;
use crate::context::AppContext;
use crate::output;
use crate::output::text::{self, Mark};

#[derive(Debug, Clone, Serialize)]
pub struct Check {
    pub name: String,
    pub status: Mark,
    pub message: String,
}

impl Check {
    fn new(name: impl Into<String>, status: Mark, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status,
            message: message.into(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthReport {
    pub passed: usize,
    pub failed: usize,
    pub warnings: usize,
    /// Percentage of checks that passed, rounded.
    pub score: u32,
    pub checks: Vec<Check>,
}

impl HealthReport {
    #[must_use]
    pub fn new(checks: Vec<Check>) -> Self {
        let count = |mark| checks.iter().filter(|c| c.status == mark).count();
        let passed = count(Mark::Pass);
        let failed = count(Mark::Fail);
        let warnings = count(Mark::Warn);
        let score = if checks.is_empty() {
            100
        } else {
            u32::try_from((passed * 200 + checks.len()) / (checks.len() * 2)).unwrap_or(100)
        };
        Self {
            passed,
            failed,
            warnings,
            score,
            checks,
        }
    }
}

/// Handle `fpt health`.
pub async fn handle(ctx: &mut AppContext, flags: &GlobalFlags) -> anyhow::Result<Status> {
    let report = HealthReport::new(run_checks(ctx).await);
    output::output(&report, flags.format, render)?;
    Ok(Status::from_ok(report.failed == 0))
}

async fn run_checks(ctx: &mut AppContext) -> Vec<Check> {
    let mut checks = Vec::new();

    checks.push(if ctx.config.store.is_configured() {
        Check::new(
            "Store credentials",
            Mark::Pass,
            format!("{} configured", ctx.config.store.url),
        )
    } else {
        Check::new(
            "Store credentials",
            Mark::Fail,
            "set SUPABASE_URL and SUPABASE_SERVICE_ROLE_KEY (or an anon key)",
        )
    });
    if ctx.config.store.key_kind() == Some(KeyKind::Anon) {
        checks.push(Check::new(
            "Service key",
            Mark::Warn,
            "only the anon key is set; backups and restores are limited by row-level security",
        ));
    }

    match ctx.store() {
        Ok(store) => {
            match store.count("profiles").await {
                Ok(count) => checks.push(Check::new(
                    "Store reachable",
                    Mark::Pass,
                    format!("profiles has {count} rows"),
                )),
                Err(error) => checks.push(Check::new(
                    "Store reachable",
                    Mark::Fail,
                    error.to_string(),
                )),
            }
            for table in &ctx.config.backup.tables {
                let check = match store.count(table).await {
                    Ok(count) => Check::new(
                        format!("Table {table}"),
                        Mark::Pass,
                        format!("readable ({count} rows)"),
                    ),
                    Err(error) => Check::new(format!("Table {table}"), Mark::Fail, error.to_string()),
                };
                checks.push(check);
            }
        }
        Err(error) => checks.push(Check::new(
            "Store reachable",
            Mark::Fail,
            format!("skipped: {error:#}"),
        )),
    }

    let dir = ctx.backup_dir();
    checks.push(match probe_writable(&dir) {
        Ok(()) => Check::new("Backup directory", Mark::Pass, format!("{} is writable", dir.display())),
        Err(error) => Check::new(
            "Backup directory",
            Mark::Fail,
            format!("{} is not writable: {error}", dir.display()),
        ),
    });

    checks.push(match ctx.transports() {
        Ok(chain) if !chain.is_empty() => Check::new(
            "Email transport",
            Mark::Pass,
            chain.names().join(" → "),
        ),
        Ok(_) => Check::new(
            "Email transport",
            Mark::Warn,
            "no RESEND_API_KEY or SENDGRID_API_KEY; notifications cannot be sent",
        ),
        Err(error) => Check::new("Email transport", Mark::Fail, format!("{error:#}")),
    });

    checks.push(if ctx.config.server.requires_auth() {
        Check::new("Function secret", Mark::Pass, "set")
    } else {
        Check::new(
            "Function secret",
            Mark::Warn,
            "FUNCTION_SECRET is empty; function endpoints accept unauthenticated calls",
        )
    });

    checks
}

fn probe_writable(dir: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(dir)?;
    tempfile::NamedTempFile::new_in(dir).map(drop)
}

fn render(report: &HealthReport) -> Vec<String> {
    let mut lines: Vec<String> = report
        .checks
        .iter()
        .map(|check| text::line(check.status, &format!("{}: {}", check.name, check.message)))
        .collect();
    lines.push(String::new());
    lines.push(format!("✓ Passed: {}", report.passed));
    lines.push(format!("✗ Failed: {}", report.failed));
    lines.push(format!("⚠ Warnings: {}", report.warnings));
    lines.push(format!("Health Score: {}%", report.score));
    lines
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use fpt_store::MemoryStore;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::commands::test_support;

    fn store() -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::new());
        store.create_table("profiles");
        store
    }

    #[test]
    fn score_rounds_the_pass_ratio() {
        let checks = vec![
            Check::new("a", Mark::Pass, ""),
            Check::new("b", Mark::Pass, ""),
            Check::new("c", Mark::Warn, ""),
        ];
        let report = HealthReport::new(checks);
        assert_eq!(report.score, 67);
        assert_eq!(report.warnings, 1);
        assert_eq!(report.failed, 0);
    }

    #[tokio::test]
    async fn missing_tables_fail_the_run() {
        let dir = tempfile::tempdir().unwrap();
        let store = store();
        let mut ctx = test_support::context(dir.path(), &store);
        ctx.config.backup.tables = vec!["profiles".into(), "clients".into()];

        let report = HealthReport::new(run_checks(&mut ctx).await);

        let clients = report
            .checks
            .iter()
            .find(|c| c.name == "Table clients")
            .unwrap();
        assert_eq!(clients.status, Mark::Fail);
        assert_eq!(report.failed, 1);
        assert_eq!(
            handle(&mut ctx, &test_support::flags()).await.unwrap(),
            Status::Failure
        );
    }

    #[tokio::test]
    async fn warnings_alone_pass() {
        let dir = tempfile::tempdir().unwrap();
        let store = store();
        let mut ctx = test_support::context(dir.path(), &store);
        ctx.config.backup.tables = vec!["profiles".into()];

        let report = HealthReport::new(run_checks(&mut ctx).await);

        assert_eq!(report.failed, 0);
        assert_eq!(report.warnings, 2);
        assert!(dir.path().join("backups").is_dir());
        assert_eq!(
            handle(&mut ctx, &test_support::flags()).await.unwrap(),
            Status::Success
        );
    }
}
