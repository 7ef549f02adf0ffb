use fpt_store::{RemoteStore, StoreError};
use serde::Serialize;

use crate::cli::GlobalFlags;
use crate::commands::Status;
use crate::context::AppContext;
use crate::output::{self, text};

/// Tables the application cannot run without.
pub const REQUIRED_TABLES: [&str; 9] = [
    "profiles",
    "clients",
    "projects",
    "tasks",
    "time_logs",
    "work_documentation",
    "document_categories",
    "document_library",
    "project_documents",
];

#[derive(Debug, Serialize)]
pub struct TableCheck {
    pub table: String,
    pub exists: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub row_count: Option<u64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

#[derive(Debug, Serialize)]
struct ValidationReport {
    valid: bool,
    tables: Vec<TableCheck>,
}

/// Handle `fpt validate`.
pub async fn handle(ctx: &mut AppContext, flags: &GlobalFlags) -> anyhow::Result<Status> {
    let store = ctx.store()?;
    let tables = check_tables(store.as_ref(), &REQUIRED_TABLES).await;
    let report = ValidationReport {
        valid: tables.iter().all(|t| t.errors.is_empty()),
        tables,
    };
    output::output(&report, flags.format, render)?;
    Ok(Status::from_ok(report.valid))
}

/// Count every table; a table that cannot be counted is reported missing.
pub async fn check_tables(store: &dyn RemoteStore, tables: &[&str]) -> Vec<TableCheck> {
    let mut checks = Vec::with_capacity(tables.len());
    for &table in tables {
        tracing::debug!(table, "checking table");
        let check = match store.count(table).await {
            Ok(count) => TableCheck {
                table: table.to_string(),
                exists: true,
                row_count: Some(count),
                errors: Vec::new(),
            },
            Err(StoreError::UnknownTable(_)) => TableCheck {
                table: table.to_string(),
                exists: false,
                row_count: None,
                errors: vec![format!("Table {table} does not exist")],
            },
            Err(error) => TableCheck {
                table: table.to_string(),
                exists: false,
                row_count: None,
                errors: vec![format!("Could not read {table}: {error}")],
            },
        };
        checks.push(check);
    }
    checks
}

fn render(report: &ValidationReport) -> Vec<String> {
    let mut lines = Vec::new();
    for check in &report.tables {
        if check.errors.is_empty() {
            let rows = check
                .row_count
                .map(|n| format!(" ({n} rows)"))
                .unwrap_or_default();
            lines.push(text::line(
                text::Mark::Pass,
                &format!("{} - OK{rows}", check.table),
            ));
        } else {
            lines.push(text::line(
                text::Mark::Fail,
                &format!("{} - FAILED", check.table),
            ));
            lines.extend(check.errors.iter().map(|e| format!("   - {e}")));
        }
    }
    lines.push(text::rule());
    lines.push(if report.valid {
        text::line(text::Mark::Pass, "Validation PASSED")
    } else {
        text::line(text::Mark::Fail, "Validation FAILED")
    });
    lines
}
