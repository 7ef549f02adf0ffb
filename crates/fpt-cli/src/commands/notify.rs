use anyhow::Context;
use fpt_notify::{RunItem, RunSummary};

use crate::cli::GlobalFlags;
use crate::cli::subcommands::NotifyCommands;
use crate::commands::Status;
use crate::context::AppContext;
use crate::output::{self, text};

/// Handle `fpt notify`.
pub async fn handle(
    action: NotifyCommands,
    ctx: &mut AppContext,
    flags: &GlobalFlags,
) -> anyhow::Result<Status> {
    let entrypoint = action.entrypoint();
    let summary = ctx
        .pipeline()?
        .run(entrypoint)
        .await
        .with_context(|| format!("{entrypoint} failed"))?;
    output::output(&summary, flags.format, render)?;
    Ok(Status::from_ok(summary.failed == 0))
}

fn render(summary: &RunSummary) -> Vec<String> {
    let mut lines: Vec<String> = summary
        .results
        .iter()
        .map(|item| match item {
            RunItem::Dispatch(outcome) => match (&outcome.transport, &outcome.error) {
                (Some(transport), _) => text::line(
                    text::Mark::Pass,
                    &format!("{} sent via {transport}", outcome.id),
                ),
                (None, error) => text::line(
                    text::Mark::Fail,
                    &format!("{}: {}", outcome.id, error.as_deref().unwrap_or("not sent")),
                ),
            },
            RunItem::Digest(result) => match &result.error {
                None => text::line(
                    text::Mark::Pass,
                    &format!("{} digest sent to {}", result.cadence.label(), result.user_id),
                ),
                Some(error) => text::line(
                    text::Mark::Fail,
                    &format!("{} digest for {}: {error}", result.cadence.label(), result.user_id),
                ),
            },
        })
        .collect();
    lines.push(format!(
        "{}: {} sent, {} failed",
        summary.message, summary.sent, summary.failed
    ));
    lines
}
