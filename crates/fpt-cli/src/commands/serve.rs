use anyhow::Context;
use fpt_server::AppState;
use tokio::net::TcpListener;

use crate::cli::root_commands::ServeArgs;
use crate::commands::Status;
use crate::context::AppContext;

/// Handle `fpt serve`.
///
/// Runs until Ctrl+C or SIGTERM. Without an email transport the server
/// still starts and every function call answers 500.
pub async fn handle(args: &ServeArgs, ctx: &mut AppContext) -> anyhow::Result<Status> {
    let bind = args
        .bind
        .clone()
        .unwrap_or_else(|| ctx.config.server.bind.clone());
    let pipeline = ctx.pipeline()?;

    if !ctx.config.server.requires_auth() {
        tracing::warn!("function secret is empty; endpoints accept unauthenticated calls");
    }
    if !ctx.config.email.is_configured() {
        tracing::warn!("no email transport configured; function calls will fail");
    }

    let listener = TcpListener::bind(&bind)
        .await
        .with_context(|| format!("failed to bind {bind}"))?;
    fpt_server::serve(listener, AppState::new(pipeline, &ctx.config.server))
        .await
        .context("server stopped")?;
    Ok(Status::Success)
}
