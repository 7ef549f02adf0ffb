//! # fpt-server
//!
//! Serves the scheduled notification functions over HTTP so a cron service
//! can trigger them:
//!
//! - `GET|POST /functions/{name}` runs one [`fpt_notify::Entrypoint`]
//! - `GET /health` reports liveness and the available functions
//!
//! When a function secret is configured every function call must carry
//! `Authorization: Bearer <secret>`.

mod routes;
mod shutdown;

use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use fpt_config::ServerConfig;
use fpt_notify::Pipeline;
use tokio::net::TcpListener;

pub use shutdown::shutdown_signal;

/// Shared state of every handler.
#[derive(Clone)]
pub struct AppState {
    pipeline: Arc<Pipeline>,
    secret: Option<Arc<str>>,
}

impl AppState {
    pub fn new(pipeline: Pipeline, config: &ServerConfig) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            secret: config
                .requires_auth()
                .then(|| Arc::from(config.function_secret.as_str())),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(routes::health))
        .route(
            "/functions/{name}",
            get(routes::invoke)
                .post(routes::invoke)
                .fallback(routes::method_not_allowed),
        )
        .with_state(state)
}

/// Serve until Ctrl+C or SIGTERM.
///
/// # Errors
///
/// Returns the I/O error that stopped the server.
pub async fn serve(listener: TcpListener, state: AppState) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        tracing::info!(%addr, "serving notification functions");
    }
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
}
