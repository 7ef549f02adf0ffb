//! Function handlers.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use fpt_notify::{Entrypoint, NotifyError};
use serde_json::json;
use subtle::ConstantTimeEq;

use crate::AppState;

pub async fn health() -> Json<serde_json::Value> {
    let functions: Vec<&str> = Entrypoint::ALL.iter().map(|e| e.name()).collect();
    Json(json!({ "status": "ok", "functions": functions }))
}

pub async fn invoke(
    State(state): State<AppState>,
    Path(name): Path<String>,
    headers: HeaderMap,
) -> Response {
    if !authorized(&state, &headers) {
        return (StatusCode::UNAUTHORIZED, Json(json!({ "error": "Unauthorized" }))).into_response();
    }

    let entrypoint = match name.parse::<Entrypoint>() {
        Ok(entrypoint) => entrypoint,
        Err(error) => {
            return (
                StatusCode::NOT_FOUND,
                Json(json!({ "success": false, "error": error.to_string() })),
            )
                .into_response();
        }
    };

    match state.pipeline.run(entrypoint).await {
        Ok(summary) => (StatusCode::OK, Json(summary)).into_response(),
        Err(error) => failure(entrypoint, &error),
    }
}

pub async fn method_not_allowed() -> Response {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(json!({ "error": "Method not allowed" })),
    )
        .into_response()
}

fn authorized(state: &AppState, headers: &HeaderMap) -> bool {
    let Some(secret) = &state.secret else {
        return true;
    };
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .is_some_and(|token| bool::from(token.as_bytes().ct_eq(secret.as_bytes())))
}

fn failure(entrypoint: Entrypoint, error: &NotifyError) -> Response {
    tracing::error!(function = %entrypoint, %error, "function failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "success": false, "error": error.to_string() })),
    )
        .into_response()
}
