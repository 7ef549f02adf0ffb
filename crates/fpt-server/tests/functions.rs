use std::sync::Arc;

use async_trait::async_trait;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use chrono::{TimeZone, Utc};
use fpt_config::{EmailConfig, NotifyConfig, ServerConfig};
use fpt_core::report::MemoryReporter;
use fpt_core::row::from_pairs;
use fpt_notify::{Email, EmailTransport, NotifyError, Pipeline, TransportChain};
use fpt_server::{AppState, router};
use fpt_store::MemoryStore;
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use tower::ServiceExt;

struct AcceptAll;

#[async_trait]
impl EmailTransport for AcceptAll {
    fn name(&self) -> &str {
        "accept-all"
    }

    async fn send(&self, _email: &Email) -> Result<(), NotifyError> {
        Ok(())
    }
}

fn store() -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    store.set_now(Utc.with_ymd_and_hms(2026, 10, 18, 9, 0, 0).unwrap());
    store.insert_table(
        "profiles",
        [from_pairs([
            ("id", json!("u-1")),
            ("email", json!("pm@example.com")),
            ("full_name", json!("Thandi Nkosi")),
        ])],
    );
    store.insert_table(
        "tasks",
        [from_pairs([
            ("id", json!("t-1")),
            ("name", json!("Pump test")),
            ("status", json!("in_progress")),
            ("assigned_to", json!("u-1")),
            ("due_date", json!("2026-10-18T11:00:00Z")),
        ])],
    );
    store.create_table("projects");
    store.create_table("notifications");
    store
}

fn app(
    store: Arc<MemoryStore>,
    transports: Vec<Arc<dyn EmailTransport>>,
    secret: &str,
) -> axum::Router {
    let pipeline = Pipeline::new(
        store,
        TransportChain::new(transports),
        &EmailConfig::default(),
        NotifyConfig::default(),
        Arc::new(MemoryReporter::new()),
    );
    let config = ServerConfig {
        function_secret: secret.to_string(),
        ..ServerConfig::default()
    };
    router(AppState::new(pipeline, &config))
}

async fn call(app: axum::Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

fn post(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("POST").uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::empty()).unwrap()
}

#[tokio::test]
async fn authorized_call_runs_the_function() {
    let store = store();
    let app = app(store.clone(), vec![Arc::new(AcceptAll)], "cron-secret");

    let (status, body) = call(app, post("/functions/check-task-deadlines", Some("cron-secret"))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Task deadline check completed");
    assert_eq!(body["sent"], 1);
    assert_eq!(body["failed"], 0);
    assert_eq!(body["results"][0]["transport"], "accept-all");
    assert_eq!(store.rpc_calls("check_task_deadlines"), 1);
}

#[tokio::test]
async fn wrong_or_missing_token_is_rejected() {
    let store = store();
    for token in [
        None,
        Some("guess"),
        Some("cron-secre"),
        Some("cron-secret-2"),
        Some("CRON-SECRET"),
    ] {
        let app = app(store.clone(), vec![Arc::new(AcceptAll)], "cron-secret");
        let (status, body) = call(app, post("/functions/send-notifications", token)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body, json!({"error": "Unauthorized"}));
    }
    assert_eq!(store.rpc_calls("check_task_deadlines"), 0);
}

#[tokio::test]
async fn get_is_accepted_without_secret() {
    let app = app(store(), vec![Arc::new(AcceptAll)], "");
    let request = Request::get("/functions/send-notifications")
        .body(Body::empty())
        .unwrap();

    let (status, body) = call(app, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Notifications processed successfully");
}

#[tokio::test]
async fn other_methods_are_not_allowed() {
    let app = app(store(), vec![Arc::new(AcceptAll)], "");
    let request = Request::delete("/functions/send-notifications")
        .body(Body::empty())
        .unwrap();

    let (status, body) = call(app, request).await;

    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(body, json!({"error": "Method not allowed"}));
}

#[tokio::test]
async fn unknown_function_is_not_found() {
    let app = app(store(), vec![Arc::new(AcceptAll)], "");
    let (status, body) = call(app, post("/functions/send-email", None)).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn uncaught_error_is_a_500_with_message() {
    let app = app(store(), Vec::new(), "");
    let (status, body) = call(app, post("/functions/send-digest-emails", None)).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["success"], false);
    assert!(
        body["error"]
            .as_str()
            .is_some_and(|e| e.starts_with("no email transport configured"))
    );
}

#[tokio::test]
async fn health_lists_functions() {
    let app = app(store(), Vec::new(), "cron-secret");
    let request = Request::get("/health").body(Body::empty()).unwrap();

    let (status, body) = call(app, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "status": "ok",
            "functions": [
                "send-notifications",
                "check-task-deadlines",
                "check-budget-alerts",
                "send-digest-emails"
            ]
        })
    );
}

#[tokio::test]
async fn failed_rule_evaluation_is_a_500() {
    let store = store();
    store.faults(|f| f.fail_rpc("check_task_deadlines", "function timed out"));
    let app = app(store, vec![Arc::new(AcceptAll)], "");

    let (status, body) = call(app, post("/functions/check-task-deadlines", None)).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["success"], false);
    assert!(
        body["error"]
            .as_str()
            .is_some_and(|e| e.contains("function timed out"))
    );
}
