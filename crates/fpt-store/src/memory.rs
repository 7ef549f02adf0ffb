//! In-memory [`RemoteStore`] with failure injection.
//!
//! Tables are plain row vectors. The notification procedures are evaluated
//! locally with the same contracts as the hosted ones, so the scanners and
//! dispatcher can run end to end without a network.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use fpt_core::row::{self, Row};
use serde_json::{Value, json};

use crate::error::StoreError;
use crate::query::{Order, Query};
use crate::RemoteStore;

/// Horizon of the deadline rule.
const DEADLINE_WINDOW_HOURS: i64 = 24;

/// A project alerts once actual cost exceeds its budget by this factor.
const BUDGET_ALERT_RATIO: f64 = 1.1;

/// Failures to inject, keyed by table or function name.
#[derive(Debug, Clone, Default)]
pub struct Faults {
    fetch: HashMap<String, (usize, String)>,
    upsert: HashMap<String, (usize, String)>,
    delete: HashMap<String, String>,
    count: HashMap<String, String>,
    rpc: HashMap<String, String>,
}

impl Faults {
    /// Fail the page at zero-based index `page` of `table`.
    pub fn fail_fetch_at(&mut self, table: &str, page: usize, message: &str) {
        self.fetch
            .insert(table.to_string(), (page, message.to_string()));
    }

    /// Fail the zero-based `batch`-th upsert into `table`.
    pub fn fail_upsert_at(&mut self, table: &str, batch: usize, message: &str) {
        self.upsert
            .insert(table.to_string(), (batch, message.to_string()));
    }

    pub fn fail_delete(&mut self, table: &str, message: &str) {
        self.delete.insert(table.to_string(), message.to_string());
    }

    pub fn fail_count(&mut self, table: &str, message: &str) {
        self.count.insert(table.to_string(), message.to_string());
    }

    pub fn fail_rpc(&mut self, function: &str, message: &str) {
        self.rpc.insert(function.to_string(), message.to_string());
    }
}

#[derive(Debug, Default)]
struct State {
    tables: BTreeMap<String, Vec<Row>>,
    faults: Faults,
    fetch_calls: HashMap<String, usize>,
    upsert_attempts: HashMap<String, usize>,
    upsert_batches: HashMap<String, Vec<usize>>,
    delete_calls: HashMap<String, usize>,
    rpc_calls: HashMap<String, usize>,
    writes: usize,
    next_id: u64,
    now: Option<DateTime<Utc>>,
}

impl State {
    fn table(&self, table: &str) -> Result<&Vec<Row>, StoreError> {
        self.tables
            .get(table)
            .ok_or_else(|| StoreError::UnknownTable(table.to_string()))
    }

    fn table_mut(&mut self, table: &str) -> Result<&mut Vec<Row>, StoreError> {
        self.tables
            .get_mut(table)
            .ok_or_else(|| StoreError::UnknownTable(table.to_string()))
    }

    fn now(&self) -> DateTime<Utc> {
        self.now.unwrap_or_else(Utc::now)
    }

    fn clear(&mut self, table: &str) -> Result<(), StoreError> {
        *self.delete_calls.entry(table.to_string()).or_default() += 1;
        if let Some(message) = self.faults.delete.get(table) {
            return Err(StoreError::Simulated(message.clone()));
        }
        self.table_mut(table)?.clear();
        self.writes += 1;
        Ok(())
    }

    fn has_notification(&self, kind: &str, entity_id: &str) -> bool {
        self.tables.get("notifications").is_some_and(|rows| {
            rows.iter().any(|r| {
                row::text(r, "notification_type") == Some(kind)
                    && row::text(r, "related_entity_id") == Some(entity_id)
            })
        })
    }

    fn push_notification(&mut self, mut record: Row) {
        self.next_id += 1;
        let now = self.now().to_rfc3339();
        record.insert("id".into(), json!(format!("n-{}", self.next_id)));
        record.insert("status".into(), json!("pending"));
        record.insert("created_at".into(), json!(now));
        self.tables
            .entry("notifications".to_string())
            .or_default()
            .push(record);
        self.writes += 1;
    }

    fn check_task_deadlines(&mut self) -> Result<Value, StoreError> {
        let now = self.now();
        let horizon = now + Duration::hours(DEADLINE_WINDOW_HOURS);
        let due: Vec<Row> = Query::table("tasks")
            .neq("status", "completed")
            .not_null("assigned_to")
            .gte("due_date", now.to_rfc3339())
            .lte("due_date", horizon.to_rfc3339())
            .apply(self.table("tasks")?);

        let mut created = 0;
        for task in due {
            let Some(task_id) = row::text(&task, "id") else {
                continue;
            };
            if self.has_notification("task_deadline", task_id) {
                continue;
            }
            let name = row::text(&task, "name").unwrap_or("Task");
            self.push_notification(row::from_pairs([
                ("notification_type", json!("task_deadline")),
                ("recipient_id", task.get("assigned_to").cloned().unwrap_or(Value::Null)),
                ("subject", json!(format!("Task due soon: {name}"))),
                ("body", task.get("description").cloned().unwrap_or(Value::Null)),
                ("related_entity_id", json!(task_id)),
                (
                    "metadata",
                    json!({
                        "task_name": name,
                        "due_date": task.get("due_date"),
                        "priority": task.get("priority"),
                        "project_id": task.get("project_id"),
                    }),
                ),
            ]));
            created += 1;
        }
        Ok(json!(created))
    }

    fn check_budget_alerts(&mut self) -> Result<Value, StoreError> {
        let over: Vec<Row> = self
            .table("projects")?
            .iter()
            .filter(|p| {
                let budget = p.get("estimated_budget").and_then(Value::as_f64).unwrap_or(0.0);
                let actual = p.get("actual_cost").and_then(Value::as_f64).unwrap_or(0.0);
                budget > 0.0 && actual > budget * BUDGET_ALERT_RATIO
            })
            .cloned()
            .collect();

        let mut created = 0;
        for project in over {
            let Some(project_id) = row::text(&project, "id") else {
                continue;
            };
            let recipient = project
                .get("pm_id")
                .filter(|v| !v.is_null())
                .or_else(|| project.get("created_by"))
                .cloned()
                .unwrap_or(Value::Null);
            if recipient.is_null() || self.has_notification("budget_alert", project_id) {
                continue;
            }
            let name = row::text(&project, "name").unwrap_or("Project");
            self.push_notification(row::from_pairs([
                ("notification_type", json!("budget_alert")),
                ("recipient_id", recipient),
                ("subject", json!(format!("Budget alert: {name}"))),
                (
                    "body",
                    json!(format!("{name} has exceeded its estimated budget.")),
                ),
                ("related_entity_id", json!(project_id)),
                (
                    "metadata",
                    json!({
                        "project_name": name,
                        "estimated_budget": project.get("estimated_budget"),
                        "actual_cost": project.get("actual_cost"),
                    }),
                ),
            ]));
            created += 1;
        }
        Ok(json!(created))
    }

    fn pending_notifications(&self, limit: usize) -> Value {
        let Some(rows) = self.tables.get("notifications") else {
            return json!([]);
        };
        let profiles = self.tables.get("profiles");
        let pending = Query::table("notifications")
            .eq("status", "pending")
            .order("created_at", Order::Asc)
            .limit(limit)
            .apply(rows);

        let enriched: Vec<Value> = pending
            .into_iter()
            .map(|mut record| {
                let id = record.get("id").cloned().unwrap_or(Value::Null);
                record.insert("notification_id".into(), id);
                let profile = row::text(&record, "recipient_id").and_then(|id| {
                    profiles?.iter().find(|p| row::text(p, "id") == Some(id))
                });
                if let Some(profile) = profile {
                    record
                        .entry("recipient_email")
                        .or_insert_with(|| profile.get("email").cloned().unwrap_or(Value::Null));
                    record.entry("recipient_name").or_insert_with(|| {
                        profile.get("full_name").cloned().unwrap_or(Value::Null)
                    });
                }
                Value::Object(record)
            })
            .collect();
        Value::Array(enriched)
    }

    fn mark_notification(&mut self, id: &str, status: &str, error: Option<&str>) -> Value {
        let now = self.now().to_rfc3339();
        let Some(record) = self.tables.get_mut("notifications").and_then(|rows| {
            rows.iter_mut().find(|r| row::text(r, "id") == Some(id))
        }) else {
            return Value::Null;
        };
        // Terminal states are never rewritten.
        if row::text(record, "status") != Some("pending") {
            return Value::Null;
        }
        record.insert("status".into(), json!(status));
        match error {
            Some(message) => record.insert("error_message".into(), json!(message)),
            None => record.insert("sent_at".into(), json!(now)),
        };
        self.writes += 1;
        Value::Null
    }
}

fn arg<'a>(args: &'a Value, name: &str) -> Result<&'a str, StoreError> {
    args.get(name)
        .and_then(Value::as_str)
        .ok_or_else(|| StoreError::Parse(format!("missing argument '{name}'")))
}

/// Store backed by in-process tables.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Create or replace `table` with `rows`.
    pub fn insert_table<I>(&self, table: &str, rows: I)
    where
        I: IntoIterator<Item = Row>,
    {
        self.state()
            .tables
            .insert(table.to_string(), rows.into_iter().collect());
    }

    /// Create an empty table if it does not exist.
    pub fn create_table(&self, table: &str) {
        self.state().tables.entry(table.to_string()).or_default();
    }

    /// Current rows of `table` (empty when the table does not exist).
    #[must_use]
    pub fn rows(&self, table: &str) -> Vec<Row> {
        self.state().tables.get(table).cloned().unwrap_or_default()
    }

    /// Pin the clock used by the notification procedures.
    pub fn set_now(&self, now: DateTime<Utc>) {
        self.state().now = Some(now);
    }

    pub fn faults(&self, configure: impl FnOnce(&mut Faults)) {
        configure(&mut self.state().faults);
    }

    /// Page requests made against `table`, failed ones included.
    #[must_use]
    pub fn fetch_calls(&self, table: &str) -> usize {
        self.state().fetch_calls.get(table).copied().unwrap_or(0)
    }

    /// Sizes of the upserts into `table` that succeeded, in order.
    #[must_use]
    pub fn upsert_batches(&self, table: &str) -> Vec<usize> {
        self.state()
            .upsert_batches
            .get(table)
            .cloned()
            .unwrap_or_default()
    }

    #[must_use]
    pub fn delete_calls(&self, table: &str) -> usize {
        self.state().delete_calls.get(table).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn rpc_calls(&self, function: &str) -> usize {
        self.state().rpc_calls.get(function).copied().unwrap_or(0)
    }

    /// Mutations applied so far (upserts, deletes, status updates, inserts).
    #[must_use]
    pub fn writes(&self) -> usize {
        self.state().writes
    }
}

#[async_trait]
impl RemoteStore for MemoryStore {
    async fn fetch_page(
        &self,
        table: &str,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Row>, StoreError> {
        let mut state = self.state();
        *state.fetch_calls.entry(table.to_string()).or_default() += 1;
        if let Some((page, message)) = state.faults.fetch.get(table)
            && offset / limit.max(1) == *page
        {
            return Err(StoreError::Simulated(message.clone()));
        }
        Ok(state
            .table(table)?
            .iter()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn select(&self, query: &Query) -> Result<Vec<Row>, StoreError> {
        let state = self.state();
        Ok(query.apply(state.table(&query.table)?))
    }

    async fn upsert(
        &self,
        table: &str,
        rows: &[Row],
        conflict_column: &str,
    ) -> Result<(), StoreError> {
        let mut state = self.state();
        let attempt = {
            let counter = state.upsert_attempts.entry(table.to_string()).or_default();
            *counter += 1;
            *counter - 1
        };
        if let Some((batch, message)) = state.faults.upsert.get(table)
            && attempt == *batch
        {
            return Err(StoreError::Simulated(message.clone()));
        }

        let existing = state.table_mut(table)?;
        for incoming in rows {
            let key = incoming.get(conflict_column).filter(|v| !v.is_null());
            let position = key.and_then(|key| {
                existing
                    .iter()
                    .position(|r| r.get(conflict_column) == Some(key))
            });
            match position {
                Some(index) => {
                    for (column, value) in incoming {
                        existing[index].insert(column.clone(), value.clone());
                    }
                }
                None => existing.push(incoming.clone()),
            }
        }
        state
            .upsert_batches
            .entry(table.to_string())
            .or_default()
            .push(rows.len());
        state.writes += 1;
        Ok(())
    }

    async fn delete_all(&self, table: &str) -> Result<(), StoreError> {
        self.state().clear(table)
    }

    async fn count_where(&self, query: &Query) -> Result<u64, StoreError> {
        let state = self.state();
        if let Some(message) = state.faults.count.get(&query.table) {
            return Err(StoreError::Simulated(message.clone()));
        }
        let rows = state.table(&query.table)?;
        Ok(rows.iter().filter(|r| query.matches(r)).count() as u64)
    }

    async fn rpc(&self, function: &str, args: Value) -> Result<Value, StoreError> {
        let mut state = self.state();
        *state.rpc_calls.entry(function.to_string()).or_default() += 1;
        if let Some(message) = state.faults.rpc.get(function) {
            return Err(StoreError::Simulated(message.clone()));
        }

        match function {
            "get_pending_notifications" => {
                let limit = args
                    .get("limit_count")
                    .and_then(Value::as_u64)
                    .and_then(|n| usize::try_from(n).ok())
                    .unwrap_or(10);
                Ok(state.pending_notifications(limit))
            }
            "mark_notification_sent" => {
                let id = arg(&args, "notification_id")?;
                Ok(state.mark_notification(id, "sent", None))
            }
            "mark_notification_failed" => {
                let id = arg(&args, "notification_id")?;
                let message = args
                    .get("error_msg")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown error");
                Ok(state.mark_notification(id, "failed", Some(message)))
            }
            "check_task_deadlines" => state.check_task_deadlines(),
            "check_budget_alerts" => state.check_budget_alerts(),
            "delete_all_rows" => {
                let table = arg(&args, "table_name")?;
                state.clear(table)?;
                Ok(Value::Null)
            }
            other => Err(StoreError::UnknownFunction(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use fpt_core::row::from_pairs;
    use pretty_assertions::assert_eq;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 18, 8, 0, 0).unwrap()
    }

    fn seeded() -> MemoryStore {
        let store = MemoryStore::new();
        store.set_now(now());
        store.insert_table(
            "profiles",
            [from_pairs([
                ("id", json!("u-1")),
                ("email", json!("pm@example.com")),
                ("full_name", json!("Pat Morgan")),
            ])],
        );
        store.insert_table(
            "tasks",
            [
                from_pairs([
                    ("id", json!("t-1")),
                    ("name", json!("Hydrant flow test")),
                    ("status", json!("todo")),
                    ("assigned_to", json!("u-1")),
                    ("due_date", json!("2026-10-18T20:00:00Z")),
                ]),
                from_pairs([
                    ("id", json!("t-2")),
                    ("name", json!("Riser inspection")),
                    ("status", json!("completed")),
                    ("assigned_to", json!("u-1")),
                    ("due_date", json!("2026-10-18T21:00:00Z")),
                ]),
                from_pairs([
                    ("id", json!("t-3")),
                    ("name", json!("Alarm panel swap")),
                    ("status", json!("todo")),
                    ("assigned_to", json!("u-1")),
                    ("due_date", json!("2026-10-25T09:00:00Z")),
                ]),
            ],
        );
        store.insert_table(
            "projects",
            [
                from_pairs([
                    ("id", json!("p-1")),
                    ("name", json!("Harbor Hospital")),
                    ("pm_id", json!("u-1")),
                    ("estimated_budget", json!(10_000)),
                    ("actual_cost", json!(12_500)),
                ]),
                from_pairs([
                    ("id", json!("p-2")),
                    ("name", json!("Eastside Mall")),
                    ("pm_id", json!("u-1")),
                    ("estimated_budget", json!(10_000)),
                    ("actual_cost", json!(10_500)),
                ]),
            ],
        );
        store.create_table("notifications");
        store
    }

    #[tokio::test]
    async fn upsert_merges_on_conflict_column() {
        let store = MemoryStore::new();
        store.insert_table(
            "clients",
            [from_pairs([("id", json!("c-1")), ("name", json!("Old"))])],
        );
        let batch = vec![
            from_pairs([("id", json!("c-1")), ("name", json!("New"))]),
            from_pairs([("id", json!("c-2")), ("name", json!("Second"))]),
        ];

        store.upsert("clients", &batch, "id").await.unwrap();
        store.upsert("clients", &batch, "id").await.unwrap();

        let rows = store.rows("clients");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["name"], json!("New"));
        assert_eq!(store.upsert_batches("clients"), vec![2, 2]);
    }

    #[tokio::test]
    async fn unknown_table_is_an_error() {
        let store = MemoryStore::new();
        let err = store.count("ghosts").await.unwrap_err();
        assert!(matches!(err, StoreError::UnknownTable(ref t) if t == "ghosts"));
    }

    #[tokio::test]
    async fn injected_upsert_failure_hits_one_batch() {
        let store = MemoryStore::new();
        store.create_table("tasks");
        store.faults(|f| f.fail_upsert_at("tasks", 1, "deadlock detected"));
        let batch = vec![from_pairs([("id", json!("t-1"))])];

        assert!(store.upsert("tasks", &batch, "id").await.is_ok());
        assert!(store.upsert("tasks", &batch, "id").await.is_err());
        assert!(store.upsert("tasks", &batch, "id").await.is_ok());
        assert_eq!(store.upsert_batches("tasks"), vec![1, 1]);
    }

    #[tokio::test]
    async fn delete_all_rows_rpc_clears_table() {
        let store = seeded();
        store
            .rpc("delete_all_rows", json!({"table_name": "tasks"}))
            .await
            .unwrap();
        assert_eq!(store.count("tasks").await.unwrap(), 0);
        assert_eq!(store.delete_calls("tasks"), 1);
    }

    #[tokio::test]
    async fn deadline_rule_creates_one_notification_per_task() {
        let store = seeded();

        store.rpc("check_task_deadlines", Value::Null).await.unwrap();
        store.rpc("check_task_deadlines", Value::Null).await.unwrap();

        let notifications = store.rows("notifications");
        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0]["related_entity_id"], json!("t-1"));
        assert_eq!(notifications[0]["status"], json!("pending"));
    }

    #[tokio::test]
    async fn budget_rule_uses_ratio_threshold() {
        let store = seeded();

        store.rpc("check_budget_alerts", Value::Null).await.unwrap();

        let notifications = store.rows("notifications");
        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0]["metadata"]["project_name"], json!("Harbor Hospital"));
    }

    #[tokio::test]
    async fn pending_notifications_join_profiles() {
        let store = seeded();
        store.rpc("check_task_deadlines", Value::Null).await.unwrap();

        let pending = store
            .rpc("get_pending_notifications", json!({"limit_count": 10}))
            .await
            .unwrap();

        let first = &pending[0];
        assert_eq!(first["notification_id"], first["id"]);
        assert_eq!(first["recipient_email"], json!("pm@example.com"));
        assert_eq!(first["recipient_name"], json!("Pat Morgan"));
    }

    #[tokio::test]
    async fn marking_never_reverts_terminal_status() {
        let store = seeded();
        store.rpc("check_task_deadlines", Value::Null).await.unwrap();
        let id = store.rows("notifications")[0]["id"].clone();

        store
            .rpc("mark_notification_sent", json!({"notification_id": id}))
            .await
            .unwrap();
        store
            .rpc(
                "mark_notification_failed",
                json!({"notification_id": id, "error_msg": "late failure"}),
            )
            .await
            .unwrap();

        let record = &store.rows("notifications")[0];
        assert_eq!(record["status"], json!("sent"));
        assert!(record.get("error_message").is_none());
    }
}
