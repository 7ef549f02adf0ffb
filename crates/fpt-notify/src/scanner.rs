//! Notification Scanner: trigger the remote rule evaluation.
//!
//! The rules themselves (deadline lookahead, budget ratio, deduplication) live
//! in the store's procedures. The scanner only triggers them and keeps no
//! state of its own, so calling it twice never relies on local dedup.

use std::sync::Arc;

use fpt_core::report::Reporter;
use fpt_store::RemoteStore;
use serde_json::Value;

use crate::error::NotifyError;

/// A remote rule that materializes pending notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanRule {
    /// Tasks due within the next 24 hours.
    TaskDeadlines,
    /// Projects whose actual cost exceeds the estimated budget.
    BudgetAlerts,
}

impl ScanRule {
    #[must_use]
    pub const fn procedure(self) -> &'static str {
        match self {
            Self::TaskDeadlines => "check_task_deadlines",
            Self::BudgetAlerts => "check_budget_alerts",
        }
    }
}

pub struct Scanner {
    store: Arc<dyn RemoteStore>,
    reporter: Arc<dyn Reporter>,
}

impl Scanner {
    pub fn new(store: Arc<dyn RemoteStore>, reporter: Arc<dyn Reporter>) -> Self {
        Self { store, reporter }
    }

    /// # Errors
    ///
    /// Returns [`NotifyError::Store`] if the procedure fails.
    pub async fn scan_deadlines(&self) -> Result<Option<u64>, NotifyError> {
        self.scan(ScanRule::TaskDeadlines).await
    }

    /// # Errors
    ///
    /// Returns [`NotifyError::Store`] if the procedure fails.
    pub async fn scan_budgets(&self) -> Result<Option<u64>, NotifyError> {
        self.scan(ScanRule::BudgetAlerts).await
    }

    /// Run one rule. Returns the number of records created when the
    /// procedure reports it.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError::Store`] if the procedure fails.
    pub async fn scan(&self, rule: ScanRule) -> Result<Option<u64>, NotifyError> {
        let reporter = self.reporter.scoped("rule", rule.procedure());
        reporter.debug("Evaluating");
        let created = match self.store.rpc(rule.procedure(), Value::Null).await {
            Ok(value) => value.as_u64(),
            Err(error) => {
                reporter.error(&format!("Rule evaluation failed: {error}"));
                return Err(error.into());
            }
        };
        match created {
            Some(n) => reporter.info(&format!("Created {n} notifications")),
            None => reporter.info("Evaluation completed"),
        }
        Ok(created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use fpt_core::report::MemoryReporter;
    use fpt_core::row::from_pairs;
    use fpt_store::MemoryStore;
    use serde_json::json;

    #[tokio::test]
    async fn triggers_remote_rules_without_local_dedup() {
        let now = Utc.with_ymd_and_hms(2026, 10, 18, 9, 0, 0).unwrap();
        let store = Arc::new(MemoryStore::new());
        store.set_now(now);
        store.insert_table(
            "tasks",
            [from_pairs([
                ("id", json!("t-1")),
                ("name", json!("Valve check")),
                ("status", json!("in_progress")),
                ("assigned_to", json!("u-1")),
                ("due_date", json!((now + Duration::hours(3)).to_rfc3339())),
            ])],
        );
        let scanner = Scanner::new(store.clone(), Arc::new(MemoryReporter::new()));

        assert_eq!(scanner.scan_deadlines().await.unwrap(), Some(1));
        assert_eq!(scanner.scan_deadlines().await.unwrap(), Some(0));
        assert_eq!(store.rpc_calls("check_task_deadlines"), 2);
        assert_eq!(store.rows("notifications").len(), 1);
    }

    #[tokio::test]
    async fn failure_is_reported_and_returned() {
        let store = Arc::new(MemoryStore::new());
        store.faults(|f| f.fail_rpc("check_budget_alerts", "permission denied"));
        let reporter = MemoryReporter::new();
        let scanner = Scanner::new(store, Arc::new(reporter.clone()));

        let err = scanner.scan_budgets().await.unwrap_err();
        assert!(matches!(err, NotifyError::Store(_)));
        assert_eq!(
            reporter.messages(fpt_core::report::ReportLevel::Error),
            ["Rule evaluation failed: permission denied"]
        );
    }
}
