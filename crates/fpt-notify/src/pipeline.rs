//! Notification entry points.
//!
//! Each entry point is one scheduled invocation: it runs its scans, works a
//! bounded queue and returns a [`RunSummary`]. Pending records beyond the
//! queue limit wait for the next invocation.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use fpt_config::{EmailConfig, NotifyConfig};
use fpt_core::digest::DigestResult;
use fpt_core::enums::NotificationKind;
use fpt_core::notification::{DispatchOutcome, NotificationRecord};
use fpt_core::report::Reporter;
use fpt_store::RemoteStore;
use serde::Serialize;

use crate::digest::DigestRunner;
use crate::dispatcher::Dispatcher;
use crate::error::NotifyError;
use crate::queue::NotificationQueue;
use crate::render::Renderer;
use crate::scanner::{ScanRule, Scanner};
use crate::transport::TransportChain;

/// The scheduled notification functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Entrypoint {
    /// Scan deadlines and budgets, then send the oldest pending records.
    SendNotifications,
    CheckTaskDeadlines,
    CheckBudgetAlerts,
    SendDigestEmails,
}

impl Entrypoint {
    pub const ALL: [Self; 4] = [
        Self::SendNotifications,
        Self::CheckTaskDeadlines,
        Self::CheckBudgetAlerts,
        Self::SendDigestEmails,
    ];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::SendNotifications => "send-notifications",
            Self::CheckTaskDeadlines => "check-task-deadlines",
            Self::CheckBudgetAlerts => "check-budget-alerts",
            Self::SendDigestEmails => "send-digest-emails",
        }
    }

    const fn completed_message(self) -> &'static str {
        match self {
            Self::SendNotifications => "Notifications processed successfully",
            Self::CheckTaskDeadlines => "Task deadline check completed",
            Self::CheckBudgetAlerts => "Budget alert check completed",
            Self::SendDigestEmails => "Digest email generation completed",
        }
    }
}

impl fmt::Display for Entrypoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Entrypoint {
    type Err = NotifyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|entry| entry.name() == s)
            .ok_or_else(|| NotifyError::UnknownEntrypoint(s.to_string()))
    }
}

/// One item of a run's results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum RunItem {
    Dispatch(DispatchOutcome),
    Digest(DigestResult),
}

impl RunItem {
    #[must_use]
    pub const fn success(&self) -> bool {
        match self {
            Self::Dispatch(outcome) => outcome.success,
            Self::Digest(result) => result.success,
        }
    }
}

/// Body returned by a completed invocation, partial failures included.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub success: bool,
    pub message: String,
    pub sent: usize,
    pub failed: usize,
    pub results: Vec<RunItem>,
}

impl RunSummary {
    fn completed(entrypoint: Entrypoint, results: Vec<RunItem>) -> Self {
        let sent = results.iter().filter(|item| item.success()).count();
        Self {
            success: true,
            message: entrypoint.completed_message().to_string(),
            sent,
            failed: results.len() - sent,
            results,
        }
    }
}

pub struct Pipeline {
    store: Arc<dyn RemoteStore>,
    chain: TransportChain,
    renderer: Renderer,
    limits: NotifyConfig,
    reporter: Arc<dyn Reporter>,
}

impl Pipeline {
    pub fn new(
        store: Arc<dyn RemoteStore>,
        chain: TransportChain,
        email: &EmailConfig,
        limits: NotifyConfig,
        reporter: Arc<dyn Reporter>,
    ) -> Self {
        Self {
            store,
            chain,
            renderer: Renderer::new(&email.app_url),
            limits,
            reporter,
        }
    }

    /// Run `entrypoint` now.
    ///
    /// # Errors
    ///
    /// See [`Self::run_at`].
    pub async fn run(&self, entrypoint: Entrypoint) -> Result<RunSummary, NotifyError> {
        self.run_at(entrypoint, Utc::now()).await
    }

    /// Run `entrypoint` as if invoked at `now`.
    ///
    /// # Errors
    ///
    /// - [`NotifyError::NoTransport`] before any remote call when no email
    ///   transport is configured
    /// - [`NotifyError::Store`] when a rule evaluation (dedicated check runs
    ///   only), the queue read or the recipient query fails
    ///
    /// Per-record and per-recipient failures are reported in the summary.
    pub async fn run_at(
        &self,
        entrypoint: Entrypoint,
        now: DateTime<Utc>,
    ) -> Result<RunSummary, NotifyError> {
        self.chain.ensure_ready()?;
        let reporter = self.reporter.scoped("function", entrypoint.name());
        reporter.info("Starting");
        let scanner = Scanner::new(Arc::clone(&self.store), Arc::clone(&reporter));
        let queue = NotificationQueue::new(Arc::clone(&self.store));

        let results = match entrypoint {
            Entrypoint::SendNotifications => {
                for rule in [ScanRule::TaskDeadlines, ScanRule::BudgetAlerts] {
                    // The combined run still sends what is already queued.
                    if let Err(error) = scanner.scan(rule).await {
                        reporter.warn(&format!("Continuing without {}: {error}", rule.procedure()));
                    }
                }
                let pending = queue.pending(self.limits.queue_limit).await?;
                self.dispatch(pending, &reporter).await?
            }
            Entrypoint::CheckTaskDeadlines => {
                scanner.scan_deadlines().await?;
                let pending = queue.pending(self.limits.scan_limit).await?;
                self.dispatch(pending, &reporter).await?
            }
            Entrypoint::CheckBudgetAlerts => {
                scanner.scan_budgets().await?;
                let pending = queue
                    .pending_of_kind(NotificationKind::BudgetAlert, self.limits.scan_limit)
                    .await?;
                self.dispatch(pending, &reporter).await?
            }
            Entrypoint::SendDigestEmails => {
                let runner = DigestRunner::new(
                    Arc::clone(&self.store),
                    &self.limits,
                    self.chain.clone(),
                    self.renderer.clone(),
                    Arc::clone(&reporter),
                );
                runner
                    .run(now)
                    .await?
                    .into_iter()
                    .map(RunItem::Digest)
                    .collect()
            }
        };

        let summary = RunSummary::completed(entrypoint, results);
        reporter.info(&format!(
            "{}: {} sent, {} failed",
            summary.message, summary.sent, summary.failed
        ));
        Ok(summary)
    }

    async fn dispatch(
        &self,
        pending: Vec<NotificationRecord>,
        reporter: &Arc<dyn Reporter>,
    ) -> Result<Vec<RunItem>, NotifyError> {
        reporter.info(&format!("Processing {} pending notifications", pending.len()));
        let dispatcher = Dispatcher::new(
            Arc::clone(&self.store),
            self.chain.clone(),
            self.renderer.clone(),
            Arc::clone(reporter),
        );
        Ok(dispatcher
            .dispatch(pending)
            .await?
            .into_iter()
            .map(RunItem::Dispatch)
            .collect())
    }
}
