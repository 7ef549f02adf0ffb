//! Digest Aggregator and the digest run.

use std::sync::Arc;

use chrono::{DateTime, Datelike, Duration, Utc, Weekday};
use fpt_config::NotifyConfig;
use fpt_core::digest::{DigestRecipient, DigestResult, DigestWindow, UpcomingDeadline};
use fpt_core::enums::DigestCadence;
use fpt_core::notification::NotificationRecord;
use fpt_core::report::Reporter;
use fpt_core::row::{self, Row};
use fpt_store::{Order, Query, RemoteStore};
use serde_json::Value;

use crate::error::NotifyError;
use crate::render::Renderer;
use crate::transport::TransportChain;

/// Read-only aggregation of one recipient's activity.
pub struct DigestAggregator {
    store: Arc<dyn RemoteStore>,
    top_notifications: usize,
    upcoming_limit: usize,
    lookahead: Duration,
}

impl DigestAggregator {
    pub fn new(store: Arc<dyn RemoteStore>, config: &NotifyConfig) -> Self {
        Self {
            store,
            top_notifications: config.top_notifications,
            upcoming_limit: config.upcoming_limit,
            lookahead: Duration::days(config.lookahead_days),
        }
    }

    /// Build the window `[start, end)` for `user_id`. Upcoming deadlines are
    /// the tasks due in `[end, end + lookahead]`.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError::Store`] if any of the queries fails.
    pub async fn build(
        &self,
        user_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<DigestWindow, NotifyError> {
        let (from, until) = (start.to_rfc3339(), end.to_rfc3339());

        let rows = self
            .store
            .select(
                &Query::table("notifications")
                    .eq("recipient_id", user_id)
                    .eq("status", "sent")
                    .gte("created_at", from.as_str())
                    .lt("created_at", until.as_str())
                    .order("created_at", Order::Desc),
            )
            .await?;
        let notification_count = rows.len();
        let notifications = rows
            .into_iter()
            .take(self.top_notifications)
            .map(|row| serde_json::from_value::<NotificationRecord>(Value::Object(row)))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|error| NotifyError::Malformed {
                what: "notification",
                message: error.to_string(),
            })?;

        let tasks_completed = self
            .store
            .count_where(
                &Query::table("tasks")
                    .eq("assigned_to", user_id)
                    .eq("status", "completed")
                    .gte("updated_at", from.as_str())
                    .lt("updated_at", until.as_str()),
            )
            .await?;

        let time_logs = self
            .store
            .select(
                &Query::table("time_logs")
                    .columns("start_time,end_time")
                    .eq("user_id", user_id)
                    .gte("created_at", from.as_str())
                    .lt("created_at", until.as_str()),
            )
            .await?;
        let hours_logged = time_logs.iter().map(logged_hours).sum();

        let projects_updated = self
            .store
            .count_where(
                &Query::table("projects")
                    .eq("created_by", user_id)
                    .gte("updated_at", from.as_str())
                    .lt("updated_at", until.as_str()),
            )
            .await?;

        let upcoming = self
            .store
            .select(
                &Query::table("tasks")
                    .columns("id,name,due_date,priority")
                    .eq("assigned_to", user_id)
                    .neq("status", "completed")
                    .not_null("due_date")
                    .gte("due_date", until.as_str())
                    .lte("due_date", (end + self.lookahead).to_rfc3339())
                    .order("due_date", Order::Asc)
                    .limit(self.upcoming_limit),
            )
            .await?;
        let upcoming_deadlines = upcoming.iter().filter_map(upcoming_deadline).collect();

        Ok(DigestWindow {
            user_id: user_id.to_string(),
            window_start: start,
            window_end: end,
            notification_count,
            notifications,
            tasks_completed,
            hours_logged,
            projects_updated,
            upcoming_deadlines,
        })
    }
}

/// `end - start` in hours; open or inverted entries count as zero.
fn logged_hours(entry: &Row) -> f64 {
    match (row::timestamp(entry, "start_time"), row::timestamp(entry, "end_time")) {
        (Some(start), Some(end)) => {
            #[allow(clippy::cast_precision_loss)]
            let hours = (end - start).num_seconds() as f64 / 3600.0;
            hours.max(0.0)
        }
        _ => 0.0,
    }
}

fn upcoming_deadline(task: &Row) -> Option<UpcomingDeadline> {
    Some(UpcomingDeadline {
        task_id: row::text(task, "id")?.to_string(),
        name: row::text(task, "name").unwrap_or("Task").to_string(),
        due_date: row::timestamp(task, "due_date")?,
        priority: row::text(task, "priority").map(String::from),
    })
}

// ---------------------------------------------------------------------------
// Digest run
// ---------------------------------------------------------------------------

/// Sends one digest per eligible recipient.
pub struct DigestRunner {
    store: Arc<dyn RemoteStore>,
    aggregator: DigestAggregator,
    chain: TransportChain,
    renderer: Renderer,
    reporter: Arc<dyn Reporter>,
}

impl DigestRunner {
    pub fn new(
        store: Arc<dyn RemoteStore>,
        config: &NotifyConfig,
        chain: TransportChain,
        renderer: Renderer,
        reporter: Arc<dyn Reporter>,
    ) -> Self {
        Self {
            aggregator: DigestAggregator::new(Arc::clone(&store), config),
            store,
            chain,
            renderer,
            reporter,
        }
    }

    /// Recipients with email enabled and a digest due at `now`: everyone with
    /// `daily_digest`, plus everyone with `weekly_digest` on a Monday (UTC).
    /// On Mondays a weekly subscriber gets the weekly digest only.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError::Store`] if the preference or profile query fails.
    pub async fn recipients(&self, now: DateTime<Utc>) -> Result<Vec<DigestRecipient>, NotifyError> {
        let is_monday = now.weekday() == Weekday::Mon;
        let preferences = self
            .store
            .select(&Query::table("notification_preferences").eq("email_enabled", true))
            .await?;

        let mut recipients = Vec::new();
        for preference in preferences {
            let Some(user_id) = row::text(&preference, "user_id") else {
                continue;
            };
            let weekly = is_monday && row::flag(&preference, "weekly_digest");
            let cadence = if weekly {
                DigestCadence::Weekly
            } else if row::flag(&preference, "daily_digest") {
                DigestCadence::Daily
            } else {
                continue;
            };
            let profile = self
                .store
                .select(
                    &Query::table("profiles")
                        .columns("id,email,full_name")
                        .eq("id", user_id)
                        .limit(1),
                )
                .await?;
            let profile = profile.first();
            recipients.push(DigestRecipient {
                user_id: user_id.to_string(),
                email: profile.and_then(|p| row::text(p, "email")).map(String::from),
                name: profile
                    .and_then(|p| row::text(p, "full_name"))
                    .map(String::from),
                cadence,
            });
        }
        Ok(recipients)
    }

    /// Build and deliver every due digest.
    ///
    /// A recipient without sent notifications in the window is skipped and
    /// does not appear in the results. Failures are per recipient.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError::NoTransport`] before any query when the chain
    /// is empty, and [`NotifyError::Store`] if the recipients cannot be read.
    pub async fn run(&self, now: DateTime<Utc>) -> Result<Vec<DigestResult>, NotifyError> {
        self.chain.ensure_ready()?;
        let recipients = self.recipients(now).await?;
        self.reporter
            .info(&format!("Found {} users for digest emails", recipients.len()));

        let mut results = Vec::new();
        for recipient in &recipients {
            let reporter = self.reporter.scoped("user", &recipient.user_id);
            let start = now - Duration::days(recipient.cadence.window_days());
            let outcome = match self.aggregator.build(&recipient.user_id, start, now).await {
                Ok(window) if window.is_empty() => {
                    reporter.debug("Skipping digest: no notifications");
                    continue;
                }
                Ok(window) => self.deliver(&window, recipient, reporter.as_ref()).await,
                Err(error) => Err(error),
            };

            let result = match outcome {
                Ok(()) => {
                    reporter.info(&format!("{} digest sent", recipient.cadence.label()));
                    DigestResult {
                        user_id: recipient.user_id.clone(),
                        success: true,
                        cadence: recipient.cadence,
                        error: None,
                    }
                }
                Err(error) => {
                    reporter.error(&format!(
                        "Failed to send {} digest: {error}",
                        recipient.cadence
                    ));
                    DigestResult {
                        user_id: recipient.user_id.clone(),
                        success: false,
                        cadence: recipient.cadence,
                        error: Some(error.to_string()),
                    }
                }
            };
            results.push(result);
        }
        Ok(results)
    }

    async fn deliver(
        &self,
        window: &DigestWindow,
        recipient: &DigestRecipient,
        reporter: &dyn Reporter,
    ) -> Result<(), NotifyError> {
        let to = recipient
            .email
            .as_deref()
            .filter(|to| !to.is_empty())
            .ok_or_else(|| NotifyError::MissingRecipient(format!("digest for {}", recipient.user_id)))?;
        let email = self.renderer.digest(window, recipient, to);
        self.chain.deliver(&email, reporter).await.map(|_| ())
    }
}
