//! Digest windows: per-recipient activity summaries computed fresh each run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::enums::DigestCadence;
use crate::notification::NotificationRecord;

/// A task due soon, shown at the bottom of a digest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpcomingDeadline {
    pub task_id: String,
    pub name: String,
    pub due_date: DateTime<Utc>,
    pub priority: Option<String>,
}

/// Aggregate of a recipient's activity in `[window_start, window_end)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DigestWindow {
    pub user_id: String,
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
    /// Sent notifications in the window.
    pub notification_count: usize,
    /// Most recent notifications first, capped by the aggregator.
    pub notifications: Vec<NotificationRecord>,
    pub tasks_completed: u64,
    /// Sum of `end - start` over time entries, negative spans clipped to zero.
    pub hours_logged: f64,
    pub projects_updated: u64,
    /// Soonest first.
    pub upcoming_deadlines: Vec<UpcomingDeadline>,
}

impl DigestWindow {
    /// A window with no notifications produces no email.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.notification_count == 0
    }
}

/// Who receives a digest and how often.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DigestRecipient {
    pub user_id: String,
    pub email: Option<String>,
    pub name: Option<String>,
    pub cadence: DigestCadence,
}

/// Per-recipient entry in a digest run's results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DigestResult {
    pub user_id: String,
    pub success: bool,
    #[serde(rename = "type")]
    pub cadence: DigestCadence,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
