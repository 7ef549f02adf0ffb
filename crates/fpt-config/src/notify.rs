//! Notification run limits.

use serde::{Deserialize, Serialize};

/// Pending records dispatched by the combined send run.
const fn default_queue_limit() -> usize {
    10
}

/// Pending records dispatched by the deadline and budget runs.
const fn default_scan_limit() -> usize {
    50
}

const fn default_top_notifications() -> usize {
    10
}

const fn default_upcoming_limit() -> usize {
    5
}

const fn default_lookahead_days() -> i64 {
    7
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NotifyConfig {
    #[serde(default = "default_queue_limit")]
    pub queue_limit: usize,

    #[serde(default = "default_scan_limit")]
    pub scan_limit: usize,

    /// Notifications listed in one digest email.
    #[serde(default = "default_top_notifications")]
    pub top_notifications: usize,

    /// Upcoming deadlines listed in one digest email.
    #[serde(default = "default_upcoming_limit")]
    pub upcoming_limit: usize,

    /// How far ahead a digest looks for due tasks, in days.
    #[serde(default = "default_lookahead_days")]
    pub lookahead_days: i64,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            queue_limit: default_queue_limit(),
            scan_limit: default_scan_limit(),
            top_notifications: default_top_notifications(),
            upcoming_limit: default_upcoming_limit(),
            lookahead_days: default_lookahead_days(),
        }
    }
}
