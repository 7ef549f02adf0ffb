//! Status enums and kinds for fpt.
//!
//! All enums use `snake_case` serialization via `#[serde(rename_all = "snake_case")]`.
//! Status enums with state machines provide `allowed_next_states()` to enforce
//! valid transitions at the application layer.

use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// NotificationStatus
// ---------------------------------------------------------------------------

/// Delivery status of a notification record.
///
/// ```text
/// pending → sent
///         → failed
/// ```
///
/// `sent` and `failed` are terminal. A failed record is never retried by the
/// dispatcher; re-delivery needs a fresh pending record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationStatus {
    #[default]
    Pending,
    Sent,
    Failed,
}

impl NotificationStatus {
    /// Valid next states from the current state.
    #[must_use]
    pub const fn allowed_next_states(self) -> &'static [Self] {
        match self {
            Self::Pending => &[Self::Sent, Self::Failed],
            Self::Sent | Self::Failed => &[],
        }
    }

    /// Check whether transitioning to `next` is allowed.
    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        self.allowed_next_states().contains(&next)
    }

    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Sent | Self::Failed)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Sent => "sent",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for NotificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// NotificationKind
// ---------------------------------------------------------------------------

/// What produced a notification record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// A task is due inside the deadline lookahead window.
    #[serde(alias = "deadline")]
    TaskDeadline,
    /// A project's actual cost crossed its budget threshold.
    BudgetAlert,
    /// An aggregated activity summary.
    #[serde(alias = "weekly_digest", alias = "daily_digest")]
    Digest,
    ProjectUpdate,
    /// Any rule type this build does not know about.
    #[serde(other)]
    Other,
}

impl NotificationKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TaskDeadline => "task_deadline",
            Self::BudgetAlert => "budget_alert",
            Self::Digest => "digest",
            Self::ProjectUpdate => "project_update",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// RestoreMode
// ---------------------------------------------------------------------------

/// How a restore job treats the live store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RestoreMode {
    /// Report intended record counts; perform no writes.
    DryRun,
    /// Delete every live row, then upsert the snapshot rows.
    ClearThenRestore,
    /// Upsert the snapshot rows on top of existing data.
    UpsertOnly,
}

impl RestoreMode {
    #[must_use]
    pub const fn from_flags(dry_run: bool, clear_before_restore: bool) -> Self {
        if dry_run {
            Self::DryRun
        } else if clear_before_restore {
            Self::ClearThenRestore
        } else {
            Self::UpsertOnly
        }
    }

    #[must_use]
    pub const fn writes(self) -> bool {
        !matches!(self, Self::DryRun)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::DryRun => "dry_run",
            Self::ClearThenRestore => "clear_then_restore",
            Self::UpsertOnly => "upsert_only",
        }
    }
}

impl fmt::Display for RestoreMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// DigestCadence
// ---------------------------------------------------------------------------

/// How often a recipient receives a digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DigestCadence {
    Daily,
    Weekly,
}

impl DigestCadence {
    /// Length of the activity window in days.
    #[must_use]
    pub const fn window_days(self) -> i64 {
        match self {
            Self::Daily => 1,
            Self::Weekly => 7,
        }
    }

    /// Capitalised label used in email subjects.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Daily => "Daily",
            Self::Weekly => "Weekly",
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
        }
    }
}

impl fmt::Display for DigestCadence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
