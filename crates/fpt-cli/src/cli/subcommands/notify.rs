use clap::Subcommand;
use fpt_notify::Entrypoint;

/// Notification functions runnable from the command line.
#[derive(Clone, Copy, Debug, Subcommand)]
pub enum NotifyCommands {
    /// Scan deadlines and budgets, then send queued notifications.
    Send,
    /// Scan task deadlines and send the resulting notifications.
    Deadlines,
    /// Scan project budgets and send pending budget alerts.
    Budgets,
    /// Send daily and weekly digests.
    Digest,
}

impl NotifyCommands {
    #[must_use]
    pub const fn entrypoint(self) -> Entrypoint {
        match self {
            Self::Send => Entrypoint::SendNotifications,
            Self::Deadlines => Entrypoint::CheckTaskDeadlines,
            Self::Budgets => Entrypoint::CheckBudgetAlerts,
            Self::Digest => Entrypoint::SendDigestEmails,
        }
    }
}
