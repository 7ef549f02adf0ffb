use std::process::ExitCode;

pub mod backup;
pub mod backups;
pub mod dispatch;
pub mod health;
pub mod notify;
pub mod restore;
pub mod serve;
pub mod validate;

/// Aggregate result of a command that ran to completion.
///
/// Per-item failures (a table that failed to back up, a notification that
/// could not be delivered) produce [`Status::Failure`] without being an
/// error.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Status {
    Success,
    Failure,
}

impl Status {
    #[must_use]
    pub const fn from_ok(ok: bool) -> Self {
        if ok { Self::Success } else { Self::Failure }
    }
}

impl From<Status> for ExitCode {
    fn from(status: Status) -> Self {
        match status {
            Status::Success => Self::SUCCESS,
            Status::Failure => Self::FAILURE,
        }
    }
}
