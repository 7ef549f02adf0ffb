pub mod backups;
pub mod notify;

pub use backups::BackupsCommands;
pub use notify::NotifyCommands;
