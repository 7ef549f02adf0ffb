//! Errors raised while loading or checking fpt settings.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    /// A TOML file or `FPT_*` variable could not be merged into [`crate::FptConfig`].
    #[error("failed to load fpt configuration: {0}")]
    Figment(#[from] figment::Error),

    /// Credentials for `section` are missing. Raised for `store` before any
    /// backup, restore or notification run touches the remote store.
    #[error("{section} is not configured: {}", hint(section))]
    NotConfigured { section: String },

    /// A value no run can work with, such as a zero `backup.batch_size`.
    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}

fn hint(section: &str) -> &'static str {
    match section {
        "store" => "set SUPABASE_URL and SUPABASE_SERVICE_ROLE_KEY (or FPT_STORE__URL and FPT_STORE__SERVICE_KEY)",
        "email" => "set RESEND_API_KEY or SENDGRID_API_KEY",
        _ => "required fields are missing",
    }
}
