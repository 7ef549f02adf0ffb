//! # fpt-config
//!
//! Layered configuration loading for fpt using figment.
//!
//! Configuration sources (in priority order, highest wins):
//! 1. Environment variables (`FPT_*` prefix, `__` as separator)
//! 2. Legacy unprefixed variables shared with the web app and edge
//!    functions (`SUPABASE_URL`, `RESEND_API_KEY`, `BACKUP_DIR`, ...)
//! 3. Project-level `.fpt/config.toml`
//! 4. User-level `~/.config/fpt/config.toml`
//! 5. Built-in defaults
//!
//! # Environment Variable Mapping
//!
//! Figment maps `FPT_STORE__URL` -> `store.url`, `FPT_BACKUP__KEEP` -> `backup.keep`, etc.
//! The `__` (double underscore) separates nested config sections.
//!
//! # Usage
//!
//! ```no_run
//! use std::path::Path;
//! use fpt_config::FptConfig;
//!
//! let config = FptConfig::load_with_dotenv(Path::new(".")).expect("config");
//! if config.store.is_configured() {
//!     println!("Store URL: {}", config.store.url);
//! }
//! ```

mod backup;
mod email;
mod error;
mod notify;
mod server;
mod store;

pub use backup::BackupConfig;
pub use email::EmailConfig;
pub use error::ConfigError;
pub use notify::NotifyConfig;
pub use server::ServerConfig;
pub use store::{KeyKind, StoreConfig};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Unprefixed variable → config key, lowest precedence first.
///
/// `SUPABASE_URL` beats `VITE_SUPABASE_URL`, and the service key variables
/// beat each other in the same way.
const LEGACY_ENV: &[(&str, &str)] = &[
    ("VITE_SUPABASE_URL", "store.url"),
    ("SUPABASE_URL", "store.url"),
    ("SUPABASE_SERVICE_KEY", "store.service_key"),
    ("SUPABASE_SERVICE_ROLE_KEY", "store.service_key"),
    ("SUPABASE_ANON_KEY", "store.anon_key"),
    ("VITE_SUPABASE_ANON_KEY", "store.anon_key"),
    ("BACKUP_DIR", "backup.dir"),
    ("RESEND_API_KEY", "email.resend_api_key"),
    ("SENDGRID_API_KEY", "email.sendgrid_api_key"),
    ("FROM_EMAIL", "email.from"),
    ("APP_URL", "email.app_url"),
    ("FUNCTION_SECRET", "server.function_secret"),
];

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct FptConfig {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub backup: BackupConfig,
    #[serde(default)]
    pub email: EmailConfig,
    #[serde(default)]
    pub notify: NotifyConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

impl FptConfig {
    /// Load configuration relative to the current directory.
    ///
    /// Does NOT call `dotenvy` -- use [`Self::load_with_dotenv`] if you need `.env` file loading.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Figment`] when a source fails to parse and
    /// [`ConfigError::InvalidValue`] when a value is out of range.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(Path::new("."))
    }

    /// Load configuration with `.fpt/config.toml` looked up under `project_root`.
    ///
    /// # Errors
    ///
    /// See [`Self::load`].
    pub fn load_from(project_root: &Path) -> Result<Self, ConfigError> {
        let config: Self = Self::figment_at(project_root).extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Load `<project_root>/.env` into the process environment, then load.
    ///
    /// Variables already set in the environment are left untouched. A
    /// missing `.env` is not an error.
    ///
    /// # Errors
    ///
    /// See [`Self::load`].
    pub fn load_with_dotenv(project_root: &Path) -> Result<Self, ConfigError> {
        let _ = dotenvy::from_path(project_root.join(".env"));
        Self::load_from(project_root)
    }

    /// Build the figment provider chain rooted at the current directory.
    pub fn figment() -> Figment {
        Self::figment_at(Path::new("."))
    }

    /// Build the figment provider chain.
    ///
    /// This is public so tests can inspect the figment directly or add
    /// additional providers on top.
    pub fn figment_at(project_root: &Path) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        // Layer 1: User-global config
        if let Some(global_path) = Self::global_config_path()
            && global_path.exists()
        {
            figment = figment.merge(Toml::file(global_path));
        }

        // Layer 2: Project-local config
        let local_path = project_root.join(".fpt").join("config.toml");
        if local_path.exists() {
            figment = figment.merge(Toml::file(local_path));
        }

        // Layer 3: Legacy variable names
        for &(var, key) in LEGACY_ENV {
            figment = figment.merge(Env::raw().only(&[var]).map(move |_| key.into()));
        }

        // Layer 4: Environment variables (highest priority)
        figment.merge(Env::prefixed("FPT_").split("__"))
    }

    /// Reject values the backup and notification runs cannot work with.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] naming the first bad field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("backup.page_size", self.backup.page_size),
            ("backup.batch_size", self.backup.batch_size),
            ("backup.keep", self.backup.keep),
            ("notify.queue_limit", self.notify.queue_limit),
            ("notify.scan_limit", self.notify.scan_limit),
        ];
        if let Some((field, _)) = positive.iter().find(|(_, value)| *value == 0) {
            return Err(ConfigError::InvalidValue {
                field: (*field).to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }

        if self.backup.conflict_column.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "backup.conflict_column".to_string(),
                reason: "must not be empty".to_string(),
            });
        }

        if !self.store.url.is_empty()
            && !(self.store.url.starts_with("http://") || self.store.url.starts_with("https://"))
        {
            return Err(ConfigError::InvalidValue {
                field: "store.url".to_string(),
                reason: format!("expected an http(s) URL, got '{}'", self.store.url),
            });
        }

        Ok(())
    }

    /// Store credentials, or the fatal configuration error raised before any
    /// remote work begins.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NotConfigured`] when the URL or both keys are missing.
    pub fn require_store(&self) -> Result<&StoreConfig, ConfigError> {
        if self.store.is_configured() {
            Ok(&self.store)
        } else {
            Err(ConfigError::NotConfigured {
                section: "store".to_string(),
            })
        }
    }

    /// Email transport settings with at least one key present.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NotConfigured`] when no transport key is set.
    pub fn require_email(&self) -> Result<&EmailConfig, ConfigError> {
        if self.email.is_configured() {
            Ok(&self.email)
        } else {
            Err(ConfigError::NotConfigured {
                section: "email".to_string(),
            })
        }
    }

    /// Path to the user-global config file.
    fn global_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("fpt").join("config.toml"))
    }
}
