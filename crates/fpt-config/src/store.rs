//! Remote store (hosted Postgres REST) configuration.

use serde::{Deserialize, Serialize};
use std::fmt;

fn default_schema() -> String {
    "public".to_string()
}

/// Default request timeout in seconds.
const fn default_timeout_secs() -> u64 {
    30
}

/// Which API key the store client authenticates with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyKind {
    /// Full-access key; bypasses row-level security.
    Service,
    /// Restricted key; subject to row-level security.
    Anon,
}

impl fmt::Display for KeyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Service => "service",
            Self::Anon => "anon",
        })
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StoreConfig {
    /// Project URL (e.g., `https://abcd.supabase.co`).
    #[serde(default)]
    pub url: String,

    /// Full-access service role key.
    #[serde(default)]
    pub service_key: String,

    /// Restricted anon key.
    #[serde(default)]
    pub anon_key: String,

    /// Database schema exposed through the REST API.
    #[serde(default = "default_schema")]
    pub schema: String,

    /// Per-request timeout, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            service_key: String::new(),
            anon_key: String::new(),
            schema: default_schema(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl StoreConfig {
    /// URL plus at least one key.
    pub fn is_configured(&self) -> bool {
        !self.url.is_empty() && self.key_kind().is_some()
    }

    /// Service key when present, else the anon key.
    pub fn api_key(&self) -> Option<&str> {
        match self.key_kind()? {
            KeyKind::Service => Some(&self.service_key),
            KeyKind::Anon => Some(&self.anon_key),
        }
    }

    pub fn key_kind(&self) -> Option<KeyKind> {
        if !self.service_key.is_empty() {
            Some(KeyKind::Service)
        } else if !self.anon_key.is_empty() {
            Some(KeyKind::Anon)
        } else {
            None
        }
    }

    /// URL without a trailing slash.
    pub fn base_url(&self) -> &str {
        self.url.trim_end_matches('/')
    }
}
