//! HTTP function server configuration.

use serde::{Deserialize, Serialize};

fn default_bind() -> String {
    "127.0.0.1:8787".to_string()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Socket address the function server listens on.
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Bearer secret required on every function call. Empty disables auth.
    #[serde(default)]
    pub function_secret: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            function_secret: String::new(),
        }
    }
}

impl ServerConfig {
    pub fn requires_auth(&self) -> bool {
        !self.function_secret.is_empty()
    }
}
