//! Transactional email configuration.

use serde::{Deserialize, Serialize};

fn default_from() -> String {
    "notifications@yourdomain.com".to_string()
}

fn default_resend_url() -> String {
    "https://api.resend.com".to_string()
}

fn default_sendgrid_url() -> String {
    "https://api.sendgrid.com".to_string()
}

fn default_app_url() -> String {
    "https://fire-protection-tracker.com".to_string()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EmailConfig {
    /// Sender address on every outbound message.
    #[serde(default = "default_from")]
    pub from: String,

    /// Resend API key. Resend is tried first when set.
    #[serde(default)]
    pub resend_api_key: String,

    /// SendGrid API key. Used after Resend, or alone.
    #[serde(default)]
    pub sendgrid_api_key: String,

    #[serde(default = "default_resend_url")]
    pub resend_url: String,

    #[serde(default = "default_sendgrid_url")]
    pub sendgrid_url: String,

    /// Web app base URL for links in emails.
    #[serde(default = "default_app_url")]
    pub app_url: String,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            from: default_from(),
            resend_api_key: String::new(),
            sendgrid_api_key: String::new(),
            resend_url: default_resend_url(),
            sendgrid_url: default_sendgrid_url(),
            app_url: default_app_url(),
        }
    }
}

impl EmailConfig {
    /// At least one transport has a key.
    pub fn is_configured(&self) -> bool {
        self.has_resend() || self.has_sendgrid()
    }

    pub fn has_resend(&self) -> bool {
        !self.resend_api_key.is_empty()
    }

    pub fn has_sendgrid(&self) -> bool {
        !self.sendgrid_api_key.is_empty()
    }
}
