//! Resend transport (`POST /emails`).

use async_trait::async_trait;
use fpt_config::EmailConfig;
use serde_json::{Value, json};

use crate::error::NotifyError;
use crate::transport::{Email, EmailTransport, check_response};

pub struct ResendTransport {
    http: reqwest::Client,
    url: String,
    api_key: String,
    from: String,
}

impl ResendTransport {
    pub fn new(http: reqwest::Client, config: &EmailConfig) -> Self {
        Self {
            http,
            url: config.resend_url.trim_end_matches('/').to_string(),
            api_key: config.resend_api_key.clone(),
            from: config.from.clone(),
        }
    }

    fn payload(&self, email: &Email) -> Value {
        json!({
            "from": self.from,
            "to": [email.to],
            "subject": email.subject,
            "html": email.html,
            "text": email.text,
        })
    }
}

#[async_trait]
impl EmailTransport for ResendTransport {
    fn name(&self) -> &str {
        "resend"
    }

    async fn send(&self, email: &Email) -> Result<(), NotifyError> {
        let resp = self
            .http
            .post(format!("{}/emails", self.url))
            .bearer_auth(&self.api_key)
            .json(&self.payload(email))
            .send()
            .await?;
        check_response(self.name(), resp).await?;
        Ok(())
    }
}
