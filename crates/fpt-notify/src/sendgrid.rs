//! SendGrid transport (`POST /v3/mail/send`).

use async_trait::async_trait;
use fpt_config::EmailConfig;
use serde_json::{Value, json};

use crate::error::NotifyError;
use crate::transport::{Email, EmailTransport, check_response};

pub struct SendGridTransport {
    http: reqwest::Client,
    url: String,
    api_key: String,
    from: String,
}

impl SendGridTransport {
    pub fn new(http: reqwest::Client, config: &EmailConfig) -> Self {
        Self {
            http,
            url: config.sendgrid_url.trim_end_matches('/').to_string(),
            api_key: config.sendgrid_api_key.clone(),
            from: config.from.clone(),
        }
    }

    /// SendGrid requires `text/plain` before `text/html`.
    fn payload(&self, email: &Email) -> Value {
        json!({
            "personalizations": [{
                "to": [{ "email": email.to }],
                "subject": email.subject,
            }],
            "from": { "email": self.from },
            "content": [
                { "type": "text/plain", "value": email.text },
                { "type": "text/html", "value": email.html },
            ],
        })
    }
}

#[async_trait]
impl EmailTransport for SendGridTransport {
    fn name(&self) -> &str {
        "sendgrid"
    }

    async fn send(&self, email: &Email) -> Result<(), NotifyError> {
        let resp = self
            .http
            .post(format!("{}/v3/mail/send", self.url))
            .bearer_auth(&self.api_key)
            .json(&self.payload(email))
            .send()
            .await?;
        check_response(self.name(), resp).await?;
        Ok(())
    }
}
