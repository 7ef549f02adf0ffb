//! Email transports and the ordered fallback chain.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use fpt_config::EmailConfig;
use fpt_core::report::Reporter;
use serde::Serialize;

use crate::error::NotifyError;
use crate::resend::ResendTransport;
use crate::sendgrid::SendGridTransport;

/// A rendered message ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Email {
    pub to: String,
    pub subject: String,
    pub text: String,
    pub html: String,
}

/// One outbound email provider.
#[async_trait]
pub trait EmailTransport: Send + Sync {
    /// Short name used in logs and dispatch outcomes.
    fn name(&self) -> &str;

    /// Deliver `email`. Any error counts as a failed attempt.
    async fn send(&self, email: &Email) -> Result<(), NotifyError>;
}

/// Transports tried in order until one accepts the message.
#[derive(Clone, Default)]
pub struct TransportChain {
    transports: Vec<Arc<dyn EmailTransport>>,
}

impl TransportChain {
    #[must_use]
    pub const fn new(transports: Vec<Arc<dyn EmailTransport>>) -> Self {
        Self { transports }
    }

    /// Resend then SendGrid, each only when its key is set.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError::Http`] if an HTTP client cannot be built.
    pub fn from_config(config: &EmailConfig) -> Result<Self, NotifyError> {
        let http = http_client()?;
        let mut transports: Vec<Arc<dyn EmailTransport>> = Vec::new();
        if config.has_resend() {
            transports.push(Arc::new(ResendTransport::new(http.clone(), config)));
        }
        if config.has_sendgrid() {
            transports.push(Arc::new(SendGridTransport::new(http, config)));
        }
        Ok(Self { transports })
    }

    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.transports.iter().map(|t| t.name()).collect()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.transports.is_empty()
    }

    /// # Errors
    ///
    /// Returns [`NotifyError::NoTransport`] when the chain is empty.
    pub fn ensure_ready(&self) -> Result<(), NotifyError> {
        if self.is_empty() {
            return Err(NotifyError::NoTransport);
        }
        Ok(())
    }

    /// Try each transport once, in order. Returns the name of the transport
    /// that delivered.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError::AllTransportsFailed`] carrying the last
    /// transport's error when none succeeded.
    pub async fn deliver(&self, email: &Email, reporter: &dyn Reporter) -> Result<String, NotifyError> {
        self.ensure_ready()?;
        let mut last_error = String::new();
        for transport in &self.transports {
            match transport.send(email).await {
                Ok(()) => {
                    reporter.debug(&format!("Delivered via {}", transport.name()));
                    return Ok(transport.name().to_string());
                }
                Err(error) => {
                    reporter.warn(&format!("{} failed: {error}", transport.name()));
                    last_error = error.to_string();
                }
            }
        }
        Err(NotifyError::AllTransportsFailed { last_error })
    }
}

fn http_client() -> Result<reqwest::Client, NotifyError> {
    Ok(reqwest::Client::builder()
        .user_agent("fpt/0.1")
        .timeout(Duration::from_secs(30))
        .build()?)
}

/// Check a provider response: 429 → [`NotifyError::RateLimited`] (Retry-After,
/// default 60 s), other non-success → [`NotifyError::Provider`] with the body.
pub async fn check_response(
    transport: &str,
    resp: reqwest::Response,
) -> Result<reqwest::Response, NotifyError> {
    if resp.status() == 429 {
        let retry_after_secs = resp
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(60);
        return Err(NotifyError::RateLimited {
            transport: transport.to_string(),
            retry_after_secs,
        });
    }
    if !resp.status().is_success() {
        let status = resp.status().as_u16();
        let message = resp.text().await.unwrap_or_default();
        return Err(NotifyError::Provider {
            transport: transport.to_string(),
            status,
            message,
        });
    }
    Ok(resp)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mock_response(status: u16, body: &'static str) -> reqwest::Response {
        reqwest::Response::from(
            ::http::Response::builder()
                .status(status)
                .body(body)
                .unwrap(),
        )
    }

    #[tokio::test]
    async fn accepted_passes_through() {
        let resp = check_response("sendgrid", mock_response(202, "")).await;
        assert!(resp.is_ok());
    }

    #[tokio::test]
    async fn rejection_carries_transport_and_body() {
        let err = check_response("resend", mock_response(422, "invalid from"))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "resend API error (422): invalid from");
    }

    #[tokio::test]
    async fn rate_limit_defaults_to_sixty_seconds() {
        let err = check_response("resend", mock_response(429, ""))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            NotifyError::RateLimited {
                retry_after_secs: 60,
                ..
            }
        ));
    }

    #[test]
    fn chain_follows_configured_keys() {
        let both = EmailConfig {
            resend_api_key: "re_key".into(),
            sendgrid_api_key: "SG.key".into(),
            ..Default::default()
        };
        assert_eq!(TransportChain::from_config(&both).unwrap().names(), ["resend", "sendgrid"]);

        let sendgrid_only = EmailConfig {
            sendgrid_api_key: "SG.key".into(),
            ..Default::default()
        };
        assert_eq!(
            TransportChain::from_config(&sendgrid_only).unwrap().names(),
            ["sendgrid"]
        );

        let none = TransportChain::from_config(&EmailConfig::default()).unwrap();
        assert!(matches!(none.ensure_ready(), Err(NotifyError::NoTransport)));
    }
}
