//! Notification delivery
//!
//! Manager-facing emails are handed off to an HTTP relay. When no relay is
//! configured (dev mode) the payload is logged instead of sent, so webhook
//! processing never depends on email infrastructure being up.

use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info};

use crate::types::{Result, TurnstileError};

/// Trait for outbound email - allows swapping implementations
#[async_trait::async_trait]
pub trait EmailService: Send + Sync {
    async fn send(&self, subject: &str, html_body: &str, recipients: &[String]) -> Result<()>;
}

/// Mailer that POSTs messages to an HTTP email relay
pub struct RelayMailer {
    http: reqwest::Client,
    relay_url: String,
    from: String,
}

#[derive(Serialize)]
struct RelayMessage<'a> {
    from: &'a str,
    subject: &'a str,
    html_body: &'a str,
    recipients: &'a [String],
}

impl RelayMailer {
    pub fn new(relay_url: String, from: String, timeout_ms: u64) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .build()
            .map_err(|e| TurnstileError::Email(format!("failed to build http client: {}", e)))?;

        Ok(Self { http, relay_url, from })
    }
}

#[async_trait::async_trait]
impl EmailService for RelayMailer {
    async fn send(&self, subject: &str, html_body: &str, recipients: &[String]) -> Result<()> {
        if recipients.is_empty() {
            debug!(subject, "no recipients, skipping email");
            return Ok(());
        }

        let message = RelayMessage {
            from: &self.from,
            subject,
            html_body,
            recipients,
        };

        let response = self
            .http
            .post(&self.relay_url)
            .json(&message)
            .send()
            .await
            .map_err(|e| TurnstileError::Email(format!("relay request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(TurnstileError::Email(format!(
                "relay returned {}",
                response.status()
            )));
        }

        debug!(subject, recipient_count = recipients.len(), "email handed to relay");
        Ok(())
    }
}

/// Log-only mailer for dev mode
pub struct LogMailer;

#[async_trait::async_trait]
impl EmailService for LogMailer {
    async fn send(&self, subject: &str, _html_body: &str, recipients: &[String]) -> Result<()> {
        info!(subject, recipients = ?recipients, "email relay not configured, logging only");
        Ok(())
    }
}
