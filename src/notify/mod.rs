//! Operational user alerts.
//!
//! Trade-execution failures are reported through this port so operators can
//! triage without reading logs. Delivery is fire-and-forget: implementations
//! swallow their own errors.

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::sync::Mutex;
use tracing::{debug, error};

/// Notification port the exchange client depends on
#[async_trait]
pub trait UserAlertNotifier: Send + Sync {
    async fn notify(&self, message: &str);
}

/// Webhook notification client
pub struct WebhookNotifier {
    client: Client,
    webhook_url: String,
}

#[derive(Serialize)]
struct TextMessage<'a> {
    text: &'a str,
}

impl WebhookNotifier {
    pub fn new(webhook_url: String) -> Self {
        Self {
            client: Client::new(),
            webhook_url,
        }
    }
}

#[async_trait]
impl UserAlertNotifier for WebhookNotifier {
    async fn notify(&self, message: &str) {
        let payload = TextMessage { text: message };

        match self
            .client
            .post(&self.webhook_url)
            .json(&payload)
            .send()
            .await
        {
            Ok(resp) => {
                if resp.status().is_success() {
                    debug!("User alert sent successfully");
                } else {
                    let status = resp.status();
                    let body = resp.text().await.unwrap_or_default();
                    error!("User alert delivery failed: {} - {}", status, body);
                }
            }
            Err(e) => {
                error!("User alert request failed: {}", e);
            }
        }
    }
}

/// Fallback when no webhook URL is configured: alerts land in the log only
pub struct LogOnlyNotifier;

#[async_trait]
impl UserAlertNotifier for LogOnlyNotifier {
    async fn notify(&self, message: &str) {
        error!("USER ALERT: {}", message);
    }
}

/// Recording stub for tests
#[derive(Default)]
pub struct RecordingNotifier {
    messages: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[async_trait]
impl UserAlertNotifier for RecordingNotifier {
    async fn notify(&self, message: &str) {
        self.messages
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(message.to_string());
    }
}
