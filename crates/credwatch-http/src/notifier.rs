//! Alert transports.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{info, instrument};

use credwatch_core::error::{ApiError, NotificationError};
use credwatch_core::traits::Notifier;
use credwatch_core::{AlertEvent, Result};

use crate::USER_AGENT;

/// POSTs each alert as JSON to a webhook.
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
}

impl WebhookNotifier {
    /// Create a notifier posting to `url`.
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::Configuration {
                message: e.to_string(),
            })?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    #[instrument(skip(self, event), fields(subject = %event.subject))]
    async fn send(&self, event: &AlertEvent) -> std::result::Result<(), NotificationError> {
        let response = self
            .client
            .post(&self.url)
            .json(event)
            .send()
            .await
            .map_err(|e| NotificationError::Delivery {
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(NotificationError::Status {
                status: status.as_u16(),
            });
        }
        Ok(())
    }
}

/// Writes alerts to the log. Used when no webhook is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, event: &AlertEvent) -> std::result::Result<(), NotificationError> {
        info!(
            subject = %event.subject,
            produced_at = %event.produced_at,
            message = %event.message,
            "ALERT"
        );
        Ok(())
    }
}
