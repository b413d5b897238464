//! Notification channel trait.

use async_trait::async_trait;

use crate::error::NotificationError;
use crate::types::AlertEvent;

/// A best-effort notification channel.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver one alert.
    async fn send(&self, event: &AlertEvent) -> std::result::Result<(), NotificationError>;
}
