//! Alert conditions and best-effort dispatch.
//!
//! Delivery failures are logged and dropped here; they never reach the
//! pipeline or the session.

use std::sync::Arc;

use chrono::{FixedOffset, Offset, Utc};
use tracing::{debug, info, instrument, warn};

use crate::traits::{Clock, Notifier};
use crate::types::{AlertEvent, CreditReading, TemplateRecord};

/// Default low-balance threshold.
pub const DEFAULT_CREDIT_THRESHOLD: f64 = 3000.0;

/// Default offset for dates shown in alerts (UTC+05:30).
pub const DEFAULT_DISPLAY_OFFSET_SECS: i32 = 5 * 3600 + 30 * 60;

/// Alert conditions and presentation settings.
#[derive(Debug, Clone, Copy)]
pub struct DispatchConfig {
    /// Balances strictly below this raise an alert.
    pub credit_threshold: f64,
    /// Offset used only to render dates in messages.
    pub display_offset: FixedOffset,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            credit_threshold: DEFAULT_CREDIT_THRESHOLD,
            display_offset: FixedOffset::east_opt(DEFAULT_DISPLAY_OFFSET_SECS)
                .unwrap_or_else(|| Utc.fix()),
        }
    }
}

/// Turns records into alerts and hands them to a [`Notifier`].
#[derive(Clone)]
pub struct NotificationDispatcher {
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    config: DispatchConfig,
}

impl NotificationDispatcher {
    pub fn new(notifier: Arc<dyn Notifier>, clock: Arc<dyn Clock>, config: DispatchConfig) -> Self {
        Self {
            notifier,
            clock,
            config,
        }
    }

    /// The alert for `reading`, if its balance is below the threshold.
    pub fn credit_alert(&self, reading: &CreditReading) -> Option<AlertEvent> {
        if reading.credits >= self.config.credit_threshold {
            return None;
        }
        Some(AlertEvent {
            subject: "Low credit balance".to_string(),
            message: format!("ALERT: Low credits! Current balance: {}", reading.credits),
            produced_at: self.clock.now(),
        })
    }

    /// The alert for a disabled template.
    pub fn template_alert(&self, record: &TemplateRecord) -> AlertEvent {
        let changed = record
            .last_status_change_timestamp
            .with_timezone(&self.config.display_offset)
            .format("%-d %B %Y");

        AlertEvent {
            subject: format!("Template disabled: {}", record.name),
            message: format!(
                "Template: {}\nStatus: {}\nRejected Reason: {}\nDisabled Time: {}",
                record.name,
                record.status.to_uppercase(),
                record.rejected_reason.as_deref().unwrap_or("N/A"),
                changed,
            ),
            produced_at: self.clock.now(),
        }
    }

    /// Dispatch a low-balance alert when the condition holds.
    ///
    /// Returns whether an alert was raised, regardless of delivery.
    #[instrument(skip(self, reading), fields(credits = reading.credits))]
    pub async fn credits(&self, reading: &CreditReading) -> bool {
        match self.credit_alert(reading) {
            Some(event) => {
                self.dispatch(&event).await;
                true
            }
            None => {
                debug!(
                    threshold = self.config.credit_threshold,
                    "Balance above threshold, no alert"
                );
                false
            }
        }
    }

    /// Dispatch one alert per template. Returns the number raised.
    #[instrument(skip(self, records), fields(count = records.len()))]
    pub async fn templates(&self, records: &[TemplateRecord]) -> usize {
        for record in records {
            self.dispatch(&self.template_alert(record)).await;
        }
        records.len()
    }

    async fn dispatch(&self, event: &AlertEvent) {
        match self.notifier.send(event).await {
            Ok(()) => info!(subject = %event.subject, "Alert dispatched"),
            Err(e) => warn!(subject = %event.subject, error = %e, "Alert dispatch failed, dropping"),
        }
    }
}
