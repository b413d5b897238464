//! Alert event type.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// A notification-worthy condition detected from a record.
///
/// Fire-and-forget: nothing about an event is retained after dispatch.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertEvent {
    /// One-line summary.
    pub subject: String,
    /// Human-readable body.
    pub message: String,
    /// When the event was produced.
    pub produced_at: DateTime<Utc>,
}
