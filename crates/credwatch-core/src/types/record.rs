//! Normalized records produced from API responses.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One message template as reported by the template-status endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateRecord {
    /// Template name.
    pub name: String,
    /// Reason given by the provider for rejecting the template, if any.
    pub rejected_reason: Option<String>,
    /// Lowercased status, e.g. `disabled` or `approved`.
    pub status: String,
    /// Most recent status change.
    pub last_status_change_timestamp: DateTime<Utc>,
}

/// A credit balance observed at a point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreditReading {
    /// Remaining credit balance.
    pub credits: f64,
    /// When the balance was read.
    #[serde(rename = "timestamp")]
    pub observed_at: DateTime<Utc>,
}
