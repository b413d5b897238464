//! Template-status source.
//!
//! All window decisions compare absolute instants; the presentation offset
//! used in alert messages never reaches this module.

use chrono::{DateTime, SecondsFormat, TimeDelta, Utc};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::error::TransformError;
use crate::types::TemplateRecord;

/// Default path of the templates-by-status endpoint.
pub const TEMPLATES_ENDPOINT: &str = "/client/t1/api/get-templates-by-status";

/// Status that makes a template alert-worthy.
pub const DISABLED_STATUS: &str = "disabled";

/// Templates requested per poll.
const ROWS_PER_PAGE: u32 = 100;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTemplate {
    name: String,
    status: String,
    #[serde(default)]
    rejected_reason: Option<String>,
    #[serde(default)]
    status_journey: Vec<RawStatusChange>,
    #[serde(default)]
    updated_at: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct RawStatusChange {
    #[serde(default)]
    timestamp: Option<Value>,
}

/// Request body for the templates-by-status endpoint.
pub fn payload(assistant_id: &str, now: DateTime<Utc>) -> Value {
    json!({
        "statusFilter": "action_required",
        "tag": "trending",
        "skip": 0,
        "timeStamp": now.to_rfc3339_opts(SecondsFormat::Millis, true),
        "rowsPerPage": ROWS_PER_PAGE,
        "totalCount": null,
        "assistantId": assistant_id,
    })
}

/// Normalize every template in a templates-by-status response.
///
/// A response without a `templates` array is a [`TransformError`]; individual
/// items that cannot be normalized are skipped with a warning.
pub fn normalize(response: &Value) -> std::result::Result<Vec<TemplateRecord>, TransformError> {
    let items = response
        .get("templates")
        .and_then(Value::as_array)
        .ok_or_else(|| TransformError::MissingField {
            field: "templates".to_string(),
        })?;

    let records = items
        .iter()
        .enumerate()
        .filter_map(|(index, item)| match normalize_item(item) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(index, error = %e, "Skipping malformed template");
                None
            }
        })
        .collect();

    Ok(records)
}

fn normalize_item(item: &Value) -> std::result::Result<TemplateRecord, TransformError> {
    let raw = RawTemplate::deserialize(item).map_err(|e| TransformError::InvalidField {
        field: "templates[]".to_string(),
        reason: e.to_string(),
    })?;

    // The journey's last entry is the most recent change; fall back to the
    // template's own update time when the journey is empty.
    let changed = raw
        .status_journey
        .last()
        .and_then(|change| change.timestamp.as_ref())
        .or(raw.updated_at.as_ref())
        .and_then(parse_timestamp)
        .ok_or_else(|| TransformError::InvalidField {
            field: "statusJourney".to_string(),
            reason: format!("no usable status change timestamp for `{}`", raw.name),
        })?;

    Ok(TemplateRecord {
        rejected_reason: raw.rejected_reason.filter(|r| !r.trim().is_empty()),
        status: raw.status.to_lowercase(),
        last_status_change_timestamp: changed,
        name: raw.name,
    })
}

/// Parse an RFC 3339 string or an epoch-milliseconds number.
fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|t| t.with_timezone(&Utc)),
        Value::Number(n) => n.as_i64().and_then(DateTime::from_timestamp_millis),
        _ => None,
    }
}

/// Keep disabled templates whose last change lies within `window` of `now`.
///
/// The boundary is inclusive: a change exactly `window` ago is kept.
pub fn recent_disabled(
    records: &[TemplateRecord],
    now: DateTime<Utc>,
    window: TimeDelta,
) -> Vec<TemplateRecord> {
    let cutoff = now - window;
    records
        .iter()
        .filter(|record| {
            if record.status != DISABLED_STATUS {
                debug!(name = %record.name, status = %record.status, "Skipping template");
                return false;
            }
            record.last_status_change_timestamp >= cutoff
        })
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::epoch;

    fn record(name: &str, status: &str, changed: DateTime<Utc>) -> TemplateRecord {
        TemplateRecord {
            name: name.to_string(),
            rejected_reason: None,
            status: status.to_string(),
            last_status_change_timestamp: changed,
        }
    }

    #[test]
    fn window_keeps_recent_disabled_templates_only() {
        let now = epoch();
        let records = vec![
            record("three-hours", "disabled", now - TimeDelta::hours(3)),
            record("five-hours", "disabled", now - TimeDelta::hours(5)),
            record("one-hour", "disabled", now - TimeDelta::hours(1)),
            record("enabled-recent", "enabled", now - TimeDelta::hours(1)),
            record("enabled-old", "enabled", now - TimeDelta::hours(3)),
        ];

        let kept = recent_disabled(&records, now, TimeDelta::hours(4));
        let names: Vec<_> = kept.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["three-hours", "one-hour"]);
    }

    #[test]
    fn window_boundary_is_inclusive() {
        let now = epoch();
        let records = vec![
            record("exactly", "disabled", now - TimeDelta::hours(4)),
            record("just-outside", "disabled", now - TimeDelta::hours(4) - TimeDelta::seconds(1)),
        ];

        let kept = recent_disabled(&records, now, TimeDelta::hours(4));
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].name, "exactly");
    }

    #[test]
    fn normalize_uses_last_journey_entry() {
        let response = json!({
            "templates": [{
                "name": "welcome",
                "status": "DISABLED",
                "rejectedReason": "Low quality",
                "statusJourney": [
                    { "status": "APPROVED", "timestamp": "2026-10-01T00:00:00Z" },
                    { "status": "DISABLED", "timestamp": "2026-10-17T10:30:00+05:30" }
                ],
                "updatedAt": "2026-09-01T00:00:00Z"
            }]
        });

        let records = normalize(&response).unwrap();
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.name, "welcome");
        assert_eq!(record.status, "disabled");
        assert_eq!(record.rejected_reason.as_deref(), Some("Low quality"));
        assert_eq!(
            record.last_status_change_timestamp,
            DateTime::parse_from_rfc3339("2026-10-17T05:00:00Z").unwrap()
        );
    }

    #[test]
    fn normalize_falls_back_to_updated_at() {
        let response = json!({
            "templates": [{
                "name": "promo",
                "status": "APPROVED",
                "rejectedReason": "",
                "statusJourney": [],
                "updatedAt": 1_792_238_400_000_i64
            }]
        });

        let records = normalize(&response).unwrap();
        assert_eq!(records[0].rejected_reason, None);
        assert_eq!(
            records[0].last_status_change_timestamp,
            DateTime::from_timestamp_millis(1_792_238_400_000).unwrap()
        );
    }

    #[test]
    fn normalize_skips_malformed_items() {
        let response = json!({
            "templates": [
                { "status": "DISABLED", "updatedAt": "2026-10-17T00:00:00Z" },
                { "name": "no-time", "status": "DISABLED" },
                { "name": "ok", "status": "DISABLED", "updatedAt": "2026-10-17T00:00:00Z" }
            ]
        });

        let records = normalize(&response).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "ok");
    }

    #[test]
    fn empty_template_list_is_success() {
        assert!(normalize(&json!({ "templates": [] })).unwrap().is_empty());
    }

    #[test]
    fn missing_template_list_is_a_transform_error() {
        let err = normalize(&json!({ "items": [] })).unwrap_err();
        assert!(matches!(err, TransformError::MissingField { field } if field == "templates"));
    }

    #[test]
    fn payload_carries_assistant_and_timestamp() {
        let body = payload("assistant-1", epoch());
        assert_eq!(body["assistantId"], "assistant-1");
        assert_eq!(body["statusFilter"], "action_required");
        assert_eq!(body["rowsPerPage"], 100);
        assert_eq!(body["timeStamp"], "2026-10-17T12:00:00.000Z");
        assert!(body["totalCount"].is_null());
    }
}
