//! Credit-balance source.

use chrono::{DateTime, Utc};
use serde_json::{Value, json};

use crate::error::TransformError;
use crate::types::CreditReading;

/// Default path of the account-details endpoint carrying the balance.
pub const CREDITS_ENDPOINT: &str = "/client/t1/api/get-wba-details";

/// Response field holding the balance.
pub const BALANCE_FIELD: &str = "templateCredit";

/// Request body for the account-details endpoint.
pub fn payload(assistant_id: &str) -> Value {
    json!({ "assistantId": assistant_id })
}

/// Extract the balance from an account-details response.
///
/// The backend reports it either as a JSON number or as a numeric string,
/// possibly with thousands separators.
pub fn extract(
    response: &Value,
    observed_at: DateTime<Utc>,
) -> std::result::Result<CreditReading, TransformError> {
    let raw = response
        .get(BALANCE_FIELD)
        .filter(|v| !v.is_null())
        .ok_or_else(|| TransformError::MissingField {
            field: BALANCE_FIELD.to_string(),
        })?;

    let credits = match raw {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().replace(',', "").parse::<f64>().ok(),
        _ => None,
    }
    .filter(|v| v.is_finite())
    .ok_or_else(|| TransformError::InvalidField {
        field: BALANCE_FIELD.to_string(),
        reason: format!("expected a number, got {raw}"),
    })?;

    Ok(CreditReading {
        credits,
        observed_at,
    })
}
