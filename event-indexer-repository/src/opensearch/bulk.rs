//! Interpretation of OpenSearch bulk responses.
//!
//! Maps the HTTP status of a bulk request, and the per-item statuses in its
//! body, onto [`IndexError`]. Conflicts (409) are absorbed here.

use serde_json::Value;

use crate::errors::IndexError;

const CONFLICT: u16 = 409;
const TOO_MANY_REQUESTS: u16 = 429;

/// Classify the HTTP status of a bulk response.
///
/// A 409 comes back as [`IndexError::Conflict`]; the sink treats it as
/// success since the documents already exist.
pub(crate) fn check_response_status(status: u16) -> Result<(), IndexError> {
    match status {
        200..=299 => Ok(()),
        CONFLICT => Err(IndexError::conflict("bulk request returned 409")),
        TOO_MANY_REQUESTS => Err(IndexError::throttled("bulk request returned 429")),
        500..=599 => Err(IndexError::unavailable(format!(
            "bulk request returned {}",
            status
        ))),
        other => Err(IndexError::rejected(format!(
            "bulk request returned {}",
            other
        ))),
    }
}

/// Inspect the per-item results of an accepted bulk response.
///
/// The first item failure that is not a conflict decides the result.
pub(crate) fn check_items(body: &Value) -> Result<(), IndexError> {
    let has_errors = body
        .get("errors")
        .and_then(Value::as_bool)
        .ok_or_else(|| IndexError::rejected("bulk response is missing the errors flag"))?;

    if !has_errors {
        return Ok(());
    }

    let items = body
        .get("items")
        .and_then(Value::as_array)
        .ok_or_else(|| IndexError::rejected("bulk response is missing items"))?;

    for item in items {
        let Some(actions) = item.as_object() else {
            continue;
        };

        for result in actions.values() {
            check_item(result)?;
        }
    }

    Ok(())
}

fn check_item(result: &Value) -> Result<(), IndexError> {
    let status = result
        .get("status")
        .and_then(Value::as_u64)
        .and_then(|status| u16::try_from(status).ok())
        .unwrap_or(0);
    let id = result.get("_id").and_then(Value::as_str).unwrap_or("<unknown>");
    let reason = result
        .pointer("/error/reason")
        .and_then(Value::as_str)
        .unwrap_or("no reason given");

    match status {
        200..=299 | CONFLICT => Ok(()),
        TOO_MANY_REQUESTS => Err(IndexError::throttled(format!("item {}: {}", id, reason))),
        500..=599 => Err(IndexError::unavailable(format!(
            "item {} returned {}: {}",
            id, status, reason
        ))),
        _ => Err(IndexError::rejected(format!(
            "item {} returned {}: {}",
            id, status, reason
        ))),
    }
}
