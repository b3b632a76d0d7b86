//! Response classification.
//!
//! Turns a raw HTTP body into a [`DatasetResult`]:
//!
//! - an array of objects is a dataset
//! - an object with both `error` and `message` keys is an API error
//! - any other object is a one-row dataset (single-row lookups answer this way)
//! - anything else, including bodies that are not JSON, is a decode error
//!
//! The HTTP status does not drive classification; it is only attached to API
//! errors for diagnostics.

use crate::error::SodaError;
use crate::transport::TransportResponse;
use crate::types::{DatasetResult, Row};
use serde_json::Value;

/// Classify a completed HTTP exchange.
pub fn classify_response(response: &TransportResponse) -> DatasetResult {
    classify_body(&response.body, Some(response.status))
}

/// Classify a response body.
pub fn classify_body(body: &[u8], status: Option<u16>) -> DatasetResult {
    let json: Value = serde_json::from_slice(body).map_err(|e| {
        SodaError::decode(format!("Failed to parse response: {}", e), Some(body))
    })?;

    match json {
        Value::Array(items) => {
            let count = items.len();
            let rows: Vec<Row> = items
                .into_iter()
                .filter_map(|item| match item {
                    Value::Object(map) => Some(Row::from(map)),
                    _ => None,
                })
                .collect();
            if rows.len() != count {
                return Err(SodaError::decode(
                    "Response array contains non-object elements",
                    Some(body),
                ));
            }
            Ok(rows)
        }
        Value::Object(map) => {
            if map.contains_key("error") {
                if let Some(message) = map.get("message") {
                    let message = match message {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    };
                    return Err(SodaError::Api {
                        message,
                        status,
                        detail: Value::Object(map),
                    });
                }
            }
            Ok(vec![Row::from(map)])
        }
        other => Err(SodaError::decode(
            format!("Unexpected JSON {} in response", json_kind(&other)),
            Some(body),
        )),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
