//! Uniform response envelope shared by every extension endpoint.
//!
//! Success responses are `{"success": true, ...payload}`; failures are
//! `{"success": false, "error_code", "error", "details"?, "timestamp"}`.
//! Two reserved payload fields opt a response out of JSON encoding:
//! `_raw_text` carries a plain text body (used for Prometheus exposition)
//! and `_content_type` overrides the content type when `_raw_text` is set.

use crate::error::{ErrorCode, ErrorPayload};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

/// Reserved payload field carrying a raw text body.
pub const RAW_TEXT_FIELD: &str = "_raw_text";

/// Reserved payload field overriding the content type of a raw body.
pub const CONTENT_TYPE_FIELD: &str = "_content_type";

/// Default content type for raw bodies (Prometheus text exposition).
pub const DEFAULT_RAW_CONTENT_TYPE: &str = "text/plain; version=0.0.4";

/// Current unix time as fractional seconds.
pub fn unix_timestamp() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

/// Decoded request payload handed to route handlers.
///
/// POST bodies decode to the JSON object as-is; GET query strings decode to
/// a map with single-element lists collapsed to scalars.
pub type RequestData = Map<String, Value>;

/// Collapse parsed query parameters into a [`RequestData`] map.
///
/// Repeated keys stay as arrays; a single value collapses to a scalar string.
pub fn collapse_query_params(params: HashMap<String, Vec<String>>) -> RequestData {
    let mut data = Map::new();
    for (key, mut values) in params {
        let value = if values.len() == 1 {
            Value::String(values.remove(0))
        } else {
            Value::Array(values.into_iter().map(Value::String).collect())
        };
        data.insert(key, value);
    }
    data
}

/// How an envelope should be written to the wire.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponsePayload {
    /// JSON body with the HTTP status derived from the envelope.
    Json(Value),
    /// Raw text body (byte-for-byte) with an explicit content type.
    Raw { body: String, content_type: String },
}

impl ResponsePayload {
    /// Classify a handler value: the reserved `_raw_text` field selects a
    /// raw body, everything else stays JSON.
    pub fn from_value(value: Value) -> Self {
        if let Value::Object(map) = &value {
            if let Some(Value::String(body)) = map.get(RAW_TEXT_FIELD) {
                let content_type = map
                    .get(CONTENT_TYPE_FIELD)
                    .and_then(Value::as_str)
                    .unwrap_or(DEFAULT_RAW_CONTENT_TYPE)
                    .to_string();
                return ResponsePayload::Raw {
                    body: body.clone(),
                    content_type,
                };
            }
        }
        ResponsePayload::Json(value)
    }
}

/// Build a success envelope from payload fields.
pub fn success_envelope(payload: Value) -> Value {
    let mut map = match payload {
        Value::Object(map) => map,
        Value::Null => Map::new(),
        other => {
            let mut map = Map::new();
            map.insert("result".to_string(), other);
            map
        }
    };
    map.insert("success".to_string(), Value::Bool(true));
    Value::Object(map)
}

/// Build an error envelope from a code and message.
pub fn error_envelope(code: ErrorCode, message: impl Into<String>) -> Value {
    ErrorPayload::new(code, message).to_value()
}

/// Ensure a controller response conforms to the envelope contract.
///
/// Guarantees a boolean `success` field and, on failure, non-empty `error`
/// and `error_code` strings. Raw-text responses pass through untouched.
pub fn normalize_transport_response(
    operation: &str,
    response: Value,
    default_error_code: &str,
) -> Value {
    let mut map = match response {
        Value::Object(map) => map,
        other => {
            let mut map = Map::new();
            map.insert("success".to_string(), Value::Bool(true));
            map.insert("result".to_string(), other);
            return Value::Object(map);
        }
    };

    if map.contains_key(RAW_TEXT_FIELD) {
        map.entry("success".to_string())
            .or_insert(Value::Bool(true));
        return Value::Object(map);
    }

    let success = map
        .get("success")
        .and_then(Value::as_bool)
        .unwrap_or_else(|| !map.contains_key("error"));
    map.insert("success".to_string(), Value::Bool(success));

    if !success {
        let has_error = map
            .get("error")
            .and_then(Value::as_str)
            .is_some_and(|s| !s.is_empty());
        if !has_error {
            map.insert(
                "error".to_string(),
                Value::String(format!("{operation} failed")),
            );
        }
        let has_code = map
            .get("error_code")
            .and_then(Value::as_str)
            .is_some_and(|s| !s.is_empty());
        if !has_code {
            map.insert(
                "error_code".to_string(),
                Value::String(default_error_code.to_string()),
            );
        }
    }

    Value::Object(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn query_params_collapse_single_values() {
        let mut params = HashMap::new();
        params.insert("movement_id".to_string(), vec!["move_1".to_string()]);
        params.insert(
            "tags".to_string(),
            vec!["a".to_string(), "b".to_string()],
        );
        let data = collapse_query_params(params);
        assert_eq!(data["movement_id"], "move_1");
        assert_eq!(data["tags"], json!(["a", "b"]));
    }

    #[test]
    fn raw_text_selects_raw_payload() {
        let value = json!({
            "success": true,
            "_raw_text": "worldviewer_requests_received 4\n",
        });
        match ResponsePayload::from_value(value) {
            ResponsePayload::Raw { body, content_type } => {
                assert_eq!(body, "worldviewer_requests_received 4\n");
                assert_eq!(content_type, DEFAULT_RAW_CONTENT_TYPE);
            }
            other => panic!("expected raw payload, got {other:?}"),
        }
    }

    #[test]
    fn content_type_override_is_honored() {
        let value = json!({"_raw_text": "hello", "_content_type": "text/csv"});
        match ResponsePayload::from_value(value) {
            ResponsePayload::Raw { content_type, .. } => assert_eq!(content_type, "text/csv"),
            other => panic!("expected raw payload, got {other:?}"),
        }
    }

    #[test]
    fn normalize_fills_missing_error_fields() {
        let response = json!({"success": false});
        let normalized = normalize_transport_response("queue_play", response, "QUEUE_PLAY_FAILED");
        assert_eq!(normalized["error"], "queue_play failed");
        assert_eq!(normalized["error_code"], "QUEUE_PLAY_FAILED");
    }

    #[test]
    fn normalize_preserves_existing_codes() {
        let response = json!({"success": false, "error": "queue is full", "error_code": "VALIDATION_ERROR"});
        let normalized = normalize_transport_response("add_movement", response, "ADD_MOVEMENT_FAILED");
        assert_eq!(normalized["error_code"], "VALIDATION_ERROR");
    }

    #[test]
    fn normalize_wraps_bare_values() {
        let normalized = normalize_transport_response("get_status", json!(42), "STATUS_FAILED");
        assert_eq!(normalized["success"], true);
        assert_eq!(normalized["result"], 42);
    }

    #[test]
    fn success_envelope_merges_payload() {
        let envelope = success_envelope(json!({"movement_id": "m1"}));
        assert_eq!(envelope["success"], true);
        assert_eq!(envelope["movement_id"], "m1");
    }
}
