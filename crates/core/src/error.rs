//! Error taxonomy for the AgentWorld control plane.
//!
//! Uses `thiserror` for ergonomic error definitions. Every failure that
//! reaches a client carries a stable [`ErrorCode`]; the router maps codes to
//! HTTP status codes in one place.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;

/// Stable error codes shared across all extensions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    /// Caller-supplied parameters invalid (400).
    Validation,
    /// Wrong verb for the endpoint (405).
    MethodNotAllowed,
    /// Entity missing (404).
    NotFound,
    /// Rate limit exceeded (429).
    RateLimited,
    /// Missing or invalid credentials (401).
    Unauthorized,
    /// Main-thread dispatch deadline elapsed (504).
    Timeout,
    /// Core subsystem not ready (500).
    CameraUnavailable,
    /// Shot queue not ready (500).
    QueueUnavailable,
    /// Operation-specific failure (500), e.g. `SMOOTH_MOVE_FAILED`.
    OperationFailed(String),
}

impl ErrorCode {
    /// The wire representation, e.g. `VALIDATION_ERROR`.
    pub fn as_str(&self) -> &str {
        match self {
            ErrorCode::Validation => "VALIDATION_ERROR",
            ErrorCode::MethodNotAllowed => "METHOD_NOT_ALLOWED",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::RateLimited => "RATE_LIMITED",
            ErrorCode::Unauthorized => "UNAUTHORIZED",
            ErrorCode::Timeout => "TIMEOUT",
            ErrorCode::CameraUnavailable => "CAMERA_UNAVAILABLE",
            ErrorCode::QueueUnavailable => "QUEUE_UNAVAILABLE",
            ErrorCode::OperationFailed(code) => code,
        }
    }

    /// HTTP status the router sends for this code.
    pub fn http_status(&self) -> u16 {
        match self {
            ErrorCode::Validation => 400,
            ErrorCode::Unauthorized => 401,
            ErrorCode::NotFound => 404,
            ErrorCode::MethodNotAllowed => 405,
            ErrorCode::RateLimited => 429,
            ErrorCode::Timeout => 504,
            ErrorCode::CameraUnavailable
            | ErrorCode::QueueUnavailable
            | ErrorCode::OperationFailed(_) => 500,
        }
    }

    /// Map a wire string back to a code. Unknown strings become
    /// [`ErrorCode::OperationFailed`] so that status mapping stays total.
    pub fn from_str_code(code: &str) -> Self {
        match code {
            "VALIDATION_ERROR" => ErrorCode::Validation,
            "METHOD_NOT_ALLOWED" => ErrorCode::MethodNotAllowed,
            "NOT_FOUND" => ErrorCode::NotFound,
            "RATE_LIMITED" => ErrorCode::RateLimited,
            "UNAUTHORIZED" => ErrorCode::Unauthorized,
            "TIMEOUT" => ErrorCode::Timeout,
            "CAMERA_UNAVAILABLE" => ErrorCode::CameraUnavailable,
            "QUEUE_UNAVAILABLE" => ErrorCode::QueueUnavailable,
            other => ErrorCode::OperationFailed(other.to_string()),
        }
    }
}

/// Structured error payload returned to HTTP and MCP clients.
#[derive(Debug, Clone)]
pub struct ErrorPayload {
    pub code: ErrorCode,
    pub message: String,
    pub details: Option<BTreeMap<String, Value>>,
}

impl ErrorPayload {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    /// Attach a `details` object naming the offending parameter.
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.details
            .get_or_insert_with(BTreeMap::new)
            .insert(key.into(), value.into());
        self
    }

    /// Render to the standard error envelope.
    pub fn to_value(&self) -> Value {
        let mut payload = serde_json::json!({
            "success": false,
            "error_code": self.code.as_str(),
            "error": self.message,
            "timestamp": crate::envelope::unix_timestamp(),
        });
        if let Some(details) = &self.details {
            payload["details"] = serde_json::to_value(details).unwrap_or(Value::Null);
        }
        payload
    }
}

/// Tagged failure variants a route handler can return.
///
/// The router owns the mapping from variants to envelopes and status codes;
/// handlers never raise through the transport with ad-hoc strings.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("{0}")]
    Validation(String),

    #[error("{endpoint} requires {expected} method")]
    MethodNotAllowed { endpoint: String, expected: String },

    #[error("{0}")]
    NotFound(String),

    #[error("{message}")]
    Domain {
        code: ErrorCode,
        message: String,
        details: Option<BTreeMap<String, Value>>,
    },

    #[error("{0}")]
    Unexpected(String),
}

impl HandlerError {
    /// Domain failure with an operation-specific `<OP>_FAILED` code.
    pub fn operation_failed(code: impl Into<String>, message: impl Into<String>) -> Self {
        HandlerError::Domain {
            code: ErrorCode::OperationFailed(code.into()),
            message: message.into(),
            details: None,
        }
    }

    /// Validation failure naming the offending parameter.
    pub fn invalid_param(param: &str, message: impl Into<String>) -> Self {
        HandlerError::Domain {
            code: ErrorCode::Validation,
            message: message.into(),
            details: Some(BTreeMap::from([(
                "parameter".to_string(),
                Value::String(param.to_string()),
            )])),
        }
    }

    /// The stable code for this failure, given the operation's default code
    /// for the `Unexpected` catch-all.
    pub fn error_code(&self, default_code: &str) -> ErrorCode {
        match self {
            HandlerError::Validation(_) => ErrorCode::Validation,
            HandlerError::MethodNotAllowed { .. } => ErrorCode::MethodNotAllowed,
            HandlerError::NotFound(_) => ErrorCode::NotFound,
            HandlerError::Domain { code, .. } => code.clone(),
            HandlerError::Unexpected(_) => ErrorCode::OperationFailed(default_code.to_string()),
        }
    }

    /// Render to the standard error envelope.
    pub fn to_envelope(&self, default_code: &str) -> Value {
        let code = self.error_code(default_code);
        let mut payload = ErrorPayload::new(code, self.to_string());
        if let HandlerError::Domain {
            details: Some(details),
            ..
        } = self
        {
            payload.details = Some(details.clone());
        }
        payload.to_value()
    }
}

/// Result alias used by every route handler.
pub type HandlerResult = std::result::Result<Value, HandlerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_map_to_documented_statuses() {
        assert_eq!(ErrorCode::Validation.http_status(), 400);
        assert_eq!(ErrorCode::Unauthorized.http_status(), 401);
        assert_eq!(ErrorCode::NotFound.http_status(), 404);
        assert_eq!(ErrorCode::MethodNotAllowed.http_status(), 405);
        assert_eq!(ErrorCode::RateLimited.http_status(), 429);
        assert_eq!(ErrorCode::Timeout.http_status(), 504);
        assert_eq!(
            ErrorCode::OperationFailed("SMOOTH_MOVE_FAILED".into()).http_status(),
            500
        );
    }

    #[test]
    fn wire_round_trip() {
        for code in [
            ErrorCode::Validation,
            ErrorCode::RateLimited,
            ErrorCode::Timeout,
            ErrorCode::OperationFailed("ARC_SHOT_FAILED".into()),
        ] {
            assert_eq!(ErrorCode::from_str_code(code.as_str()), code);
        }
    }

    #[test]
    fn handler_error_envelope_carries_details() {
        let err = HandlerError::invalid_param("start_position", "start_position is required");
        let envelope = err.to_envelope("SMOOTH_MOVE_FAILED");
        assert_eq!(envelope["success"], false);
        assert_eq!(envelope["error_code"], "VALIDATION_ERROR");
        assert_eq!(envelope["details"]["parameter"], "start_position");
        assert!(envelope["timestamp"].as_f64().unwrap() > 0.0);
    }

    #[test]
    fn unexpected_uses_default_operation_code() {
        let err = HandlerError::Unexpected("stage detached".into());
        let envelope = err.to_envelope("FRAME_OBJECT_FAILED");
        assert_eq!(envelope["error_code"], "FRAME_OBJECT_FAILED");
        assert_eq!(envelope["error"], "stage detached");
    }
}
