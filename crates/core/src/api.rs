//! Extension capability interface.
//!
//! The HTTP pipeline talks to a hosted extension through [`ExtensionApi`].
//! Optional capabilities (health extras, metrics, security, OpenAPI) are
//! declared by overriding the `Option`-returning methods; the pipeline
//! never probes for them.

use crate::identity::ExtensionIdentity;
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Extension-specific fields merged into the `/health` response.
pub type HealthInfo = Map<String, Value>;

/// Why the security gate rejected a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecurityRejection {
    /// Sliding-window limit exceeded (429).
    RateLimited,
    /// Missing or invalid credentials (401), with a caller-facing reason.
    Unauthorized(String),
}

/// Request validation capability: rate limiting plus authentication in one
/// combined check, run before dispatch.
pub trait RequestGate: Send + Sync {
    fn validate_request(
        &self,
        headers: &HashMap<String, String>,
        client_ip: &str,
        method: &str,
        path: &str,
    ) -> Result<(), SecurityRejection>;
}

/// Metrics capability consumed by the HTTP pipeline.
pub trait MetricsSink: Send + Sync {
    fn increment_requests(&self);
    fn increment_errors(&self);
    fn increment_rate_limited(&self);
    fn increment_auth_failures(&self);
    fn increment_endpoint(&self, endpoint: &str);
    fn record_request_duration_ms(&self, duration_ms: f64);

    /// Flat JSON snapshot served by `/metrics.json`.
    fn json_snapshot(&self) -> Value;

    /// Text exposition served by `/metrics.prom`.
    fn prometheus_text(&self) -> String;
}

/// The aggregated integration point an extension hands to the HTTP server.
pub trait ExtensionApi: Send + Sync {
    /// Process-wide identity (name, versions, service name, port).
    fn identity(&self) -> &ExtensionIdentity;

    /// Extension-specific health extras merged into `/health`.
    fn health_info(&self) -> Option<HealthInfo> {
        None
    }

    /// Metrics registry, when the extension collects metrics.
    fn metrics(&self) -> Option<&dyn MetricsSink> {
        None
    }

    /// Security gate, when the extension enforces auth / rate limits.
    fn security(&self) -> Option<&dyn RequestGate> {
        None
    }

    /// OpenAPI document served by `/docs` and `/openapi.json`.
    fn openapi_document(&self) -> Option<Value> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct BareExtension {
        identity: ExtensionIdentity,
    }

    impl ExtensionApi for BareExtension {
        fn identity(&self) -> &ExtensionIdentity {
            &self.identity
        }
    }

    #[test]
    fn optional_capabilities_default_to_none() {
        let ext = BareExtension {
            identity: ExtensionIdentity::new("worldviewer", 8900),
        };
        assert!(ext.health_info().is_none());
        assert!(ext.metrics().is_none());
        assert!(ext.security().is_none());
        assert!(ext.openapi_document().is_none());
        assert_eq!(ext.identity().port, 8900);
    }
}
