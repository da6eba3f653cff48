//! Extension identity: stable name, versions, service name, and port.
//!
//! Identity is resolved once at startup (from the version config plus
//! environment overrides) and is read-only afterwards.

use serde::{Deserialize, Serialize};

/// Process-wide identity of a hosted extension.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExtensionIdentity {
    /// Stable extension name, e.g. `worldviewer`.
    pub name: String,

    /// Semantic version of the extension itself.
    pub version: String,

    /// Version of the HTTP API surface (reported by `/health`).
    pub api_version: String,

    /// Human-readable service name, e.g. `Agent WorldViewer API`.
    pub service_name: String,

    /// HTTP port the extension listens on.
    pub port: u16,
}

impl ExtensionIdentity {
    /// Build an identity with derived defaults for versions and service name.
    pub fn new(name: impl Into<String>, port: u16) -> Self {
        let name = name.into();
        let service_name = default_service_name(&name);
        Self {
            name,
            version: "0.1.0".into(),
            api_version: "0.1.0".into(),
            service_name,
            port,
        }
    }

    /// Base URL clients should use to reach this extension.
    pub fn base_url(&self) -> String {
        format!("http://localhost:{}", self.port)
    }

    /// Realm string used in `WWW-Authenticate` challenges.
    pub fn auth_realm(&self) -> String {
        format!("isaac-sim-{}", self.name)
    }
}

/// Default service name when the version config has no entry.
pub fn default_service_name(extension: &str) -> String {
    let mut chars = extension.chars();
    let titled = match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    };
    format!("Agent {titled} API")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_service_name_and_realm() {
        let identity = ExtensionIdentity::new("worldviewer", 8900);
        assert_eq!(identity.service_name, "Agent Worldviewer API");
        assert_eq!(identity.auth_realm(), "isaac-sim-worldviewer");
        assert_eq!(identity.base_url(), "http://localhost:8900");
    }

    #[test]
    fn identity_round_trips_through_json() {
        let identity = ExtensionIdentity {
            name: "worldrecorder".into(),
            version: "1.2.0".into(),
            api_version: "1.0.0".into(),
            service_name: "Agent WorldRecorder API".into(),
            port: 8892,
        };
        let json = serde_json::to_string(&identity).unwrap();
        let parsed: ExtensionIdentity = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, identity);
    }
}
