//! Combined rate-limit + authentication gate.
//!
//! HMAC-SHA256 signatures over `"METHOD|PATH|TIMESTAMP"` are the primary
//! credential. Bearer tokens are accepted only when explicitly enabled and
//! log a warning on every use. Secrets resolve per extension with a global
//! fallback:
//!
//! - `AGENT_<EXT>_HMAC_SECRET` / `AGENT_EXT_HMAC_SECRET`
//! - `AGENT_<EXT>_AUTH_TOKEN` / `AGENT_EXT_AUTH_TOKEN`
//! - `AGENT_<EXT>_AUTH_ENABLED` / `AGENT_EXT_AUTH_ENABLED` (kill switch)
//! - `AGENT_<EXT>_BEARER_AUTH_ENABLED` / `AGENT_EXT_BEARER_AUTH_ENABLED`

use crate::limiter::RateLimiter;
use agentworld_core::{RequestGate, SecurityRejection};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::collections::HashMap;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{info, warn};

type HmacSha256 = Hmac<Sha256>;

/// Maximum clock skew accepted on `X-Timestamp`.
const MAX_TIMESTAMP_SKEW_SECS: f64 = 60.0;

/// Secrets and flags resolved for one extension.
///
/// `SecurityManager::for_extension` fills this from the environment; tests
/// inject values directly.
#[derive(Debug, Clone, Default)]
pub struct SecretConfig {
    /// HMAC secret; preferred credential when set.
    pub hmac_secret: Option<String>,
    /// Bearer token; only honored when `bearer_enabled`.
    pub bearer_token: Option<String>,
    /// Opt-in flag for Bearer authentication.
    pub bearer_enabled: bool,
    /// Master kill switch; `false` admits everything.
    pub auth_enabled: bool,
}

impl SecretConfig {
    /// Resolve from environment variables for `extension`.
    pub fn from_env(extension: &str) -> Self {
        let ext = extension.to_uppercase();
        Self {
            hmac_secret: env_scoped(&format!("AGENT_{ext}_HMAC_SECRET"), "AGENT_EXT_HMAC_SECRET"),
            bearer_token: env_scoped(&format!("AGENT_{ext}_AUTH_TOKEN"), "AGENT_EXT_AUTH_TOKEN"),
            bearer_enabled: env_flag_scoped(
                &format!("AGENT_{ext}_BEARER_AUTH_ENABLED"),
                "AGENT_EXT_BEARER_AUTH_ENABLED",
            )
            .unwrap_or(false),
            auth_enabled: env_flag_scoped(
                &format!("AGENT_{ext}_AUTH_ENABLED"),
                "AGENT_EXT_AUTH_ENABLED",
            )
            .unwrap_or(true),
        }
    }

    fn has_secrets(&self) -> bool {
        self.hmac_secret.is_some() || self.bearer_token.is_some()
    }
}

fn env_scoped(specific: &str, global: &str) -> Option<String> {
    std::env::var(specific)
        .ok()
        .filter(|v| !v.is_empty())
        .or_else(|| std::env::var(global).ok().filter(|v| !v.is_empty()))
}

fn env_flag_scoped(specific: &str, global: &str) -> Option<bool> {
    for name in [specific, global] {
        if let Ok(value) = std::env::var(name) {
            return Some(parse_flag(&value));
        }
    }
    None
}

fn parse_flag(value: &str) -> bool {
    !matches!(
        value.to_ascii_lowercase().as_str(),
        "0" | "false" | "no" | "off"
    )
}

/// Unified security manager for one extension.
pub struct SecurityManager {
    extension_name: String,
    secrets: SecretConfig,
    rate_limiter: RateLimiter,
}

impl SecurityManager {
    /// Build from environment configuration with default rate limits.
    pub fn for_extension(extension_name: &str) -> Self {
        let manager = Self::with_config(
            extension_name,
            SecretConfig::from_env(extension_name),
            RateLimiter::default(),
        );
        info!(extension = %extension_name, "SecurityManager initialized");
        manager
    }

    /// Build from explicit secrets and limiter (tests, embedded setups).
    pub fn with_config(
        extension_name: &str,
        secrets: SecretConfig,
        rate_limiter: RateLimiter,
    ) -> Self {
        Self {
            extension_name: extension_name.to_string(),
            secrets,
            rate_limiter,
        }
    }

    /// Whether authentication is enforced for this extension.
    pub fn auth_enforced(&self) -> bool {
        self.secrets.auth_enabled && self.secrets.has_secrets()
    }

    fn check_auth(
        &self,
        headers: &HashMap<String, String>,
        method: &str,
        path: &str,
    ) -> Result<(), SecurityRejection> {
        if !self.auth_enforced() {
            return Ok(());
        }

        let timestamp = header(headers, "X-Timestamp");
        let signature = header(headers, "X-Signature");

        // Primary credential: HMAC signature
        if let (Some(ts), Some(sig)) = (timestamp, signature) {
            if let Some(secret) = &self.secrets.hmac_secret {
                if verify_hmac_signature(secret, method, path, ts, sig, unix_now()) {
                    return Ok(());
                }
            }
            return Err(SecurityRejection::Unauthorized(
                "Invalid HMAC signature".into(),
            ));
        }

        // Secondary credential: Bearer token, only when explicitly enabled
        let auth_header = header(headers, "Authorization");
        if self.secrets.bearer_enabled {
            if let Some(value) = auth_header {
                if let Some(provided) = value.strip_prefix("Bearer ") {
                    if let Some(expected) = &self.secrets.bearer_token {
                        if constant_time_eq(provided.as_bytes(), expected.as_bytes()) {
                            warn!(
                                extension = %self.extension_name,
                                "Bearer token authentication used - consider HMAC for production"
                            );
                            return Ok(());
                        }
                    }
                    return Err(SecurityRejection::Unauthorized(
                        "Invalid Bearer token".into(),
                    ));
                }
            }
        }

        // No valid credential; pick the most helpful message
        let message = if timestamp.is_some() || signature.is_some() {
            "Invalid HMAC signature - check timestamp and signature calculation"
        } else if auth_header.is_some() {
            if self.secrets.bearer_enabled {
                "Invalid Bearer token"
            } else {
                "Bearer authentication disabled - use HMAC signature authentication"
            }
        } else {
            "Missing authentication - provide X-Timestamp and X-Signature headers for HMAC auth"
        };
        Err(SecurityRejection::Unauthorized(message.into()))
    }
}

impl RequestGate for SecurityManager {
    /// Validate a complete request: rate limiting first, then authentication.
    fn validate_request(
        &self,
        headers: &HashMap<String, String>,
        client_ip: &str,
        method: &str,
        path: &str,
    ) -> Result<(), SecurityRejection> {
        if !self.rate_limiter.is_allowed(client_ip) {
            return Err(SecurityRejection::RateLimited);
        }
        self.check_auth(headers, method, path)
    }
}

fn header<'a>(headers: &'a HashMap<String, String>, name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

fn unix_now() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_secs_f64()
}

/// Verify a hex HMAC-SHA256 signature over `"METHOD|PATH|TIMESTAMP"`.
///
/// Comparison is constant-time via `Mac::verify_slice`. The timestamp must
/// be within 60 seconds of `now`.
fn verify_hmac_signature(
    secret: &str,
    method: &str,
    path: &str,
    timestamp: &str,
    signature: &str,
    now: f64,
) -> bool {
    let Ok(ts) = timestamp.parse::<f64>() else {
        return false;
    };
    if (now - ts).abs() > MAX_TIMESTAMP_SKEW_SECS {
        return false;
    }

    let Ok(provided) = hex::decode(signature) else {
        return false;
    };
    let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => return false,
    };
    mac.update(format!("{method}|{path}|{timestamp}").as_bytes());
    mac.verify_slice(&provided).is_ok()
}

/// Produce `(timestamp, signature)` headers for a request, the client side
/// of [`verify_hmac_signature`], also used by the CLI signing helper.
pub fn sign_request(secret: &str, method: &str, path: &str) -> (String, String) {
    let timestamp = format!("{}", unix_now() as u64);
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .unwrap_or_else(|_| unreachable!("HMAC accepts any key length"));
    mac.update(format!("{method}|{path}|{timestamp}").as_bytes());
    let signature = hex::encode(mac.finalize().into_bytes());
    (timestamp, signature)
}

/// Constant-time byte comparison for Bearer tokens.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn hmac_manager(secret: &str) -> SecurityManager {
        SecurityManager::with_config(
            "worldviewer",
            SecretConfig {
                hmac_secret: Some(secret.into()),
                bearer_token: None,
                bearer_enabled: false,
                auth_enabled: true,
            },
            RateLimiter::default(),
        )
    }

    fn headers(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn hmac_happy_path() {
        let manager = hmac_manager("abc");
        let (ts, sig) = sign_request("abc", "GET", "/health");
        let headers = headers(&[("X-Timestamp", &ts), ("X-Signature", &sig)]);
        assert!(manager
            .validate_request(&headers, "127.0.0.1", "GET", "/health")
            .is_ok());
    }

    #[test]
    fn hmac_rejects_stale_timestamp() {
        let manager = hmac_manager("abc");
        let stale = format!("{}", unix_now() as u64 - 120);
        let mut mac = HmacSha256::new_from_slice(b"abc").unwrap();
        mac.update(format!("GET|/health|{stale}").as_bytes());
        let sig = hex::encode(mac.finalize().into_bytes());
        let headers = headers(&[("X-Timestamp", &stale), ("X-Signature", &sig)]);
        let err = manager
            .validate_request(&headers, "127.0.0.1", "GET", "/health")
            .unwrap_err();
        assert_eq!(
            err,
            SecurityRejection::Unauthorized("Invalid HMAC signature".into())
        );
    }

    #[test]
    fn hmac_rejects_every_bit_flip() {
        let now = unix_now();
        let ts = format!("{}", now as u64);
        let mut mac = HmacSha256::new_from_slice(b"abc").unwrap();
        mac.update(format!("GET|/health|{ts}").as_bytes());
        let good = hex::encode(mac.finalize().into_bytes());
        assert!(verify_hmac_signature("abc", "GET", "/health", &ts, &good, now));

        let bytes = hex::decode(&good).unwrap();
        for i in 0..bytes.len() {
            for bit in 0..8 {
                let mut mutated = bytes.clone();
                mutated[i] ^= 1 << bit;
                let sig = hex::encode(&mutated);
                assert!(
                    !verify_hmac_signature("abc", "GET", "/health", &ts, &sig, now),
                    "bit flip at byte {i} bit {bit} accepted"
                );
            }
        }
    }

    #[test]
    fn hmac_rejects_wrong_path() {
        let manager = hmac_manager("abc");
        let (ts, sig) = sign_request("abc", "GET", "/health");
        let headers = headers(&[("X-Timestamp", &ts), ("X-Signature", &sig)]);
        assert!(manager
            .validate_request(&headers, "127.0.0.1", "GET", "/metrics")
            .is_err());
    }

    #[test]
    fn missing_credentials_guidance() {
        let manager = hmac_manager("abc");
        let err = manager
            .validate_request(&HashMap::new(), "127.0.0.1", "GET", "/health")
            .unwrap_err();
        match err {
            SecurityRejection::Unauthorized(message) => {
                assert!(message.contains("X-Timestamp"));
            }
            other => panic!("expected unauthorized, got {other:?}"),
        }
    }

    #[test]
    fn bearer_disabled_by_default() {
        let manager = SecurityManager::with_config(
            "worldviewer",
            SecretConfig {
                hmac_secret: None,
                bearer_token: Some("token123".into()),
                bearer_enabled: false,
                auth_enabled: true,
            },
            RateLimiter::default(),
        );
        let headers = headers(&[("Authorization", "Bearer token123")]);
        let err = manager
            .validate_request(&headers, "127.0.0.1", "GET", "/health")
            .unwrap_err();
        assert_eq!(
            err,
            SecurityRejection::Unauthorized(
                "Bearer authentication disabled - use HMAC signature authentication".into()
            )
        );
    }

    #[test]
    fn bearer_opt_in_accepts_exact_token() {
        let manager = SecurityManager::with_config(
            "worldviewer",
            SecretConfig {
                hmac_secret: None,
                bearer_token: Some("token123".into()),
                bearer_enabled: true,
                auth_enabled: true,
            },
            RateLimiter::default(),
        );
        let good = headers(&[("Authorization", "Bearer token123")]);
        assert!(manager
            .validate_request(&good, "127.0.0.1", "GET", "/health")
            .is_ok());

        let bad = headers(&[("Authorization", "Bearer token124")]);
        assert_eq!(
            manager
                .validate_request(&bad, "127.0.0.1", "GET", "/health")
                .unwrap_err(),
            SecurityRejection::Unauthorized("Invalid Bearer token".into())
        );
    }

    #[test]
    fn auth_disabled_admits_everything() {
        let manager = SecurityManager::with_config(
            "worldviewer",
            SecretConfig {
                hmac_secret: Some("abc".into()),
                bearer_token: None,
                bearer_enabled: false,
                auth_enabled: false,
            },
            RateLimiter::default(),
        );
        assert!(manager
            .validate_request(&HashMap::new(), "127.0.0.1", "GET", "/health")
            .is_ok());
    }

    #[test]
    fn no_secrets_admits_everything() {
        let manager = SecurityManager::with_config(
            "worldviewer",
            SecretConfig {
                auth_enabled: true,
                ..SecretConfig::default()
            },
            RateLimiter::default(),
        );
        assert!(manager
            .validate_request(&HashMap::new(), "127.0.0.1", "GET", "/health")
            .is_ok());
    }

    #[test]
    fn rate_limit_precedes_auth() {
        let manager = SecurityManager::with_config(
            "worldviewer",
            SecretConfig {
                hmac_secret: Some("abc".into()),
                auth_enabled: true,
                ..SecretConfig::default()
            },
            RateLimiter::new(2, Duration::from_secs(60)),
        );
        let (ts, sig) = sign_request("abc", "GET", "/health");
        let headers = headers(&[("X-Timestamp", &ts), ("X-Signature", &sig)]);
        assert!(manager
            .validate_request(&headers, "10.0.0.1", "GET", "/health")
            .is_ok());
        assert!(manager
            .validate_request(&headers, "10.0.0.1", "GET", "/health")
            .is_ok());
        assert_eq!(
            manager
                .validate_request(&headers, "10.0.0.1", "GET", "/health")
                .unwrap_err(),
            SecurityRejection::RateLimited
        );
    }

    #[test]
    fn flag_parsing_matches_contract() {
        for off in ["0", "false", "no", "off", "False", "OFF"] {
            assert!(!parse_flag(off));
        }
        for on in ["1", "true", "yes", "on", "anything"] {
            assert!(parse_flag(on));
        }
    }
}
