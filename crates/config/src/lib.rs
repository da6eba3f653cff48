//! Configuration loading for AgentWorld extensions.
//!
//! Two JSON documents are read at startup: `agent-world-http.json` (CORS
//! values, security headers, response formatting, error messages) and
//! `agent-world-versions.json` (per-extension version, api_version, and
//! service name plus a default version). Missing or invalid files fall back
//! to documented defaults with a warning. Version lookups honor environment
//! overrides so CI can pin what `/health` reports.

use agentworld_core::identity::default_service_name;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

// ── HTTP configuration ──────────────────────────────────────────────────────

/// CORS header values sent on preflight and regular responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    #[serde(default = "default_allow_origin")]
    pub access_control_allow_origin: String,

    #[serde(default = "default_allow_methods")]
    pub access_control_allow_methods: String,

    #[serde(default = "default_allow_headers")]
    pub access_control_allow_headers: String,

    #[serde(default = "default_max_age")]
    pub access_control_max_age: String,

    #[serde(default = "default_vary")]
    pub vary_header: String,
}

fn default_allow_origin() -> String {
    "*".into()
}
fn default_allow_methods() -> String {
    "GET, POST, OPTIONS".into()
}
fn default_allow_headers() -> String {
    "Content-Type, Authorization, X-Timestamp, X-Signature".into()
}
fn default_max_age() -> String {
    "86400".into()
}
fn default_vary() -> String {
    "Origin".into()
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            access_control_allow_origin: default_allow_origin(),
            access_control_allow_methods: default_allow_methods(),
            access_control_allow_headers: default_allow_headers(),
            access_control_max_age: default_max_age(),
            vary_header: default_vary(),
        }
    }
}

/// Security headers attached to every response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityHeadersConfig {
    #[serde(default = "default_csp")]
    pub content_security_policy: String,

    #[serde(default = "default_content_type_options")]
    pub x_content_type_options: String,

    #[serde(default = "default_frame_options")]
    pub x_frame_options: String,

    #[serde(default = "default_xss_protection")]
    pub x_xss_protection: String,

    #[serde(default = "default_referrer_policy")]
    pub referrer_policy: String,

    #[serde(default = "default_permissions_policy")]
    pub permissions_policy: String,

    /// HSTS is only sent when explicitly enabled.
    #[serde(default)]
    pub enable_hsts: bool,

    #[serde(default = "default_hsts_max_age")]
    pub hsts_max_age: String,
}

fn default_csp() -> String {
    "default-src 'self'; script-src 'none'; object-src 'none'; \
     style-src 'self' 'unsafe-inline'; img-src 'self' data:; \
     connect-src 'self'; font-src 'self'; media-src 'none'; \
     frame-src 'none'; form-action 'self'"
        .into()
}
fn default_content_type_options() -> String {
    "nosniff".into()
}
fn default_frame_options() -> String {
    "DENY".into()
}
fn default_xss_protection() -> String {
    "1; mode=block".into()
}
fn default_referrer_policy() -> String {
    "strict-origin-when-cross-origin".into()
}
fn default_permissions_policy() -> String {
    "geolocation=(), microphone=(), camera=(), payment=(), usb=(), \
     magnetometer=(), gyroscope=()"
        .into()
}
fn default_hsts_max_age() -> String {
    "max-age=31536000; includeSubDomains".into()
}

impl Default for SecurityHeadersConfig {
    fn default() -> Self {
        Self {
            content_security_policy: default_csp(),
            x_content_type_options: default_content_type_options(),
            x_frame_options: default_frame_options(),
            x_xss_protection: default_xss_protection(),
            referrer_policy: default_referrer_policy(),
            permissions_policy: default_permissions_policy(),
            enable_hsts: false,
            hsts_max_age: default_hsts_max_age(),
        }
    }
}

/// JSON response formatting knobs.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ResponseFormatConfig {
    /// Pretty-print indent; `None` means compact separators.
    #[serde(default)]
    pub json_indent: Option<u8>,
}

/// Caller-facing error message overrides.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorHandlingConfig {
    #[serde(default = "default_not_found_message")]
    pub not_found_message: String,
}

fn default_not_found_message() -> String {
    "Unknown endpoint".into()
}

impl Default for ErrorHandlingConfig {
    fn default() -> Self {
        Self {
            not_found_message: default_not_found_message(),
        }
    }
}

/// Root HTTP configuration document (`agent-world-http.json`).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct HttpConfig {
    #[serde(default)]
    pub cors_headers: CorsConfig,

    #[serde(default)]
    pub security_headers: SecurityHeadersConfig,

    #[serde(default)]
    pub response_formats: ResponseFormatConfig,

    #[serde(default)]
    pub error_handling: ErrorHandlingConfig,

    /// Emit one structured JSON log line per request.
    #[serde(default)]
    pub json_logging: bool,
}

impl HttpConfig {
    /// Load from a file, falling back to defaults when the file is missing
    /// or malformed.
    pub fn load_from(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(config) => config,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Invalid HTTP config, using defaults");
                    Self::default()
                }
            },
            Err(_) => {
                tracing::info!(path = %path.display(), "No HTTP config file, using defaults");
                Self::default()
            }
        }
    }
}

// ── Version configuration ───────────────────────────────────────────────────

/// Per-extension entry in `agent-world-versions.json`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ExtensionVersionEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_name: Option<String>,
}

/// Root versions document (`agent-world-versions.json`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionConfig {
    #[serde(default = "default_version")]
    pub default_version: String,

    #[serde(default = "default_suite_version")]
    pub suite_version: String,

    #[serde(default)]
    pub extensions: HashMap<String, ExtensionVersionEntry>,
}

fn default_version() -> String {
    "0.1.0".into()
}
fn default_suite_version() -> String {
    "1.0.0-alpha".into()
}

impl Default for VersionConfig {
    fn default() -> Self {
        Self {
            default_version: default_version(),
            suite_version: default_suite_version(),
            extensions: HashMap::new(),
        }
    }
}

impl VersionConfig {
    /// Load from a file, falling back to defaults when the file is missing
    /// or malformed.
    pub fn load_from(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(config) => config,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Invalid version config, using defaults");
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        }
    }

    /// Extension version with environment overrides.
    ///
    /// `AGENT_WORLD_<EXT>_VERSION` wins over `AGENT_WORLD_VERSION`, which
    /// wins over the config file, which wins over `default_version`.
    pub fn version(&self, extension: &str) -> String {
        if let Ok(v) = std::env::var(format!("AGENT_WORLD_{}_VERSION", extension.to_uppercase())) {
            return v;
        }
        if let Ok(v) = std::env::var("AGENT_WORLD_VERSION") {
            return v;
        }
        self.extensions
            .get(extension)
            .and_then(|e| e.version.clone())
            .unwrap_or_else(|| self.default_version.clone())
    }

    /// API version reported by `/health`, with the same override chain.
    pub fn api_version(&self, extension: &str) -> String {
        if let Ok(v) = std::env::var(format!("AGENT_WORLD_{}_VERSION", extension.to_uppercase())) {
            return v;
        }
        if let Ok(v) = std::env::var("AGENT_WORLD_VERSION") {
            return v;
        }
        self.extensions
            .get(extension)
            .and_then(|e| e.api_version.clone())
            .unwrap_or_else(|| self.default_version.clone())
    }

    /// Service name with `AGENT_WORLD_<EXT>_SERVICE` override.
    pub fn service_name(&self, extension: &str) -> String {
        if let Ok(v) = std::env::var(format!("AGENT_WORLD_{}_SERVICE", extension.to_uppercase())) {
            return v;
        }
        self.extensions
            .get(extension)
            .and_then(|e| e.service_name.clone())
            .unwrap_or_else(|| default_service_name(extension))
    }
}

// ── .env discovery ──────────────────────────────────────────────────────────

/// Maximum number of parent directories searched for a project `.env`.
const ENV_SEARCH_DEPTH: usize = 10;

/// Walk up from `start` looking for a directory that carries both a `.env`
/// file and a project marker (`Cargo.toml`), then load it. Existing
/// environment variables are never overwritten.
pub fn load_dotenv_from(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();
    for _ in 0..ENV_SEARCH_DEPTH {
        let env_file = current.join(".env");
        if env_file.is_file() && current.join("Cargo.toml").is_file() {
            load_env_file(&env_file);
            tracing::debug!(path = %env_file.display(), "Loaded .env file");
            return Some(env_file);
        }
        if !current.pop() {
            break;
        }
    }
    None
}

/// Discover and load the project `.env` starting from the current directory.
pub fn load_dotenv() -> Option<PathBuf> {
    let cwd = std::env::current_dir().ok()?;
    load_dotenv_from(&cwd)
}

fn load_env_file(path: &Path) {
    let Ok(content) = std::fs::read_to_string(path) else {
        tracing::warn!(path = %path.display(), "Could not read .env file");
        return;
    };
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let key = key.trim();
        if key.is_empty() || std::env::var_os(key).is_some() {
            continue;
        }
        std::env::set_var(key, value.trim());
    }
}
