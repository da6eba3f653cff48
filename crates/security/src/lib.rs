//! Request security for AgentWorld extensions.
//!
//! Every request passes one combined check before dispatch: rate limiting
//! first, then authentication. HMAC-SHA256 signatures are the default
//! credential; Bearer tokens are an explicit opt-in for development setups.
//! Rate-limit state is per-manager and never shared across extensions.

pub mod limiter;
pub mod manager;

pub use limiter::RateLimiter;
pub use manager::{sign_request, SecretConfig, SecurityManager};
