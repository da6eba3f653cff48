//! # AgentWorld Core
//!
//! Domain types, traits, and error definitions for the AgentWorld extension
//! control plane. This crate has **zero framework dependencies**; it defines
//! the contracts that every hosted extension implements against.
//!
//! ## Design Philosophy
//!
//! Extensions plug into the shared HTTP pipeline through the [`ExtensionApi`]
//! capability interface defined here. Optional capabilities (health extras,
//! metrics, security) are declared explicitly via `Option`-returning methods,
//! never probed at runtime. All other crates depend inward on core.

pub mod api;
pub mod envelope;
pub mod error;
pub mod identity;

// Re-export key types at crate root for ergonomics
pub use api::{ExtensionApi, HealthInfo, MetricsSink, RequestGate, SecurityRejection};
pub use envelope::{
    error_envelope, normalize_transport_response, success_envelope, RequestData, ResponsePayload,
    CONTENT_TYPE_FIELD, RAW_TEXT_FIELD,
};
pub use error::{ErrorCode, ErrorPayload, HandlerError, HandlerResult};
pub use identity::ExtensionIdentity;
