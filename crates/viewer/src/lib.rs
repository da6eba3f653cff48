//! WorldViewer camera extension.
//!
//! Drives the viewport camera over HTTP: direct pose control, object
//! framing, orbital repositioning, and queued cinematic shots. Camera
//! mutations run on the host's main thread via the dispatcher; cinematic
//! movements advance on the update tick through the shared engine.

pub mod camera;
pub mod extension;
pub mod openapi;
pub mod routes;
pub mod service;

pub use camera::CameraController;
pub use extension::WorldViewerExtension;
pub use service::WorldViewerService;
