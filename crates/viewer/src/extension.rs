//! WorldViewer extension assembly.
//!
//! Wires the camera controller, cinematic engine, dispatcher, tracker,
//! metrics, and security manager into one [`ExtensionApi`] implementation
//! and owns the update-tick wiring.

use crate::camera::CameraController;
use crate::openapi::build_openapi_document;
use crate::routes::route_table;
use crate::service::WorldViewerService;
use agentworld_cinematic::CinematicEngine;
use agentworld_core::{
    ExtensionApi, ExtensionIdentity, HealthInfo, MetricsSink, RequestGate,
};
use agentworld_dispatch::{HostTicker, MainThreadDispatcher, RequestTracker};
use agentworld_metrics::ExtensionMetrics;
use agentworld_security::SecurityManager;
use agentworld_server::RouteTable;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Ticks between request-tracker prune passes.
const PRUNE_EVERY_TICKS: u64 = 64;

/// The WorldViewer extension: camera control plus cinematic shot queue.
pub struct WorldViewerExtension {
    identity: ExtensionIdentity,
    camera: Arc<CameraController>,
    engine: Arc<CinematicEngine>,
    dispatcher: Arc<MainThreadDispatcher>,
    tracker: Arc<RequestTracker>,
    metrics: Arc<ExtensionMetrics>,
    security: SecurityManager,
    service: Arc<WorldViewerService>,
}

impl WorldViewerExtension {
    /// Build the extension with environment-derived security settings.
    pub fn new(identity: ExtensionIdentity) -> Arc<Self> {
        let security = SecurityManager::for_extension(&identity.name);
        Self::with_security(identity, security)
    }

    /// Build with an explicit security manager (tests, embedded setups).
    pub fn with_security(identity: ExtensionIdentity, security: SecurityManager) -> Arc<Self> {
        let camera = Arc::new(CameraController::new());
        let apply_camera = camera.clone();
        let engine = Arc::new(CinematicEngine::new(
            Box::new(move |position, target| {
                apply_camera.set_position(position, Some(target), None);
            }),
            camera.clone(),
        ));
        let dispatcher = Arc::new(MainThreadDispatcher::new());
        let tracker = Arc::new(RequestTracker::default());
        let metrics = Arc::new(ExtensionMetrics::new(&identity.name));
        let service = Arc::new(WorldViewerService::new(
            camera.clone(),
            engine.clone(),
            dispatcher.clone(),
            tracker.clone(),
            metrics.clone(),
        ));

        info!(extension = %identity.name, port = identity.port, "WorldViewer extension assembled");
        Arc::new(Self {
            identity,
            camera,
            engine,
            dispatcher,
            tracker,
            metrics,
            security,
            service,
        })
    }

    /// The extension's HTTP route table.
    pub fn routes(&self) -> RouteTable {
        route_table(self.service.clone())
    }

    /// Start the host update tick: drain main-thread tasks first, then
    /// advance the cinematic engine, pruning the tracker periodically.
    pub fn start_ticker(&self, interval: Duration) -> HostTicker {
        self.dispatcher.attach();
        self.metrics.start_server();

        let dispatcher = self.dispatcher.clone();
        let engine = self.engine.clone();
        let tracker = self.tracker.clone();
        let mut tick_count: u64 = 0;

        HostTicker::start(interval, move |now| {
            dispatcher.drain();
            engine.tick(now);
            tick_count = tick_count.wrapping_add(1);
            if tick_count % PRUNE_EVERY_TICKS == 0 {
                tracker.prune();
            }
        })
    }

    /// Release waiters and mark the server stopped.
    pub fn shutdown(&self) {
        self.dispatcher.shutdown();
        self.metrics.stop_server();
        info!(extension = %self.identity.name, "WorldViewer extension shut down");
    }

    pub fn camera(&self) -> &Arc<CameraController> {
        &self.camera
    }

    pub fn engine(&self) -> &Arc<CinematicEngine> {
        &self.engine
    }

    pub fn dispatcher(&self) -> &Arc<MainThreadDispatcher> {
        &self.dispatcher
    }
}

impl ExtensionApi for WorldViewerExtension {
    fn identity(&self) -> &ExtensionIdentity {
        &self.identity
    }

    fn health_info(&self) -> Option<HealthInfo> {
        let mut extras = HealthInfo::new();
        let (position, _) = self.camera.pose();
        extras.insert("camera_position".into(), serde_json::json!(position));
        extras.insert(
            "queue_state".into(),
            serde_json::json!(self.engine.status(std::time::Instant::now()).queue_state),
        );
        Some(extras)
    }

    fn metrics(&self) -> Option<&dyn MetricsSink> {
        Some(self.metrics.as_ref())
    }

    fn security(&self) -> Option<&dyn RequestGate> {
        Some(&self.security)
    }

    fn openapi_document(&self) -> Option<Value> {
        Some(build_openapi_document(&self.identity))
    }
}
