//! WorldViewer service layer.
//!
//! Bridges HTTP worker tasks to the main thread. Read-only queries answer
//! directly; camera mutations are fire-and-forget main-thread submissions
//! tracked by request id; `stop_movement` blocks on the dispatcher with a
//! deadline. Cinematic shots go through the shared engine's queue.

use crate::camera::CameraController;
use agentworld_cinematic::{CinematicEngine, CinematicError, QueueState, Vec3};
use agentworld_core::{ErrorCode, HandlerError, HandlerResult, RequestData};
use agentworld_dispatch::{MainThreadDispatcher, RequestTracker};
use agentworld_metrics::ExtensionMetrics;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Deadline for blocking main-thread operations.
const MAIN_THREAD_TIMEOUT: Duration = Duration::from_secs(5);

pub struct WorldViewerService {
    camera: Arc<CameraController>,
    engine: Arc<CinematicEngine>,
    dispatcher: Arc<MainThreadDispatcher>,
    tracker: Arc<RequestTracker>,
    metrics: Arc<ExtensionMetrics>,
}

#[derive(Debug, Deserialize)]
struct SetPositionPayload {
    position: Vec3,
    #[serde(default)]
    target: Option<Vec3>,
    #[serde(default)]
    up_vector: Option<Vec3>,
}

#[derive(Debug, Deserialize)]
struct FrameObjectPayload {
    object_path: String,
    #[serde(default)]
    distance: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct OrbitPayload {
    center: Vec3,
    distance: f64,
    #[serde(default)]
    elevation: Option<f64>,
    #[serde(default)]
    azimuth: Option<f64>,
}

impl WorldViewerService {
    pub fn new(
        camera: Arc<CameraController>,
        engine: Arc<CinematicEngine>,
        dispatcher: Arc<MainThreadDispatcher>,
        tracker: Arc<RequestTracker>,
        metrics: Arc<ExtensionMetrics>,
    ) -> Self {
        Self {
            camera,
            engine,
            dispatcher,
            tracker,
            metrics,
        }
    }

    // ── Direct reads ────────────────────────────────────────────────────

    pub fn camera_status(&self) -> HandlerResult {
        Ok(self.camera.status())
    }

    pub fn asset_transform(&self, data: RequestData) -> HandlerResult {
        let object_path = require_str(&data, "object_path")?;
        Ok(self.camera.asset_transform(&object_path))
    }

    pub fn request_status(&self, data: RequestData) -> HandlerResult {
        let request_id = require_str(&data, "request_id")?;
        Ok(self.tracker.get(&request_id))
    }

    pub fn movement_status(&self, data: RequestData) -> HandlerResult {
        let movement_id = require_str(&data, "movement_id")?;
        self.engine
            .movement_status(&movement_id, Instant::now())
            .map_err(cinematic_error)
    }

    pub fn shot_queue_status(&self) -> HandlerResult {
        let status = self.engine.status(Instant::now());
        let mut value = serde_json::to_value(status)
            .map_err(|e| HandlerError::Unexpected(e.to_string()))?;
        if let Value::Object(map) = &mut value {
            map.insert("success".into(), Value::Bool(true));
        }
        Ok(value)
    }

    // ── Tracked main-thread mutations ───────────────────────────────────

    pub fn set_camera_position(&self, data: RequestData) -> HandlerResult {
        let payload: SetPositionPayload = parse_payload(data)?;
        self.submit_tracked("set_position", move |camera| {
            camera.set_position(payload.position, payload.target, payload.up_vector)
        })
    }

    pub fn frame_object(&self, data: RequestData) -> HandlerResult {
        let payload: FrameObjectPayload = parse_payload(data)?;
        self.submit_tracked("frame_object", move |camera| {
            camera.frame_object(&payload.object_path, payload.distance)
        })
    }

    pub fn orbit_camera(&self, data: RequestData) -> HandlerResult {
        let payload: OrbitPayload = parse_payload(data)?;
        if payload.distance <= 0.0 {
            return Err(HandlerError::invalid_param(
                "distance",
                "distance must be positive",
            ));
        }
        self.submit_tracked("orbit_camera", move |camera| {
            camera.orbit(
                payload.center,
                payload.distance,
                payload.elevation.unwrap_or(15.0),
                payload.azimuth.unwrap_or(0.0),
            )
        })
    }

    /// Queue a camera operation for the next tick and return its request id
    /// immediately; the tracker records the outcome.
    fn submit_tracked<F>(&self, operation: &str, task: F) -> HandlerResult
    where
        F: FnOnce(&CameraController) -> Value + Send + 'static,
    {
        let request_id = Uuid::new_v4().to_string();
        self.tracker.add(&request_id, operation, Value::Null);

        let camera = self.camera.clone();
        let tracker = self.tracker.clone();
        let tracked_id = request_id.clone();
        let submitted = self.dispatcher.submit(Box::new(move || {
            let result = task(&camera);
            let outcome = if result.get("success").and_then(Value::as_bool) == Some(false) {
                Err(result
                    .get("error")
                    .and_then(Value::as_str)
                    .unwrap_or("operation failed")
                    .to_string())
            } else {
                Ok(result.clone())
            };
            tracker.mark_completed(&tracked_id, outcome);
            result
        }));

        if !submitted {
            return Err(HandlerError::Domain {
                code: ErrorCode::CameraUnavailable,
                message: "Main-thread dispatcher unavailable".into(),
                details: None,
            });
        }

        self.metrics.increment_event("camera_operations_queued");
        Ok(json!({
            "success": true,
            "request_id": request_id,
            "operation": operation,
            "status": "queued",
        }))
    }

    // ── Cinematic shots ─────────────────────────────────────────────────

    /// Queue a cinematic shot. The queue auto-starts when idle or stopped;
    /// a paused queue holds new shots until played.
    pub fn queue_shot(&self, operation: &str, data: RequestData) -> HandlerResult {
        let movement_id = format!("{operation}_{}", &Uuid::new_v4().simple().to_string()[..8]);
        let position = self
            .engine
            .add_movement(&movement_id, operation, Value::Object(data))
            .map_err(cinematic_error)?;

        if matches!(self.engine.state(), QueueState::Idle | QueueState::Stopped) {
            let _ = self.engine.play();
        }
        self.metrics.increment_event("movements_queued");

        Ok(json!({
            "success": true,
            "movement_id": movement_id,
            "operation": operation,
            "position": position,
            "status": "queued",
        }))
    }

    /// Stop the active movement on the main thread, waiting for the result.
    pub async fn stop_movement(&self) -> HandlerResult {
        let engine = self.engine.clone();
        let result = self
            .dispatcher
            .run_on_main(
                Box::new(move || {
                    let stopped = engine.stop_movement();
                    json!({
                        "success": true,
                        "stopped_movement": stopped,
                    })
                }),
                MAIN_THREAD_TIMEOUT,
            )
            .await;
        Ok(result)
    }

    // ── Queue controls ──────────────────────────────────────────────────

    pub fn queue_play(&self) -> HandlerResult {
        self.engine.play().map_err(cinematic_error)
    }

    pub fn queue_pause(&self) -> HandlerResult {
        self.engine.pause().map_err(cinematic_error)
    }

    pub fn queue_stop(&self) -> HandlerResult {
        let summary = self.engine.stop();
        Ok(json!({
            "success": true,
            "message": format!(
                "Queue stopped and cleared ({} movements removed)",
                summary.cleared_queue_size
            ),
            "cleared_active_movement": summary.cleared_active_movement,
            "cleared_queue_size": summary.cleared_queue_size,
            "queue_state": "stopped",
        }))
    }
}

fn parse_payload<T: serde::de::DeserializeOwned>(data: RequestData) -> Result<T, HandlerError> {
    serde_json::from_value(Value::Object(data))
        .map_err(|e| HandlerError::Validation(format!("invalid parameters: {e}")))
}

fn require_str(data: &RequestData, key: &str) -> Result<String, HandlerError> {
    data.get(key)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| HandlerError::invalid_param(key, format!("{key} is required")))
}

fn cinematic_error(err: CinematicError) -> HandlerError {
    match err {
        CinematicError::Validation(message) => HandlerError::Validation(message),
        CinematicError::UnknownOperation(op) => {
            HandlerError::Validation(format!("Unknown operation: {op}"))
        }
        CinematicError::QueueFull { max } => HandlerError::Domain {
            code: ErrorCode::Validation,
            message: format!("Queue is full (max {max} movements)"),
            details: None,
        },
        CinematicError::MovementNotFound(id) => {
            HandlerError::NotFound(format!("Movement not found: {id}"))
        }
        CinematicError::MovementActive(id) => HandlerError::Validation(format!(
            "Cannot remove active movement: {id}. Use stop_movement instead."
        )),
        CinematicError::InvalidTransition { from, to } => HandlerError::Domain {
            code: ErrorCode::QueueUnavailable,
            message: format!("Invalid queue state transition: {from} -> {to}"),
            details: None,
        },
        CinematicError::QueueEmpty => {
            HandlerError::Validation("No movements in queue to start".into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentworld_cinematic::NullScene;
    use serde_json::Map;

    fn service() -> (WorldViewerService, Arc<MainThreadDispatcher>, Arc<CameraController>) {
        let camera = Arc::new(CameraController::new());
        let apply_camera = camera.clone();
        let engine = Arc::new(CinematicEngine::new(
            Box::new(move |position, target| {
                apply_camera.set_position(position, Some(target), None);
            }),
            Arc::new(NullScene),
        ));
        let dispatcher = Arc::new(MainThreadDispatcher::new());
        dispatcher.attach();
        let tracker = Arc::new(RequestTracker::default());
        let metrics = Arc::new(ExtensionMetrics::new("worldviewer"));
        let svc = WorldViewerService::new(
            camera.clone(),
            engine,
            dispatcher.clone(),
            tracker,
            metrics,
        );
        (svc, dispatcher, camera)
    }

    fn data(json: Value) -> RequestData {
        match json {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }

    #[test]
    fn set_position_is_tracked_and_applied_on_drain() {
        let (svc, dispatcher, camera) = service();
        let response = svc
            .set_camera_position(data(json!({"position": [1.0, 2.0, 3.0]})))
            .unwrap();
        assert_eq!(response["status"], "queued");
        let request_id = response["request_id"].as_str().unwrap().to_string();

        // Not applied until the tick drains the dispatcher.
        assert_ne!(camera.pose().0, [1.0, 2.0, 3.0]);
        dispatcher.drain();
        assert_eq!(camera.pose().0, [1.0, 2.0, 3.0]);

        let status = svc
            .request_status(data(json!({"request_id": request_id})))
            .unwrap();
        assert_eq!(status["completed"], true);
        assert_eq!(status["result"]["success"], true);
    }

    #[test]
    fn failed_camera_operation_records_error() {
        let (svc, dispatcher, _camera) = service();
        let response = svc
            .frame_object(data(json!({"object_path": "/World/Missing"})))
            .unwrap();
        let request_id = response["request_id"].as_str().unwrap().to_string();
        dispatcher.drain();

        let status = svc
            .request_status(data(json!({"request_id": request_id})))
            .unwrap();
        assert_eq!(status["completed"], true);
        assert!(status["error"].as_str().unwrap().contains("/World/Missing"));
    }

    #[test]
    fn invalid_payload_is_rejected_before_dispatch() {
        let (svc, _dispatcher, _camera) = service();
        let err = svc
            .set_camera_position(data(json!({"position": [1.0, 2.0]})))
            .unwrap_err();
        assert!(matches!(err, HandlerError::Validation(_)));

        let err = svc
            .orbit_camera(data(json!({"center": [0, 0, 0], "distance": -5.0})))
            .unwrap_err();
        assert!(matches!(err, HandlerError::Domain { .. }));
    }

    #[test]
    fn shots_auto_start_the_queue() {
        let (svc, _dispatcher, _camera) = service();
        let response = svc
            .queue_shot(
                "smooth_move",
                data(json!({
                    "start_position": [0, 0, 0],
                    "end_position": [5, 0, 0],
                    "duration": 1.0,
                })),
            )
            .unwrap();
        assert_eq!(response["position"], 1);

        let status = svc.shot_queue_status().unwrap();
        assert_eq!(status["queue_state"], "running");
    }

    #[test]
    fn unknown_request_id_is_not_found() {
        let (svc, _dispatcher, _camera) = service();
        let status = svc
            .request_status(data(json!({"request_id": "nope"})))
            .unwrap();
        assert_eq!(status["error_code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn stop_movement_round_trips_the_dispatcher() {
        let (svc, dispatcher, _camera) = service();
        let handle = {
            let dispatcher = dispatcher.clone();
            std::thread::spawn(move || {
                for _ in 0..200 {
                    dispatcher.drain();
                    std::thread::sleep(Duration::from_millis(2));
                }
            })
        };
        let response = svc.stop_movement().await.unwrap();
        assert_eq!(response["success"], true);
        assert!(response["stopped_movement"].is_null());
        handle.join().unwrap();
    }
}
