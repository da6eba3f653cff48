//! Viewport camera state and direct camera operations.
//!
//! The controller holds the camera pose and a registry of known asset
//! transforms (the stage itself is owned by the host runtime). Pose
//! mutations are only invoked from the main thread; reads are safe from
//! any thread.

use agentworld_cinematic::{SceneContext, Vec3};
use agentworld_core::{ErrorCode, ErrorPayload};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::debug;

/// Distance used when framing an object without an explicit distance.
const DEFAULT_FRAME_DISTANCE: f64 = 10.0;

#[derive(Debug, Clone)]
struct CameraPose {
    position: Vec3,
    target: Vec3,
    up: Vec3,
}

impl Default for CameraPose {
    fn default() -> Self {
        Self {
            position: [0.0, 0.0, 10.0],
            target: [0.0, 0.0, 0.0],
            up: [0.0, 0.0, 1.0],
        }
    }
}

/// In-process camera controller bound to the viewport.
pub struct CameraController {
    pose: Mutex<CameraPose>,
    assets: Mutex<HashMap<String, Vec3>>,
}

impl CameraController {
    pub fn new() -> Self {
        Self {
            pose: Mutex::new(CameraPose::default()),
            assets: Mutex::new(HashMap::new()),
        }
    }

    /// Register an asset transform so `frame_object` and orbits can
    /// resolve it. The scene builder extension feeds this registry.
    pub fn register_asset(&self, path: &str, position: Vec3) {
        self.assets
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(path.to_string(), position);
    }

    /// Set the camera pose. Main-thread only.
    pub fn set_position(&self, position: Vec3, target: Option<Vec3>, up: Option<Vec3>) -> Value {
        let mut pose = self.pose.lock().unwrap_or_else(|e| e.into_inner());
        pose.position = position;
        if let Some(target) = target {
            pose.target = target;
        }
        if let Some(up) = up {
            pose.up = up;
        }
        debug!(?position, "Camera position updated");
        json!({
            "success": true,
            "message": "Camera position updated",
            "position": pose.position,
            "target": pose.target,
        })
    }

    /// Position the camera to frame a registered asset. Main-thread only.
    pub fn frame_object(&self, object_path: &str, distance: Option<f64>) -> Value {
        let asset = {
            let assets = self.assets.lock().unwrap_or_else(|e| e.into_inner());
            assets.get(object_path).copied()
        };
        let Some(center) = asset else {
            return ErrorPayload::new(
                ErrorCode::NotFound,
                format!("Object not found: {object_path}"),
            )
            .to_value();
        };

        let distance = distance.unwrap_or(DEFAULT_FRAME_DISTANCE);
        // Offset back and up along a fixed viewing diagonal.
        let direction = [0.6, 0.6, 0.529];
        let position = [
            center[0] + direction[0] * distance,
            center[1] + direction[1] * distance,
            center[2] + direction[2] * distance,
        ];
        self.set_position(position, Some(center), None);
        json!({
            "success": true,
            "message": format!("Framed object: {object_path}"),
            "position": position,
            "target": center,
            "distance": distance,
        })
    }

    /// Reposition on a sphere around `center`. Main-thread only.
    pub fn orbit(&self, center: Vec3, distance: f64, elevation_deg: f64, azimuth_deg: f64) -> Value {
        let elevation = elevation_deg.to_radians();
        let azimuth = azimuth_deg.to_radians();
        let position = [
            center[0] + distance * elevation.cos() * azimuth.cos(),
            center[1] + distance * elevation.cos() * azimuth.sin(),
            center[2] + distance * elevation.sin(),
        ];
        self.set_position(position, Some(center), None);
        json!({
            "success": true,
            "position": position,
            "target": center,
            "azimuth": azimuth_deg,
            "elevation": elevation_deg,
        })
    }

    /// Current camera status. Safe from any thread.
    pub fn status(&self) -> Value {
        let pose = self.pose.lock().unwrap_or_else(|e| e.into_inner());
        json!({
            "success": true,
            "connected": true,
            "position": pose.position,
            "target": pose.target,
            "up_vector": pose.up,
        })
    }

    /// World transform of a registered asset.
    pub fn asset_transform(&self, object_path: &str) -> Value {
        let assets = self.assets.lock().unwrap_or_else(|e| e.into_inner());
        match assets.get(object_path) {
            Some(position) => json!({
                "success": true,
                "object_path": object_path,
                "position": position,
            }),
            None => ErrorPayload::new(
                ErrorCode::NotFound,
                format!("Object not found: {object_path}"),
            )
            .to_value(),
        }
    }

    /// Current `(position, target)` pair.
    pub fn pose(&self) -> (Vec3, Vec3) {
        let pose = self.pose.lock().unwrap_or_else(|e| e.into_inner());
        (pose.position, pose.target)
    }
}

impl Default for CameraController {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneContext for CameraController {
    fn camera_pose(&self) -> Option<(Vec3, Vec3)> {
        Some(self.pose())
    }

    fn asset_position(&self, path: &str) -> Option<Vec3> {
        self.assets
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(path)
            .copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_position_updates_pose() {
        let camera = CameraController::new();
        let result = camera.set_position([1.0, 2.0, 3.0], Some([0.0; 3]), None);
        assert_eq!(result["success"], true);
        assert_eq!(camera.pose().0, [1.0, 2.0, 3.0]);
        assert_eq!(camera.pose().1, [0.0, 0.0, 0.0]);
    }

    #[test]
    fn frame_object_requires_registered_asset() {
        let camera = CameraController::new();
        let missing = camera.frame_object("/World/Crate", None);
        assert_eq!(missing["success"], false);
        assert_eq!(missing["error_code"], "NOT_FOUND");

        camera.register_asset("/World/Crate", [5.0, 5.0, 0.0]);
        let framed = camera.frame_object("/World/Crate", Some(10.0));
        assert_eq!(framed["success"], true);
        assert_eq!(camera.pose().1, [5.0, 5.0, 0.0]);
    }

    #[test]
    fn orbit_repositions_on_sphere() {
        let camera = CameraController::new();
        camera.orbit([0.0; 3], 10.0, 0.0, 0.0);
        let (position, target) = camera.pose();
        assert!((position[0] - 10.0).abs() < 1e-9);
        assert_eq!(target, [0.0, 0.0, 0.0]);
    }

    #[test]
    fn scene_context_exposes_assets() {
        let camera = CameraController::new();
        camera.register_asset("/World/Tower", [1.0, 2.0, 3.0]);
        assert_eq!(camera.asset_position("/World/Tower"), Some([1.0, 2.0, 3.0]));
        assert_eq!(camera.asset_position("/World/Missing"), None);
        assert!(camera.camera_pose().is_some());
    }
}
