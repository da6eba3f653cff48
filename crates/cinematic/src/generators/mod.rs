//! Keyframe generators, one module per shot type.
//!
//! Generators are free functions sharing the validation, easing, and
//! duration helpers from the parent crate. [`generate`] is the single entry
//! point: it dispatches on the operation, validates parameters, and returns
//! the full keyframe plan.
//!
//! Precision contract for every generator: the first keyframe's position
//! equals the start position and the last equals the end position exactly
//! (where the shot provides explicit endpoints), `progress` never
//! decreases, and `timestamp` strictly increases.

pub mod arc_shot;
pub mod dolly_shot;
pub mod orbit_shot;
pub mod pan_tilt;
pub mod smooth_move;

use crate::duration::DEFAULT_DURATION_SECS;
use crate::error::CinematicError;
use crate::movement::{Keyframe, ShotOperation, Vec3};
use serde_json::Value;

/// Read access to scene state the generators need: the current camera pose
/// (for default targets and orbit starting positions) and asset transforms
/// (for orbiting a named object). Implemented by the camera controller.
pub trait SceneContext: Send + Sync {
    /// Current `(position, target)` of the camera, when known.
    fn camera_pose(&self) -> Option<(Vec3, Vec3)> {
        None
    }

    /// World position of an asset by path, when resolvable.
    fn asset_position(&self, _path: &str) -> Option<Vec3> {
        None
    }
}

/// Context with no scene access; generators fall back to defaults.
pub struct NullScene;

impl SceneContext for NullScene {}

/// A generated movement plan.
#[derive(Debug, Clone)]
pub struct GeneratedPlan {
    pub duration_seconds: f64,
    pub keyframes: Vec<Keyframe>,
}

/// Generate keyframes for `operation` from raw request parameters.
pub fn generate(
    operation: ShotOperation,
    params: &Value,
    ctx: &dyn SceneContext,
) -> Result<GeneratedPlan, CinematicError> {
    let plan = match operation {
        ShotOperation::SmoothMove => smooth_move::generate(params, ctx)?,
        ShotOperation::ArcShot => arc_shot::generate(params)?,
        ShotOperation::OrbitShot => orbit_shot::generate(params, ctx)?,
        ShotOperation::DollyShot => dolly_shot::generate(params)?,
        ShotOperation::PanTiltShot => pan_tilt::generate(params)?,
        ShotOperation::CinematicOrbit => orbit_shot::generate_cinematic(params)?,
    };
    tracing::debug!(
        operation = operation.as_str(),
        keyframes = plan.keyframes.len(),
        duration = plan.duration_seconds,
        "Generated keyframe plan"
    );
    Ok(plan)
}

/// Cheap duration estimate for queue status display, without generating
/// keyframes. Explicit duration wins; otherwise distance over the supplied
/// speed (default 5 units/s); otherwise a per-shot fallback.
pub fn estimate_duration(operation: ShotOperation, params: &Value) -> f64 {
    if let Some(duration) = params.get("duration").and_then(Value::as_f64) {
        return duration;
    }
    let start = read_vec3(params, "start_position");
    let end = read_vec3(params, "end_position");
    if let (Some(start), Some(end)) = (start, end) {
        let speed = params
            .get("speed")
            .and_then(Value::as_f64)
            .filter(|s| *s > 0.0)
            .unwrap_or(5.0);
        return crate::duration::resolve_duration(start, end, Some(speed), None, operation);
    }
    match operation {
        ShotOperation::OrbitShot | ShotOperation::CinematicOrbit => 8.0,
        ShotOperation::DollyShot => 5.0,
        ShotOperation::PanTiltShot => 6.0,
        _ => DEFAULT_DURATION_SECS,
    }
}

fn read_vec3(params: &Value, key: &str) -> Option<Vec3> {
    let array = params.get(key)?.as_array()?;
    if array.len() != 3 {
        return None;
    }
    let mut out = [0.0; 3];
    for (i, value) in array.iter().enumerate() {
        out[i] = value.as_f64()?;
    }
    Some(out)
}
