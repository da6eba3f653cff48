//! Linear movement between two positions with optional target or
//! rotation-based aiming.

use super::{GeneratedPlan, SceneContext};
use crate::duration::resolve_duration;
use crate::easing::Easing;
use crate::error::CinematicError;
use crate::movement::{
    frame_count, lerp, parse_params, validate_duration, validate_fps, validate_position,
    validate_speed, Keyframe, ShotOperation, Vec3,
};
use crate::styles::rotation_to_target;
use serde::Deserialize;
use serde_json::Value;

/// Distance of the default look-at point in front of the camera.
const DEFAULT_TARGET_DISTANCE: f64 = 10.0;

#[derive(Debug, Clone, Deserialize)]
struct SmoothMoveParams {
    start_position: Vec3,
    end_position: Vec3,
    #[serde(default)]
    start_target: Option<Vec3>,
    #[serde(default)]
    end_target: Option<Vec3>,
    /// `[pitch, yaw, roll]` degrees; overrides `start_target` when present.
    #[serde(default)]
    start_rotation: Option<Vec3>,
    #[serde(default)]
    end_rotation: Option<Vec3>,
    #[serde(default)]
    duration: Option<f64>,
    #[serde(default)]
    speed: Option<f64>,
    #[serde(default)]
    easing_type: Option<String>,
    #[serde(default)]
    fps: Option<f64>,
}

pub fn generate(params: &Value, ctx: &dyn SceneContext) -> Result<GeneratedPlan, CinematicError> {
    let p: SmoothMoveParams = parse_params(params)?;
    let start = validate_position("start_position", p.start_position)?;
    let end = validate_position("end_position", p.end_position)?;
    let duration = validate_duration(p.duration)?;
    let speed = validate_speed(p.speed)?;
    let fps = validate_fps(p.fps)?;

    let duration = resolve_duration(start, end, speed, duration, ShotOperation::SmoothMove);
    let easing = p
        .easing_type
        .as_deref()
        .map(Easing::from_name)
        .unwrap_or_default();

    let (start_target, end_target) = resolve_targets(&p, start, end, ctx)?;

    let n = frame_count(duration, fps);
    let mut keyframes = Vec::with_capacity(n + 1);
    for i in 0..=n {
        let t = i as f64 / n as f64;
        let eased = easing.apply(t);
        let position = if i == 0 {
            start
        } else if i == n {
            end
        } else {
            lerp(start, end, eased)
        };
        let target = lerp(start_target, end_target, eased);
        keyframes.push(Keyframe::new(position, target, t, t * duration));
    }

    Ok(GeneratedPlan {
        duration_seconds: duration,
        keyframes,
    })
}

/// Resolve look-at endpoints. Rotation data wins over explicit targets;
/// otherwise fall back to the current camera target (start) or a point in
/// front of the end position.
fn resolve_targets(
    p: &SmoothMoveParams,
    start: Vec3,
    end: Vec3,
    ctx: &dyn SceneContext,
) -> Result<(Vec3, Vec3), CinematicError> {
    let start_target = if let Some(rotation) = p.start_rotation {
        let rotation = validate_position("start_rotation", rotation)?;
        rotation_to_target(start, rotation, DEFAULT_TARGET_DISTANCE)
    } else if let Some(target) = p.start_target {
        validate_position("start_target", target)?
    } else if let Some((_, current_target)) = ctx.camera_pose() {
        current_target
    } else {
        [start[0], start[1], start[2] - DEFAULT_TARGET_DISTANCE]
    };

    let end_target = if let Some(rotation) = p.end_rotation {
        let rotation = validate_position("end_rotation", rotation)?;
        rotation_to_target(end, rotation, DEFAULT_TARGET_DISTANCE)
    } else if let Some(target) = p.end_target {
        validate_position("end_target", target)?
    } else {
        [end[0], end[1], end[2] - DEFAULT_TARGET_DISTANCE]
    };

    Ok((start_target, end_target))
}
