//! Curved movement along a quadratic Bezier path.

use super::GeneratedPlan;
use crate::duration::{distance, resolve_duration};
use crate::easing::sinusoidal;
use crate::error::CinematicError;
use crate::movement::{
    frame_count, lerp, parse_params, validate_duration, validate_fps, validate_position,
    validate_speed, Keyframe, ShotOperation, Vec3,
};
use crate::styles::arc_style;
use serde::Deserialize;
use serde_json::Value;

/// How many frames ahead the camera looks when no targets are supplied.
const LOOK_AHEAD_FRAMES: usize = 5;

/// Vertical lift applied to the control point, as a fraction of distance.
const CONTROL_LIFT_FACTOR: f64 = 0.1;

#[derive(Debug, Clone, Deserialize)]
struct ArcShotParams {
    start_position: Vec3,
    end_position: Vec3,
    #[serde(default)]
    start_target: Option<Vec3>,
    #[serde(default)]
    end_target: Option<Vec3>,
    #[serde(default)]
    duration: Option<f64>,
    #[serde(default)]
    speed: Option<f64>,
    #[serde(default)]
    movement_style: Option<String>,
    #[serde(default)]
    fps: Option<f64>,
}

pub fn generate(params: &Value) -> Result<GeneratedPlan, CinematicError> {
    let p: ArcShotParams = parse_params(params)?;
    let start = validate_position("start_position", p.start_position)?;
    let end = validate_position("end_position", p.end_position)?;
    let duration = validate_duration(p.duration)?;
    let speed = validate_speed(p.speed)?;
    let fps = validate_fps(p.fps)?;
    let start_target = p
        .start_target
        .map(|t| validate_position("start_target", t))
        .transpose()?;
    let end_target = p
        .end_target
        .map(|t| validate_position("end_target", t))
        .transpose()?;

    let duration = resolve_duration(start, end, speed, duration, ShotOperation::ArcShot);
    let style = arc_style(p.movement_style.as_deref().unwrap_or("standard"));
    let control = control_point(start, end, style.curvature_intensity);

    let n = frame_count(duration, fps);
    let mut keyframes = Vec::with_capacity(n + 1);
    for i in 0..=n {
        let t = i as f64 / n as f64;
        let eased = sinusoidal(t);
        let position = bezier_position(start, control, end, eased, i, n);
        let target = match (start_target, end_target) {
            (Some(st), Some(et)) => {
                if i == 0 {
                    st
                } else if i == n {
                    et
                } else {
                    lerp(st, et, eased)
                }
            }
            _ => look_ahead_target(start, control, end, i, n),
        };
        let mut keyframe = Keyframe::new(position, target, t, t * duration);
        keyframe.control_point = Some(control);
        keyframes.push(keyframe);
    }

    Ok(GeneratedPlan {
        duration_seconds: duration,
        keyframes,
    })
}

/// Control point for the quadratic Bezier: midpoint offset sideways by
/// `distance · curvature` along the horizontal perpendicular, plus a
/// vertical lift proportional to distance.
pub(super) fn control_point(start: Vec3, end: Vec3, curvature: f64) -> Vec3 {
    let move_distance = distance(start, end);
    if move_distance == 0.0 {
        return start;
    }
    let norm = [
        (end[0] - start[0]) / move_distance,
        (end[1] - start[1]) / move_distance,
        (end[2] - start[2]) / move_distance,
    ];
    let perp = perpendicular(norm);
    let midpoint = lerp(start, end, 0.5);
    let offset = move_distance * curvature;
    [
        midpoint[0] + perp[0] * offset,
        midpoint[1] + perp[1] * offset,
        midpoint[2] + perp[2] * offset + move_distance * CONTROL_LIFT_FACTOR,
    ]
}

/// Horizontal unit perpendicular via Z-up cross product; mostly-vertical
/// motion falls back to the Y axis.
fn perpendicular(norm: Vec3) -> Vec3 {
    let perp = if norm[2].abs() < 0.9 {
        [-norm[1], norm[0], 0.0]
    } else {
        [0.0, 1.0, 0.0]
    };
    let mag = (perp[0] * perp[0] + perp[1] * perp[1] + perp[2] * perp[2]).sqrt();
    if mag > 0.0 {
        [perp[0] / mag, perp[1] / mag, perp[2] / mag]
    } else {
        [1.0, 0.0, 0.0]
    }
}

/// Quadratic Bezier `P(t) = (1-t)²P₀ + 2(1-t)tP₁ + t²P₂` with exact
/// endpoints at the first and last frame.
pub(super) fn bezier_position(
    start: Vec3,
    control: Vec3,
    end: Vec3,
    eased_t: f64,
    frame_index: usize,
    total_frames: usize,
) -> Vec3 {
    if frame_index == 0 {
        return start;
    }
    if frame_index == total_frames {
        return end;
    }
    let t = eased_t;
    let omt = 1.0 - t;
    [
        omt * omt * start[0] + 2.0 * omt * t * control[0] + t * t * end[0],
        omt * omt * start[1] + 2.0 * omt * t * control[1] + t * t * end[1],
        omt * omt * start[2] + 2.0 * omt * t * control[2] + t * t * end[2],
    ]
}

fn look_ahead_target(start: Vec3, control: Vec3, end: Vec3, i: usize, n: usize) -> Vec3 {
    if i >= n {
        return end;
    }
    let next_frame = (i + LOOK_AHEAD_FRAMES).min(n);
    let next_eased = sinusoidal(next_frame as f64 / n as f64);
    bezier_position(start, control, end, next_eased, next_frame, n)
}
