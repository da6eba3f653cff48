//! Dolly push/pull movements with style-driven approach curves.

use super::GeneratedPlan;
use crate::error::CinematicError;
use crate::movement::{
    frame_count, lerp, parse_params, validate_duration, validate_fps, validate_position,
    Keyframe, Vec3,
};
use crate::styles::{dolly_style, ApproachCurve, DollyStyle};
use serde::Deserialize;
use serde_json::Value;

/// Fraction of the movement over which deceleration applies.
const DECELERATION_ONSET: f64 = 0.8;

#[derive(Debug, Clone, Deserialize)]
struct DollyShotParams {
    start_position: Vec3,
    end_position: Vec3,
    #[serde(default)]
    start_target: Option<Vec3>,
    #[serde(default)]
    end_target: Option<Vec3>,
    #[serde(default)]
    duration: Option<f64>,
    #[serde(default)]
    movement_style: Option<String>,
    #[serde(default)]
    fps: Option<f64>,
}

pub fn generate(params: &Value) -> Result<GeneratedPlan, CinematicError> {
    let p: DollyShotParams = parse_params(params)?;
    let start = validate_position("start_position", p.start_position)?;
    let end = validate_position("end_position", p.end_position)?;
    let duration = validate_duration(p.duration)?.unwrap_or(5.0);
    let fps = validate_fps(p.fps)?;
    let start_target = p
        .start_target
        .map(|t| validate_position("start_target", t))
        .transpose()?;
    let end_target = p
        .end_target
        .map(|t| validate_position("end_target", t))
        .transpose()?;

    let style = dolly_style(p.movement_style.as_deref().unwrap_or("standard"));

    let n = frame_count(duration, fps);
    let mut keyframes = Vec::with_capacity(n + 1);
    for i in 0..=n {
        let t = i as f64 / n as f64;
        let eased = dolly_easing(t, style);
        let position = if i == 0 {
            start
        } else if i == n {
            end
        } else {
            lerp(start, end, eased)
        };
        let target = dolly_target(start, end, start_target, end_target, eased, i, n);
        keyframes.push(Keyframe::new(position, target, t, t * duration));
    }

    Ok(GeneratedPlan {
        duration_seconds: duration,
        keyframes,
    })
}

/// Style-driven approach curve with an extra deceleration over the final
/// 20% of the motion.
fn dolly_easing(t: f64, style: DollyStyle) -> f64 {
    let mut eased = match style.approach_curve {
        ApproachCurve::EaseInCubic => t * t * t,
        ApproachCurve::EaseOut => 1.0 - (1.0 - t) * (1.0 - t),
        ApproachCurve::EaseInOutQuartic => {
            if t < 0.5 {
                8.0 * t * t * t * t
            } else {
                1.0 - 8.0 * (1.0 - t).powi(4)
            }
        }
        ApproachCurve::EaseInOut => {
            if t < 0.5 {
                2.0 * t * t
            } else {
                1.0 - 2.0 * (1.0 - t) * (1.0 - t)
            }
        }
    };

    if t > DECELERATION_ONSET {
        let decel = 1.0 - (t - DECELERATION_ONSET) * style.deceleration_factor;
        eased = DECELERATION_ONSET + (eased - DECELERATION_ONSET) * decel;
    }
    eased
}

/// Classic dolly framing: interpolate when both targets exist, hold a single
/// target, otherwise look at the midpoint of the two positions.
fn dolly_target(
    start: Vec3,
    end: Vec3,
    start_target: Option<Vec3>,
    end_target: Option<Vec3>,
    eased: f64,
    i: usize,
    n: usize,
) -> Vec3 {
    match (start_target, end_target) {
        (Some(st), Some(et)) => {
            if i == 0 {
                st
            } else if i == n {
                et
            } else {
                lerp(st, et, eased)
            }
        }
        (Some(st), None) => st,
        (None, Some(et)) => et,
        (None, None) => lerp(start, end, 0.5),
    }
}
