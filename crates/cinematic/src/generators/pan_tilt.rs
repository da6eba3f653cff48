//! Pan/tilt rotation movements.
//!
//! Two modes: keyframe mode (start/end positions, behaves like a smooth
//! move) and rotation mode (azimuth/elevation sweeps at a fixed radius,
//! looking at the origin).

use super::GeneratedPlan;
use crate::easing::Easing;
use crate::error::CinematicError;
use crate::movement::{
    frame_count, lerp, parse_params, validate_duration, validate_fps, validate_position,
    Keyframe, Vec3,
};
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Clone, Deserialize)]
struct PanTiltParams {
    #[serde(default)]
    start_position: Option<Vec3>,
    #[serde(default)]
    end_position: Option<Vec3>,
    #[serde(default)]
    start_target: Option<Vec3>,
    #[serde(default)]
    end_target: Option<Vec3>,
    #[serde(default)]
    start_azimuth: Option<f64>,
    #[serde(default)]
    end_azimuth: Option<f64>,
    #[serde(default)]
    start_elevation: Option<f64>,
    #[serde(default)]
    end_elevation: Option<f64>,
    #[serde(default)]
    distance: Option<f64>,
    #[serde(default)]
    duration: Option<f64>,
    #[serde(default)]
    easing_type: Option<String>,
    #[serde(default)]
    fps: Option<f64>,
}

pub fn generate(params: &Value) -> Result<GeneratedPlan, CinematicError> {
    let p: PanTiltParams = parse_params(params)?;
    let duration = validate_duration(p.duration)?.unwrap_or(6.0);
    let fps = validate_fps(p.fps)?;

    let has_positions = p.start_position.is_some() && p.end_position.is_some();
    let has_rotations = p.start_azimuth.is_some() && p.end_azimuth.is_some();
    if !has_positions && !has_rotations {
        return Err(CinematicError::invalid(
            "Pan/tilt requires either (start_position, end_position) for keyframe mode \
             or (start_azimuth, end_azimuth) for rotation mode",
        ));
    }

    if has_positions {
        keyframe_mode(&p, duration, fps)
    } else {
        rotation_mode(&p, duration, fps)
    }
}

fn keyframe_mode(p: &PanTiltParams, duration: f64, fps: f64) -> Result<GeneratedPlan, CinematicError> {
    let start = validate_position("start_position", p.start_position.unwrap_or_default())?;
    let end = validate_position("end_position", p.end_position.unwrap_or_default())?;
    let easing = p
        .easing_type
        .as_deref()
        .map(Easing::from_name)
        .unwrap_or_default();

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
        let target = match (p.start_target, p.end_target) {
            (Some(st), Some(et)) => lerp(st, et, eased),
            (Some(st), None) => st,
            (None, Some(et)) => et,
            (None, None) => [position[0], position[1], position[2] - 10.0],
        };
        keyframes.push(Keyframe::new(position, target, t, t * duration));
    }

    Ok(GeneratedPlan {
        duration_seconds: duration,
        keyframes,
    })
}

fn rotation_mode(p: &PanTiltParams, duration: f64, fps: f64) -> Result<GeneratedPlan, CinematicError> {
    let distance = match p.distance {
        Some(d) if d <= 0.0 => {
            return Err(CinematicError::invalid(
                "distance must be positive for rotation mode",
            ))
        }
        Some(d) => d,
        None => 10.0,
    };
    let start_azimuth = p.start_azimuth.unwrap_or(0.0).to_radians();
    let end_azimuth = p.end_azimuth.unwrap_or(0.0).to_radians();
    let start_elevation = p.start_elevation.unwrap_or(0.0).to_radians();
    let end_elevation = p.end_elevation.unwrap_or(0.0).to_radians();

    let n = frame_count(duration, fps);
    let mut keyframes = Vec::with_capacity(n + 1);
    for i in 0..=n {
        let t = i as f64 / n as f64;
        let azimuth = start_azimuth + (end_azimuth - start_azimuth) * t;
        let elevation = start_elevation + (end_elevation - start_elevation) * t;

        let position = [
            distance * elevation.cos() * azimuth.cos(),
            distance * elevation.cos() * azimuth.sin(),
            distance * elevation.sin(),
        ];
        let mut keyframe = Keyframe::new(position, [0.0; 3], t, t * duration);
        keyframe.azimuth_degrees = Some(azimuth.to_degrees());
        keyframes.push(keyframe);
    }

    Ok(GeneratedPlan {
        duration_seconds: duration,
        keyframes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn keyframe_mode_behaves_like_smooth_move() {
        let params = json!({
            "start_position": [0.0, 0.0, 0.0],
            "end_position": [4.0, 0.0, 0.0],
            "duration": 1.0,
            "easing_type": "linear",
            "fps": 30.0,
        });
        let plan = generate(&params).unwrap();
        assert_eq!(plan.keyframes.len(), 31);
        assert_eq!(plan.keyframes[0].position, [0.0, 0.0, 0.0]);
        assert_eq!(plan.keyframes[30].position, [4.0, 0.0, 0.0]);
    }

    #[test]
    fn rotation_mode_orbits_origin() {
        let params = json!({
            "start_azimuth": 0.0,
            "end_azimuth": 90.0,
            "distance": 10.0,
            "duration": 1.0,
            "fps": 30.0,
        });
        let plan = generate(&params).unwrap();
        let first = &plan.keyframes[0];
        let last = plan.keyframes.last().unwrap();
        assert!((first.position[0] - 10.0).abs() < 1e-9);
        assert!(last.position[0].abs() < 1e-9);
        assert!((last.position[1] - 10.0).abs() < 1e-9);
        for keyframe in &plan.keyframes {
            assert_eq!(keyframe.target, [0.0, 0.0, 0.0]);
        }
    }

    #[test]
    fn elevation_sweep_tilts() {
        let params = json!({
            "start_azimuth": 0.0,
            "end_azimuth": 0.0,
            "start_elevation": 0.0,
            "end_elevation": 90.0,
            "distance": 10.0,
            "duration": 1.0,
        });
        let plan = generate(&params).unwrap();
        let last = plan.keyframes.last().unwrap();
        assert!(last.position[0].abs() < 1e-6);
        assert!((last.position[2] - 10.0).abs() < 1e-6);
    }

    #[test]
    fn neither_mode_is_an_error() {
        let err = generate(&json!({"duration": 1.0})).unwrap_err();
        assert!(matches!(err, CinematicError::Validation(_)));
    }

    #[test]
    fn default_duration_is_six_seconds() {
        let params = json!({"start_azimuth": 0.0, "end_azimuth": 90.0});
        let plan = generate(&params).unwrap();
        assert_eq!(plan.duration_seconds, 6.0);
    }
}
