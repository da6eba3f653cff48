//! Orbital movements: spherical orbits around a center or a target object,
//! plus the cinematic curved-path orbit.

use super::arc_shot::{bezier_position, control_point};
use super::{GeneratedPlan, SceneContext};
use crate::easing::sinusoidal;
use crate::error::CinematicError;
use crate::movement::{
    frame_count, lerp, parse_params, validate_duration, validate_fps, validate_position,
    Keyframe, Vec3,
};
use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

/// Fixed distance used when projecting an orbital look-at target.
const ORBITAL_TARGET_DISTANCE: f64 = 100.0;

/// Downward view elevation assumed when no start target is given.
const DEFAULT_VIEW_ELEVATION: f64 = -0.1;

#[derive(Debug, Clone, Deserialize)]
struct OrbitShotParams {
    #[serde(default)]
    start_azimuth: Option<f64>,
    #[serde(default)]
    end_azimuth: Option<f64>,
    #[serde(default)]
    distance: Option<f64>,
    #[serde(default)]
    elevation: Option<f64>,
    #[serde(default)]
    center: Option<Vec3>,
    #[serde(default)]
    duration: Option<f64>,
    #[serde(default)]
    fps: Option<f64>,
    #[serde(default)]
    start_target: Option<Vec3>,
    #[serde(default)]
    end_target: Option<Vec3>,
    /// USD path of the object to orbit; switches to target-object mode.
    #[serde(default)]
    target_object: Option<String>,
    #[serde(default)]
    start_position: Option<Vec3>,
    #[serde(default)]
    orbit_count: Option<f64>,
}

pub fn generate(params: &Value, ctx: &dyn SceneContext) -> Result<GeneratedPlan, CinematicError> {
    let p: OrbitShotParams = parse_params(params)?;
    validate_duration(p.duration)?;
    if let Some(distance) = p.distance {
        if distance <= 0.0 {
            return Err(CinematicError::invalid("distance must be positive"));
        }
    }
    if let Some(count) = p.orbit_count {
        if count <= 0.0 {
            return Err(CinematicError::invalid("orbit_count must be positive"));
        }
    }

    if p.target_object.is_some() || p.start_position.is_some() {
        orbit_around_target(&p, ctx)
    } else {
        spherical_orbit(&p)
    }
}

/// Circle at fixed elevation radius around a center point, azimuth sweeping
/// linearly from `start_azimuth` to `end_azimuth`.
fn spherical_orbit(p: &OrbitShotParams) -> Result<GeneratedPlan, CinematicError> {
    let start_azimuth = p.start_azimuth.unwrap_or(0.0).to_radians();
    let end_azimuth = p.end_azimuth.unwrap_or(360.0).to_radians();
    let distance = p.distance.unwrap_or(10.0);
    let elevation = p.elevation.unwrap_or(15.0).to_radians();
    let duration = p.duration.unwrap_or(8.0);
    let fps = validate_fps(p.fps)?;
    let center = p.center.unwrap_or([0.0; 3]);

    let n = frame_count(duration, fps);
    let mut keyframes = Vec::with_capacity(n + 1);
    for i in 0..=n {
        let t = i as f64 / n as f64;
        let azimuth = start_azimuth + (end_azimuth - start_azimuth) * t;
        let eased = sinusoidal(t);

        let position = [
            center[0] + distance * elevation.cos() * azimuth.cos(),
            center[1] + distance * elevation.cos() * azimuth.sin(),
            center[2] + distance * elevation.sin(),
        ];
        let target = match (p.start_target, p.end_target) {
            (Some(st), Some(et)) => lerp(st, et, eased),
            (Some(st), None) => st,
            _ => center,
        };

        let mut keyframe = Keyframe::new(position, target, t, t * duration);
        keyframe.azimuth_degrees = Some(azimuth.to_degrees());
        keyframes.push(keyframe);
    }

    Ok(GeneratedPlan {
        duration_seconds: duration,
        keyframes,
    })
}

/// Orbit around a target object (or explicit center) starting from the
/// camera's current or supplied position; radius and elevation derive from
/// that starting position, and the azimuth sweeps `orbit_count` revolutions
/// under sinusoidal easing.
fn orbit_around_target(
    p: &OrbitShotParams,
    ctx: &dyn SceneContext,
) -> Result<GeneratedPlan, CinematicError> {
    let start_position = match p.start_position {
        Some(position) => validate_position("start_position", position)?,
        None => ctx
            .camera_pose()
            .map(|(position, _)| position)
            .ok_or_else(|| {
                CinematicError::invalid("start_position required when target_object is specified")
            })?,
    };

    let center = match p.center {
        Some(center) => center,
        None => resolve_orbit_center(p.target_object.as_deref(), ctx),
    };

    let start_vec = [
        start_position[0] - center[0],
        start_position[1] - center[1],
        start_position[2] - center[2],
    ];
    let radius = (start_vec[0] * start_vec[0] + start_vec[1] * start_vec[1]
        + start_vec[2] * start_vec[2])
        .sqrt();
    if radius == 0.0 {
        return Err(CinematicError::invalid(
            "Starting position cannot be at orbit center",
        ));
    }

    let start_azimuth = start_vec[1].atan2(start_vec[0]);
    let elevation = (start_vec[2] / radius).asin();
    let sweep = (p.orbit_count.unwrap_or(1.0) * 360.0).to_radians();
    let end_azimuth = start_azimuth + sweep;
    let duration = p.duration.unwrap_or(8.0);
    let fps = validate_fps(p.fps)?;
    let view_elevation = view_elevation(p.start_target, start_position);

    let n = frame_count(duration, fps);
    let mut keyframes = Vec::with_capacity(n + 1);
    for i in 0..=n {
        let t = i as f64 / n as f64;
        let eased = sinusoidal(t);
        let azimuth = start_azimuth + (end_azimuth - start_azimuth) * eased;

        let position = [
            center[0] + radius * elevation.cos() * azimuth.cos(),
            center[1] + radius * elevation.cos() * azimuth.sin(),
            center[2] + radius * elevation.sin(),
        ];
        let target = match (p.start_target, p.end_target) {
            (Some(st), Some(et)) => lerp(st, et, eased),
            (Some(st), None) => st,
            _ => orbital_target(position, center, view_elevation),
        };

        let mut keyframe = Keyframe::new(position, target, t, t * duration);
        keyframe.azimuth_degrees = Some(azimuth.to_degrees());
        keyframes.push(keyframe);
    }

    Ok(GeneratedPlan {
        duration_seconds: duration,
        keyframes,
    })
}

fn resolve_orbit_center(target_object: Option<&str>, ctx: &dyn SceneContext) -> Vec3 {
    if let Some(path) = target_object {
        if let Some(position) = ctx.asset_position(path) {
            return position;
        }
        warn!(target = %path, "Could not resolve target object transform, orbiting origin");
    }
    [0.0; 3]
}

/// Elevation angle of the initial view direction, preserved while orbiting.
fn view_elevation(start_target: Option<Vec3>, start_position: Vec3) -> f64 {
    if let Some(target) = start_target {
        let view = [
            target[0] - start_position[0],
            target[1] - start_position[1],
            target[2] - start_position[2],
        ];
        let length = (view[0] * view[0] + view[1] * view[1] + view[2] * view[2]).sqrt();
        if length > 0.0 {
            return (view[2] / length).asin();
        }
    }
    DEFAULT_VIEW_ELEVATION
}

/// Project a look-at point toward the orbit center at the preserved view
/// elevation.
fn orbital_target(position: Vec3, center: Vec3, view_elevation: f64) -> Vec3 {
    let horizontal = [center[0] - position[0], center[1] - position[1]];
    let length = (horizontal[0] * horizontal[0] + horizontal[1] * horizontal[1]).sqrt();
    if length == 0.0 {
        return center;
    }
    let direction = [horizontal[0] / length, horizontal[1] / length];
    [
        position[0] + direction[0] * ORBITAL_TARGET_DISTANCE * view_elevation.cos(),
        position[1] + direction[1] * ORBITAL_TARGET_DISTANCE * view_elevation.cos(),
        position[2] + ORBITAL_TARGET_DISTANCE * view_elevation.sin(),
    ]
}

// ── Cinematic orbit ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
struct CinematicOrbitParams {
    start_position: Vec3,
    end_position: Vec3,
    #[serde(default)]
    start_target: Option<Vec3>,
    #[serde(default)]
    end_target: Option<Vec3>,
    #[serde(default)]
    duration: Option<f64>,
    #[serde(default)]
    fps: Option<f64>,
}

/// Curvature of the cinematic orbit path (same scheme as the arc shot).
const CINEMATIC_CURVATURE: f64 = 0.25;

/// Peak weight of the scene-focus blend at the path midpoint.
const SCENE_FOCUS_PEAK: f64 = 0.7;

/// Curved sweep between two positions with a scene-focus target blend that
/// biases the look-at toward the average of the endpoint targets near the
/// midpoint of the path.
pub fn generate_cinematic(params: &Value) -> Result<GeneratedPlan, CinematicError> {
    let p: CinematicOrbitParams = parse_params(params)?;
    let start = validate_position("start_position", p.start_position)?;
    let end = validate_position("end_position", p.end_position)?;
    let duration = validate_duration(p.duration)?.unwrap_or(8.0);
    let fps = validate_fps(p.fps)?;

    let control = control_point(start, end, CINEMATIC_CURVATURE);

    let n = frame_count(duration, fps);
    let mut keyframes = Vec::with_capacity(n + 1);
    for i in 0..=n {
        let t = i as f64 / n as f64;
        let eased = sinusoidal(t);
        let position = bezier_position(start, control, end, eased, i, n);
        let target = cinematic_target(start, end, p.start_target, p.end_target, t, eased);
        let mut keyframe = Keyframe::new(position, target, t, t * duration);
        keyframe.control_point = Some(control);
        keyframes.push(keyframe);
    }

    Ok(GeneratedPlan {
        duration_seconds: duration,
        keyframes,
    })
}

fn cinematic_target(
    start: Vec3,
    end: Vec3,
    start_target: Option<Vec3>,
    end_target: Option<Vec3>,
    t: f64,
    eased: f64,
) -> Vec3 {
    match (start_target, end_target) {
        (Some(st), Some(et)) => {
            let scene_center = lerp(st, et, 0.5);
            let focus = (std::f64::consts::PI * t).sin() * SCENE_FOCUS_PEAK;
            let linear = lerp(st, et, eased);
            [
                linear[0] + (scene_center[0] - linear[0]) * focus,
                linear[1] + (scene_center[1] - linear[1]) * focus,
                linear[2] + (scene_center[2] - linear[2]) * focus,
            ]
        }
        _ => {
            let mid = lerp(start, end, 0.5);
            [mid[0], mid[1], mid[2] - 10.0]
        }
    }
}
