//! Movement data structures and shared parameter validation.

use crate::error::CinematicError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Instant;

/// Camera-space position or direction.
pub type Vec3 = [f64; 3];

/// The kind of trajectory a movement follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShotOperation {
    SmoothMove,
    ArcShot,
    OrbitShot,
    DollyShot,
    PanTiltShot,
    CinematicOrbit,
}

impl ShotOperation {
    pub fn as_str(self) -> &'static str {
        match self {
            ShotOperation::SmoothMove => "smooth_move",
            ShotOperation::ArcShot => "arc_shot",
            ShotOperation::OrbitShot => "orbit_shot",
            ShotOperation::DollyShot => "dolly_shot",
            ShotOperation::PanTiltShot => "pan_tilt_shot",
            ShotOperation::CinematicOrbit => "cinematic_orbit",
        }
    }

    pub fn parse(name: &str) -> Result<Self, CinematicError> {
        match name {
            "smooth_move" => Ok(ShotOperation::SmoothMove),
            "arc_shot" => Ok(ShotOperation::ArcShot),
            "orbit_shot" => Ok(ShotOperation::OrbitShot),
            "dolly_shot" => Ok(ShotOperation::DollyShot),
            "pan_tilt_shot" => Ok(ShotOperation::PanTiltShot),
            "cinematic_orbit" => Ok(ShotOperation::CinematicOrbit),
            other => Err(CinematicError::UnknownOperation(other.to_string())),
        }
    }

    /// The `<OP>_FAILED` code used when this operation fails.
    pub fn failure_code(self) -> String {
        format!("{}_FAILED", self.as_str().to_uppercase())
    }
}

/// One sampled point along a movement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Keyframe {
    /// Camera position.
    pub position: Vec3,
    /// Look-at target.
    pub target: Vec3,
    /// Normalized progress through the movement, in `[0, 1]`.
    pub progress: f64,
    /// Seconds since movement start.
    pub timestamp: f64,
    /// Azimuth in degrees, for orbital shots.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub azimuth_degrees: Option<f64>,
    /// Bezier control point, for curved shots.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub control_point: Option<Vec3>,
}

impl Keyframe {
    pub fn new(position: Vec3, target: Vec3, progress: f64, timestamp: f64) -> Self {
        Self {
            position,
            target,
            progress,
            timestamp,
            azimuth_degrees: None,
            control_point: None,
        }
    }
}

/// State of the movement currently driving the camera.
#[derive(Debug, Clone)]
pub struct MovementState {
    pub movement_id: String,
    pub operation: ShotOperation,
    pub params: Value,
    pub start_time: Instant,
    pub duration_seconds: f64,
    pub keyframes: Vec<Keyframe>,
    pub current_frame: usize,
}

impl MovementState {
    /// Fraction of the movement elapsed at `now`, clamped to `[0, 1]`.
    pub fn progress_at(&self, now: Instant) -> f64 {
        if self.duration_seconds <= 0.0 {
            return 1.0;
        }
        let elapsed = now.duration_since(self.start_time).as_secs_f64();
        (elapsed / self.duration_seconds).min(1.0)
    }

    /// Remaining seconds at `now`.
    pub fn remaining_at(&self, now: Instant) -> f64 {
        let elapsed = now.duration_since(self.start_time).as_secs_f64();
        (self.duration_seconds - elapsed).max(0.0)
    }
}

// ── Shared parameter validation ─────────────────────────────────────────────

/// Target frame rate bounds.
pub const MAX_FPS: f64 = 120.0;

/// Default keyframe sampling rate.
pub const DEFAULT_FPS: f64 = 30.0;

/// Number of keyframes for a movement: `max(1, round(duration · fps)) + 1`.
pub fn frame_count(duration: f64, fps: f64) -> usize {
    ((duration * fps).round() as usize).max(1)
}

/// Check a position is three finite numbers.
pub fn validate_position(name: &str, position: Vec3) -> Result<Vec3, CinematicError> {
    if position.iter().all(|v| v.is_finite()) {
        Ok(position)
    } else {
        Err(CinematicError::invalid(format!(
            "{name} coordinates must be finite numbers"
        )))
    }
}

/// Check an optional duration is positive.
pub fn validate_duration(duration: Option<f64>) -> Result<Option<f64>, CinematicError> {
    match duration {
        Some(d) if d <= 0.0 || !d.is_finite() => Err(CinematicError::invalid(format!(
            "duration must be positive, got: {d}"
        ))),
        other => Ok(other),
    }
}

/// Check an optional speed is positive.
pub fn validate_speed(speed: Option<f64>) -> Result<Option<f64>, CinematicError> {
    match speed {
        Some(s) if s <= 0.0 || !s.is_finite() => Err(CinematicError::invalid(format!(
            "speed must be positive, got: {s}"
        ))),
        other => Ok(other),
    }
}

/// Resolve the sampling rate, checking it lies in `(0, 120]`.
pub fn validate_fps(fps: Option<f64>) -> Result<f64, CinematicError> {
    let fps = fps.unwrap_or(DEFAULT_FPS);
    if fps <= 0.0 || fps > MAX_FPS {
        return Err(CinematicError::invalid(format!(
            "fps must be between 0 and {MAX_FPS}, got: {fps}"
        )));
    }
    Ok(fps)
}

/// Linear interpolation between two positions.
pub fn lerp(start: Vec3, end: Vec3, t: f64) -> Vec3 {
    [
        start[0] + (end[0] - start[0]) * t,
        start[1] + (end[1] - start[1]) * t,
        start[2] + (end[2] - start[2]) * t,
    ]
}

/// Deserialize shot params from JSON, mapping serde failures to validation
/// errors that name the offending field.
pub fn parse_params<T: serde::de::DeserializeOwned>(params: &Value) -> Result<T, CinematicError> {
    serde_json::from_value(params.clone())
        .map_err(|e| CinematicError::invalid(format!("invalid parameters: {e}")))
}
