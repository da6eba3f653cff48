//! Speed-based duration calculation for camera movements.

use crate::movement::{ShotOperation, Vec3};

/// Distances below this count as "no movement".
const ZERO_DISTANCE_EPSILON: f64 = 1e-3;

/// Minimum duration returned for zero-distance movements.
const MIN_DURATION_SECS: f64 = 0.1;

/// Fallback when neither positions nor duration are available.
pub const DEFAULT_DURATION_SECS: f64 = 3.0;

/// 3D Euclidean distance between two positions.
pub fn distance(start: Vec3, end: Vec3) -> f64 {
    let dx = end[0] - start[0];
    let dy = end[1] - start[1];
    let dz = end[2] - start[2];
    (dx * dx + dy * dy + dz * dz).sqrt()
}

/// Default cruise speed (units/second) per shot type.
pub fn default_speed(operation: ShotOperation) -> f64 {
    match operation {
        ShotOperation::SmoothMove => 10.0,
        ShotOperation::ArcShot => 8.0,
        ShotOperation::OrbitShot => 15.0,
        _ => 10.0,
    }
}

/// Resolve a movement duration.
///
/// Explicit `duration` wins; otherwise `distance / speed` with the shot
/// type's default speed; zero distance yields the minimum duration.
pub fn resolve_duration(
    start: Vec3,
    end: Vec3,
    speed: Option<f64>,
    duration: Option<f64>,
    operation: ShotOperation,
) -> f64 {
    if let Some(duration) = duration {
        return duration;
    }
    let dist = distance(start, end);
    if dist < ZERO_DISTANCE_EPSILON {
        return MIN_DURATION_SECS;
    }
    let speed = match speed {
        Some(s) if s > 0.0 => s,
        _ => default_speed(operation),
    };
    dist / speed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_duration_wins() {
        let d = resolve_duration(
            [0.0; 3],
            [100.0, 0.0, 0.0],
            Some(5.0),
            Some(7.5),
            ShotOperation::SmoothMove,
        );
        assert_eq!(d, 7.5);
    }

    #[test]
    fn duration_from_speed() {
        let d = resolve_duration(
            [0.0; 3],
            [10.0, 0.0, 0.0],
            Some(5.0),
            None,
            ShotOperation::SmoothMove,
        );
        assert_eq!(d, 2.0);
    }

    #[test]
    fn zero_distance_yields_minimum() {
        let d = resolve_duration(
            [1.0, 2.0, 3.0],
            [1.0, 2.0, 3.0],
            Some(5.0),
            None,
            ShotOperation::SmoothMove,
        );
        assert_eq!(d, 0.1);
    }

    #[test]
    fn default_speeds_per_shot_type() {
        assert_eq!(default_speed(ShotOperation::SmoothMove), 10.0);
        assert_eq!(default_speed(ShotOperation::ArcShot), 8.0);
        assert_eq!(default_speed(ShotOperation::OrbitShot), 15.0);

        // 20 units at arc default 8 u/s
        let d = resolve_duration(
            [0.0; 3],
            [20.0, 0.0, 0.0],
            None,
            None,
            ShotOperation::ArcShot,
        );
        assert!((d - 2.5).abs() < 1e-9);
    }

    #[test]
    fn euclidean_distance() {
        assert_eq!(distance([0.0; 3], [3.0, 4.0, 0.0]), 5.0);
    }
}
