//! Named style variants for shot generators.
//!
//! Styles give data-driven control over shot character: an arc can be
//! `gentle` or `dramatic`, a dolly can creep or float. Unknown style names
//! fall back to `standard`.

use crate::movement::Vec3;

/// Dolly approach curve shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApproachCurve {
    EaseInCubic,
    EaseOut,
    EaseInOutQuartic,
    EaseInOut,
}

/// Style parameters for dolly shots.
#[derive(Debug, Clone, Copy)]
pub struct DollyStyle {
    pub deceleration_factor: f64,
    pub approach_curve: ApproachCurve,
}

/// Resolve a dolly style by name.
pub fn dolly_style(name: &str) -> DollyStyle {
    match name {
        "creeping" => DollyStyle {
            deceleration_factor: 0.8,
            approach_curve: ApproachCurve::EaseInCubic,
        },
        "aggressive" => DollyStyle {
            deceleration_factor: 0.2,
            approach_curve: ApproachCurve::EaseOut,
        },
        "floating" => DollyStyle {
            deceleration_factor: 0.95,
            approach_curve: ApproachCurve::EaseInOutQuartic,
        },
        _ => DollyStyle {
            deceleration_factor: 0.5,
            approach_curve: ApproachCurve::EaseInOut,
        },
    }
}

/// Style parameters for arc shots.
#[derive(Debug, Clone, Copy)]
pub struct ArcStyle {
    pub curvature_intensity: f64,
    pub scene_focus_factor: f64,
}

/// Resolve an arc style by name.
pub fn arc_style(name: &str) -> ArcStyle {
    match name {
        "gentle" => ArcStyle {
            curvature_intensity: 0.15,
            scene_focus_factor: 0.3,
        },
        "dramatic" => ArcStyle {
            curvature_intensity: 0.4,
            scene_focus_factor: 1.0,
        },
        "smooth" => ArcStyle {
            curvature_intensity: 0.2,
            scene_focus_factor: 0.5,
        },
        _ => ArcStyle {
            curvature_intensity: 0.25,
            scene_focus_factor: 0.7,
        },
    }
}

/// Convert camera rotation angles to a look-at target.
///
/// `rotation` is `[pitch, yaw, roll]` in degrees. The combined Z·Y·X
/// rotation is applied to the local forward vector `(0, 0, -1)` and the
/// target sits `distance` units along the result.
pub fn rotation_to_target(position: Vec3, rotation: Vec3, distance: f64) -> Vec3 {
    let rx = rotation[0].to_radians();
    let ry = rotation[1].to_radians();

    let fx = ry.sin();
    let fy = -rx.sin() * ry.cos();
    let fz = -rx.cos() * ry.cos();

    [
        position[0] + fx * distance,
        position[1] + fy * distance,
        position[2] + fz * distance,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_styles_fall_back_to_standard() {
        let dolly = dolly_style("imaginary");
        assert_eq!(dolly.deceleration_factor, 0.5);
        assert_eq!(dolly.approach_curve, ApproachCurve::EaseInOut);

        let arc = arc_style("imaginary");
        assert_eq!(arc.curvature_intensity, 0.25);
    }

    #[test]
    fn named_styles_resolve() {
        assert_eq!(dolly_style("creeping").deceleration_factor, 0.8);
        assert_eq!(
            dolly_style("floating").approach_curve,
            ApproachCurve::EaseInOutQuartic
        );
        assert_eq!(arc_style("dramatic").curvature_intensity, 0.4);
        assert_eq!(arc_style("gentle").scene_focus_factor, 0.3);
    }

    #[test]
    fn zero_rotation_looks_down_negative_z() {
        let target = rotation_to_target([1.0, 2.0, 3.0], [0.0, 0.0, 0.0], 10.0);
        assert!((target[0] - 1.0).abs() < 1e-9);
        assert!((target[1] - 2.0).abs() < 1e-9);
        assert!((target[2] - (3.0 - 10.0)).abs() < 1e-9);
    }

    #[test]
    fn yaw_rotates_forward_toward_x() {
        let target = rotation_to_target([0.0; 3], [0.0, 90.0, 0.0], 10.0);
        assert!((target[0] - 10.0).abs() < 1e-9);
        assert!(target[2].abs() < 1e-9);
    }
}
