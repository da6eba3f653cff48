//! Easing curves for cinematic camera movements.
//!
//! Each curve maps linear time `t ∈ [0, 1]` to eased progress. Unknown
//! names fall back to `ease_in_out` with a warning.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use tracing::warn;

/// Named easing curves accepted by the shot generators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Easing {
    Linear,
    EaseIn,
    EaseOut,
    EaseInOut,
    Bounce,
    Elastic,
}

impl Easing {
    /// Parse a curve name, falling back to `ease_in_out` for unknown names.
    pub fn from_name(name: &str) -> Self {
        match name {
            "linear" => Easing::Linear,
            "ease_in" => Easing::EaseIn,
            "ease_out" => Easing::EaseOut,
            "ease_in_out" => Easing::EaseInOut,
            "bounce" => Easing::Bounce,
            "elastic" => Easing::Elastic,
            other => {
                warn!(easing = %other, "Unknown easing type, using ease_in_out");
                Easing::EaseInOut
            }
        }
    }

    /// Apply the curve to `t`.
    pub fn apply(self, t: f64) -> f64 {
        match self {
            Easing::Linear => t,
            Easing::EaseIn => t * t,
            Easing::EaseOut => 1.0 - (1.0 - t) * (1.0 - t),
            Easing::EaseInOut => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(2) / 2.0
                }
            }
            Easing::Bounce => bounce(t),
            Easing::Elastic => elastic(t),
        }
    }
}

impl Default for Easing {
    fn default() -> Self {
        Easing::EaseInOut
    }
}

fn bounce(mut t: f64) -> f64 {
    if t < 1.0 / 2.75 {
        7.5625 * t * t
    } else if t < 2.0 / 2.75 {
        t -= 1.5 / 2.75;
        7.5625 * t * t + 0.75
    } else if t < 2.5 / 2.75 {
        t -= 2.25 / 2.75;
        7.5625 * t * t + 0.9375
    } else {
        t -= 2.625 / 2.75;
        7.5625 * t * t + 0.984375
    }
}

fn elastic(t: f64) -> f64 {
    if t == 0.0 || t == 1.0 {
        return t;
    }
    -(2f64.powf(-10.0 * t)) * ((t - 0.1) * (2.0 * PI) / 0.4).sin() + 1.0
}

/// Sinusoidal curve shared by arc and orbit shots.
pub fn sinusoidal(t: f64) -> f64 {
    0.5 * (1.0 - (PI * t).cos())
}
