//! Cinematic camera movement engine for AgentWorld.
//!
//! Turns shot descriptions (smooth moves, arcs, orbits, dollies, pan/tilts)
//! into precomputed keyframe sequences, queues them for ordered execution,
//! and advances the active movement on every host update tick. The engine
//! never touches the viewport directly; callers pass an apply callback
//! receiving `(position, target)` pairs.

pub mod duration;
pub mod easing;
pub mod engine;
pub mod error;
pub mod generators;
pub mod movement;
pub mod queue;
pub mod styles;

pub use engine::{CameraApply, CinematicEngine};
pub use error::CinematicError;
pub use generators::{GeneratedPlan, NullScene, SceneContext};
pub use movement::{Keyframe, MovementState, ShotOperation, Vec3};
pub use queue::{QueueState, QueueStatus, ShotQueue, MAX_QUEUE_SIZE};
