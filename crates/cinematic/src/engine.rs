//! Tick-driven execution of queued movements.
//!
//! The engine owns the shot queue behind a lock and advances it from the
//! host update tick: start the next queued movement when running with no
//! active one, interpolate the active movement's keyframes, and apply
//! `(position, target)` pairs through the camera-apply callback. There is
//! no back-reference to a camera controller; callers hand in a closure.

use crate::error::CinematicError;
use crate::generators::{self, SceneContext};
use crate::movement::{MovementState, ShotOperation, Vec3};
use crate::queue::{QueueStatus, ShotQueue, StopSummary};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tracing::{error, info};

pub use crate::generators::NullScene;

/// Applies an interpolated pose to the viewport camera. Invoked only from
/// the update tick.
pub type CameraApply = Box<dyn Fn(Vec3, Vec3) + Send + Sync>;

/// Movements longer than this are rejected at start.
const MAX_DURATION_SECS: f64 = 60.0;

/// Queued camera-movement engine driven by the host update tick.
pub struct CinematicEngine {
    queue: Mutex<ShotQueue>,
    apply: CameraApply,
    scene: Arc<dyn SceneContext>,
}

impl CinematicEngine {
    pub fn new(apply: CameraApply, scene: Arc<dyn SceneContext>) -> Self {
        Self {
            queue: Mutex::new(ShotQueue::new()),
            apply,
            scene,
        }
    }

    /// Queue a movement. Returns its position in the queue.
    pub fn add_movement(
        &self,
        movement_id: &str,
        operation: &str,
        params: Value,
    ) -> Result<usize, CinematicError> {
        let operation = ShotOperation::parse(operation)?;
        let mut queue = self.lock();
        let position = queue.add_movement(movement_id, operation, params)?;
        info!(movement_id, operation = operation.as_str(), position, "Movement queued");
        Ok(position)
    }

    /// Remove a queued (never active) movement.
    pub fn remove_movement(&self, movement_id: &str) -> Result<(), CinematicError> {
        self.lock().remove_movement(movement_id)
    }

    /// Start or resume queue processing.
    pub fn play(&self) -> Result<Value, CinematicError> {
        let mut queue = self.lock();
        let state = queue.play()?;
        Ok(json!({
            "success": true,
            "message": "Queue processing started",
            "queue_state": state.as_str(),
        }))
    }

    /// Pause: the active movement finishes, nothing new starts.
    pub fn pause(&self) -> Result<Value, CinematicError> {
        let mut queue = self.lock();
        let state = queue.pause()?;
        Ok(json!({
            "success": true,
            "message": "Queue paused - active movement continues, no new movements start",
            "queue_state": state.as_str(),
            "active_movement_continues": queue.active().is_some(),
        }))
    }

    /// Stop and clear the queue. The active movement's remaining frames are
    /// discarded; its final keyframe is not applied.
    pub fn stop(&self) -> StopSummary {
        self.lock().stop()
    }

    /// Stop only the active movement, leaving the queue and state alone.
    pub fn stop_movement(&self) -> Option<String> {
        self.lock().clear_active()
    }

    /// Stored queue state.
    pub fn state(&self) -> crate::queue::QueueState {
        self.lock().state()
    }

    /// Queue status snapshot.
    pub fn status(&self, now: Instant) -> QueueStatus {
        self.lock().status(now)
    }

    /// Status for a single movement: active, queued, or not found.
    pub fn movement_status(&self, movement_id: &str, now: Instant) -> Result<Value, CinematicError> {
        let queue = self.lock();
        if let Some(active) = queue.active() {
            if active.movement_id == movement_id {
                return Ok(json!({
                    "success": true,
                    "movement_id": movement_id,
                    "status": "active",
                    "operation": active.operation.as_str(),
                    "progress": active.progress_at(now),
                    "remaining_time": active.remaining_at(now),
                    "current_frame": active.current_frame,
                    "total_frames": active.keyframes.len(),
                }));
            }
        }
        let status = queue.status(now);
        if let Some(queued) = status
            .queued_shots
            .iter()
            .find(|shot| shot.movement_id == movement_id)
        {
            return Ok(json!({
                "success": true,
                "movement_id": movement_id,
                "status": "queued",
                "operation": queued.operation,
                "position": queued.position,
                "estimated_start_time": queued.estimated_start_time,
            }));
        }
        Err(CinematicError::MovementNotFound(movement_id.to_string()))
    }

    /// Advance the engine by one tick. Runs on the main thread.
    ///
    /// Order per tick: finish or interpolate the active movement, then start
    /// the next queued movement when the queue is running.
    pub fn tick(&self, now: Instant) {
        let mut queue = self.lock();

        let completed = match queue.active_mut() {
            Some(active) => {
                let elapsed = now.duration_since(active.start_time).as_secs_f64();
                if elapsed >= active.duration_seconds {
                    if let Some(last) = active.keyframes.last() {
                        (self.apply)(last.position, last.target);
                    }
                    true
                } else {
                    let progress = elapsed / active.duration_seconds;
                    let index = ((progress * active.keyframes.len() as f64) as usize)
                        .min(active.keyframes.len().saturating_sub(1));
                    let frame = &active.keyframes[index];
                    (self.apply)(frame.position, frame.target);
                    active.current_frame = index;
                    false
                }
            }
            None => false,
        };
        if completed {
            if let Some(movement_id) = queue.clear_active() {
                info!(movement_id, "Completed cinematic movement");
            }
        }

        if queue.state() == crate::queue::QueueState::Running && queue.active().is_none() {
            if let Some(next) = queue.take_next() {
                match self.start_movement(&next.movement_id, next.operation, &next.params, now) {
                    Ok(movement) => {
                        if let Some(first) = movement.keyframes.first() {
                            (self.apply)(first.position, first.target);
                        }
                        info!(
                            movement_id = %movement.movement_id,
                            operation = movement.operation.as_str(),
                            duration = movement.duration_seconds,
                            "Started cinematic movement"
                        );
                        queue.set_active(movement);
                    }
                    Err(e) => {
                        error!(
                            movement_id = %next.movement_id,
                            error = %e,
                            "Failed to start movement, queue entering error state"
                        );
                        queue.mark_error();
                    }
                }
            }
        }
    }

    fn start_movement(
        &self,
        movement_id: &str,
        operation: ShotOperation,
        params: &Value,
        now: Instant,
    ) -> Result<MovementState, CinematicError> {
        let plan = generators::generate(operation, params, self.scene.as_ref())?;
        if plan.duration_seconds > MAX_DURATION_SECS {
            return Err(CinematicError::invalid(format!(
                "duration must be at most {MAX_DURATION_SECS} seconds, got: {}",
                plan.duration_seconds
            )));
        }
        Ok(MovementState {
            movement_id: movement_id.to_string(),
            operation,
            params: params.clone(),
            start_time: now,
            duration_seconds: plan.duration_seconds,
            keyframes: plan.keyframes,
            current_frame: 0,
        })
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ShotQueue> {
        self.queue.lock().unwrap_or_else(|e| e.into_inner())
    }
}
