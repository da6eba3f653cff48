//! Shot queue state machine and status reporting.

use crate::error::CinematicError;
use crate::generators::estimate_duration;
use crate::movement::{MovementState, ShotOperation};
use serde::Serialize;
use serde_json::Value;
use std::collections::VecDeque;
use std::time::Instant;
use tracing::info;

/// Maximum queued movements (one active plus nine waiting).
pub const MAX_QUEUE_SIZE: usize = 10;

/// Stored queue states. `pending` is never stored; it is inferred by
/// [`ShotQueue::effective_state`] when the queue is idle with items waiting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueState {
    Idle,
    Running,
    Paused,
    Stopped,
    Error,
}

impl QueueState {
    pub fn as_str(self) -> &'static str {
        match self {
            QueueState::Idle => "idle",
            QueueState::Running => "running",
            QueueState::Paused => "paused",
            QueueState::Stopped => "stopped",
            QueueState::Error => "error",
        }
    }

    /// Valid targets for a user-initiated transition.
    fn valid_targets(self) -> &'static [QueueState] {
        match self {
            QueueState::Idle => &[QueueState::Running, QueueState::Stopped],
            QueueState::Running => &[QueueState::Paused, QueueState::Stopped, QueueState::Idle],
            QueueState::Paused => &[QueueState::Running, QueueState::Stopped, QueueState::Idle],
            QueueState::Stopped => &[QueueState::Idle, QueueState::Running],
            QueueState::Error => &[QueueState::Idle, QueueState::Stopped],
        }
    }

    pub fn can_transition(self, to: QueueState) -> bool {
        self.valid_targets().contains(&to)
    }
}

/// A movement waiting in the queue.
#[derive(Debug, Clone)]
pub struct PendingMovement {
    pub movement_id: String,
    pub operation: ShotOperation,
    pub params: Value,
}

/// Status of the currently-active shot.
#[derive(Debug, Clone, Serialize)]
pub struct ActiveShotStatus {
    pub movement_id: String,
    pub operation: &'static str,
    pub progress: f64,
    pub remaining_time: f64,
    pub total_duration: f64,
    pub current_frame: usize,
    pub total_frames: usize,
}

/// Status of one queued shot.
#[derive(Debug, Clone, Serialize)]
pub struct QueuedShotStatus {
    pub movement_id: String,
    pub operation: &'static str,
    pub estimated_duration: f64,
    pub estimated_start_time: f64,
    pub position: usize,
}

/// Comprehensive queue status.
#[derive(Debug, Clone, Serialize)]
pub struct QueueStatus {
    pub queue_state: &'static str,
    pub active_shots: Vec<ActiveShotStatus>,
    pub active_count: usize,
    pub queued_shots: Vec<QueuedShotStatus>,
    pub queued_count: usize,
    pub total_duration: f64,
    pub estimated_remaining: f64,
}

/// Summary returned by a stop operation.
#[derive(Debug, Clone, Serialize)]
pub struct StopSummary {
    pub cleared_active_movement: Option<String>,
    pub cleared_queue_size: usize,
}

/// Ordered movement queue with at most one active movement.
///
/// Pausing never interrupts the active movement: it finishes its pass, but
/// nothing new starts until `play`. Only the main thread (or its lock
/// holder) mutates this structure.
pub struct ShotQueue {
    state: QueueState,
    pending: VecDeque<PendingMovement>,
    active: Option<MovementState>,
}

impl ShotQueue {
    pub fn new() -> Self {
        Self {
            state: QueueState::Idle,
            pending: VecDeque::new(),
            active: None,
        }
    }

    pub fn state(&self) -> QueueState {
        self.state
    }

    pub fn active(&self) -> Option<&MovementState> {
        self.active.as_ref()
    }

    pub fn active_mut(&mut self) -> Option<&mut MovementState> {
        self.active.as_mut()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// The state reported to callers: `pending` when idle with items
    /// waiting, `idle` when running with nothing left.
    pub fn effective_state(&self) -> &'static str {
        let has_work = self.active.is_some() || !self.pending.is_empty();
        match self.state {
            QueueState::Running if !has_work => "idle",
            QueueState::Paused if !has_work => "idle",
            QueueState::Idle if has_work => "pending",
            other => other.as_str(),
        }
    }

    fn transition(&mut self, to: QueueState) -> Result<(), CinematicError> {
        if !self.state.can_transition(to) {
            return Err(CinematicError::InvalidTransition {
                from: self.state.as_str().to_string(),
                to: to.as_str().to_string(),
            });
        }
        info!(from = self.state.as_str(), to = to.as_str(), "Queue state transition");
        self.state = to;
        Ok(())
    }

    /// Append a movement. Fails without side effects when full.
    pub fn add_movement(
        &mut self,
        movement_id: &str,
        operation: ShotOperation,
        params: Value,
    ) -> Result<usize, CinematicError> {
        if self.pending.len() >= MAX_QUEUE_SIZE {
            return Err(CinematicError::QueueFull {
                max: MAX_QUEUE_SIZE,
            });
        }
        self.pending.push_back(PendingMovement {
            movement_id: movement_id.to_string(),
            operation,
            params,
        });
        Ok(self.pending.len())
    }

    /// Remove a queued movement by id. The active movement cannot be
    /// removed; callers use `stop_movement` for that.
    pub fn remove_movement(&mut self, movement_id: &str) -> Result<(), CinematicError> {
        if let Some(index) = self
            .pending
            .iter()
            .position(|m| m.movement_id == movement_id)
        {
            self.pending.remove(index);
            return Ok(());
        }
        if self
            .active
            .as_ref()
            .is_some_and(|m| m.movement_id == movement_id)
        {
            return Err(CinematicError::MovementActive(movement_id.to_string()));
        }
        Err(CinematicError::MovementNotFound(movement_id.to_string()))
    }

    /// Start or resume queue processing.
    pub fn play(&mut self) -> Result<QueueState, CinematicError> {
        match self.state {
            QueueState::Running => Ok(self.state),
            QueueState::Paused => {
                self.transition(QueueState::Running)?;
                Ok(self.state)
            }
            QueueState::Idle | QueueState::Stopped => {
                if self.pending.is_empty() && self.active.is_none() {
                    return Err(CinematicError::QueueEmpty);
                }
                self.transition(QueueState::Running)?;
                Ok(self.state)
            }
            QueueState::Error => Err(CinematicError::InvalidTransition {
                from: self.state.as_str().to_string(),
                to: QueueState::Running.as_str().to_string(),
            }),
        }
    }

    /// Pause: the active movement continues its pass, nothing new starts.
    pub fn pause(&mut self) -> Result<QueueState, CinematicError> {
        self.transition(QueueState::Paused)?;
        Ok(self.state)
    }

    /// Stop and clear everything. Idempotent; the active movement's final
    /// keyframe is not applied.
    pub fn stop(&mut self) -> StopSummary {
        let cleared_active_movement = self.active.take().map(|m| m.movement_id);
        let cleared_queue_size = self.pending.len();
        self.pending.clear();
        self.state = QueueState::Stopped;
        info!(
            cleared = cleared_queue_size,
            active = ?cleared_active_movement,
            "Queue stopped and cleared"
        );
        StopSummary {
            cleared_active_movement,
            cleared_queue_size,
        }
    }

    /// Pop the next queued movement for activation.
    pub fn take_next(&mut self) -> Option<PendingMovement> {
        self.pending.pop_front()
    }

    pub fn set_active(&mut self, movement: MovementState) {
        self.active = Some(movement);
    }

    /// Clear the active movement, returning its id.
    pub fn clear_active(&mut self) -> Option<String> {
        self.active.take().map(|m| m.movement_id)
    }

    /// Record a non-fatal scheduler failure: the offending movement is gone
    /// and the queue enters the error state until stopped.
    pub fn mark_error(&mut self) {
        self.state = QueueState::Error;
    }

    /// Comprehensive status snapshot at `now`.
    pub fn status(&self, now: Instant) -> QueueStatus {
        let mut active_shots = Vec::new();
        if let Some(active) = &self.active {
            active_shots.push(ActiveShotStatus {
                movement_id: active.movement_id.clone(),
                operation: active.operation.as_str(),
                progress: active.progress_at(now),
                remaining_time: active.remaining_at(now),
                total_duration: active.duration_seconds,
                current_frame: active.current_frame,
                total_frames: active.keyframes.len(),
            });
        }

        let mut queued_shots = Vec::new();
        let mut estimated_start_time = active_shots
            .first()
            .map(|shot| shot.remaining_time)
            .unwrap_or(0.0);
        for (i, pending) in self.pending.iter().enumerate() {
            let estimated_duration = estimate_duration(pending.operation, &pending.params);
            queued_shots.push(QueuedShotStatus {
                movement_id: pending.movement_id.clone(),
                operation: pending.operation.as_str(),
                estimated_duration,
                estimated_start_time,
                position: i + 1,
            });
            estimated_start_time += estimated_duration;
        }

        let total_duration = queued_shots
            .iter()
            .map(|shot| shot.estimated_duration)
            .sum::<f64>()
            + active_shots
                .first()
                .map(|shot| shot.remaining_time)
                .unwrap_or(0.0);

        QueueStatus {
            queue_state: self.effective_state(),
            active_count: active_shots.len(),
            active_shots,
            queued_count: queued_shots.len(),
            queued_shots,
            total_duration,
            estimated_remaining: total_duration,
        }
    }
}

impl Default for ShotQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn movement_params() -> Value {
        json!({
            "start_position": [0, 0, 0],
            "end_position": [10, 0, 0],
            "duration": 1.0,
        })
    }

    #[test]
    fn capacity_is_enforced_without_mutation() {
        let mut queue = ShotQueue::new();
        for i in 0..MAX_QUEUE_SIZE {
            queue
                .add_movement(&format!("m{i}"), ShotOperation::SmoothMove, movement_params())
                .unwrap();
        }
        let err = queue
            .add_movement("overflow", ShotOperation::SmoothMove, movement_params())
            .unwrap_err();
        assert_eq!(err, CinematicError::QueueFull { max: MAX_QUEUE_SIZE });
        assert_eq!(queue.pending_len(), MAX_QUEUE_SIZE);
        assert_eq!(queue.state(), QueueState::Idle);
    }

    #[test]
    fn play_requires_queued_work() {
        let mut queue = ShotQueue::new();
        assert_eq!(queue.play().unwrap_err(), CinematicError::QueueEmpty);

        queue
            .add_movement("m1", ShotOperation::SmoothMove, movement_params())
            .unwrap();
        assert_eq!(queue.play().unwrap(), QueueState::Running);
        // Playing again is a no-op success.
        assert_eq!(queue.play().unwrap(), QueueState::Running);
    }

    #[test]
    fn state_machine_closure() {
        use QueueState::*;
        let table: &[(QueueState, &[QueueState])] = &[
            (Idle, &[Running, Stopped]),
            (Running, &[Paused, Stopped, Idle]),
            (Paused, &[Running, Stopped, Idle]),
            (Stopped, &[Idle, Running]),
            (Error, &[Idle, Stopped]),
        ];
        for (from, allowed) in table {
            for to in [Idle, Running, Paused, Stopped] {
                assert_eq!(
                    from.can_transition(to),
                    allowed.contains(&to),
                    "{from:?} -> {to:?}"
                );
            }
        }
    }

    #[test]
    fn invalid_transition_has_no_side_effect() {
        let mut queue = ShotQueue::new();
        let err = queue.pause().unwrap_err();
        assert!(matches!(err, CinematicError::InvalidTransition { .. }));
        assert_eq!(queue.state(), QueueState::Idle);
    }

    #[test]
    fn stop_is_idempotent() {
        let mut queue = ShotQueue::new();
        queue
            .add_movement("m1", ShotOperation::SmoothMove, movement_params())
            .unwrap();
        queue.play().unwrap();

        let first = queue.stop();
        assert_eq!(first.cleared_queue_size, 1);
        assert_eq!(queue.state(), QueueState::Stopped);

        let second = queue.stop();
        assert_eq!(second.cleared_queue_size, 0);
        assert_eq!(queue.state(), QueueState::Stopped);
        assert_eq!(queue.pending_len(), 0);
    }

    #[test]
    fn error_state_clears_via_stop() {
        let mut queue = ShotQueue::new();
        queue.mark_error();
        assert_eq!(queue.state(), QueueState::Error);
        assert!(matches!(queue.play(), Err(CinematicError::InvalidTransition { .. })));
        queue.stop();
        assert_eq!(queue.state(), QueueState::Stopped);
    }

    #[test]
    fn effective_state_inference() {
        let mut queue = ShotQueue::new();
        assert_eq!(queue.effective_state(), "idle");

        queue
            .add_movement("m1", ShotOperation::SmoothMove, movement_params())
            .unwrap();
        assert_eq!(queue.effective_state(), "pending");

        queue.play().unwrap();
        assert_eq!(queue.effective_state(), "running");

        queue.take_next().unwrap();
        assert_eq!(queue.effective_state(), "idle");
    }

    #[test]
    fn remove_only_touches_queued_movements() {
        let mut queue = ShotQueue::new();
        queue
            .add_movement("m1", ShotOperation::SmoothMove, movement_params())
            .unwrap();
        queue
            .add_movement("m2", ShotOperation::ArcShot, movement_params())
            .unwrap();

        queue.remove_movement("m1").unwrap();
        assert_eq!(queue.pending_len(), 1);
        assert_eq!(
            queue.remove_movement("m1").unwrap_err(),
            CinematicError::MovementNotFound("m1".into())
        );
    }

    #[test]
    fn status_estimates_start_times() {
        let mut queue = ShotQueue::new();
        queue
            .add_movement("m1", ShotOperation::SmoothMove, movement_params())
            .unwrap();
        queue
            .add_movement(
                "m2",
                ShotOperation::SmoothMove,
                json!({"start_position": [0, 0, 0], "end_position": [10, 0, 0], "duration": 2.0}),
            )
            .unwrap();

        let status = queue.status(Instant::now());
        assert_eq!(status.queued_count, 2);
        assert_eq!(status.queued_shots[0].estimated_start_time, 0.0);
        assert_eq!(status.queued_shots[1].estimated_start_time, 1.0);
        assert_eq!(status.total_duration, 3.0);
        assert_eq!(status.queue_state, "pending");
    }
}
