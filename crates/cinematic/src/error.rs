//! Error types for the cinematic engine.

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum CinematicError {
    #[error("{0}")]
    Validation(String),

    #[error("Unknown operation: {0}")]
    UnknownOperation(String),

    #[error("Queue is full (max {max} movements)")]
    QueueFull { max: usize },

    #[error("Movement not found in queue: {0}")]
    MovementNotFound(String),

    #[error("Cannot remove active movement: {0}. Use stop_movement instead.")]
    MovementActive(String),

    #[error("Invalid queue state transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    #[error("No movements in queue to start")]
    QueueEmpty,
}

impl CinematicError {
    pub fn invalid(message: impl Into<String>) -> Self {
        CinematicError::Validation(message.into())
    }
}
