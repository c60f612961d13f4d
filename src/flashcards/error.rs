//! Scheduler error types

use std::fmt;

use thiserror::Error;
use uuid::Uuid;

use super::storage::StorageError;

/// Which step ladder a configuration problem refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LadderKind {
    Learning,
    Relearning,
}

impl fmt::Display for LadderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LadderKind::Learning => f.write_str("learning steps"),
            LadderKind::Relearning => f.write_str("relearning steps"),
        }
    }
}

/// Errors raised while loading or validating scheduler settings
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must contain at least one step")]
    EmptyLadder(LadderKind),

    #[error("{ladder} step {index} is invalid: {minutes} minutes")]
    InvalidStep {
        ladder: LadderKind,
        index: usize,
        minutes: f64,
    },

    #[error("{field} must be at least 1 day, got {value}")]
    InvalidInterval { field: &'static str, value: f64 },

    #[error("Desired retention must be between 0 and 1, got {0}")]
    InvalidRetention(f64),

    #[error("Maximum interval must be at least 1 day")]
    InvalidMaximumInterval,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors surfaced by a review session
#[derive(Debug, Error)]
pub enum ReviewError {
    #[error("Session not found: {0}")]
    SessionNotFound(Uuid),

    #[error("Session {0} has no card left to review")]
    SessionFinished(Uuid),

    #[error("Card {0} has a review that has not been saved yet")]
    PendingSave(Uuid),

    #[error("Failed to save card: {0}")]
    Persistence(#[from] StorageError),
}

pub type ReviewResult<T> = Result<T, ReviewError>;
