//! Spaced repetition scheduling for flashcards
//!
//! This module provides:
//! - A pluggable memory model (FSRS by default)
//! - Learning step ladders and graduation
//! - The review state machine composing the two
//! - Session-scoped step positions and single-review undo
//! - JSON storage and scheduler settings

pub mod algorithm;
pub mod config;
pub mod error;
pub mod models;
pub mod review;
pub mod scheduler;
pub mod session;
pub mod steps;
pub mod storage;
pub mod undo;

pub use algorithm::{format_interval, Fsrs, MemoryModel};
pub use config::{resolve_step_ladder, DeckConfigSource, FsrsSettings, SchedulerSettings, StepLadderConfig};
pub use error::{ConfigError, LadderKind, ReviewError, ReviewResult};
pub use models::*;
pub use review::ReviewService;
pub use scheduler::{RatingPreview, ReviewScheduler};
pub use session::{SessionId, SessionStepRegistry, SessionStepState, SessionSteps};
pub use steps::{schedule_step, StepOutcome};
pub use storage::{CardStore, FlashcardStorage, StorageError};
pub use undo::{ReviewSnapshot, ReviewUndoStack};
