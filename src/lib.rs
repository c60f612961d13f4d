//! Review scheduling core for Nous flashcards.
//!
//! Decides when each card is shown next by combining a memory model with
//! short learning step ladders, and keeps enough history to undo a review.

pub mod flashcards;

pub use flashcards::{
    ConfigError, Fsrs, MemoryModel, Rating, ReviewCard, ReviewError, ReviewScheduler,
    ReviewService, SchedulerSettings, StepLadderConfig,
};
