//! Core scheduling library for the recall backend.
//!
//! Provides:
//! - The leveled spaced repetition scheduler
//! - Shared types (Difficulty, Grade, ReviewOutcome)
//! - Grade parsing errors

pub mod error;
pub mod scheduler;
pub mod types;

pub use error::{Result, ScheduleError};
pub use scheduler::{schedule, Scheduler};
pub use types::{is_due, Difficulty, Grade, ReviewOutcome};
