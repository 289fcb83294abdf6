//! Error types for recall-core.

use thiserror::Error;

/// Result type alias using ScheduleError.
pub type Result<T> = std::result::Result<T, ScheduleError>;

/// Errors raised while preparing input for the scheduler.
///
/// Scheduling itself is total; only parsing a grade can fail.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScheduleError {
    #[error("invalid grade \"{0}\": expected hard, good or easy")]
    InvalidGrade(String),
}
