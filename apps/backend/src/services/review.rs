//! Turns a submitted review into the card's next scheduling state.

use chrono::{DateTime, Duration, Utc};
use recall_core::{Difficulty, Grade, ScheduleError, Scheduler};

use crate::error::{ApiError, Result};
use crate::models::{PlannedReview, ReviewPayload};

/// Shortest interval a client-computed schedule may ask for
const MIN_INTERVAL_DAYS: i64 = 1;

/// Read a grade from its JSON form; anything but a known string is invalid.
pub fn parse_grade(value: &serde_json::Value) -> std::result::Result<Grade, ScheduleError> {
    match value.as_str() {
        Some(raw) => raw.parse(),
        None => Err(ScheduleError::InvalidGrade(value.to_string())),
    }
}

/// Decide the next difficulty and due date for a card currently at `current`.
///
/// Graded reviews go through the scheduler. Precomputed values from a client
/// are accepted with the difficulty clamped, but a due date less than a day
/// after `now` is rejected.
pub fn plan_review(
    scheduler: &Scheduler,
    current: Difficulty,
    payload: &ReviewPayload,
    now: DateTime<Utc>,
) -> Result<PlannedReview> {
    match payload {
        ReviewPayload::Graded { grade } => {
            let grade = parse_grade(grade)?;
            let outcome = scheduler.schedule(current, grade, now);
            Ok(PlannedReview {
                grade: Some(grade),
                previous_difficulty: current,
                next_difficulty: outcome.next_difficulty,
                next_due_at: outcome.next_due_at,
                interval_days: Some(outcome.interval_days),
            })
        }
        ReviewPayload::Precomputed {
            new_difficulty,
            new_review_due_at,
        } => {
            let too_soon = now
                .checked_add_signed(Duration::days(MIN_INTERVAL_DAYS))
                .map_or(true, |earliest| *new_review_due_at < earliest);
            if too_soon {
                return Err(ApiError::BadRequest(format!(
                    "new_review_due_at {} must be at least {} day after the review",
                    new_review_due_at.to_rfc3339(),
                    MIN_INTERVAL_DAYS
                )));
            }
            Ok(PlannedReview {
                grade: None,
                previous_difficulty: current,
                next_difficulty: Difficulty::clamped(*new_difficulty),
                next_due_at: *new_review_due_at,
                interval_days: None,
            })
        }
    }
}
