//! Core types shared by the scheduler and its callers.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ScheduleError;

/// Mastery level of a card, always within `[0, 5]`.
///
/// 0 is a brand new (or repeatedly failed) card, 5 is fully mastered.
/// Any integer can be turned into a `Difficulty`; values outside the range
/// are clamped rather than rejected, and deserialization clamps the same way.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(from = "i64", into = "u8")]
pub struct Difficulty(u8);

impl Difficulty {
    pub const MIN: Difficulty = Difficulty(0);
    pub const MAX: Difficulty = Difficulty(5);

    /// Build a difficulty, clamping `value` into `[MIN, MAX]`.
    pub fn clamped(value: i64) -> Self {
        Self(value.clamp(Self::MIN.0 as i64, Self::MAX.0 as i64) as u8)
    }

    pub fn value(self) -> u8 {
        self.0
    }

    /// One level easier to recall, saturating at `MAX`.
    pub fn raised(self) -> Self {
        Self::clamped(self.0 as i64 + 1)
    }

    /// One level back, saturating at `MIN`.
    pub fn lowered(self) -> Self {
        Self::clamped(self.0 as i64 - 1)
    }
}

impl From<i64> for Difficulty {
    fn from(value: i64) -> Self {
        Self::clamped(value)
    }
}

impl From<Difficulty> for u8 {
    fn from(difficulty: Difficulty) -> Self {
        difficulty.0
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Learner's self-reported recall quality for one review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", try_from = "String")]
pub enum Grade {
    Hard,
    Good,
    Easy,
}

impl Grade {
    pub const ALL: [Grade; 3] = [Grade::Hard, Grade::Good, Grade::Easy];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Hard => "hard",
            Self::Good => "good",
            Self::Easy => "easy",
        }
    }
}

impl FromStr for Grade {
    type Err = ScheduleError;

    /// Parse a grade, ignoring surrounding whitespace and ASCII case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hard" => Ok(Self::Hard),
            "good" => Ok(Self::Good),
            "easy" => Ok(Self::Easy),
            _ => Err(ScheduleError::InvalidGrade(s.to_string())),
        }
    }
}

impl TryFrom<&str> for Grade {
    type Error = ScheduleError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl TryFrom<String> for Grade {
    type Error = ScheduleError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Next review state of a card, as computed by the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewOutcome {
    pub next_difficulty: Difficulty,
    pub next_due_at: DateTime<Utc>,
    /// Whole days scheduled. `next_due_at` is this far from the review
    /// unless it saturated at the latest representable instant.
    pub interval_days: u32,
}

/// A card is due once the reference time reaches its due date.
pub fn is_due(due_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    now >= due_at
}
