//! Leveled spaced repetition scheduler.
//!
//! Difficulty doubles as a mastery counter and an interval multiplier:
//! - `hard` drops one level and brings the card back tomorrow
//! - `good` keeps the level and spaces the card by `level * 2` days
//! - `easy` raises one level and spaces the card by at least a week
//!
//! Above `compounding_above`, the base interval is multiplied by the level
//! again, so well-known cards spread out geometrically.

use chrono::{DateTime, Duration, Utc};

use crate::types::{Difficulty, Grade, ReviewOutcome};

/// Scheduler constants. `Default` holds the production policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scheduler {
    pub hard_days: u32,
    pub good_step_days: u32,
    pub good_min_days: u32,
    pub easy_step_days: u32,
    pub easy_min_days: u32,
    pub compounding_above: u8,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self {
            hard_days: 1,
            good_step_days: 2,
            good_min_days: 1,
            easy_step_days: 4,
            easy_min_days: 7,
            compounding_above: 2,
        }
    }
}

impl Scheduler {
    /// Compute the next difficulty and due date for a review at `now`.
    pub fn schedule(&self, current: Difficulty, grade: Grade, now: DateTime<Utc>) -> ReviewOutcome {
        let (next_difficulty, interval_days) = match grade {
            Grade::Hard => (current.lowered(), self.hard_days),
            Grade::Good => {
                let base = (current.value() as u32)
                    .saturating_mul(self.good_step_days)
                    .max(self.good_min_days);
                (current, self.compound(base, current))
            }
            Grade::Easy => {
                let next = current.raised();
                let base = (next.value() as u32)
                    .saturating_mul(self.easy_step_days)
                    .max(self.easy_min_days);
                (next, self.compound(base, next))
            }
        };

        // Whole days only, and never less than one.
        let interval_days = interval_days.max(1);

        // Saturates at the latest representable instant.
        let next_due_at = Duration::try_days(interval_days as i64)
            .and_then(|interval| now.checked_add_signed(interval))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        ReviewOutcome {
            next_difficulty,
            next_due_at,
            interval_days,
        }
    }

    fn compound(&self, base: u32, level: Difficulty) -> u32 {
        if level.value() > self.compounding_above {
            base.saturating_mul(level.value() as u32)
        } else {
            base
        }
    }
}

/// Schedule with the default policy.
pub fn schedule(current: Difficulty, grade: Grade, now: DateTime<Utc>) -> ReviewOutcome {
    Scheduler::default().schedule(current, grade, now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn jan_first() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    fn levels() -> impl Iterator<Item = Difficulty> {
        (0..=5).map(Difficulty::clamped)
    }

    fn interval(outcome: &ReviewOutcome, now: DateTime<Utc>) -> i64 {
        (outcome.next_due_at - now).num_days()
    }

    #[test]
    fn hard_lowers_one_level_and_returns_tomorrow() {
        let now = jan_first();
        for d in levels() {
            let outcome = schedule(d, Grade::Hard, now);
            assert_eq!(outcome.next_difficulty.value(), d.value().saturating_sub(1));
            assert_eq!(outcome.next_due_at - now, Duration::days(1));
            assert_eq!(outcome.interval_days, 1);
        }
    }

    #[test]
    fn good_keeps_level_and_waits_at_least_a_day() {
        let now = jan_first();
        for d in levels() {
            let outcome = schedule(d, Grade::Good, now);
            assert_eq!(outcome.next_difficulty, d);
            assert!(interval(&outcome, now) >= 1);
        }
    }

    #[test]
    fn good_intervals_per_level() {
        let now = jan_first();
        let days: Vec<u32> = levels()
            .map(|d| schedule(d, Grade::Good, now).interval_days)
            .collect();
        assert_eq!(days, vec![1, 2, 4, 18, 32, 50]);
    }

    #[test]
    fn easy_raises_level_and_waits_at_least_a_week() {
        let now = jan_first();
        for d in levels() {
            let outcome = schedule(d, Grade::Easy, now);
            assert_eq!(outcome.next_difficulty.value(), (d.value() + 1).min(5));
            assert!(interval(&outcome, now) >= 7);
        }
    }

    #[test]
    fn easy_intervals_grow_with_level() {
        let now = jan_first();
        let days: Vec<u32> = levels()
            .map(|d| schedule(d, Grade::Easy, now).interval_days)
            .collect();
        assert_eq!(days, vec![7, 8, 36, 64, 100, 100]);
        for pair in days[..5].windows(2) {
            assert!(pair[1] > pair[0], "easy interval must grow: {:?}", pair);
        }
    }

    #[test]
    fn hard_at_floor_stays_at_zero() {
        let outcome = schedule(Difficulty::MIN, Grade::Hard, jan_first());
        assert_eq!(outcome.next_difficulty, Difficulty::MIN);
        assert_eq!(outcome.interval_days, 1);
    }

    #[test]
    fn easy_at_ceiling_stays_at_five() {
        let outcome = schedule(Difficulty::MAX, Grade::Easy, jan_first());
        assert_eq!(outcome.next_difficulty, Difficulty::MAX);
        assert_eq!(outcome.interval_days, 100);
    }

    #[test]
    fn good_at_level_two_does_not_compound() {
        let outcome = schedule(Difficulty::clamped(2), Grade::Good, jan_first());
        assert_eq!(outcome.next_difficulty.value(), 2);
        assert_eq!(
            outcome.next_due_at,
            Utc.with_ymd_and_hms(2024, 1, 5, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn easy_at_level_three_compounds() {
        let outcome = schedule(Difficulty::clamped(3), Grade::Easy, jan_first());
        assert_eq!(outcome.next_difficulty.value(), 4);
        assert_eq!(outcome.interval_days, 64);
        assert_eq!(
            outcome.next_due_at,
            Utc.with_ymd_and_hms(2024, 3, 5, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn preserves_time_of_day() {
        let now = Utc.with_ymd_and_hms(2024, 6, 30, 17, 45, 10).unwrap();
        let outcome = schedule(Difficulty::clamped(1), Grade::Good, now);
        assert_eq!(
            outcome.next_due_at,
            Utc.with_ymd_and_hms(2024, 7, 2, 17, 45, 10).unwrap()
        );
    }

    #[test]
    fn out_of_range_input_is_clamped_first() {
        let now = jan_first();
        let high = schedule(Difficulty::clamped(12), Grade::Easy, now);
        assert_eq!(high, schedule(Difficulty::MAX, Grade::Easy, now));
        let low = schedule(Difficulty::clamped(-4), Grade::Hard, now);
        assert_eq!(low, schedule(Difficulty::MIN, Grade::Hard, now));
    }

    #[test]
    fn custom_constants_are_respected() {
        let scheduler = Scheduler {
            easy_min_days: 3,
            compounding_above: 5,
            ..Default::default()
        };
        let outcome = scheduler.schedule(Difficulty::clamped(4), Grade::Easy, jan_first());
        assert_eq!(outcome.interval_days, 20);
    }

    #[test]
    fn due_date_saturates_near_the_end_of_time() {
        let now = DateTime::<Utc>::MAX_UTC - Duration::days(10);
        let outcome = schedule(Difficulty::MAX, Grade::Easy, now);
        assert_eq!(outcome.next_difficulty, Difficulty::MAX);
        assert_eq!(outcome.next_due_at, DateTime::<Utc>::MAX_UTC);

        let tomorrow = schedule(Difficulty::MAX, Grade::Hard, now);
        assert_eq!(tomorrow.next_due_at, now + Duration::days(1));
    }

    #[test]
    fn huge_constants_do_not_overflow() {
        let scheduler = Scheduler {
            easy_step_days: u32::MAX,
            ..Default::default()
        };
        let outcome = scheduler.schedule(Difficulty::clamped(4), Grade::Easy, jan_first());
        assert_eq!(outcome.interval_days, u32::MAX);
        assert_eq!(outcome.next_due_at, DateTime::<Utc>::MAX_UTC);
    }

    #[test]
    fn zero_constants_still_move_forward() {
        let scheduler = Scheduler {
            hard_days: 0,
            good_min_days: 0,
            ..Default::default()
        };
        let now = jan_first();
        assert_eq!(scheduler.schedule(Difficulty::MIN, Grade::Hard, now).interval_days, 1);
        assert_eq!(scheduler.schedule(Difficulty::MIN, Grade::Good, now).interval_days, 1);
    }
}
