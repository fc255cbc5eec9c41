//! Pure streak calculations.
//!
//! Every function here takes `today` as an argument so the results depend
//! only on their inputs. Gaps are measured between local calendar dates,
//! never between timestamps.

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};

/// Freezes available per ISO week. Policy constant, not user-configurable.
pub const WEEKLY_FREEZE_ALLOWANCE: u32 = 1;

/// Outcome of advancing a streak to `today`, before freezes are considered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreakStep {
    pub new_streak: u32,
    /// At least one full day was missed since the last credited day.
    pub streak_broken: bool,
    /// `today` has not been credited yet.
    pub is_new_day: bool,
}

/// Freeze allowance as seen from `today`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FreezeWindow {
    pub freezes_remaining: u32,
    pub can_freeze: bool,
    /// The stored week is over; the stored used-count no longer applies.
    pub week_reset: bool,
    /// Monday of the week containing `today`.
    pub new_week_start: NaiveDate,
}

impl FreezeWindow {
    /// Used-count to persist after optionally consuming one freeze.
    pub fn next_used_count(&self, stored_used: u32, consumed: bool) -> u32 {
        let base = if self.week_reset { 0 } else { stored_used };
        if consumed {
            (base + 1).min(WEEKLY_FREEZE_ALLOWANCE)
        } else {
            base
        }
    }
}

/// Advance a streak from `last_practice_date` to `today`.
///
/// A `last_practice_date` after `today` is treated as already credited.
pub fn compute_next_streak(
    last_practice_date: Option<NaiveDate>,
    current_streak: u32,
    today: NaiveDate,
) -> StreakStep {
    let Some(last) = last_practice_date else {
        return StreakStep {
            new_streak: 1,
            streak_broken: false,
            is_new_day: true,
        };
    };

    match (today - last).num_days() {
        gap if gap <= 0 => StreakStep {
            new_streak: current_streak,
            streak_broken: false,
            is_new_day: false,
        },
        1 => StreakStep {
            new_streak: current_streak.saturating_add(1),
            streak_broken: false,
            is_new_day: true,
        },
        _ => StreakStep {
            new_streak: 1,
            streak_broken: true,
            is_new_day: true,
        },
    }
}

/// Monday that begins the ISO week containing `date`.
///
/// Sunday closes the week that started six days earlier.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.weekday().num_days_from_monday() as i64)
}

/// Evaluate the weekly freeze allowance with lazy rollover.
pub fn evaluate_freeze_window(
    freezes_used_this_week: u32,
    freeze_week_start: Option<NaiveDate>,
    today: NaiveDate,
) -> FreezeWindow {
    let current_week = week_start(today);
    let week_reset = match freeze_week_start {
        None => true,
        Some(stored) => stored < current_week,
    };
    let effective_used = if week_reset { 0 } else { freezes_used_this_week };
    let freezes_remaining = WEEKLY_FREEZE_ALLOWANCE.saturating_sub(effective_used);

    FreezeWindow {
        freezes_remaining,
        can_freeze: freezes_remaining > 0,
        week_reset,
        new_week_start: current_week,
    }
}
