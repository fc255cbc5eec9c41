//! Streak milestones and their celebration copy.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Day counts that trigger a one-shot celebration.
///
/// Only an exact landing fires a milestone; jumping past one does not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u32", try_from = "u32")]
pub enum Milestone {
    ThreeDays,
    OneWeek,
    TwoWeeks,
    ThirtyDays,
}

impl Milestone {
    pub const ALL: [Milestone; 4] = [
        Milestone::ThreeDays,
        Milestone::OneWeek,
        Milestone::TwoWeeks,
        Milestone::ThirtyDays,
    ];

    pub fn days(self) -> u32 {
        match self {
            Milestone::ThreeDays => 3,
            Milestone::OneWeek => 7,
            Milestone::TwoWeeks => 14,
            Milestone::ThirtyDays => 30,
        }
    }

    pub fn message(self) -> &'static str {
        milestone_message(self)
    }
}

impl From<Milestone> for u32 {
    fn from(milestone: Milestone) -> Self {
        milestone.days()
    }
}

impl TryFrom<u32> for Milestone {
    type Error = String;

    fn try_from(days: u32) -> Result<Self, Self::Error> {
        detect_milestone(days).ok_or_else(|| format!("{days} is not a milestone"))
    }
}

impl fmt::Display for Milestone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-day streak", self.days())
    }
}

pub fn detect_milestone(streak: u32) -> Option<Milestone> {
    Milestone::ALL.into_iter().find(|m| m.days() == streak)
}

/// Celebration text for a milestone. Affirms progress only.
pub fn milestone_message(milestone: Milestone) -> &'static str {
    match milestone {
        Milestone::ThreeDays => "3 days in a row! You're building a real practice habit.",
        Milestone::OneWeek => "A full week of practice! Your answers are getting sharper every day.",
        Milestone::TwoWeeks => "Two weeks strong! Consistency like this is what gets offers.",
        Milestone::ThirtyDays => "30 days of practice! You've made interview prep part of who you are.",
    }
}
