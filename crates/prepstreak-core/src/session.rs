//! Completed practice sessions.
//!
//! A session must be recorded before the streak engine is told about it.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;

/// Coached practice modes that can complete a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PracticeMode {
    Behavioral,
    Technical,
    SystemDesign,
    MockInterview,
}

impl PracticeMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            PracticeMode::Behavioral => "behavioral",
            PracticeMode::Technical => "technical",
            PracticeMode::SystemDesign => "system_design",
            PracticeMode::MockInterview => "mock_interview",
        }
    }
}

impl fmt::Display for PracticeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PracticeMode {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "behavioral" => Ok(Self::Behavioral),
            "technical" => Ok(Self::Technical),
            "system_design" => Ok(Self::SystemDesign),
            "mock_interview" | "mock" => Ok(Self::MockInterview),
            other => Err(ValidationError::InvalidValue {
                field: "mode".into(),
                message: format!("unknown practice mode: {other}"),
            }),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PracticeSession {
    pub id: i64,
    pub user_id: String,
    pub mode: PracticeMode,
    pub duration_min: u32,
    /// Local calendar day the session counts toward.
    pub practiced_on: NaiveDate,
    pub completed_at: DateTime<Utc>,
}

/// Per-user totals for display.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PracticeStats {
    pub total_sessions: u64,
    pub total_minutes: u64,
    pub today_sessions: u64,
    pub distinct_days: u64,
}
