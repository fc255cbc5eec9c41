//! Persisted per-user streak snapshot.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ValidationError;

/// Opaque user identifier issued by the identity provider.
///
/// Always non-empty once constructed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserId(String);

impl UserId {
    /// Validate a raw identifier. Surrounding whitespace is stripped.
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::EmptyUserId);
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for UserId {
    type Error = ValidationError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        Self::parse(&raw)
    }
}

impl From<UserId> for String {
    fn from(id: UserId) -> Self {
        id.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One row per user. Only [`StreakEngine`](super::StreakEngine) mutates it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreakRecord {
    pub user_id: UserId,
    /// Consecutive local calendar days with a completed session.
    pub current_streak: u32,
    /// High-water mark of `current_streak`.
    pub longest_streak: u32,
    /// Most recent local day that was credited.
    pub last_practice_date: Option<NaiveDate>,
    pub freezes_used_this_week: u32,
    /// Monday of the week `freezes_used_this_week` applies to.
    pub freeze_week_start: Option<NaiveDate>,
    /// A manually activated freeze that has not bridged a gap yet.
    #[serde(default)]
    pub freeze_banked: bool,
    /// Advisory only, never compared.
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl StreakRecord {
    /// Zero-value record used when nothing is stored for `user_id`.
    pub fn empty(user_id: UserId) -> Self {
        Self {
            user_id,
            current_streak: 0,
            longest_streak: 0,
            last_practice_date: None,
            freezes_used_this_week: 0,
            freeze_week_start: None,
            freeze_banked: false,
            updated_at: None,
        }
    }

    /// True if every field except `updated_at` matches `other`.
    ///
    /// Used as the compare-and-swap predicate by stores.
    pub fn same_state(&self, other: &StreakRecord) -> bool {
        self.user_id == other.user_id
            && self.current_streak == other.current_streak
            && self.longest_streak == other.longest_streak
            && self.last_practice_date == other.last_practice_date
            && self.freezes_used_this_week == other.freezes_used_this_week
            && self.freeze_week_start == other.freeze_week_start
            && self.freeze_banked == other.freeze_banked
    }
}
