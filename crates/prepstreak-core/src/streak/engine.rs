//! Persistence orchestrator for practice streaks.
//!
//! Runs the read → calculate → resolve freeze → write cycle for a user. No
//! public method here returns an error: storage failures are logged and the
//! caller gets a safe default or the in-memory result, so streak bookkeeping
//! can never fail the practice session that triggered it.

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use super::calc::{compute_next_streak, evaluate_freeze_window};
use super::milestone::{detect_milestone, Milestone};
use super::{Clock, StreakRecord, StreakStore, SystemClock, UserId};
use crate::error::StoreError;

/// Read-compute-write cycles attempted before giving up on a contended row.
pub const MAX_WRITE_ATTEMPTS: u32 = 3;

/// Result handed back to a session-completion caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreakUpdate {
    pub current_streak: u32,
    pub longest_streak: u32,
    pub milestone: Option<Milestone>,
    /// False when today had already been credited.
    pub is_new_day: bool,
    /// A freeze bridged a gap in this update.
    pub freeze_used: bool,
}

/// Display read model: the stored record plus today's freeze allowance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreakStatus {
    #[serde(flatten)]
    pub record: StreakRecord,
    pub freezes_remaining: u32,
    pub today: NaiveDate,
}

/// What a completed session does to a record, without any I/O.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOutcome {
    pub update: StreakUpdate,
    /// Record to persist, or `None` when nothing changes.
    pub next: Option<StreakRecord>,
}

/// Apply one completed session on `today` to `record`.
///
/// A banked freeze is redeemed before an automatic one is considered; only
/// the automatic path increments the weekly count, since activation already
/// did.
pub fn apply_session(record: &StreakRecord, today: NaiveDate) -> SessionOutcome {
    let step = compute_next_streak(record.last_practice_date, record.current_streak, today);
    if !step.is_new_day {
        return SessionOutcome {
            update: StreakUpdate {
                current_streak: record.current_streak,
                longest_streak: record.longest_streak,
                milestone: None,
                is_new_day: false,
                freeze_used: false,
            },
            next: None,
        };
    }

    let mut redeemed_banked = false;
    let mut auto_freeze = false;
    let final_streak = if step.streak_broken && record.current_streak > 0 {
        if record.freeze_banked {
            redeemed_banked = true;
            record.current_streak.saturating_add(1)
        } else if evaluate_freeze_window(
            record.freezes_used_this_week,
            record.freeze_week_start,
            today,
        )
        .can_freeze
        {
            auto_freeze = true;
            record.current_streak.saturating_add(1)
        } else {
            step.new_streak
        }
    } else {
        step.new_streak
    };

    let longest_streak = record.longest_streak.max(final_streak);
    let milestone = detect_milestone(final_streak);

    // Re-evaluated here so the count and week start are always written as a
    // consistent pair, including when no freeze was considered above.
    let window = evaluate_freeze_window(
        record.freezes_used_this_week,
        record.freeze_week_start,
        today,
    );

    let next = StreakRecord {
        user_id: record.user_id.clone(),
        current_streak: final_streak,
        longest_streak,
        last_practice_date: Some(today),
        freezes_used_this_week: window
            .next_used_count(record.freezes_used_this_week, auto_freeze),
        freeze_week_start: Some(window.new_week_start),
        freeze_banked: record.freeze_banked && !redeemed_banked,
        updated_at: record.updated_at,
    };

    SessionOutcome {
        update: StreakUpdate {
            current_streak: final_streak,
            longest_streak,
            milestone,
            is_new_day: true,
            freeze_used: auto_freeze || redeemed_banked,
        },
        next: Some(next),
    }
}

/// Bank this week's freeze on `record`, or `None` if it cannot be banked.
pub fn apply_freeze_activation(record: &StreakRecord, today: NaiveDate) -> Option<StreakRecord> {
    if record.freeze_banked {
        return None;
    }
    let window = evaluate_freeze_window(
        record.freezes_used_this_week,
        record.freeze_week_start,
        today,
    );
    if !window.can_freeze {
        return None;
    }

    Some(StreakRecord {
        freezes_used_this_week: window.next_used_count(record.freezes_used_this_week, true),
        freeze_week_start: Some(window.new_week_start),
        freeze_banked: true,
        ..record.clone()
    })
}

struct Snapshot {
    record: StreakRecord,
    /// Exactly what the store returned; the compare-and-swap expectation.
    stored: Option<StreakRecord>,
    /// The stored row exists but cannot be decoded; the next write replaces it.
    malformed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriteStatus {
    Skipped,
    Saved,
    Failed,
}

/// Streak orchestrator over a [`StreakStore`] and a [`Clock`].
pub struct StreakEngine<S, C = SystemClock> {
    store: S,
    clock: C,
}

impl<S: StreakStore> StreakEngine<S, SystemClock> {
    /// Engine using the system's local calendar day.
    pub fn with_system_clock(store: S) -> Self {
        Self::new(store, SystemClock::local())
    }
}

impl<S: StreakStore, C: Clock> StreakEngine<S, C> {
    pub fn new(store: S, clock: C) -> Self {
        Self { store, clock }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Stored record for `user_id`, or the zero default if absent or unreadable.
    pub fn fetch_streak(&self, user_id: &UserId) -> StreakRecord {
        self.load_snapshot(user_id).record
    }

    /// Record plus the freeze allowance remaining today.
    pub fn status(&self, user_id: &UserId) -> StreakStatus {
        let today = self.clock.today();
        let record = self.fetch_streak(user_id);
        let window = evaluate_freeze_window(
            record.freezes_used_this_week,
            record.freeze_week_start,
            today,
        );
        StreakStatus {
            record,
            freezes_remaining: window.freezes_remaining,
            today,
        }
    }

    /// Credit today's practice for `user_id`.
    ///
    /// Call only after the session itself has been durably recorded. Returns
    /// `None` only for a blank user id; a failed write still returns the
    /// computed result.
    #[instrument(skip(self))]
    pub fn update_streak_after_session(&self, user_id: &str) -> Option<StreakUpdate> {
        let user_id = match UserId::parse(user_id) {
            Ok(id) => id,
            Err(err) => {
                warn!(error = %err, "skipping streak update");
                return None;
            }
        };
        let today = self.clock.today();

        let (update, status) = self.read_modify_write(&user_id, |record| {
            let outcome = apply_session(record, today);
            (outcome.update, outcome.next)
        });

        debug!(
            user_id = %user_id,
            streak = update.current_streak,
            new_day = update.is_new_day,
            ?status,
            "streak updated"
        );
        if update.freeze_used {
            info!(user_id = %user_id, streak = update.current_streak, "freeze bridged a missed day");
        }
        if let Some(milestone) = update.milestone {
            info!(user_id = %user_id, milestone = milestone.days(), "streak milestone reached");
        }
        Some(update)
    }

    /// Pre-spend this week's freeze. Returns whether a freeze was banked.
    ///
    /// Leaves the streak counters and last practice date untouched.
    #[instrument(skip(self))]
    pub fn activate_freeze(&self, user_id: &str) -> bool {
        let user_id = match UserId::parse(user_id) {
            Ok(id) => id,
            Err(err) => {
                warn!(error = %err, "skipping freeze activation");
                return false;
            }
        };
        let today = self.clock.today();

        let (available, status) = self.read_modify_write(&user_id, |record| {
            let next = apply_freeze_activation(record, today);
            (next.is_some(), next)
        });

        if !available {
            debug!(user_id = %user_id, "no freeze available this week");
        }
        available && status == WriteStatus::Saved
    }

    fn load_snapshot(&self, user_id: &UserId) -> Snapshot {
        match self.store.load_streak(user_id) {
            Ok(Some(record)) => Snapshot {
                record: record.clone(),
                stored: Some(record),
                malformed: false,
            },
            Ok(None) => Snapshot {
                record: StreakRecord::empty(user_id.clone()),
                stored: None,
                malformed: false,
            },
            Err(err @ StoreError::Malformed { .. }) => {
                warn!(user_id = %user_id, error = %err, "unreadable streak record, starting over");
                Snapshot {
                    record: StreakRecord::empty(user_id.clone()),
                    stored: None,
                    malformed: true,
                }
            }
            Err(err) => {
                warn!(user_id = %user_id, error = %err, "failed to read streak record, using defaults");
                Snapshot {
                    record: StreakRecord::empty(user_id.clone()),
                    stored: None,
                    malformed: false,
                }
            }
        }
    }

    /// Retries the whole cycle when the row changed under us.
    ///
    /// Transient read failures keep the "must not exist" expectation so a
    /// readable row is never clobbered; only an undecodable row is replaced.
    fn read_modify_write<T>(
        &self,
        user_id: &UserId,
        mut plan: impl FnMut(&StreakRecord) -> (T, Option<StreakRecord>),
    ) -> (T, WriteStatus) {
        let mut attempt = 1;
        loop {
            let snapshot = self.load_snapshot(user_id);
            let (value, next) = plan(&snapshot.record);
            let Some(mut next) = next else {
                return (value, WriteStatus::Skipped);
            };
            next.updated_at = Some(Utc::now());

            let saved = if snapshot.malformed {
                self.store.replace_streak(&next)
            } else {
                self.store.save_streak(&next, snapshot.stored.as_ref())
            };
            match saved {
                Ok(()) => return (value, WriteStatus::Saved),
                Err(StoreError::Conflict { .. }) if attempt < MAX_WRITE_ATTEMPTS => {
                    debug!(user_id = %user_id, attempt, "streak record changed concurrently, retrying");
                    attempt += 1;
                }
                Err(err) => {
                    warn!(user_id = %user_id, attempt, error = %err, "failed to persist streak record");
                    return (value, WriteStatus::Failed);
                }
            }
        }
    }
}
