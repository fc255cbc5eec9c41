//! Integration tests for the streak engine against in-memory and SQLite stores.

use chrono::{Duration, NaiveDate};
use prepstreak_core::streak::{MAX_WRITE_ATTEMPTS, WEEKLY_FREEZE_ALLOWANCE};
use prepstreak_core::{
    Database, ManualClock, MemoryStore, Milestone, StoreError, StreakEngine, StreakRecord,
    StreakStore, UserId,
};
use proptest::prelude::*;
use std::sync::atomic::{AtomicU32, Ordering};

const USER: &str = "candidate-1";

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn user() -> UserId {
    UserId::parse(USER).unwrap()
}

// Tuesday; D+2 stays inside the week that starts Monday 2026-03-02.
fn day_d() -> NaiveDate {
    date(2026, 3, 3)
}

fn seeded(current: u32, longest: u32, last: NaiveDate) -> StreakRecord {
    StreakRecord {
        current_streak: current,
        longest_streak: longest,
        last_practice_date: Some(last),
        ..StreakRecord::empty(user())
    }
}

#[test]
fn first_session_starts_streak_at_one() {
    let engine = StreakEngine::new(MemoryStore::new(), ManualClock::new(day_d()));
    let update = engine.update_streak_after_session(USER).unwrap();
    assert_eq!(update.current_streak, 1);
    assert_eq!(update.longest_streak, 1);
    assert_eq!(update.milestone, None);
    assert!(update.is_new_day);

    let stored = engine.store().get(&user()).unwrap();
    assert_eq!(stored.last_practice_date, Some(day_d()));
    assert_eq!(stored.freeze_week_start, Some(date(2026, 3, 2)));
    assert!(stored.updated_at.is_some());
}

#[test]
fn second_session_same_day_is_idempotent() {
    let engine = StreakEngine::new(MemoryStore::new(), ManualClock::new(day_d()));
    let first = engine.update_streak_after_session(USER).unwrap();
    let before = engine.store().get(&user()).unwrap();

    let second = engine.update_streak_after_session(USER).unwrap();
    assert!(!second.is_new_day);
    assert_eq!(second.current_streak, first.current_streak);
    assert_eq!(second.milestone, None);
    assert_eq!(engine.store().get(&user()).unwrap(), before);
}

#[test]
fn consecutive_day_reaches_seven_day_milestone() {
    let store = MemoryStore::new();
    store.insert(seeded(6, 6, day_d()));
    let engine = StreakEngine::new(store, ManualClock::new(day_d() + Duration::days(1)));

    let update = engine.update_streak_after_session(USER).unwrap();
    assert_eq!(update.current_streak, 7);
    assert_eq!(update.longest_streak, 7);
    assert_eq!(update.milestone, Some(Milestone::OneWeek));
    assert!(!update.freeze_used);
}

#[test]
fn freeze_bridges_a_missed_day() {
    let store = MemoryStore::new();
    store.insert(seeded(5, 5, day_d()));
    let engine = StreakEngine::new(store, ManualClock::new(day_d() + Duration::days(2)));

    let update = engine.update_streak_after_session(USER).unwrap();
    assert_eq!(update.current_streak, 6);
    assert!(update.freeze_used);

    let stored = engine.store().get(&user()).unwrap();
    assert_eq!(stored.current_streak, 6);
    assert_eq!(stored.freezes_used_this_week, 1);
    assert_eq!(stored.freeze_week_start, Some(date(2026, 3, 2)));
}

#[test]
fn gap_without_freeze_restarts_at_one() {
    let store = MemoryStore::new();
    store.insert(StreakRecord {
        freezes_used_this_week: WEEKLY_FREEZE_ALLOWANCE,
        freeze_week_start: Some(date(2026, 3, 2)),
        ..seeded(5, 8, day_d())
    });
    let engine = StreakEngine::new(store, ManualClock::new(day_d() + Duration::days(2)));

    let update = engine.update_streak_after_session(USER).unwrap();
    assert_eq!(update.current_streak, 1);
    assert_eq!(update.longest_streak, 8);
    assert!(!update.freeze_used);
    assert_eq!(engine.store().get(&user()).unwrap().freezes_used_this_week, 1);
}

#[test]
fn weekly_rollover_restores_the_freeze() {
    let store = MemoryStore::new();
    // Used last week; last practiced Sunday 2026-03-01.
    store.insert(StreakRecord {
        freezes_used_this_week: 1,
        freeze_week_start: Some(date(2026, 2, 23)),
        ..seeded(4, 4, date(2026, 3, 1))
    });
    let clock = ManualClock::new(date(2026, 3, 3));
    let engine = StreakEngine::new(&store, &clock);

    assert_eq!(engine.status(&user()).freezes_remaining, 1);

    let update = engine.update_streak_after_session(USER).unwrap();
    assert_eq!(update.current_streak, 5);
    assert!(update.freeze_used);

    let stored = store.get(&user()).unwrap();
    assert_eq!(stored.freezes_used_this_week, 1);
    assert_eq!(stored.freeze_week_start, Some(date(2026, 3, 2)));
}

#[test]
fn rollover_without_freeze_resets_count_on_write() {
    let store = MemoryStore::new();
    store.insert(StreakRecord {
        freezes_used_this_week: 1,
        freeze_week_start: Some(date(2026, 2, 23)),
        ..seeded(4, 4, date(2026, 3, 1))
    });
    let engine = StreakEngine::new(&store, ManualClock::new(date(2026, 3, 2)));

    let update = engine.update_streak_after_session(USER).unwrap();
    assert_eq!(update.current_streak, 5);
    assert!(!update.freeze_used);

    let stored = store.get(&user()).unwrap();
    assert_eq!(stored.freezes_used_this_week, 0);
    assert_eq!(stored.freeze_week_start, Some(date(2026, 3, 2)));
}

#[test]
fn five_consecutive_days_fire_only_the_three_day_milestone() {
    let clock = ManualClock::new(date(2026, 3, 2));
    let engine = StreakEngine::new(MemoryStore::new(), &clock);

    let mut streaks = Vec::new();
    let mut milestones = Vec::new();
    for _ in 0..5 {
        let update = engine.update_streak_after_session(USER).unwrap();
        streaks.push(update.current_streak);
        milestones.push(update.milestone);
        clock.advance_days(1);
    }

    assert_eq!(streaks, vec![1, 2, 3, 4, 5]);
    assert_eq!(
        milestones,
        vec![None, None, Some(Milestone::ThreeDays), None, None]
    );
}

#[test]
fn end_to_end_on_sqlite() {
    let db = Database::open_memory().unwrap();
    let clock = ManualClock::new(date(2026, 3, 2));
    let engine = StreakEngine::new(&db, &clock);

    let mut streaks = Vec::new();
    for _ in 0..5 {
        streaks.push(engine.update_streak_after_session(USER).unwrap().current_streak);
        clock.advance_days(1);
    }
    assert_eq!(streaks, vec![1, 2, 3, 4, 5]);

    // Skip Saturday, come back Sunday: the weekly freeze covers it.
    clock.advance_days(1);
    let update = engine.update_streak_after_session(USER).unwrap();
    assert_eq!(update.current_streak, 6);
    assert!(update.freeze_used);

    let stored = engine.fetch_streak(&user());
    assert_eq!(stored.current_streak, 6);
    assert_eq!(stored.longest_streak, 6);
    assert_eq!(stored.last_practice_date, Some(date(2026, 3, 8)));
    assert_eq!(stored.freezes_used_this_week, 1);
}

#[test]
fn manual_freeze_is_redeemed_by_next_gap_and_not_double_spent() {
    let store = MemoryStore::new();
    store.insert(seeded(4, 4, day_d()));
    let clock = ManualClock::new(day_d() + Duration::days(1));
    let engine = StreakEngine::new(&store, &clock);

    assert!(engine.activate_freeze(USER));
    assert!(!engine.activate_freeze(USER), "only one freeze per week");
    let banked = store.get(&user()).unwrap();
    assert_eq!(banked.current_streak, 4);
    assert_eq!(banked.last_practice_date, Some(day_d()));
    assert_eq!(banked.freezes_used_this_week, 1);
    assert!(banked.freeze_banked);

    // Rest day spent, practice resumes the day after.
    clock.advance_days(1);
    let update = engine.update_streak_after_session(USER).unwrap();
    assert_eq!(update.current_streak, 5);
    assert!(update.freeze_used);
    let redeemed = store.get(&user()).unwrap();
    assert_eq!(redeemed.freezes_used_this_week, 1);
    assert!(!redeemed.freeze_banked);

    // A second gap in the same week has nothing left to spend.
    clock.advance_days(2);
    let update = engine.update_streak_after_session(USER).unwrap();
    assert_eq!(update.current_streak, 1);
    assert_eq!(update.longest_streak, 5);
}

#[test]
fn activate_freeze_fails_when_allowance_spent_by_auto_freeze() {
    let store = MemoryStore::new();
    store.insert(seeded(5, 5, day_d()));
    let clock = ManualClock::new(day_d() + Duration::days(2));
    let engine = StreakEngine::new(&store, &clock);

    engine.update_streak_after_session(USER).unwrap();
    assert!(!engine.activate_freeze(USER));
}

#[test]
fn read_failure_falls_back_without_clobbering() {
    let store = MemoryStore::new();
    store.insert(seeded(12, 20, day_d()));
    store.set_fail_reads(true);
    let engine = StreakEngine::new(&store, ManualClock::new(day_d() + Duration::days(1)));

    let fetched = engine.fetch_streak(&user());
    assert_eq!(fetched, StreakRecord::empty(user()));

    let update = engine.update_streak_after_session(USER).unwrap();
    assert_eq!(update.current_streak, 1);

    // The conditional write refused to overwrite the real row.
    let stored = store.get(&user()).unwrap();
    assert_eq!(stored.current_streak, 12);
    assert_eq!(stored.longest_streak, 20);
}

#[test]
fn write_failure_still_returns_computed_result() {
    let store = MemoryStore::new();
    store.insert(seeded(2, 2, day_d()));
    store.set_fail_writes(true);
    let engine = StreakEngine::new(&store, ManualClock::new(day_d() + Duration::days(1)));

    let update = engine.update_streak_after_session(USER).unwrap();
    assert_eq!(update.current_streak, 3);
    assert_eq!(update.milestone, Some(Milestone::ThreeDays));
    assert_eq!(store.get(&user()).unwrap().current_streak, 2);

    assert!(!engine.activate_freeze(USER));
    assert!(!store.get(&user()).unwrap().freeze_banked);

    // Next session after recovery reconciles from the durable state.
    store.set_fail_writes(false);
    let update = engine.update_streak_after_session(USER).unwrap();
    assert_eq!(update.current_streak, 3);
    assert_eq!(store.get(&user()).unwrap().current_streak, 3);
}

#[test]
fn unreadable_sqlite_row_is_replaced_on_next_session() {
    let db = Database::open_memory().unwrap();
    db.conn()
        .execute(
            "INSERT INTO user_streaks (user_id, current_streak, longest_streak, last_practice_date)
             VALUES (?1, 2, 2, 'yesterday')",
            [USER],
        )
        .unwrap();
    let clock = ManualClock::new(day_d());
    let engine = StreakEngine::new(&db, &clock);

    assert!(db.load_streak(&user()).is_err());
    assert_eq!(engine.fetch_streak(&user()), StreakRecord::empty(user()));

    let mut streaks = Vec::new();
    for _ in 0..3 {
        streaks.push(engine.update_streak_after_session(USER).unwrap().current_streak);
        clock.advance_days(1);
    }
    assert_eq!(streaks, vec![1, 2, 3]);

    let stored = engine.fetch_streak(&user());
    assert_eq!(stored.current_streak, 3);
    assert_eq!(stored.last_practice_date, Some(day_d() + Duration::days(2)));
}

/// Simulates another tab crediting the same day between our read and write.
struct RacingStore {
    inner: MemoryStore,
    competing: StreakRecord,
    saves: AtomicU32,
}

impl StreakStore for RacingStore {
    fn load_streak(&self, user_id: &UserId) -> Result<Option<StreakRecord>, StoreError> {
        self.inner.load_streak(user_id)
    }

    fn save_streak(
        &self,
        record: &StreakRecord,
        expected: Option<&StreakRecord>,
    ) -> Result<(), StoreError> {
        if self.saves.fetch_add(1, Ordering::SeqCst) == 0 {
            self.inner.insert(self.competing.clone());
        }
        self.inner.save_streak(record, expected)
    }
    fn replace_streak(&self, record: &StreakRecord) -> Result<(), StoreError> {
        self.inner.replace_streak(record)
    }
}

#[test]
fn concurrent_completion_credits_the_day_once() {
    let today = day_d() + Duration::days(1);
    let inner = MemoryStore::new();
    inner.insert(seeded(3, 3, day_d()));
    let store = RacingStore {
        inner,
        competing: seeded(4, 4, today),
        saves: AtomicU32::new(0),
    };
    let engine = StreakEngine::new(&store, ManualClock::new(today));

    let update = engine.update_streak_after_session(USER).unwrap();
    assert!(!update.is_new_day);
    assert_eq!(update.current_streak, 4);
    assert_eq!(store.inner.get(&user()).unwrap().current_streak, 4);
    assert_eq!(store.saves.load(Ordering::SeqCst), 1);
}

/// Every conditional write loses.
struct AlwaysConflicting {
    attempts: AtomicU32,
}

impl StreakStore for AlwaysConflicting {
    fn load_streak(&self, _user_id: &UserId) -> Result<Option<StreakRecord>, StoreError> {
        Ok(None)
    }

    fn save_streak(
        &self,
        record: &StreakRecord,
        _expected: Option<&StreakRecord>,
    ) -> Result<(), StoreError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(StoreError::Conflict {
            user_id: record.user_id.to_string(),
        })
    }
    fn replace_streak(&self, record: &StreakRecord) -> Result<(), StoreError> {
        self.save_streak(record, None)
    }
}

#[test]
fn persistent_conflicts_give_up_after_bounded_attempts() {
    let store = AlwaysConflicting {
        attempts: AtomicU32::new(0),
    };
    let engine = StreakEngine::new(&store, ManualClock::new(day_d()));

    let update = engine.update_streak_after_session(USER).unwrap();
    assert_eq!(update.current_streak, 1);
    assert_eq!(store.attempts.load(Ordering::SeqCst), MAX_WRITE_ATTEMPTS);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn longest_streak_tracks_max_observed(gaps in proptest::collection::vec(0i64..4, 1..40)) {
        let clock = ManualClock::new(date(2026, 1, 5));
        let engine = StreakEngine::new(MemoryStore::new(), &clock);

        let mut max_seen = 0;
        let mut prev_longest = 0;
        for gap in gaps {
            clock.advance_days(gap);
            let update = engine.update_streak_after_session(USER).unwrap();
            max_seen = max_seen.max(update.current_streak);
            prop_assert!(update.longest_streak >= prev_longest);
            prop_assert!(update.longest_streak >= update.current_streak);
            prop_assert_eq!(update.longest_streak, max_seen);
            prev_longest = update.longest_streak;

            let stored = engine.store().get(&user()).unwrap();
            prop_assert!(stored.freezes_used_this_week <= WEEKLY_FREEZE_ALLOWANCE);
            prop_assert_eq!(stored.current_streak, update.current_streak);
        }
    }
}
