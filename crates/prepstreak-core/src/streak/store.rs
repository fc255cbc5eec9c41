//! Keyed storage seam for streak records.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use super::{StreakRecord, UserId};
use crate::error::StoreError;

/// Read-by-key and conditional upsert-by-key over [`StreakRecord`]s.
///
/// Implementations must make `save_streak` atomic with respect to the
/// `expected` check so two writers that read the same snapshot cannot both
/// succeed.
pub trait StreakStore {
    /// Load the stored record, or `None` if the user has none yet.
    fn load_streak(&self, user_id: &UserId) -> Result<Option<StreakRecord>, StoreError>;

    /// Write `record` if the stored row still matches `expected`.
    ///
    /// `expected = None` means the row must not exist yet. A mismatch yields
    /// [`StoreError::Conflict`].
    fn save_streak(
        &self,
        record: &StreakRecord,
        expected: Option<&StreakRecord>,
    ) -> Result<(), StoreError>;

    /// Write `record` unconditionally, replacing any stored row.
    ///
    /// Used only to recover a row that can no longer be decoded.
    fn replace_streak(&self, record: &StreakRecord) -> Result<(), StoreError>;
}

impl<S: StreakStore + ?Sized> StreakStore for &S {
    fn load_streak(&self, user_id: &UserId) -> Result<Option<StreakRecord>, StoreError> {
        (**self).load_streak(user_id)
    }

    fn save_streak(
        &self,
        record: &StreakRecord,
        expected: Option<&StreakRecord>,
    ) -> Result<(), StoreError> {
        (**self).save_streak(record, expected)
    }

    fn replace_streak(&self, record: &StreakRecord) -> Result<(), StoreError> {
        (**self).replace_streak(record)
    }
}

/// In-process store. Failure switches let callers exercise degraded paths.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<HashMap<UserId, StreakRecord>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed or overwrite a record without any checks.
    pub fn insert(&self, record: StreakRecord) {
        self.records
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(record.user_id.clone(), record);
    }

    /// Current stored value, bypassing failure switches.
    pub fn get(&self, user_id: &UserId) -> Option<StreakRecord> {
        self.records
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(user_id)
            .cloned()
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }
}

impl StreakStore for MemoryStore {
    fn load_streak(&self, user_id: &UserId) -> Result<Option<StreakRecord>, StoreError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store reads disabled".into()));
        }
        Ok(self.get(user_id))
    }

    fn save_streak(
        &self,
        record: &StreakRecord,
        expected: Option<&StreakRecord>,
    ) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store writes disabled".into()));
        }

        let mut records = self.records.lock().unwrap_or_else(|e| e.into_inner());
        let matches = match (records.get(&record.user_id), expected) {
            (None, None) => true,
            (Some(stored), Some(expected)) => stored.same_state(expected),
            _ => false,
        };
        if !matches {
            return Err(StoreError::Conflict {
                user_id: record.user_id.to_string(),
            });
        }

        records.insert(record.user_id.clone(), record.clone());
        Ok(())
    }

    fn replace_streak(&self, record: &StreakRecord) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store writes disabled".into()));
        }
        self.insert(record.clone());
        Ok(())
    }
}
