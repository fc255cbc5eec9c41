//! SQLite-backed practice and streak storage.
//!
//! Provides persistent storage for:
//! - Completed practice sessions and per-user totals
//! - Per-user streak records, written with compare-and-swap semantics

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection};
use std::path::Path;
use std::time::Duration;

use super::{data_dir, migrations};
use crate::error::{CoreError, DatabaseError, StoreError};
use crate::session::{PracticeMode, PracticeSession, PracticeStats};
use crate::streak::{StreakRecord, StreakStore, UserId};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// SQLite database holding sessions and streak records.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Get a reference to the underlying SQLite connection.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Open the database at `<data dir>/prepstreak.db`.
    ///
    /// # Errors
    /// Returns an error if the data directory is unavailable or the database
    /// cannot be opened or migrated.
    pub fn open() -> Result<Self, CoreError> {
        let path = data_dir()?.join("prepstreak.db");
        Ok(Self::open_at(&path)?)
    }

    /// Open (or create) a database file at `path`.
    pub fn open_at(path: &Path) -> Result<Self, DatabaseError> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_connection(conn)
    }

    /// Open an in-memory database.
    pub fn open_memory() -> Result<Self, DatabaseError> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self, DatabaseError> {
        migrations::migrate(&conn).map_err(|e| DatabaseError::MigrationFailed(e.to_string()))?;
        Ok(Self { conn })
    }

    /// How long a statement waits on a locked database before failing.
    pub fn set_busy_timeout(&self, timeout: Duration) -> Result<(), DatabaseError> {
        self.conn.busy_timeout(timeout)?;
        Ok(())
    }

    /// Record a completed session. Returns the new row id.
    pub fn record_session(
        &self,
        user_id: &UserId,
        mode: PracticeMode,
        duration_min: u32,
        practiced_on: NaiveDate,
        completed_at: DateTime<Utc>,
    ) -> Result<i64, DatabaseError> {
        self.conn.execute(
            "INSERT INTO practice_sessions (user_id, mode, duration_min, practiced_on, completed_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                user_id.as_str(),
                mode.as_str(),
                duration_min,
                practiced_on.format(DATE_FORMAT).to_string(),
                completed_at.to_rfc3339(),
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Most recent sessions for a user, newest first.
    pub fn recent_sessions(
        &self,
        user_id: &UserId,
        limit: u32,
    ) -> Result<Vec<PracticeSession>, DatabaseError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, user_id, mode, duration_min, practiced_on, completed_at
             FROM practice_sessions
             WHERE user_id = ?1
             ORDER BY completed_at DESC, id DESC
             LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![user_id.as_str(), limit], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, u32>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, String>(5)?,
            ))
        })?;

        let mut sessions = Vec::new();
        for row in rows {
            let (id, user_id, mode, duration_min, practiced_on, completed_at) = row?;
            let mode = mode
                .parse::<PracticeMode>()
                .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;
            let practiced_on = NaiveDate::parse_from_str(&practiced_on, DATE_FORMAT)
                .map_err(|e| DatabaseError::QueryFailed(format!("bad practiced_on: {e}")))?;
            let completed_at = DateTime::parse_from_rfc3339(&completed_at)
                .map_err(|e| DatabaseError::QueryFailed(format!("bad completed_at: {e}")))?
                .with_timezone(&Utc);
            sessions.push(PracticeSession {
                id,
                user_id,
                mode,
                duration_min,
                practiced_on,
                completed_at,
            });
        }
        Ok(sessions)
    }

    pub fn practice_stats(
        &self,
        user_id: &UserId,
        today: NaiveDate,
    ) -> Result<PracticeStats, DatabaseError> {
        let (total_sessions, total_minutes, distinct_days) = self.conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(duration_min), 0), COUNT(DISTINCT practiced_on)
             FROM practice_sessions
             WHERE user_id = ?1",
            params![user_id.as_str()],
            |row| {
                Ok((
                    row.get::<_, u64>(0)?,
                    row.get::<_, u64>(1)?,
                    row.get::<_, u64>(2)?,
                ))
            },
        )?;

        let today_sessions = self.conn.query_row(
            "SELECT COUNT(*) FROM practice_sessions WHERE user_id = ?1 AND practiced_on = ?2",
            params![user_id.as_str(), today.format(DATE_FORMAT).to_string()],
            |row| row.get::<_, u64>(0),
        )?;

        Ok(PracticeStats {
            total_sessions,
            total_minutes,
            today_sessions,
            distinct_days,
        })
    }
}

fn format_date(date: Option<NaiveDate>) -> Option<String> {
    date.map(|d| d.format(DATE_FORMAT).to_string())
}

fn parse_date(user_id: &UserId, field: &str, raw: Option<String>) -> Result<Option<NaiveDate>, StoreError> {
    raw.map(|s| {
        NaiveDate::parse_from_str(&s, DATE_FORMAT).map_err(|e| StoreError::Malformed {
            user_id: user_id.to_string(),
            message: format!("{field} '{s}': {e}"),
        })
    })
    .transpose()
}

struct StreakRow {
    current_streak: u32,
    longest_streak: u32,
    last_practice_date: Option<String>,
    freezes_used_this_week: u32,
    freeze_week_start: Option<String>,
    freeze_banked: bool,
    updated_at: Option<String>,
}

impl StreakStore for Database {
    fn load_streak(&self, user_id: &UserId) -> Result<Option<StreakRecord>, StoreError> {
        let result = self.conn.query_row(
            "SELECT current_streak, longest_streak, last_practice_date,
                    freezes_used_this_week, freeze_week_start, freeze_banked, updated_at
             FROM user_streaks WHERE user_id = ?1",
            params![user_id.as_str()],
            |row| {
                Ok(StreakRow {
                    current_streak: row.get(0)?,
                    longest_streak: row.get(1)?,
                    last_practice_date: row.get(2)?,
                    freezes_used_this_week: row.get(3)?,
                    freeze_week_start: row.get(4)?,
                    freeze_banked: row.get(5)?,
                    updated_at: row.get(6)?,
                })
            },
        );
        let row = match result {
            Ok(row) => row,
            Err(rusqlite::Error::QueryReturnedNoRows) => return Ok(None),
            Err(
                e @ (rusqlite::Error::FromSqlConversionFailure(..)
                | rusqlite::Error::IntegralValueOutOfRange(..)
                | rusqlite::Error::InvalidColumnType(..)),
            ) => {
                return Err(StoreError::Malformed {
                    user_id: user_id.to_string(),
                    message: e.to_string(),
                });
            }
            Err(e) => return Err(e.into()),
        };

        let updated_at = row
            .updated_at
            .as_deref()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc));

        Ok(Some(StreakRecord {
            user_id: user_id.clone(),
            current_streak: row.current_streak,
            longest_streak: row.longest_streak,
            last_practice_date: parse_date(user_id, "last_practice_date", row.last_practice_date)?,
            freezes_used_this_week: row.freezes_used_this_week,
            freeze_week_start: parse_date(user_id, "freeze_week_start", row.freeze_week_start)?,
            freeze_banked: row.freeze_banked,
            updated_at,
        }))
    }

    fn save_streak(
        &self,
        record: &StreakRecord,
        expected: Option<&StreakRecord>,
    ) -> Result<(), StoreError> {
        let updated_at = record.updated_at.map(|dt| dt.to_rfc3339());
        let changed = match expected {
            None => self.conn.execute(
                "INSERT INTO user_streaks (
                    user_id, current_streak, longest_streak, last_practice_date,
                    freezes_used_this_week, freeze_week_start, freeze_banked, updated_at
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                 ON CONFLICT(user_id) DO NOTHING",
                params![
                    record.user_id.as_str(),
                    record.current_streak,
                    record.longest_streak,
                    format_date(record.last_practice_date),
                    record.freezes_used_this_week,
                    format_date(record.freeze_week_start),
                    record.freeze_banked,
                    updated_at,
                ],
            )?,
            Some(prev) => self.conn.execute(
                "UPDATE user_streaks SET
                    current_streak = ?2,
                    longest_streak = ?3,
                    last_practice_date = ?4,
                    freezes_used_this_week = ?5,
                    freeze_week_start = ?6,
                    freeze_banked = ?7,
                    updated_at = ?8
                 WHERE user_id = ?1
                   AND current_streak = ?9
                   AND longest_streak = ?10
                   AND last_practice_date IS ?11
                   AND freezes_used_this_week = ?12
                   AND freeze_week_start IS ?13
                   AND freeze_banked = ?14",
                params![
                    record.user_id.as_str(),
                    record.current_streak,
                    record.longest_streak,
                    format_date(record.last_practice_date),
                    record.freezes_used_this_week,
                    format_date(record.freeze_week_start),
                    record.freeze_banked,
                    updated_at,
                    prev.current_streak,
                    prev.longest_streak,
                    format_date(prev.last_practice_date),
                    prev.freezes_used_this_week,
                    format_date(prev.freeze_week_start),
                    prev.freeze_banked,
                ],
            )?,
        };

        if changed == 0 {
            return Err(StoreError::Conflict {
                user_id: record.user_id.to_string(),
            });
        }
        Ok(())
    }

    fn replace_streak(&self, record: &StreakRecord) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO user_streaks (
                user_id, current_streak, longest_streak, last_practice_date,
                freezes_used_this_week, freeze_week_start, freeze_banked, updated_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                record.user_id.as_str(),
                record.current_streak,
                record.longest_streak,
                format_date(record.last_practice_date),
                record.freezes_used_this_week,
                format_date(record.freeze_week_start),
                record.freeze_banked,
                record.updated_at.map(|dt| dt.to_rfc3339()),
            ],
        )?;
        Ok(())
    }
}
