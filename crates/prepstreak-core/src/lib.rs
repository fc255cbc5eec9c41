//! # prepstreak Core Library
//!
//! Practice-streak bookkeeping for an interview-practice coaching product.
//! Every practice mode calls into this library after a session has been
//! saved; the library tracks the consecutive-day habit, forgives one missed
//! day per week with a freeze, and reports milestones.
//!
//! ## Architecture
//!
//! - **Calculation layer**: pure functions of (previous record, today)
//! - **Streak engine**: read-modify-write orchestration that never fails its
//!   caller, with compare-and-swap retries against concurrent writers
//! - **Storage**: SQLite sessions and streak records, TOML configuration
//!
//! ## Key Components
//!
//! - [`StreakEngine`]: session-completion and freeze-activation entry points
//! - [`StreakStore`]: keyed storage seam, implemented by [`Database`] and
//!   [`MemoryStore`]
//! - [`Config`]: application configuration management

pub mod error;
pub mod session;
pub mod storage;
pub mod streak;

pub use error::{ConfigError, CoreError, DatabaseError, StoreError, ValidationError};
pub use session::{PracticeMode, PracticeSession, PracticeStats};
pub use storage::{Config, Database};
pub use streak::{
    Clock, ManualClock, MemoryStore, Milestone, StreakEngine, StreakRecord, StreakStatus,
    StreakStore, StreakUpdate, SystemClock, UserId,
};
