//! Practice-streak engine.
//!
//! - [`calc`] and [`milestone`] are pure: previous snapshot + `today` in,
//!   next snapshot and derived facts out.
//! - [`engine`] owns the read-modify-write cycle against a [`StreakStore`]
//!   and contains every failure.

pub mod calc;
mod clock;
pub mod engine;
pub mod milestone;
mod record;
mod store;

pub use calc::{
    compute_next_streak, evaluate_freeze_window, week_start, FreezeWindow, StreakStep,
    WEEKLY_FREEZE_ALLOWANCE,
};
pub use clock::{Clock, ManualClock, SystemClock};
pub use engine::{
    apply_freeze_activation, apply_session, SessionOutcome, StreakEngine, StreakStatus,
    StreakUpdate, MAX_WRITE_ATTEMPTS,
};
pub use milestone::{detect_milestone, milestone_message, Milestone};
pub use record::{StreakRecord, UserId};
pub use store::{MemoryStore, StreakStore};
