use chrono::Utc;
use clap::Subcommand;
use prepstreak_core::{Clock, Config, PracticeMode, StreakEngine, UserId};
use serde_json::json;

use super::open_database;

#[derive(Subcommand)]
pub enum SessionAction {
    /// Record a completed practice session and credit the streak
    Complete {
        /// User identifier
        #[arg(long)]
        user: String,
        /// Practice mode (behavioral, technical, system_design, mock_interview)
        #[arg(long, default_value = "technical")]
        mode: PracticeMode,
        /// Session length in minutes
        #[arg(long, default_value_t = 0)]
        minutes: u32,
    },
    /// Practice totals for a user
    Stats {
        #[arg(long)]
        user: String,
    },
    /// Most recent sessions for a user
    List {
        #[arg(long)]
        user: String,
        #[arg(long, default_value_t = 10)]
        limit: u32,
    },
}

pub fn run(action: SessionAction) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let db = open_database(&config)?;
    let clock = config.clock();

    match action {
        SessionAction::Complete {
            user,
            mode,
            minutes,
        } => {
            let user_id = UserId::parse(&user)?;
            // The session is saved first; streak bookkeeping only follows success.
            let session_id =
                db.record_session(&user_id, mode, minutes, clock.today(), Utc::now())?;
            tracing::debug!(session_id, user_id = %user_id, %mode, "practice session recorded");

            let engine = StreakEngine::new(&db, clock);
            let update = engine.update_streak_after_session(user_id.as_str());

            let milestone_message = update
                .as_ref()
                .and_then(|u| u.milestone)
                .filter(|_| config.notifications.milestone_toasts)
                .map(|m| m.message());

            let output = json!({
                "session_id": session_id,
                "streak": update,
                "milestone_message": milestone_message,
                "toast_duration_secs": config.notifications.toast_duration_secs,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        SessionAction::Stats { user } => {
            let user_id = UserId::parse(&user)?;
            let stats = db.practice_stats(&user_id, clock.today())?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        SessionAction::List { user, limit } => {
            let user_id = UserId::parse(&user)?;
            let sessions = db.recent_sessions(&user_id, limit)?;
            println!("{}", serde_json::to_string_pretty(&sessions)?);
        }
    }
    Ok(())
}
