use clap::Subcommand;
use prepstreak_core::{Config, StreakEngine, UserId};
use serde_json::json;

use super::open_database;

#[derive(Subcommand)]
pub enum StreakAction {
    /// Current and longest streak with freezes remaining
    Show {
        #[arg(long)]
        user: String,
    },
    /// Bank this week's freeze for an upcoming rest day
    Freeze {
        #[arg(long)]
        user: String,
    },
}

pub fn run(action: StreakAction) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let db = open_database(&config)?;
    let engine = StreakEngine::new(&db, config.clock());

    match action {
        StreakAction::Show { user } => {
            let user_id = UserId::parse(&user)?;
            let status = engine.status(&user_id);
            println!("{}", serde_json::to_string_pretty(&status)?);
        }
        StreakAction::Freeze { user } => {
            let user_id = UserId::parse(&user)?;
            let activated = engine.activate_freeze(user_id.as_str());
            let status = engine.status(&user_id);
            let output = json!({
                "activated": activated,
                "freezes_remaining": status.freezes_remaining,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }
    Ok(())
}
