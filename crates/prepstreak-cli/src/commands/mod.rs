pub mod config;
pub mod session;
pub mod streak;

use prepstreak_core::{Config, Database};

/// Open the database with the configured busy timeout.
pub fn open_database(config: &Config) -> Result<Database, Box<dyn std::error::Error>> {
    let db = Database::open()?;
    db.set_busy_timeout(config.busy_timeout())?;
    Ok(db)
}
