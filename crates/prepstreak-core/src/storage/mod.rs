mod config;
pub mod database;
pub mod migrations;

pub use config::{Config, NotificationsConfig, StorageConfig, StreakConfig};
pub use database::Database;

use std::path::PathBuf;

use crate::error::ConfigError;

/// Returns the prepstreak data directory, creating it if needed.
///
/// `PREPSTREAK_DATA_DIR` wins when set. Otherwise `~/.config/prepstreak/`,
/// or `~/.config/prepstreak-dev/` when `PREPSTREAK_ENV=dev`.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let dir = match std::env::var_os("PREPSTREAK_DATA_DIR") {
        Some(explicit) if !explicit.is_empty() => PathBuf::from(explicit),
        _ => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env = std::env::var("PREPSTREAK_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("prepstreak-dev")
            } else {
                base_dir.join("prepstreak")
            }
        }
    };

    std::fs::create_dir_all(&dir)
        .map_err(|e| ConfigError::DataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}
