//! Data and configuration locations for the cashier CLI

use std::path::PathBuf;

const APP_DIR: &str = "cashier";

const DATABASE_FILE: &str = "cashier.db";

const CONFIG_FILE: &str = "config.toml";

/// Base data directory, e.g. `~/.local/share/cashier`
///
/// Falls back to `.cashier` in the current directory when the platform data
/// directory cannot be determined.
pub fn get_data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|d| d.join(APP_DIR))
        .unwrap_or_else(|| PathBuf::from(".cashier"))
}

/// Default SQLite database, used when `database.path` is not configured
pub fn get_database_path() -> PathBuf {
    get_data_dir().join(DATABASE_FILE)
}

/// Configuration directory
///
/// `$XDG_CONFIG_HOME/cashier` when the variable is set (outside Windows),
/// otherwise the platform config directory.
pub fn get_config_dir() -> PathBuf {
    #[cfg(not(target_os = "windows"))]
    if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME")
        && !xdg_config.is_empty()
    {
        return PathBuf::from(xdg_config).join(APP_DIR);
    }

    dirs::config_dir()
        .map(|d| d.join(APP_DIR))
        .unwrap_or_else(|| PathBuf::from(".cashier"))
}

pub fn get_config_path() -> PathBuf {
    get_config_dir().join(CONFIG_FILE)
}
