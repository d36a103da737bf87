//! Settings persistence
//!
//! The configuration is stored as one flat JSON object. Loading never
//! fails: a missing or unreadable file means default settings.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::config::Config;
use crate::ManualLaborError;

/// Settings file name, stored in the home directory
pub const SETTINGS_FILE_NAME: &str = ".manual_labor_settings.json";

/// Returns the settings file path: `~/.manual_labor_settings.json`.
pub fn settings_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(SETTINGS_FILE_NAME))
}

/// Tries to read and parse the settings file.
pub fn try_load(path: &Path) -> Result<Config, ManualLaborError> {
    let content = fs::read_to_string(path).map_err(|e| persistence_error(path, e))?;
    from_json(&content)
}

/// Parse a settings record; missing keys take their defaults.
pub fn from_json(content: &str) -> Result<Config, ManualLaborError> {
    let mut config: Config = serde_json::from_str(content)?;
    config.validate();
    Ok(config)
}

/// Loads the settings file, falling back to defaults on any failure.
pub fn load(path: &Path) -> Config {
    match try_load(path) {
        Ok(config) => {
            info!("Loaded settings from {}", path.display());
            config
        }
        Err(e) => {
            debug!("Using default settings ({})", e);
            Config::default()
        }
    }
}

/// Writes the configuration as pretty-printed JSON.
pub fn save(path: &Path, config: &Config) -> Result<(), ManualLaborError> {
    let json = serde_json::to_string_pretty(config)?;
    fs::write(path, json).map_err(|e| persistence_error(path, e))?;
    info!("Saved settings to {}", path.display());
    Ok(())
}

fn persistence_error(path: &Path, e: io::Error) -> ManualLaborError {
    ManualLaborError::Persistence(format!("{}: {}", path.display(), e))
}
