// src/config.rs
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

const CONFIG_FILE_NAME: &str = "config.toml";
const APP_CONFIG_DIR: &str = "gear-session";
const CONFIG_ENV_VAR: &str = "GEAR_SESSION_CONFIG_DIR"; // Environment variable name

#[derive(Error, Debug)]
pub enum Error {
    #[error("Could not determine configuration directory.")]
    CannotDetermineConfigDir,
    #[error("I/O error accessing config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config file (TOML): {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("Failed to serialize config data (TOML): {0}")]
    TomlSerialize(#[from] toml::ser::Error),
    #[error("Debounce window must be at least 1 ms (got {0}).")]
    InvalidDebounceWindow(u64),
    #[error("Snapshot max age must be at least 1 day (got {0}).")]
    InvalidSnapshotAge(u32),
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)] // Ensure defaults are used if fields are missing
pub struct Config {
    /// Quiescence window for debounced snapshot writes, in milliseconds.
    pub debounce_ms: u64,
    /// Display tick interval while the timer runs, in milliseconds.
    pub tick_ms: u64,
    /// Snapshots older than this are discarded instead of restored.
    pub max_snapshot_age_days: u32,
    /// Tab restored when no snapshot carries one.
    pub default_tab: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            debounce_ms: 500,
            tick_ms: 100,
            max_snapshot_age_days: 7,
            default_tab: "Home".to_string(),
        }
    }
}

/// Determines the path to the configuration file.
/// Exposed at crate root as `get_config_path_util`
pub fn get_config_path() -> Result<PathBuf, Error> {
    let config_dir_override = std::env::var(CONFIG_ENV_VAR).ok();

    let config_dir_path = if let Some(path_str) = config_dir_override {
        let path = PathBuf::from(path_str);
        if !path.is_dir() {
            eprintln!( // Keep warning, as it's about env var setup
                "Warning: Environment variable {} points to '{}', which is not a directory. Trying to create it.",
                CONFIG_ENV_VAR,
                path.display()
            );
            fs::create_dir_all(&path)?;
        }
        path
    } else {
        let base_config_dir = dirs::config_dir().ok_or(Error::CannotDetermineConfigDir)?;
        base_config_dir.join(APP_CONFIG_DIR)
    };

    if !config_dir_path.exists() {
        fs::create_dir_all(&config_dir_path)?;
    }

    Ok(config_dir_path.join(CONFIG_FILE_NAME))
}

/// Loads the configuration from the TOML file at the given path.
/// Exposed at crate root as `load_config_util`
pub fn load_config(config_path: &Path) -> Result<Config, Error> {
    if config_path.exists() {
        let config_content = fs::read_to_string(config_path)?;
        // Use serde(default) to handle missing fields when parsing
        let config: Config = toml::from_str(&config_content).map_err(Error::TomlParse)?;
        Ok(config)
    } else {
        // Don't print here, let caller decide how to inform user
        let default_config = Config::default();
        save_config(config_path, &default_config)?;
        Ok(default_config)
    }
}

/// Saves the configuration to the TOML file.
/// Exposed at crate root as `save_config_util`
pub fn save_config(config_path: &Path, config: &Config) -> Result<(), Error> {
    if let Some(parent_dir) = config_path.parent() {
        if !parent_dir.exists() {
            fs::create_dir_all(parent_dir)?;
        }
    }
    let config_content = toml::to_string_pretty(config).map_err(Error::TomlSerialize)?;
    fs::write(config_path, config_content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{load_config, save_config, Config};

    #[test]
    fn missing_file_is_created_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let config = load_config(&path).unwrap();
        assert_eq!(config.debounce_ms, 500);
        assert_eq!(config.max_snapshot_age_days, 7);
        assert!(path.exists());
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "debounce_ms = 250\n").unwrap();
        let config = load_config(&path).unwrap();
        assert_eq!(config.debounce_ms, 250);
        assert_eq!(config.tick_ms, 100);
        assert_eq!(config.default_tab, "Home");
    }

    #[test]
    fn save_and_reload_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let config = Config {
            max_snapshot_age_days: 14,
            ..Default::default()
        };
        save_config(&path, &config).unwrap();
        let loaded = load_config(&path).unwrap();
        assert_eq!(loaded.max_snapshot_age_days, 14);
    }
}
