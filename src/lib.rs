// src/lib.rs
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

// --- Declare modules ---
mod config;
pub mod models;
pub mod session;
pub mod store;

// --- Expose public types ---
pub use config::{
    get_config_path as get_config_path_util,
    load_config as load_config_util,
    save_config as save_config_util,
    Config,
    Error as ConfigError,
};
pub use models::{
    AppState, ExercisePatch, PersistedSessionState, WorkoutExercise, WorkoutSet, SCHEMA_VERSION,
};
pub use session::{SessionTimer, SESSION_KEY};
pub use store::{
    get_store_path as get_store_path_util,
    Error as StoreError,
    SnapshotStore,
    SqliteStore,
};

/// Owns the configured session timer and its backing store paths. The
/// application constructs exactly one of these at startup and tears it
/// down (or resets it) at logout.
pub struct SessionService {
    pub config: Config,
    pub timer: SessionTimer<SqliteStore>,
    pub store_path: PathBuf,
    pub config_path: PathBuf,
}

impl SessionService {
    /// Initializes the service: loads config, opens the snapshot store and
    /// rehydrates the session from it.
    /// # Errors
    /// Returns `anyhow::Error` if config/store path determination, loading,
    /// or opening fails. Rehydration itself never fails.
    pub fn initialize() -> Result<Self> {
        let config_path =
            config::get_config_path().context("Failed to determine configuration file path")?;
        let config = config::load_config(&config_path)
            .context(format!("Failed to load config from {config_path:?}"))?;

        let store_path = store::get_store_path().context("Failed to determine store path")?;
        let snapshot_store = SqliteStore::open(&store_path)
            .with_context(|| format!("Failed to open snapshot store at {store_path:?}"))?;

        let timer = SessionTimer::restore(snapshot_store, &config);

        Ok(Self {
            config,
            timer,
            store_path,
            config_path,
        })
    }

    pub fn get_config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn get_store_path(&self) -> &Path {
        &self.store_path
    }

    /// Saves the current configuration state.
    /// # Errors
    /// Returns `ConfigError` if saving fails.
    pub fn save_config(&self) -> Result<(), ConfigError> {
        config::save_config(&self.config_path, &self.config)
    }

    /// Sets the debounce window for snapshot writes.
    /// # Errors
    /// - `ConfigError::InvalidDebounceWindow` if `ms` is 0.
    /// - `ConfigError` variants if saving fails.
    pub fn set_debounce_ms(&mut self, ms: u64) -> Result<(), ConfigError> {
        if ms == 0 {
            return Err(ConfigError::InvalidDebounceWindow(ms));
        }
        self.config.debounce_ms = ms;
        self.save_config()
    }

    /// Sets the maximum snapshot age before a stored session is discarded.
    /// # Errors
    /// - `ConfigError::InvalidSnapshotAge` if `days` is 0.
    /// - `ConfigError` variants if saving fails.
    pub fn set_max_snapshot_age_days(&mut self, days: u32) -> Result<(), ConfigError> {
        if days == 0 {
            return Err(ConfigError::InvalidSnapshotAge(days));
        }
        self.config.max_snapshot_age_days = days;
        self.save_config()
    }

    /// Reads out the finished session's exercises and resets the timer.
    /// Submitting the workout to the backend happens outside this crate;
    /// the caller gets the exercises the session accumulated.
    pub fn finish_workout(&mut self) -> Vec<WorkoutExercise> {
        let exercises = self.timer.exercises().to_vec();
        self.timer.reset();
        exercises
    }

    /// Signals that the host is about to lose the process: the last
    /// guaranteed write point. CLI invocations call this before exiting.
    pub fn suspend(&mut self) {
        self.timer.handle_app_state(AppState::Background);
    }
}

/// Formats accumulated seconds as `h:mm:ss` (or `m:ss` under an hour).
#[must_use]
pub fn format_elapsed(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;
    if hours > 0 {
        format!("{hours}:{minutes:02}:{secs:02}")
    } else {
        format!("{minutes}:{secs:02}")
    }
}

#[cfg(test)]
mod tests {
    use super::format_elapsed;

    #[test]
    fn formats_elapsed_time() {
        assert_eq!(format_elapsed(0), "0:00");
        assert_eq!(format_elapsed(65), "1:05");
        assert_eq!(format_elapsed(3675), "1:01:15");
    }
}
