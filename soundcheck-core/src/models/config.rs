use std::path::PathBuf;
use std::time::Duration;

use super::audio_models::MediaConstraints;

/// Default recording ceiling in seconds.
pub const DEFAULT_MAX_DURATION_SECS: u32 = 60;

/// Default payload ceiling (50 MiB).
pub const DEFAULT_MAX_PAYLOAD_BYTES: u64 = 50 * 1024 * 1024;

/// Default maximum title length, in characters.
pub const DEFAULT_MAX_TITLE_LEN: usize = 100;

/// Environment variable overriding the database location.
pub const DB_PATH_ENV: &str = "SOUNDCHECK_DB_PATH";

/// Configuration for the recorder.
#[derive(Debug, Clone)]
pub struct RecorderConfiguration {
    /// Auto-stop ceiling in seconds (None = unlimited).
    pub max_duration_secs: Option<u32>,

    /// Period of the elapsed-time tick (default: 1 second).
    pub tick_interval: Duration,

    /// Constraints applied to every stream request; the device id is
    /// filled in per `start`.
    pub constraints: MediaConstraints,
}

impl RecorderConfiguration {
    pub fn validate(&self) -> Result<(), String> {
        if self.tick_interval.is_zero() {
            return Err("tick interval must be positive".into());
        }
        if self.max_duration_secs == Some(0) {
            return Err("max duration must be positive".into());
        }
        Ok(())
    }
}

impl Default for RecorderConfiguration {
    fn default() -> Self {
        Self {
            max_duration_secs: Some(DEFAULT_MAX_DURATION_SECS),
            tick_interval: Duration::from_secs(1),
            constraints: MediaConstraints::default(),
        }
    }
}

/// Configuration for the local recording store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfiguration {
    /// SQLite database file.
    pub database_path: PathBuf,

    pub max_title_len: usize,

    pub max_payload_bytes: u64,
}

impl StoreConfiguration {
    pub fn new(database_path: impl Into<PathBuf>) -> Self {
        Self {
            database_path: database_path.into(),
            ..Default::default()
        }
    }

    /// Default configuration with the database path taken from
    /// `SOUNDCHECK_DB_PATH` when set.
    pub fn from_env() -> Self {
        match std::env::var_os(DB_PATH_ENV) {
            Some(path) if !path.is_empty() => Self::new(path),
            _ => Self::default(),
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.database_path.as_os_str().is_empty() {
            return Err("database path must not be empty".into());
        }
        if self.max_title_len == 0 {
            return Err("max title length must be positive".into());
        }
        if self.max_payload_bytes == 0 {
            return Err("max payload size must be positive".into());
        }
        Ok(())
    }
}

impl Default for StoreConfiguration {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("soundcheck.db"),
            max_title_len: DEFAULT_MAX_TITLE_LEN,
            max_payload_bytes: DEFAULT_MAX_PAYLOAD_BYTES,
        }
    }
}
