//! Watch configuration management.
//!
//! Handles loading, saving, and validating the watcher settings: which
//! remote directory to poll, where pulled files land locally, how often to
//! poll, and which bridge binary to invoke. Stored as JSON in the platform
//! config directory; a default file is written on first run.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::device::DEFAULT_ADB_PROGRAM;
use crate::error::{Error, FileSystemError, Result};

/// Default remote directory watched on the device.
pub const DEFAULT_REMOTE_DIR: &str = "/storage/emulated/0/Documents/Office Lens";

/// Default local directory that pulled files land in, relative to the
/// working directory.
pub const DEFAULT_LOCAL_DIR: &str = "output_dir";

/// Default number of seconds between poll cycles.
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;

fn default_remote_dir() -> String {
    DEFAULT_REMOTE_DIR.to_string()
}

fn default_local_dir() -> PathBuf {
    PathBuf::from(DEFAULT_LOCAL_DIR)
}

const fn default_poll_interval_secs() -> u64 {
    DEFAULT_POLL_INTERVAL_SECS
}

const fn default_true() -> bool {
    true
}

fn default_adb_program() -> String {
    DEFAULT_ADB_PROGRAM.to_string()
}

/// Watcher configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WatchConfig {
    /// Remote directory polled on the device.
    #[serde(default = "default_remote_dir")]
    pub remote_dir: String,
    /// Local directory pulled files are written into.
    #[serde(default = "default_local_dir")]
    pub local_dir: PathBuf,
    /// Seconds between poll cycles.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    /// Whether files whose pull failed are re-attempted while they remain
    /// in the remote listing.
    #[serde(default = "default_true")]
    pub retry_failed_pulls: bool,
    /// Program name or path of the debug bridge binary.
    #[serde(default = "default_adb_program")]
    pub adb_program: String,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            remote_dir: default_remote_dir(),
            local_dir: default_local_dir(),
            poll_interval_secs: default_poll_interval_secs(),
            retry_failed_pulls: true,
            adb_program: default_adb_program(),
        }
    }
}

impl WatchConfig {
    /// Load configuration from the default location, or create defaults if
    /// no file exists yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be read or
    /// parsed.
    pub fn load() -> Result<Self> {
        Self::load_from(&config_file_path())
    }

    /// Load configuration from a specific file, or create defaults there if
    /// it does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("Config file not found, using defaults");
            let config = Self::default();
            if let Err(e) = config.save_to(path) {
                warn!("Failed to save default config: {}", e);
            }
            return Ok(config);
        }

        let content = fs::read_to_string(path).map_err(|e| {
            Error::FileSystem(FileSystemError::ReadFailed {
                path: path.to_path_buf(),
                reason: format!("Failed to read config file: {e}"),
            })
        })?;

        let config: Self = serde_json::from_str(&content)?;

        info!("Loaded config from {}", path.display());
        debug!("Watching remote directory: {}", config.remote_dir);

        Ok(config)
    }

    /// Save configuration to the default location.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be written.
    pub fn save(&self) -> Result<()> {
        self.save_to(&config_file_path())
    }

    /// Save configuration to a specific file.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be written.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.exists()
        {
            fs::create_dir_all(parent).map_err(|e| {
                Error::FileSystem(FileSystemError::CreateDirFailed {
                    path: parent.to_path_buf(),
                    reason: format!("Failed to create config directory: {e}"),
                })
            })?;
        }

        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content).map_err(|e| {
            Error::FileSystem(FileSystemError::WriteFailed {
                path: path.to_path_buf(),
                reason: format!("Failed to write config file: {e}"),
            })
        })?;

        info!("Saved config to {}", path.display());
        Ok(())
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for empty paths, an empty program
    /// name, or a zero poll interval.
    pub fn validate(&self) -> Result<()> {
        if self.remote_dir.trim().is_empty() {
            return Err(Error::Configuration(
                "remote directory must not be empty".to_string(),
            ));
        }
        if self.local_dir.as_os_str().is_empty() {
            return Err(Error::Configuration(
                "local directory must not be empty".to_string(),
            ));
        }
        if self.poll_interval_secs == 0 {
            return Err(Error::Configuration(
                "poll interval must be at least one second".to_string(),
            ));
        }
        if self.adb_program.trim().is_empty() {
            return Err(Error::Configuration(
                "bridge program name must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// The poll interval as a [`Duration`].
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    /// Set the remote directory.
    #[must_use]
    pub fn with_remote_dir(mut self, remote_dir: impl Into<String>) -> Self {
        self.remote_dir = remote_dir.into();
        self
    }

    /// Set the local directory.
    #[must_use]
    pub fn with_local_dir(mut self, local_dir: impl Into<PathBuf>) -> Self {
        self.local_dir = local_dir.into();
        self
    }

    /// Set the poll interval in seconds.
    #[must_use]
    pub const fn with_poll_interval_secs(mut self, secs: u64) -> Self {
        self.poll_interval_secs = secs;
        self
    }

    /// Enable or disable retrying of failed pulls.
    #[must_use]
    pub const fn with_retry_failed_pulls(mut self, retry: bool) -> Self {
        self.retry_failed_pulls = retry;
        self
    }

    /// Get the path to the config file.
    #[must_use]
    pub fn config_file_path() -> PathBuf {
        config_file_path()
    }
}

/// Get the path to the config file.
fn config_file_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| dirs::data_local_dir().unwrap_or_else(|| PathBuf::from(".")))
        .join("adbferry")
        .join("config.json")
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config_matches_documented_constants() {
        let config = WatchConfig::default();
        assert_eq!(config.remote_dir, DEFAULT_REMOTE_DIR);
        assert_eq!(config.local_dir, PathBuf::from(DEFAULT_LOCAL_DIR));
        assert_eq!(config.poll_interval_secs, 5);
        assert!(config.retry_failed_pulls);
        assert_eq!(config.adb_program, "adb");
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(WatchConfig::default().validate().is_ok());
    }

    #[test]
    fn test_config_serialization_roundtrip() {
        let config = WatchConfig::default()
            .with_remote_dir("/sdcard/DCIM/Camera")
            .with_local_dir("/home/user/pulls")
            .with_poll_interval_secs(30);

        let json = serde_json::to_string_pretty(&config).expect("Should serialize");
        let deserialized: WatchConfig = serde_json::from_str(&json).expect("Should deserialize");

        assert_eq!(config, deserialized);
    }

    #[test]
    fn test_config_deserialization_fills_missing_fields() {
        let json = r#"{"remote_dir":"/sdcard/scans"}"#;
        let config: WatchConfig = serde_json::from_str(json).expect("Should deserialize");

        assert_eq!(config.remote_dir, "/sdcard/scans");
        assert_eq!(config.local_dir, PathBuf::from(DEFAULT_LOCAL_DIR));
        assert_eq!(config.poll_interval_secs, DEFAULT_POLL_INTERVAL_SECS);
        assert!(config.retry_failed_pulls);
    }

    #[test]
    fn test_validate_rejects_empty_remote_dir() {
        let config = WatchConfig::default().with_remote_dir("  ");
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("remote directory"));
    }

    #[test]
    fn test_validate_rejects_empty_local_dir() {
        let config = WatchConfig::default().with_local_dir("");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_interval() {
        let config = WatchConfig::default().with_poll_interval_secs(0);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("poll interval"));
    }

    #[test]
    fn test_validate_rejects_empty_program() {
        let mut config = WatchConfig::default();
        config.adb_program = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_poll_interval_duration() {
        let config = WatchConfig::default().with_poll_interval_secs(7);
        assert_eq!(config.poll_interval(), Duration::from_secs(7));
    }

    #[test]
    fn test_load_from_missing_file_writes_defaults() {
        let temp_dir = TempDir::new().expect("Should create temp dir");
        let path = temp_dir.path().join("nested").join("config.json");

        let config = WatchConfig::load_from(&path).expect("Should load defaults");

        assert_eq!(config, WatchConfig::default());
        assert!(path.exists(), "defaults should be persisted on first load");
    }

    #[test]
    fn test_save_to_and_load_from_roundtrip() {
        let temp_dir = TempDir::new().expect("Should create temp dir");
        let path = temp_dir.path().join("config.json");

        let config = WatchConfig::default()
            .with_remote_dir("/sdcard/scans")
            .with_retry_failed_pulls(false);
        config.save_to(&path).expect("Should save");

        let loaded = WatchConfig::load_from(&path).expect("Should load");
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_from_rejects_malformed_json() {
        let temp_dir = TempDir::new().expect("Should create temp dir");
        let path = temp_dir.path().join("config.json");
        fs::write(&path, "{ not json").expect("Should write file");

        let result = WatchConfig::load_from(&path);
        assert!(matches!(result, Err(Error::Serialization(_))));
    }

    #[test]
    fn test_config_file_path_uses_correct_name() {
        let path = WatchConfig::config_file_path();
        assert!(path.to_string_lossy().ends_with("config.json"));
        assert!(path.to_string_lossy().contains("adbferry"));
    }
}
