//! Structured logging system using tracing.
//!
//! Provides configurable logging with:
//! - Different log levels for development and production
//! - Console output with human-readable formatting
//! - File output with JSON formatting and rotation (daily by default)
//! - A console-only fallback for when the log directory is unavailable

use std::path::PathBuf;

use tracing::Level;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt,
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

/// Logging configuration options.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Directory where log files are stored.
    pub log_directory: PathBuf,
    /// Log file name prefix (e.g., "adbferry" -> "adbferry.2024-01-15.log").
    pub log_file_prefix: String,
    /// Maximum log level for console output.
    pub console_level: Level,
    /// Maximum log level for file output.
    pub file_level: Level,
    /// How often to rotate log files.
    pub rotation: LogRotation,
    /// Whether to include ANSI color codes in console output.
    pub console_ansi: bool,
    /// Whether to include timestamps in console output.
    pub console_timestamps: bool,
    /// Whether to include file/line info in logs.
    pub include_file_line: bool,
    /// Whether to include target module in logs.
    pub include_target: bool,
}

/// Log rotation frequency.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogRotation {
    /// Create a new log file every minute (for testing).
    Minutely,
    /// Create a new log file every hour.
    Hourly,
    /// Create a new log file every day.
    Daily,
    /// Never rotate (single log file).
    Never,
}

impl From<LogRotation> for Rotation {
    fn from(rotation: LogRotation) -> Self {
        match rotation {
            LogRotation::Minutely => Self::MINUTELY,
            LogRotation::Hourly => Self::HOURLY,
            LogRotation::Daily => Self::DAILY,
            LogRotation::Never => Self::NEVER,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self::production()
    }
}

impl LoggingConfig {
    /// Create a development configuration with verbose logging.
    #[must_use]
    pub fn development() -> Self {
        Self {
            log_directory: default_log_directory(),
            log_file_prefix: "adbferry".to_string(),
            console_level: Level::DEBUG,
            file_level: Level::TRACE,
            rotation: LogRotation::Hourly,
            console_ansi: true,
            console_timestamps: true,
            include_file_line: true,
            include_target: true,
        }
    }

    /// Create a production configuration with a quieter console.
    #[must_use]
    pub fn production() -> Self {
        Self {
            log_directory: default_log_directory(),
            log_file_prefix: "adbferry".to_string(),
            console_level: Level::INFO,
            file_level: Level::DEBUG,
            rotation: LogRotation::Daily,
            console_ansi: true,
            console_timestamps: true,
            include_file_line: false,
            include_target: false,
        }
    }

    /// Detect configuration based on build type.
    #[must_use]
    pub fn auto() -> Self {
        if cfg!(debug_assertions) {
            Self::development()
        } else {
            Self::production()
        }
    }

    /// Set the log directory.
    #[must_use]
    pub fn with_log_directory(mut self, path: PathBuf) -> Self {
        self.log_directory = path;
        self
    }

    /// Set the log file prefix.
    #[must_use]
    pub fn with_log_file_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.log_file_prefix = prefix.into();
        self
    }

    /// Set the console log level.
    #[must_use]
    pub const fn with_console_level(mut self, level: Level) -> Self {
        self.console_level = level;
        self
    }

    /// Set the file log level.
    #[must_use]
    pub const fn with_file_level(mut self, level: Level) -> Self {
        self.file_level = level;
        self
    }

    /// Set the log rotation frequency.
    #[must_use]
    pub const fn with_rotation(mut self, rotation: LogRotation) -> Self {
        self.rotation = rotation;
        self
    }
}

/// Guard that keeps file logging active. Drop this to flush and close log files.
pub struct LoggingGuard {
    _file_guard: tracing_appender::non_blocking::WorkerGuard,
}

/// Initialize the logging system with the given configuration.
///
/// Returns a guard that must be kept alive for the duration of the application.
/// When the guard is dropped, any pending log entries are flushed to disk.
///
/// # Errors
///
/// Returns an error if the log directory cannot be created or accessed.
///
/// # Panics
///
/// Panics if logging has already been initialized.
pub fn init(config: &LoggingConfig) -> Result<LoggingGuard, LoggingError> {
    if !config.log_directory.exists() {
        std::fs::create_dir_all(&config.log_directory).map_err(|e| {
            LoggingError::DirectoryCreationFailed {
                path: config.log_directory.clone(),
                reason: e.to_string(),
            }
        })?;
    }

    let file_appender = RollingFileAppender::new(
        config.rotation.into(),
        &config.log_directory,
        &config.log_file_prefix,
    );

    // Make file logging non-blocking
    let (non_blocking, file_guard) = tracing_appender::non_blocking(file_appender);

    // File filter is more verbose than the console one
    let file_filter = EnvFilter::new(level_to_directive(config.file_level))
        .add_directive("adbferry=trace".parse().expect("valid directive"))
        .add_directive("adbferry_core=trace".parse().expect("valid directive"));

    let console_layer = {
        let layer = fmt::layer()
            .with_ansi(config.console_ansi)
            .with_target(config.include_target)
            .with_file(config.include_file_line)
            .with_line_number(config.include_file_line);
        if config.console_timestamps {
            layer.with_filter(console_filter()).boxed()
        } else {
            layer.without_time().with_filter(console_filter()).boxed()
        }
    };

    // File layer with JSON formatting
    let file_layer = fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .json()
        .with_filter(file_filter);

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .init();

    Ok(LoggingGuard {
        _file_guard: file_guard,
    })
}

/// Initialize logging with automatic configuration detection.
///
/// Uses development config in debug builds, production config in release builds.
///
/// # Errors
///
/// Returns an error if initialization fails.
///
/// # Panics
///
/// Panics if logging has already been initialized.
pub fn init_auto() -> Result<LoggingGuard, LoggingError> {
    init(&LoggingConfig::auto())
}

/// Initialize console-only logging, for when the log directory is unusable.
///
/// # Panics
///
/// Panics if logging has already been initialized.
pub fn init_console_only() {
    tracing_subscriber::registry()
        .with(fmt::layer().with_filter(console_filter()))
        .init();
}

/// Console filter: overridable via `RUST_LOG`, otherwise quiet dependencies
/// with informative output from this application.
fn console_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("warn")
            .add_directive("adbferry=info".parse().expect("valid directive"))
            .add_directive("adbferry_core=info".parse().expect("valid directive"))
    })
}

/// Get the default log directory.
#[must_use]
pub fn default_log_directory() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("adbferry")
        .join("logs")
}

/// Convert a tracing Level to a filter directive string.
const fn level_to_directive(level: Level) -> &'static str {
    match level {
        Level::TRACE => "trace",
        Level::DEBUG => "debug",
        Level::INFO => "info",
        Level::WARN => "warn",
        Level::ERROR => "error",
    }
}

/// Errors that can occur during logging initialization.
#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    /// Failed to create the log directory.
    #[error("Failed to create log directory {path}: {reason}")]
    DirectoryCreationFailed {
        /// The path that could not be created.
        path: PathBuf,
        /// The reason for the failure.
        reason: String,
    },
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_production() {
        let config = LoggingConfig::default();
        assert_eq!(config.console_level, Level::INFO);
        assert_eq!(config.file_level, Level::DEBUG);
        assert_eq!(config.rotation, LogRotation::Daily);
    }

    #[test]
    fn test_development_config() {
        let config = LoggingConfig::development();
        assert_eq!(config.console_level, Level::DEBUG);
        assert_eq!(config.file_level, Level::TRACE);
        assert_eq!(config.rotation, LogRotation::Hourly);
        assert!(config.include_file_line);
    }

    #[test]
    fn test_production_config() {
        let config = LoggingConfig::production();
        assert_eq!(config.console_level, Level::INFO);
        assert_eq!(config.file_level, Level::DEBUG);
        assert_eq!(config.rotation, LogRotation::Daily);
        assert!(!config.include_file_line);
        assert!(!config.include_target);
    }

    #[test]
    fn test_config_builder() {
        let config = LoggingConfig::production()
            .with_console_level(Level::WARN)
            .with_file_level(Level::INFO)
            .with_rotation(LogRotation::Hourly)
            .with_log_file_prefix("custom");

        assert_eq!(config.console_level, Level::WARN);
        assert_eq!(config.file_level, Level::INFO);
        assert_eq!(config.rotation, LogRotation::Hourly);
        assert_eq!(config.log_file_prefix, "custom");
    }

    #[test]
    fn test_log_rotation_conversion() {
        assert!(matches!(
            Rotation::from(LogRotation::Minutely),
            Rotation::MINUTELY
        ));
        assert!(matches!(
            Rotation::from(LogRotation::Hourly),
            Rotation::HOURLY
        ));
        assert!(matches!(
            Rotation::from(LogRotation::Daily),
            Rotation::DAILY
        ));
        assert!(matches!(
            Rotation::from(LogRotation::Never),
            Rotation::NEVER
        ));
    }

    #[test]
    fn test_default_log_directory() {
        let dir = default_log_directory();
        assert!(dir.to_string_lossy().contains("adbferry"));
        assert!(dir.to_string_lossy().contains("logs"));
    }

    #[test]
    fn test_init_writes_to_custom_directory() {
        let temp = tempfile::TempDir::new().expect("Should create temp dir");
        let config = LoggingConfig::development()
            .with_log_directory(temp.path().join("logs"))
            .with_rotation(LogRotation::Never);

        // Only this test may install the global subscriber.
        let guard = init(&config).expect("Logging should initialize");
        tracing::info!("logging smoke test");
        drop(guard);

        let entries: Vec<_> = std::fs::read_dir(temp.path().join("logs"))
            .expect("Log directory should exist")
            .collect();
        assert!(!entries.is_empty(), "A log file should have been created");
    }
}
