//! Error types for AdbFerry core operations.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using the crate's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the device bridge.
///
/// Only the preflight operations (device enumeration, remote directory
/// creation) surface these. Listing, pull, and delete failures are absorbed
/// by the bridge and reported as empty/false results instead.
#[derive(Debug, Error)]
pub enum DeviceError {
    /// The bridge tool could not be spawned at all.
    #[error("{program} not found; ensure it is installed and on PATH")]
    ToolNotFound {
        /// Program name that failed to spawn.
        program: String,
    },

    /// The bridge tool ran but the command failed.
    #[error("device command failed ({command}): {reason}")]
    CommandFailed {
        /// The command that was attempted.
        command: String,
        /// Stderr or spawn error text.
        reason: String,
    },

    /// No usable device is attached.
    #[error("no device attached")]
    NoDeviceAttached,

    /// The remote directory is missing and could not be created.
    #[error("remote directory unavailable: {path}: {reason}")]
    RemoteDirUnavailable {
        /// Remote directory path.
        path: String,
        /// Stderr or spawn error text.
        reason: String,
    },
}

/// Errors raised by local file system operations.
#[derive(Debug, Error)]
pub enum FileSystemError {
    /// Failed to create a directory.
    #[error("failed to create directory {path}: {reason}")]
    CreateDirFailed {
        /// Path that could not be created.
        path: PathBuf,
        /// Underlying error text.
        reason: String,
    },

    /// Failed to read a file or its metadata.
    #[error("failed to read {path}: {reason}")]
    ReadFailed {
        /// Path that could not be read.
        path: PathBuf,
        /// Underlying error text.
        reason: String,
    },

    /// Failed to write a file.
    #[error("failed to write {path}: {reason}")]
    WriteFailed {
        /// Path that could not be written.
        path: PathBuf,
        /// Underlying error text.
        reason: String,
    },

    /// Failed to delete a file.
    #[error("failed to delete {path}: {reason}")]
    DeleteFailed {
        /// Path that could not be deleted.
        path: PathBuf,
        /// Underlying error text.
        reason: String,
    },

    /// Path does not exist.
    #[error("path not found: {path}")]
    NotFound {
        /// The missing path.
        path: PathBuf,
    },
}

/// Errors that can occur in AdbFerry core operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Device bridge error.
    #[error(transparent)]
    Device(#[from] DeviceError),

    /// Local file system error.
    #[error(transparent)]
    FileSystem(#[from] FileSystemError),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Internal invariant violation or unexpected failure.
    #[error("Internal error: {0}")]
    Internal(String),
}
