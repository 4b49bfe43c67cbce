//! `AdbFerry` Core Library
//!
//! This crate provides the core functionality for the `AdbFerry` application:
//! - Device bridge for talking to an Android device through the `adb` tool
//! - Polling transfer engine that pulls new remote files and deletes them
//!   from the device once copied
//! - Baseline and retry tracking so pre-existing files are left alone and
//!   failed pulls can be re-attempted
//! - Application configuration management
//! - Local file system abstraction for testability
//!
//! # Error Handling
//!
//! Fatal setup problems (missing `adb`, no device attached, remote directory
//! unavailable) surface as typed errors. Per-cycle device hiccups do not: the
//! bridge absorbs them into empty listings and `false` results so the polling
//! loop keeps running. See the [`error`] module for details.
//!
//! ```rust,ignore
//! use adbferry_core::{Error, Result};
//!
//! fn do_something() -> Result<()> {
//!     // Your code here
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod device;
pub mod error;
pub mod fs;
pub mod transfer;

pub use config::{
    DEFAULT_LOCAL_DIR, DEFAULT_POLL_INTERVAL_SECS, DEFAULT_REMOTE_DIR, WatchConfig,
};
pub use device::{
    AdbBridge, DEFAULT_ADB_PROGRAM, DeviceBridge, parse_devices_output, shell_quote,
};
pub use error::{DeviceError, Error, FileSystemError, Result};
pub use fs::{FileMetadata, FileSystem, RealFileSystem};
pub use transfer::{
    CycleReport, DEFAULT_POLL_INTERVAL, PollState, SessionReport, TransferEngine, TransferOptions,
    TransferRecord,
};
