//! Polling transfer engine that drains a remote device directory.
//!
//! This module provides:
//! - A preflight phase confirming device connectivity and directory setup
//! - Baseline capture so files present before monitoring are never pulled
//! - A pure poll step (`poll_cycle`) computing new files by set difference
//! - Pull-then-delete handling with per-cycle and per-session statistics
//!
//! # Example
//!
//! ```rust,ignore
//! use adbferry_core::transfer::{TransferEngine, TransferOptions};
//! use adbferry_core::device::AdbBridge;
//! use adbferry_core::fs::RealFileSystem;
//!
//! let engine = TransferEngine::new(
//!     AdbBridge::default(),
//!     RealFileSystem::new(),
//!     TransferOptions::default(),
//! );
//!
//! let session = engine.run()?;
//! println!("{}", session.summary());
//! ```

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::{DEFAULT_LOCAL_DIR, DEFAULT_POLL_INTERVAL_SECS, DEFAULT_REMOTE_DIR, WatchConfig};
use crate::device::DeviceBridge;
use crate::error::{DeviceError, Error, Result};
use crate::fs::FileSystem;

// =============================================================================
// Constants
// =============================================================================

/// Default interval between poll cycles.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS);

/// How often the inter-cycle sleep wakes up to check for a stop request.
const STOP_CHECK_INTERVAL: Duration = Duration::from_millis(200);

// =============================================================================
// Transfer Options
// =============================================================================

/// Configuration options for the transfer engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TransferOptions {
    /// Remote directory polled on the device.
    pub remote_dir: String,

    /// Local directory pulled files are written into.
    pub local_dir: PathBuf,

    /// Interval between poll cycles.
    /// Default: 5 seconds
    pub poll_interval: Duration,

    /// Whether files whose pull failed are re-attempted while they remain
    /// in the remote listing.
    /// Default: true
    pub retry_failed_pulls: bool,
}

impl Default for TransferOptions {
    fn default() -> Self {
        Self {
            remote_dir: DEFAULT_REMOTE_DIR.to_string(),
            local_dir: PathBuf::from(DEFAULT_LOCAL_DIR),
            poll_interval: DEFAULT_POLL_INTERVAL,
            retry_failed_pulls: true,
        }
    }
}

impl TransferOptions {
    /// Validate the options.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for empty directories or a zero poll
    /// interval.
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
        if self.poll_interval.is_zero() {
            return Err(Error::Configuration(
                "poll interval must not be zero".to_string(),
            ));
        }
        Ok(())
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

    /// Set the poll interval.
    #[must_use]
    pub const fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Enable or disable retrying of failed pulls.
    #[must_use]
    pub const fn with_retry_failed_pulls(mut self, retry: bool) -> Self {
        self.retry_failed_pulls = retry;
        self
    }
}

impl From<&WatchConfig> for TransferOptions {
    fn from(config: &WatchConfig) -> Self {
        Self {
            remote_dir: config.remote_dir.clone(),
            local_dir: config.local_dir.clone(),
            poll_interval: config.poll_interval(),
            retry_failed_pulls: config.retry_failed_pulls,
        }
    }
}

// =============================================================================
// Poll State
// =============================================================================

/// State threaded through poll cycles.
///
/// `known` mirrors the raw remote listing of the most recent cycle,
/// regardless of per-file outcomes. `failed` tracks files whose pull failed
/// so they can be re-attempted; it is kept separate so the known-set rule
/// stays exact.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PollState {
    /// Filenames observed in the most recent remote listing.
    pub known: HashSet<String>,
    /// Filenames whose most recent pull attempt failed.
    pub failed: HashSet<String>,
}

impl PollState {
    /// Create a state from a baseline listing.
    #[must_use]
    pub fn from_baseline(known: HashSet<String>) -> Self {
        Self {
            known,
            failed: HashSet::new(),
        }
    }
}

// =============================================================================
// Reports
// =============================================================================

/// Information about a single pulled file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferRecord {
    /// Remote filename.
    pub name: String,
    /// Size of the local copy in bytes (0 if it could not be read).
    pub bytes: u64,
    /// Whether the remote copy was deleted afterwards.
    pub deleted: bool,
}

/// Outcome of one poll cycle.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CycleReport {
    /// Number of entries in the raw remote listing.
    pub listed: usize,
    /// Number of files seen for the first time this cycle.
    pub new_files: usize,
    /// Number of previously failed files re-attempted this cycle.
    pub retried: usize,
    /// Successfully pulled files.
    pub transferred: Vec<TransferRecord>,
    /// Files whose pull failed.
    pub failed: Vec<String>,
    /// Hidden files (leading dot) that were skipped.
    pub skipped_hidden: Vec<String>,
}

impl CycleReport {
    /// Whether the cycle had nothing to do.
    #[must_use]
    pub const fn is_quiet(&self) -> bool {
        self.new_files == 0 && self.retried == 0
    }

    /// One-line human-readable summary.
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "{} listed, {} new, {} transferred, {} failed, {} hidden skipped",
            self.listed,
            self.new_files,
            self.transferred.len(),
            self.failed.len(),
            self.skipped_hidden.len()
        )
    }
}

/// Accumulated totals for a monitoring session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionReport {
    /// Number of completed poll cycles.
    pub cycles: u64,
    /// Number of files successfully pulled.
    pub files_transferred: u64,
    /// Number of failed pull attempts.
    pub failed_pulls: u64,
    /// Number of pulled files whose remote delete failed.
    pub delete_failures: u64,
    /// Total bytes pulled.
    pub bytes_transferred: u64,
}

impl SessionReport {
    /// Fold one cycle's outcome into the session totals.
    pub fn record(&mut self, report: &CycleReport) {
        self.cycles += 1;
        self.files_transferred += report.transferred.len() as u64;
        self.failed_pulls += report.failed.len() as u64;
        self.delete_failures += report.transferred.iter().filter(|t| !t.deleted).count() as u64;
        self.bytes_transferred += report.transferred.iter().map(|t| t.bytes).sum::<u64>();
    }

    /// One-line human-readable summary.
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "Session complete: {} cycles, {} files transferred ({} bytes), {} failed pulls, {} delete failures",
            self.cycles,
            self.files_transferred,
            self.bytes_transferred,
            self.failed_pulls,
            self.delete_failures
        )
    }
}

// =============================================================================
// Transfer Engine
// =============================================================================

/// Engine that polls the remote directory and ferries new files locally.
///
/// Generic over the device bridge and the local file system so the polling
/// logic can be tested without a physical device or disk writes.
pub struct TransferEngine<B: DeviceBridge, F: FileSystem> {
    bridge: B,
    fs: F,
    options: TransferOptions,
    /// Cancellation flag.
    cancelled: Arc<AtomicBool>,
}

impl<B: DeviceBridge, F: FileSystem> TransferEngine<B, F> {
    /// Create a new transfer engine.
    #[must_use]
    pub fn new(bridge: B, fs: F, options: TransferOptions) -> Self {
        Self {
            bridge,
            fs,
            options,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Create a new transfer engine with a shared cancellation flag.
    #[must_use]
    pub const fn with_cancellation(
        bridge: B,
        fs: F,
        options: TransferOptions,
        cancelled: Arc<AtomicBool>,
    ) -> Self {
        Self {
            bridge,
            fs,
            options,
            cancelled,
        }
    }

    /// The options this engine runs with.
    #[must_use]
    pub const fn options(&self) -> &TransferOptions {
        &self.options
    }

    /// Request a stop at the next checkpoint.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Check if a stop has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Get a cancellation token that can be shared across threads.
    #[must_use]
    pub fn cancellation_token(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancelled)
    }

    /// Confirm connectivity and prepare both directories.
    ///
    /// # Errors
    ///
    /// Returns an error if the options are invalid, no usable device is
    /// attached, the remote directory cannot be created, or the local
    /// directory cannot be created. All of these abort before the loop
    /// starts.
    pub fn preflight(&self) -> Result<()> {
        self.options.validate()?;

        let devices = self.bridge.list_devices()?;
        if devices.is_empty() {
            return Err(Error::Device(DeviceError::NoDeviceAttached));
        }
        info!("Device connection successful: {}", devices.join(", "));

        self.bridge.ensure_directory(&self.options.remote_dir)?;
        self.fs.create_dir_all(&self.options.local_dir)?;

        info!("Monitoring: {}", self.options.remote_dir);
        info!("Copying to: {}", self.options.local_dir.display());
        Ok(())
    }

    /// Capture the current remote listing as the baseline state.
    ///
    /// Files already present are treated as seen and are never pulled.
    #[must_use]
    pub fn baseline(&self) -> PollState {
        let known = self.bridge.list_directory(&self.options.remote_dir);
        info!("Initial files in directory: {}", known.len());
        PollState::from_baseline(known)
    }

    /// Run one poll cycle: list, diff, pull new files, delete pulled ones.
    ///
    /// Pure step function over the threaded state: the returned state's
    /// `known` set always equals the raw listing observed this cycle, and
    /// `failed` holds this cycle's pull failures when retrying is enabled.
    /// Transient device failures never surface as errors here; the bridge
    /// absorbs them into empty listings and false results.
    #[must_use]
    pub fn poll_cycle(&self, state: PollState) -> (PollState, CycleReport) {
        let current = self.bridge.list_directory(&self.options.remote_dir);
        debug!("Current files: {} entries", current.len());

        let new: HashSet<String> = current.difference(&state.known).cloned().collect();
        let retries: HashSet<String> = if self.options.retry_failed_pulls {
            current.intersection(&state.failed).cloned().collect()
        } else {
            HashSet::new()
        };

        let mut report = CycleReport {
            listed: current.len(),
            new_files: new.len(),
            retried: retries.len(),
            ..CycleReport::default()
        };

        // Sorted processing keeps logs and tests stable; the diff itself is
        // order-independent.
        let mut candidates: Vec<String> = new.union(&retries).cloned().collect();
        candidates.sort();

        if candidates.is_empty() {
            debug!("No new files found");
        } else {
            info!("Found {} new files", candidates.len());
        }

        let mut failed_now = HashSet::new();
        for name in candidates {
            if name.starts_with('.') {
                debug!("Skipping hidden file: {name}");
                report.skipped_hidden.push(name);
                continue;
            }

            if self.transfer_one(&name, &mut report) {
                continue;
            }
            failed_now.insert(name.clone());
            report.failed.push(name);
        }

        let next = PollState {
            known: current,
            failed: if self.options.retry_failed_pulls {
                failed_now
            } else {
                HashSet::new()
            },
        };
        (next, report)
    }

    /// Pull one file and delete it remotely on success. Returns whether the
    /// transfer succeeded; a failed delete does not count as a failure.
    fn transfer_one(&self, name: &str, report: &mut CycleReport) -> bool {
        let remote_path = join_remote(&self.options.remote_dir, name);
        let local_path = self.options.local_dir.join(name);

        if !self.bridge.pull_file(&remote_path, &local_path) {
            warn!("Failed to transfer: {name}");
            self.discard_partial(&local_path);
            return false;
        }

        let bytes = self.fs.metadata(&local_path).map_or(0, |m| m.len);
        info!("Successfully transferred: {name} ({bytes} bytes)");

        let deleted = self.bridge.delete_file(&remote_path);
        if deleted {
            info!("Deleted {name} from device");
        } else {
            warn!("Failed to delete {name} from device; it stays in the remote directory");
        }

        report.transferred.push(TransferRecord {
            name: name.to_string(),
            bytes,
            deleted,
        });
        true
    }

    /// Remove a partial destination file left behind by a failed pull.
    fn discard_partial(&self, local_path: &Path) {
        if !self.fs.exists(local_path) {
            return;
        }
        if let Err(e) = self.fs.remove_file(local_path) {
            warn!("Failed to remove partial file {}: {e}", local_path.display());
        }
    }

    /// Run preflight, capture the baseline, then poll until cancelled.
    ///
    /// # Errors
    ///
    /// Returns an error only for preflight failures; once the loop starts it
    /// ends solely through the cancellation flag.
    pub fn run(&self) -> Result<SessionReport> {
        self.preflight()?;

        let mut state = self.baseline();
        let mut session = SessionReport::default();

        while !self.is_cancelled() {
            debug!("Checking for new files");
            let (next, report) = self.poll_cycle(state);
            state = next;
            session.record(&report);

            if report.is_quiet() {
                debug!("Cycle: {}", report.summary());
            } else {
                info!("Cycle: {}", report.summary());
            }

            self.sleep_between_cycles();
        }

        info!("Stopping file monitor");
        Ok(session)
    }

    /// Sleep for the poll interval, waking periodically to honor a stop
    /// request promptly.
    fn sleep_between_cycles(&self) {
        let mut remaining = self.options.poll_interval;
        while !remaining.is_zero() && !self.is_cancelled() {
            let step = remaining.min(STOP_CHECK_INTERVAL);
            thread::sleep(step);
            remaining = remaining.saturating_sub(step);
        }
    }
}

/// Join a remote directory and a filename with a single slash.
fn join_remote(dir: &str, name: &str) -> String {
    format!("{}/{}", dir.trim_end_matches('/'), name)
}
