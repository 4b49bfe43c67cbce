//! Device command interface over the Android debug bridge.
//!
//! The transfer engine talks to the device exclusively through the
//! [`DeviceBridge`] trait: enumerate attached devices, ensure the watched
//! remote directory exists, list it, pull a file, delete a file. The real
//! implementation, [`AdbBridge`], shells out to the `adb` binary and parses
//! its line-oriented output.
//!
//! Failure handling follows a deliberate split. The two preflight operations
//! (`list_devices`, `ensure_directory`) return errors because the caller must
//! abort on them. The three per-cycle operations (`list_directory`,
//! `pull_file`, `delete_file`) absorb every failure into an empty set or
//! `false`, logging the cause, so a flaky cable or a vanished directory never
//! tears down the polling loop.

use std::collections::HashSet;
use std::path::Path;
use std::process::{Command, Output};

use tracing::{debug, info, warn};

use crate::error::{DeviceError, Error, Result};

/// Program name used when none is configured.
pub const DEFAULT_ADB_PROGRAM: &str = "adb";

/// Operations the transfer loop needs from the attached device.
///
/// This trait allows for mocking in tests.
#[cfg_attr(test, mockall::automock)]
pub trait DeviceBridge: Send + Sync {
    /// List identifiers of usable attached devices.
    ///
    /// Used only to confirm that at least one device is attached before the
    /// loop starts.
    fn list_devices(&self) -> Result<Vec<String>>;

    /// Create the remote directory if it does not exist.
    ///
    /// Idempotent; succeeding on an already-existing directory is not an
    /// error.
    fn ensure_directory(&self, path: &str) -> Result<()>;

    /// List plain filenames in the remote directory.
    ///
    /// Returns the empty set if the directory is missing or the listing
    /// fails; the failure is logged, never raised.
    fn list_directory(&self, path: &str) -> HashSet<String>;

    /// Copy one remote file to the given local path.
    ///
    /// Returns false on failure; the failure is logged, never raised.
    fn pull_file(&self, remote_path: &str, local_path: &Path) -> bool;

    /// Delete one remote file.
    ///
    /// Returns false on failure; the failure is logged, never raised.
    fn delete_file(&self, remote_path: &str) -> bool;
}

/// Parse the output of `adb devices` into usable device serials.
///
/// The output carries a `List of devices attached` header, optional daemon
/// startup notices prefixed with `*`, and one `<serial>\t<state>` line per
/// device. Only entries in the `device` state are usable; `unauthorized` or
/// `offline` entries cannot serve file operations.
#[must_use]
pub fn parse_devices_output(output: &str) -> Vec<String> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| {
            !line.is_empty() && !line.starts_with('*') && !line.starts_with("List of devices")
        })
        .filter_map(|line| {
            let mut parts = line.split_whitespace();
            let serial = parts.next()?;
            let state = parts.next()?;
            (state == "device").then(|| serial.to_string())
        })
        .collect()
}

/// Quote a path for use inside an `adb shell` command string.
///
/// `adb shell` joins its arguments and hands them to the device shell, so
/// paths with spaces (the stock camera and scan apps use them) must be
/// quoted on the shell side. Single-quote wrapping with embedded quotes
/// escaped covers every byte except NUL.
#[must_use]
pub fn shell_quote(path: &str) -> String {
    format!("'{}'", path.replace('\'', r"'\''"))
}

/// Real device bridge shelling out to the `adb` binary.
#[derive(Debug, Clone)]
pub struct AdbBridge {
    program: String,
}

impl AdbBridge {
    /// Create a bridge using the given program name or path.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// The program this bridge invokes.
    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }

    fn execute_command(&self, args: &[&str]) -> Result<Output> {
        debug!("Executing command: {} {:?}", self.program, args);
        Command::new(&self.program).args(args).output().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::Device(DeviceError::ToolNotFound {
                    program: self.program.clone(),
                })
            } else {
                Error::Internal(format!("Failed to execute {}: {e}", self.program))
            }
        })
    }
}

impl Default for AdbBridge {
    fn default() -> Self {
        Self::new(DEFAULT_ADB_PROGRAM)
    }
}

impl DeviceBridge for AdbBridge {
    fn list_devices(&self) -> Result<Vec<String>> {
        let output = self.execute_command(&["devices"])?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::Device(DeviceError::CommandFailed {
                command: format!("{} devices", self.program),
                reason: stderr.trim().to_string(),
            }));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let devices = parse_devices_output(&stdout);
        debug!("Connected devices: {:?}", devices);
        Ok(devices)
    }

    fn ensure_directory(&self, path: &str) -> Result<()> {
        let command = format!("mkdir -p {}", shell_quote(path));
        let output = self.execute_command(&["shell", &command])?;

        if output.status.success() {
            info!("Remote directory ready: {path}");
            Ok(())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(Error::Device(DeviceError::RemoteDirUnavailable {
                path: path.to_string(),
                reason: stderr.trim().to_string(),
            }))
        }
    }

    fn list_directory(&self, path: &str) -> HashSet<String> {
        // Probe first: `ls` on a missing path would clutter the log with
        // shell errors every cycle.
        let probe = format!("test -d {} && echo exists", shell_quote(path));
        match self.execute_command(&["shell", &probe]) {
            Ok(output) if String::from_utf8_lossy(&output.stdout).contains("exists") => {}
            Ok(_) => {
                debug!("Remote directory does not exist: {path}");
                return HashSet::new();
            }
            Err(e) => {
                warn!("Failed to probe remote directory {path}: {e}");
                return HashSet::new();
            }
        }

        let command = format!("ls {}", shell_quote(path));
        match self.execute_command(&["shell", &command]) {
            Ok(output) if output.status.success() => {
                let stdout = String::from_utf8_lossy(&output.stdout);
                // adb shell emits CRLF on some hosts; trim eats the stray \r.
                let files: HashSet<String> = stdout
                    .lines()
                    .map(str::trim)
                    .filter(|line| !line.is_empty())
                    .map(ToString::to_string)
                    .collect();
                debug!("Remote listing of {path}: {} entries", files.len());
                files
            }
            Ok(output) => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                warn!("Failed to list remote directory {path}: {}", stderr.trim());
                HashSet::new()
            }
            Err(e) => {
                warn!("Failed to list remote directory {path}: {e}");
                HashSet::new()
            }
        }
    }

    fn pull_file(&self, remote_path: &str, local_path: &Path) -> bool {
        let local = local_path.to_string_lossy();
        debug!("Pulling {remote_path} -> {local}");
        match self.execute_command(&["pull", remote_path, &local]) {
            Ok(output) if output.status.success() => true,
            Ok(output) => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                warn!("Failed to pull {remote_path}: {}", stderr.trim());
                false
            }
            Err(e) => {
                warn!("Failed to pull {remote_path}: {e}");
                false
            }
        }
    }

    fn delete_file(&self, remote_path: &str) -> bool {
        let command = format!("rm {}", shell_quote(remote_path));
        match self.execute_command(&["shell", &command]) {
            Ok(output) if output.status.success() => true,
            Ok(output) => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                warn!("Failed to delete {remote_path}: {}", stderr.trim());
                false
            }
            Err(e) => {
                warn!("Failed to delete {remote_path}: {e}");
                false
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    // A program name that cannot exist on PATH, for exercising spawn failure.
    const MISSING_TOOL: &str = "adbferry-missing-tool-for-tests";

    #[test]
    fn test_parse_devices_output_single_device() {
        let output = "List of devices attached\nemulator-5554\tdevice\n";
        assert_eq!(parse_devices_output(output), vec!["emulator-5554"]);
    }

    #[test]
    fn test_parse_devices_output_header_only() {
        let output = "List of devices attached\n\n";
        assert!(parse_devices_output(output).is_empty());
    }

    #[test]
    fn test_parse_devices_output_empty() {
        assert!(parse_devices_output("").is_empty());
    }

    #[test]
    fn test_parse_devices_output_filters_unusable_states() {
        let output = "List of devices attached\n\
                      ABC123\tunauthorized\n\
                      DEF456\toffline\n\
                      GHI789\tdevice\n";
        assert_eq!(parse_devices_output(output), vec!["GHI789"]);
    }

    #[test]
    fn test_parse_devices_output_skips_daemon_notices() {
        let output = "* daemon not running; starting now at tcp:5037\n\
                      * daemon started successfully\n\
                      List of devices attached\n\
                      emulator-5554\tdevice\n";
        assert_eq!(parse_devices_output(output), vec!["emulator-5554"]);
    }

    #[test]
    fn test_parse_devices_output_multiple_devices() {
        let output = "List of devices attached\n\
                      emulator-5554\tdevice\n\
                      R58M123ABC\tdevice\n";
        assert_eq!(
            parse_devices_output(output),
            vec!["emulator-5554", "R58M123ABC"]
        );
    }

    #[test]
    fn test_shell_quote_plain() {
        assert_eq!(shell_quote("/sdcard/scans"), "'/sdcard/scans'");
    }

    #[test]
    fn test_shell_quote_spaces() {
        assert_eq!(
            shell_quote("/storage/emulated/0/Documents/Office Lens"),
            "'/storage/emulated/0/Documents/Office Lens'"
        );
    }

    #[test]
    fn test_shell_quote_embedded_quote() {
        assert_eq!(shell_quote("it's"), r"'it'\''s'");
    }

    #[test]
    fn test_bridge_default_program() {
        let bridge = AdbBridge::default();
        assert_eq!(bridge.program(), DEFAULT_ADB_PROGRAM);
    }

    #[test]
    fn test_bridge_custom_program() {
        let bridge = AdbBridge::new("/opt/platform-tools/adb");
        assert_eq!(bridge.program(), "/opt/platform-tools/adb");
    }

    #[test]
    fn test_missing_tool_list_devices_is_fatal() {
        let bridge = AdbBridge::new(MISSING_TOOL);
        let result = bridge.list_devices();
        assert!(matches!(
            result,
            Err(Error::Device(DeviceError::ToolNotFound { .. }))
        ));
    }

    #[test]
    fn test_missing_tool_ensure_directory_is_fatal() {
        let bridge = AdbBridge::new(MISSING_TOOL);
        assert!(bridge.ensure_directory("/sdcard/scans").is_err());
    }

    #[test]
    fn test_missing_tool_list_directory_is_empty() {
        let bridge = AdbBridge::new(MISSING_TOOL);
        assert!(bridge.list_directory("/sdcard/scans").is_empty());
    }

    #[test]
    fn test_missing_tool_pull_is_false() {
        let bridge = AdbBridge::new(MISSING_TOOL);
        assert!(!bridge.pull_file("/sdcard/scans/a.jpg", &PathBuf::from("/tmp/a.jpg")));
    }

    #[test]
    fn test_missing_tool_delete_is_false() {
        let bridge = AdbBridge::new(MISSING_TOOL);
        assert!(!bridge.delete_file("/sdcard/scans/a.jpg"));
    }

    #[test]
    fn test_mock_bridge_list_devices() {
        let mut mock = MockDeviceBridge::new();
        mock.expect_list_devices()
            .returning(|| Ok(vec!["emulator-5554".to_string()]));

        let devices = mock.list_devices().unwrap();
        assert_eq!(devices, vec!["emulator-5554"]);
    }
}
