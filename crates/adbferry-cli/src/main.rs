//! `AdbFerry` - polls a directory on an Android device through `adb` and
//! ferries every new file to the local machine, deleting it from the device
//! once the copy has landed.
//!
//! This is the main entry point for the command-line application.

mod logging;

use std::process::ExitCode;
use std::sync::atomic::Ordering;

use adbferry_core::{
    AdbBridge, RealFileSystem, TransferEngine, TransferOptions, WatchConfig,
};
use tracing::{error, info, warn};

fn main() -> ExitCode {
    // Keep the guard alive so buffered file logs are flushed on exit.
    let _guard = match logging::init_auto() {
        Ok(guard) => Some(guard),
        Err(e) => {
            logging::init_console_only();
            warn!("File logging disabled: {e}");
            None
        }
    };

    info!("Starting AdbFerry");

    let config = match WatchConfig::load() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        }
    };
    if let Err(e) = config.validate() {
        error!(
            "Invalid configuration in {}: {e}",
            WatchConfig::config_file_path().display()
        );
        return ExitCode::FAILURE;
    }

    let engine = TransferEngine::new(
        AdbBridge::new(config.adb_program.clone()),
        RealFileSystem::new(),
        TransferOptions::from(&config),
    );

    let stop = engine.cancellation_token();
    if let Err(e) = ctrlc::set_handler(move || {
        info!("Stop requested, finishing the current cycle");
        stop.store(true, Ordering::SeqCst);
    }) {
        error!("Failed to install Ctrl+C handler: {e}");
        return ExitCode::FAILURE;
    }

    info!("Press Ctrl+C to stop");

    match engine.run() {
        Ok(session) => {
            info!("{}", session.summary());
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}
