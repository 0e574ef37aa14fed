//! Shared logging utilities for wmi_hunter binaries.
//!
//! Diagnostics always go to stderr because stdout carries the JSON report.
//! An optional daily log file keeps a record of triage runs next to the
//! analyst's other case notes.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

const DEFAULT_LOG_FILTER: &str = "wmi_hunter=info";
const QUIET_CONSOLE_FILTER: &str = "warn";
const MAX_LOG_FILES: usize = 5;

/// Logging configuration shared by wmi_hunter binaries.
pub struct LogConfig<'a> {
    pub app_name: &'a str,
    pub verbose: bool,
    /// Also write logs to a rolling file under [`logs_dir`].
    pub log_to_file: bool,
}

/// Initialize tracing with stderr output and an optional rolling file writer.
///
/// Keep the returned guard alive until exit so buffered file lines are flushed.
pub fn init_logging(config: LogConfig<'_>) -> Result<Option<WorkerGuard>> {
    let file_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let console_filter = if config.verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
    } else {
        EnvFilter::new(QUIET_CONSOLE_FILTER)
    };

    let mut log_guard = None;
    let file_layer = if config.log_to_file {
        let log_dir = ensure_logs_dir().context("Failed to ensure log directory")?;
        let appender = file_appender(&log_dir, config.app_name)?;
        let (file_writer, guard) = tracing_appender::non_blocking(appender);
        log_guard = Some(guard);
        Some(
            tracing_subscriber::fmt::layer()
                .with_writer(file_writer)
                .with_ansi(false)
                .with_filter(file_filter),
        )
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(file_layer)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_filter(console_filter),
        )
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(log_guard)
}

/// Daily log file `<app_name>.<date>.log` in `dir`, keeping the newest few.
fn file_appender(dir: &Path, app_name: &str) -> Result<RollingFileAppender> {
    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(app_name)
        .filename_suffix("log")
        .max_log_files(MAX_LOG_FILES)
        .build(dir)
        .with_context(|| format!("Failed to open log file in {}", dir.display()))
}

/// Get the wmi_hunter home directory: ~/.wmi_hunter
pub fn hunter_home() -> Result<PathBuf> {
    if let Ok(override_path) = std::env::var("WMI_HUNTER_HOME") {
        return Ok(PathBuf::from(override_path));
    }
    dirs::home_dir()
        .map(|home| home.join(".wmi_hunter"))
        .context("Could not determine home directory; set WMI_HUNTER_HOME")
}

/// Get the logs directory: ~/.wmi_hunter/logs
pub fn logs_dir() -> Result<PathBuf> {
    Ok(hunter_home()?.join("logs"))
}

/// Ensure the logs directory exists.
pub fn ensure_logs_dir() -> Result<PathBuf> {
    let logs = logs_dir()?;
    fs::create_dir_all(&logs)
        .with_context(|| format!("Failed to create logs directory: {}", logs.display()))?;
    Ok(logs)
}
