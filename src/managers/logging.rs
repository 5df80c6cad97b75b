//! Logging setup with file rotation
//!
//! Provides dual-output logging:
//! - Console: INFO level (DEBUG with `--verbose`), colors unless disabled
//! - File: configured level, daily rotation in the log directory

use crate::config::{expand_tilde, Config};
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

const LOG_FILE_PREFIX: &str = "db-backups";

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Directory for log files
    pub log_directory: PathBuf,
    /// Log level for file output
    pub log_level: Level,
    /// Maximum number of log files to keep
    pub max_files: u32,
    /// Console shows DEBUG instead of INFO
    pub verbose: bool,
    /// ANSI colors on the console
    pub colors: bool,
}

impl LoggingConfig {
    /// Create from config values; `LOG_DIR` and `LOG_LEVEL` may come from the environment
    pub fn from_config(config: &Config, verbose: bool, colors: bool) -> Self {
        let log_directory = config
            .lookup("LOG_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| config.global.log_directory.clone());
        let log_level = config
            .lookup("LOG_LEVEL")
            .unwrap_or_else(|| config.global.log_level.clone());

        Self {
            log_directory,
            log_level: parse_level(&log_level),
            max_files: config.global.log_max_files,
            verbose,
            colors,
        }
    }

    fn console_level(&self) -> Level {
        if self.verbose {
            Level::DEBUG
        } else {
            Level::INFO
        }
    }
}

fn parse_level(value: &str) -> Level {
    match value.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" | "warning" => Level::WARN,
        "error" | "critical" => Level::ERROR,
        _ => Level::INFO,
    }
}

/// Initialize logging with console and file outputs
///
/// Returns a guard that must be kept alive for the duration of the program.
/// When the guard is dropped, any remaining logs are flushed to disk.
pub fn init_logging(config: &LoggingConfig) -> Result<LogGuard> {
    let log_dir = expand_tilde(&config.log_directory);
    fs::create_dir_all(&log_dir)
        .with_context(|| format!("Failed to create log directory: {:?}", log_dir))?;

    let file_appender = RollingFileAppender::new(
        Rotation::DAILY,
        &log_dir,
        format!("{}.log", LOG_FILE_PREFIX),
    );
    let (non_blocking, file_guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_filter(LevelFilter::from_level(config.log_level));

    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(config.colors)
        .with_target(false)
        .with_filter(LevelFilter::from_level(config.console_level()));

    tracing_subscriber::registry()
        .with(file_layer)
        .with(console_layer)
        .init();

    if let Err(e) = cleanup_old_logs(&log_dir, config.max_files) {
        tracing::warn!("Failed to cleanup old log files in {:?}: {}", log_dir, e);
    }

    Ok(LogGuard {
        _file_guard: file_guard,
    })
}

/// Initialize simple console-only logging (for when config isn't available)
pub fn init_console_logging(verbose: bool, colors: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(colors)
        .with_target(false)
        .init();
}

/// Keep the newest `max_files` rotated logs.
///
/// Rotated names end in `.YYYY-MM-DD`, so name order is age order.
fn cleanup_old_logs(log_dir: &Path, max_files: u32) -> Result<()> {
    let prefix = format!("{}.log", LOG_FILE_PREFIX);
    let mut log_files: Vec<PathBuf> = fs::read_dir(log_dir)?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_name().to_string_lossy().starts_with(&prefix))
        .map(|entry| entry.path())
        .collect();
    log_files.sort_unstable_by(|a, b| b.cmp(a));

    for path in log_files.into_iter().skip(max_files as usize) {
        match fs::remove_file(&path) {
            Ok(()) => tracing::debug!("Removed old log file: {:?}", path),
            Err(e) => tracing::warn!("Failed to remove old log file {:?}: {}", path, e),
        }
    }

    Ok(())
}

/// Guard that keeps the logging system alive
///
/// When dropped, flushes any remaining logs to disk.
pub struct LogGuard {
    _file_guard: WorkerGuard,
}
