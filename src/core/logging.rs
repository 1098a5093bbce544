//! File logging for the terminal client.
//!
//! The terminal belongs to ratatui while the app runs, so everything goes to a
//! daily-rolling JSON log under the data directory. `log` macros used across
//! the crate are bridged into `tracing`.

use std::fs;
use std::path::{Path, PathBuf};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Rolled log files are named `readlog.log.YYYY-MM-DD`.
pub const LOG_FILE_PREFIX: &str = "readlog.log";

/// Number of rolled files kept besides today's.
pub const KEEP_ROLLED_LOGS: usize = 7;

/// Install the file subscriber. Keep the returned guard alive until exit,
/// dropping it flushes pending records.
pub fn init_tui(log_dir: &Path) -> WorkerGuard {
    if !log_dir.exists() {
        if let Err(e) = fs::create_dir_all(log_dir) {
            eprintln!("Failed to create logs directory: {}", e);
        }
    }

    let file_appender = tracing_appender::rolling::daily(log_dir, LOG_FILE_PREFIX);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .json()
        .with_file(true)
        .with_line_number(true)
        .with_target(true)
        .with_filter(env_filter);

    // No stdout layer, the TUI owns the terminal.
    if let Err(e) = tracing_subscriber::registry().with(file_layer).try_init() {
        eprintln!("Failed to install log subscriber: {}", e);
    }

    // try_init already bridges `log` when tracing-subscriber carries its
    // tracing-log feature; a second LogTracer is then refused.
    let _ = tracing_log::LogTracer::init();

    let dir = log_dir.to_path_buf();
    std::thread::spawn(move || {
        let removed = prune_old_logs(&dir, KEEP_ROLLED_LOGS);
        if !removed.is_empty() {
            log::debug!("Removed {} old log files", removed.len());
        }
    });

    guard
}

/// Delete rolled log files beyond the newest `keep`. Returns the removed paths.
pub fn prune_old_logs(log_dir: &Path, keep: usize) -> Vec<PathBuf> {
    let Ok(entries) = fs::read_dir(log_dir) else {
        return Vec::new();
    };
    let rolled_prefix = format!("{LOG_FILE_PREFIX}.");
    let today = format!("{rolled_prefix}{}", chrono::Local::now().format("%Y-%m-%d"));

    let mut rolled: Vec<PathBuf> = entries
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| {
            path.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|name| name.starts_with(&rolled_prefix) && name != today)
        })
        .collect();

    // Date suffixes sort chronologically; newest first.
    rolled.sort();
    rolled.reverse();

    rolled
        .into_iter()
        .skip(keep)
        .filter(|path| match fs::remove_file(path) {
            Ok(()) => true,
            Err(e) => {
                log::warn!("Failed to remove old log {}: {e}", path.display());
                false
            }
        })
        .collect()
}
