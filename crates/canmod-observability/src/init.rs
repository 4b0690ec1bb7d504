// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Logging initialization for canmod binaries
//!
//! Console output is always on. With the `file-logging` feature a JSON log
//! file is written to a timestamped run folder, with old runs cleaned up.

use anyhow::{anyhow, Result};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

use crate::cli::CrateDebugFlags;

#[cfg(feature = "file-logging")]
use std::path::{Path, PathBuf};

/// Filter for the given flags; `RUST_LOG` wins when set
fn build_filter(debug_flags: &CrateDebugFlags, base_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(debug_flags.to_filter_string(base_level)))
}

/// Initialize console logging
///
/// # Arguments
/// * `debug_flags` - Per-crate debug flags
/// * `base_level` - Level for everything not flagged (e.g. `"info"`)
///
/// # Errors
/// If a global subscriber is already installed.
pub fn init_console_logging(debug_flags: &CrateDebugFlags, base_level: &str) -> Result<()> {
    let console_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_filter(build_filter(debug_flags, base_level));

    Registry::default()
        .with(console_layer)
        .try_init()
        .map_err(|e| anyhow!("failed to install tracing subscriber: {e}"))
}

/// Keeps the file writer alive; logs are flushed when dropped
#[cfg(feature = "file-logging")]
pub struct LoggingGuard {
    _file_guard: tracing_appender::non_blocking::WorkerGuard,
    log_dir: PathBuf,
}

#[cfg(feature = "file-logging")]
impl LoggingGuard {
    /// Run folder holding this process's log file
    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }
}

/// Initialize console logging plus a JSON log file
///
/// Creates:
/// ```text
/// ./logs/
///   └── run_20250101_120000/
///       └── canmod.log
/// ```
///
/// # Arguments
/// * `debug_flags` - Per-crate debug flags
/// * `base_level` - Level for everything not flagged
/// * `log_dir` - Base directory for logs (default: `./logs`)
/// * `retention_runs` - Keep N most recent runs (default: 10)
#[cfg(feature = "file-logging")]
pub fn init_logging(
    debug_flags: &CrateDebugFlags,
    base_level: &str,
    log_dir: Option<PathBuf>,
    retention_runs: Option<usize>,
) -> Result<LoggingGuard> {
    use anyhow::Context;
    use chrono::Utc;

    let base_log_dir = log_dir.unwrap_or_else(|| PathBuf::from("./logs"));
    let run_folder = base_log_dir.join(format!("run_{}", Utc::now().format(RUN_FORMAT)));
    std::fs::create_dir_all(&run_folder)
        .with_context(|| format!("Failed to create log directory: {}", run_folder.display()))?;

    cleanup_old_runs(&base_log_dir, retention_runs.unwrap_or(10))?;

    let console_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_filter(build_filter(debug_flags, base_level))
        .boxed();

    let appender = tracing_appender::rolling::never(&run_folder, "canmod.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .json()
        .with_filter(build_filter(debug_flags, base_level))
        .boxed();

    Registry::default()
        .with(vec![console_layer, file_layer])
        .try_init()
        .map_err(|e| anyhow!("failed to install tracing subscriber: {e}"))?;

    Ok(LoggingGuard {
        _file_guard: guard,
        log_dir: run_folder,
    })
}

#[cfg(feature = "file-logging")]
const RUN_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Remove all but the newest `keep` run folders (the current one included)
#[cfg(feature = "file-logging")]
fn cleanup_old_runs(base_log_dir: &Path, keep: usize) -> Result<()> {
    use chrono::NaiveDateTime;

    let mut runs: Vec<(PathBuf, NaiveDateTime)> = Vec::new();
    for entry in std::fs::read_dir(base_log_dir)? {
        let path = entry?.path();
        if !path.is_dir() {
            continue;
        }
        let stamp = path
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(|n| n.strip_prefix("run_"))
            .and_then(|s| NaiveDateTime::parse_from_str(s, RUN_FORMAT).ok());
        if let Some(stamp) = stamp {
            runs.push((path, stamp));
        }
    }

    // Newest first
    runs.sort_by(|a, b| b.1.cmp(&a.1));
    for (path, _) in runs.iter().skip(keep.max(1)) {
        if let Err(e) = std::fs::remove_dir_all(path) {
            eprintln!(
                "Warning: Failed to remove old log directory {}: {}",
                path.display(),
                e
            );
        }
    }
    Ok(())
}
