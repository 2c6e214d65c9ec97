//! Tracing setup
//!
//! JSON lines on stdout plus a plain-text copy in the configured log file.
//! The filter comes from `LOG_LEVEL`, then `RUST_LOG`, defaulting to `info`.
//! Every event carries its level, timestamp and target (the component that
//! logged it); `main` wraps the process in `process_span`, which carries the pid.

use std::path::Path;

use anyhow::{Context, Result, anyhow};
use tracing::{Span, info_span};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_env("LOG_LEVEL")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Root span for the whole process; stamps every entry with the pid.
pub fn process_span() -> Span {
    info_span!("get_motivated", pid = std::process::id())
}

/// Install the global subscriber. Keep the returned guard alive until exit
/// or buffered file output is lost.
pub fn init(log_file: &Path) -> Result<WorkerGuard> {
    let dir = match log_file.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let file_name = log_file
        .file_name()
        .ok_or_else(|| anyhow!("log_file {} has no file name", log_file.display()))?;

    std::fs::create_dir_all(dir)
        .with_context(|| format!("creating log directory {}", dir.display()))?;

    let appender = tracing_appender::rolling::never(dir, file_name);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::registry()
        .with(env_filter())
        .with(fmt::layer().json())
        .with(fmt::layer().with_writer(writer).with_ansi(false))
        .try_init()
        .map_err(|e| anyhow!("installing tracing subscriber: {e}"))?;

    Ok(guard)
}
