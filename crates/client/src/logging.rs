//! Tracing setup: stderr plus a per-session log file.

use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::Result;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Keeps the non-blocking file writer alive; drop it last.
pub struct LogGuard {
    _guard: tracing_appender::non_blocking::WorkerGuard,
    pub log_file: PathBuf,
}

/// Installs the global subscriber.
///
/// `RUST_LOG` filters both layers (default INFO). The file lands in
/// `<cache dir>/logs/<session>/encounter-sim.log`.
pub fn setup_logging(session_id: Option<&str>) -> Result<LogGuard> {
    let session_id = session_id.map(str::to_owned).unwrap_or_else(|| {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_secs())
            .unwrap_or_default();
        format!("session_{}", timestamp)
    });

    let session_log_dir = log_directory().join(&session_id);
    std::fs::create_dir_all(&session_log_dir)?;

    let file_appender = tracing_appender::rolling::never(&session_log_dir, "encounter-sim.log");
    let (non_blocking_file, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);
    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking_file)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()?;

    let log_file = session_log_dir.join("encounter-sim.log");
    tracing::info!(session = %session_id, log_file = %log_file.display(), "logging initialized");

    Ok(LogGuard {
        _guard: guard,
        log_file,
    })
}

/// Platform cache directory, or the system temp dir when none resolves.
fn log_directory() -> PathBuf {
    directories::ProjectDirs::from("", "", "encounter-sim")
        .map(|dirs| dirs.cache_dir().join("logs"))
        .unwrap_or_else(|| std::env::temp_dir().join("encounter-sim").join("logs"))
}
