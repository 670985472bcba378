use std::path::Path;
use std::sync::OnceLock;

use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::core::config::AppPaths;

const LOG_FILE_PREFIX: &str = "paperchat.log";

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Installs the global subscriber: stdout, plus a daily-rolling file under
/// `paths.log_dir` when that directory is writable. `RUST_LOG` overrides
/// `default_directive`.
pub fn init(paths: &AppPaths, default_directive: &str) {
    let file_writer = match file_writer(&paths.log_dir) {
        Ok(writer) => Some(writer),
        Err(err) => {
            eprintln!(
                "File logging disabled, cannot create {}: {}",
                paths.log_dir.display(),
                err
            );
            None
        }
    };

    let file_layer = file_writer.map(|writer| {
        tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_ansi(false)
            .with_writer(writer)
    });

    let result = tracing_subscriber::registry()
        .with(env_filter(default_directive))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .with(file_layer)
        .try_init();

    match result {
        Ok(()) => tracing::debug!(log_dir = %paths.log_dir.display(), "Logging initialized"),
        // Someone else owns the global subscriber; events still reach it.
        Err(err) => tracing::warn!("Tracing subscriber not installed: {}", err),
    }
}

fn env_filter(default_directive: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive))
}

fn file_writer(log_dir: &Path) -> std::io::Result<NonBlocking> {
    std::fs::create_dir_all(log_dir)?;
    let appender = tracing_appender::rolling::daily(log_dir, LOG_FILE_PREFIX);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    // Only the first guard is kept; later writers flush on drop.
    let _ = LOG_GUARD.set(guard);
    Ok(writer)
}
