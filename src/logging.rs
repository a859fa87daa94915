use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const LOG_FILE: &str = "ipatlas.log";

/// `IPATLAS_LOG_DIR`, or `logs` next to the working directory.
fn log_dir() -> PathBuf {
    std::env::var_os("IPATLAS_LOG_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("logs"))
}

/// Sends all tracing output to a daily rolling file.
///
/// The terminal belongs to the UI, so nothing goes to stdout or stderr.
/// `RUST_LOG` directives are honored on top of an INFO floor. Keep the
/// returned guard alive for the whole run or buffered lines are lost.
pub fn initialize_logging() -> WorkerGuard {
    let dir = log_dir();
    let _ = std::fs::create_dir_all(&dir);

    let file_appender = tracing_appender::rolling::daily(&dir, LOG_FILE);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .with(
            fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(false),
        )
        .init();

    tracing::info!("Logging to {}", dir.join(LOG_FILE).display());
    guard
}
