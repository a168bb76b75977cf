use std::path::{Path, PathBuf};

use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const LOG_FILE_PREFIX: &str = "dsa-pathway.log";
const DEFAULT_FILTER: &str = "dsa_pathway_backend=info,tower_http=info,sqlx=warn";

/// Keeps the non-blocking file writer alive; drop it last.
pub struct FileLogGuard {
    _guard: WorkerGuard,
}

/// Expands a bare level such as `debug` into per-crate directives so sqlx
/// statement logging stays at `warn`. Full directive strings pass through.
pub fn filter_directives(log_level: &str) -> String {
    let level = log_level.trim();
    if level.is_empty() {
        return DEFAULT_FILTER.to_string();
    }
    if level.contains('=') || level.contains(',') {
        return level.to_string();
    }
    format!("dsa_pathway_backend={level},tower_http={level},sqlx=warn")
}

/// `LOG_DIR` (default `./logs`) when `ENABLE_FILE_LOGS` is `true` or `1`.
pub fn file_log_dir() -> Option<PathBuf> {
    let enabled = std::env::var("ENABLE_FILE_LOGS")
        .map(|v| v == "true" || v == "1")
        .unwrap_or(false);
    enabled.then(|| {
        std::env::var("LOG_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./logs"))
    })
}

fn file_writer(dir: &Path) -> Option<(NonBlocking, WorkerGuard)> {
    if let Err(err) = std::fs::create_dir_all(dir) {
        eprintln!("failed to create log directory {}: {err}", dir.display());
        return None;
    }
    let appender = RollingFileAppender::new(Rotation::DAILY, dir, LOG_FILE_PREFIX);
    Some(tracing_appender::non_blocking(appender))
}

pub fn init_tracing(log_level: &str) -> Option<FileLogGuard> {
    let directives = filter_directives(log_level);
    let env_filter = EnvFilter::try_new(&directives).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let stdout_layer = fmt::layer().with_target(true);

    let file_dir = file_log_dir();
    let guard = match file_dir.as_deref().and_then(file_writer) {
        Some((writer, guard)) => {
            let file_layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true);
            tracing_subscriber::registry()
                .with(env_filter)
                .with(stdout_layer)
                .with(file_layer)
                .init();
            Some(FileLogGuard { _guard: guard })
        }
        None => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(stdout_layer)
                .init();
            None
        }
    };

    tracing::info!(
        filter = %directives,
        file_logs = guard.is_some(),
        log_dir = ?file_dir,
        "logging initialised"
    );
    guard
}
