use std::{
    fs,
    path::{Path, PathBuf},
    time::{Duration, SystemTime},
};
use tokio::task;
use tracing_subscriber::{fmt, prelude::*, filter::LevelFilter, EnvFilter};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};

const MAX_LOG_AGE: Duration = Duration::from_secs(60 * 60 * 24 * 3);
const CLEANUP_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Keeps the non-blocking file writer flushing until dropped.
#[allow(dead_code)]
pub struct LoggerGuard(WorkerGuard);

/// Install stdout + daily rolling file logging.
///
/// `RUST_LOG` directives take precedence over `level`. Must be called from
/// inside a Tokio runtime because it spawns the old-log cleanup task.
pub fn init_logging(log_dir: impl AsRef<Path>, prefix: &str, level: &str) -> anyhow::Result<LoggerGuard> {
    let log_dir = log_dir.as_ref().to_path_buf();

    let (level, invalid_level) = parse_level(level);

    let builder = EnvFilter::builder().with_default_directive(level.into());
    let rust_log = std::env::var("RUST_LOG").unwrap_or_default();
    let console_filter = builder.clone().parse_lossy(&rust_log);
    let file_filter = builder.parse_lossy(&rust_log);

    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(prefix)
        .filename_suffix("log")
        .build(&log_dir)
        .map_err(|e| anyhow::anyhow!("Failed to create file appender in {:?}: {}", log_dir, e))?;
    let (non_blocking, guard) = NonBlocking::new(file_appender);

    let file_layer = fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_filter(file_filter);
    let stdout_layer = fmt::layer()
        .with_writer(std::io::stdout)
        .with_ansi(true)
        .with_filter(console_filter);

    tracing_subscriber::registry()
        .with(file_layer)
        .with(stdout_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to install tracing subscriber: {}", e))?;

    if let Some(invalid) = invalid_level {
        tracing::warn!("Invalid log level '{}', defaulting to 'info'", invalid);
    }

    start_log_cleanup_task(log_dir, prefix.to_string());

    Ok(LoggerGuard(guard))
}

/// Returns the level to use and, if the input was rejected, the rejected text.
fn parse_level(level: &str) -> (LevelFilter, Option<String>) {
    match level.to_ascii_lowercase().as_str() {
        "trace" => (LevelFilter::TRACE, None),
        "debug" => (LevelFilter::DEBUG, None),
        "info" => (LevelFilter::INFO, None),
        "warn" => (LevelFilter::WARN, None),
        "error" => (LevelFilter::ERROR, None),
        _ => (LevelFilter::INFO, Some(level.to_string())),
    }
}

fn start_log_cleanup_task(log_dir: PathBuf, prefix: String) {
    task::spawn(async move {
        loop {
            if let Err(e) = cleanup_old_logs(&log_dir, &prefix, MAX_LOG_AGE) {
                tracing::warn!("Failed to delete old log file: {}", e);
            }
            tokio::time::sleep(CLEANUP_INTERVAL).await;
        }
    });
}

fn cleanup_old_logs(log_dir: &Path, prefix: &str, max_age: Duration) -> std::io::Result<usize> {
    let now = SystemTime::now();
    let mut deleted = 0;

    for entry in fs::read_dir(log_dir)? {
        let path = entry?.path();

        if let Some(file_name) = path.file_name().and_then(|n| n.to_str()) {
            if file_name.starts_with(prefix) && file_name.ends_with(".log") {
                let metadata = fs::metadata(&path)?;
                if let Ok(modified) = metadata.modified() {
                    if now.duration_since(modified).unwrap_or_default() > max_age {
                        fs::remove_file(&path)?;
                        deleted += 1;
                        tracing::info!("Old log file deleted: {}", file_name);
                    }
                }
            }
        }
    }
    Ok(deleted)
}
