use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Local;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const LOG_LEVEL_ENV: &str = "REMINDERS_DASHBOARD_LOG_LEVEL";
const LOG_FILE_PREFIX: &str = "reminders-dashboard-";

/// Sends `tracing` output to a fresh file under the log directory and returns
/// its path. `debug` overrides the level from the environment.
pub fn init_logging(debug: bool) -> Result<PathBuf> {
    let log_dir = log_directory()?;
    fs::create_dir_all(&log_dir)
        .with_context(|| format!("failed to create log directory {}", log_dir.display()))?;

    let log_file_path = log_file_path(&log_dir);
    let file = fs::File::create(&log_file_path)
        .with_context(|| format!("failed to create log file {}", log_file_path.display()))?;
    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    std::mem::forget(guard);

    let level = if debug {
        "debug"
    } else {
        std::env::var(LOG_LEVEL_ENV)
            .ok()
            .and_then(|raw| normalize_log_level(&raw))
            .unwrap_or("warn")
    };

    let file_layer = fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true)
        .with_line_number(true);

    tracing_subscriber::registry()
        .with(EnvFilter::new(format!("{level},reminders_dashboard={level}")))
        .with(file_layer)
        .try_init()
        .context("failed to install tracing subscriber")?;

    tracing::info!("logging to {}", log_file_path.display());
    Ok(log_file_path)
}

fn normalize_log_level(raw: &str) -> Option<&'static str> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "trace" => Some("trace"),
        "debug" => Some("debug"),
        "info" => Some("info"),
        "warn" | "warning" => Some("warn"),
        "error" => Some("error"),
        _ => None,
    }
}

pub fn log_directory() -> Result<PathBuf> {
    let data_dir =
        dirs::data_local_dir().context("failed to determine local data directory")?;
    Ok(data_dir.join("reminders-dashboard").join("logs"))
}

pub fn log_file_path(log_dir: &Path) -> PathBuf {
    let timestamp = Local::now().format("%Y-%m-%d_%H-%M-%S");
    log_dir.join(format!("{LOG_FILE_PREFIX}{timestamp}.log"))
}

pub fn print_log_location(log_path: &Path) {
    eprintln!("log file: {}", log_path.display());
}
