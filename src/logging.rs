use std::path::Path;

use anyhow::Result;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

pub const LOG_FILE_PREFIX: &str = "update";

/// Keeps the background log writer alive; drop it last
pub struct LoggerGuard(#[allow(dead_code)] Option<WorkerGuard>);

/// Canonical name of a CLI log level, `None` when unrecognised
pub fn parse_level(level: &str) -> Option<&'static str> {
    match level.to_ascii_lowercase().as_str() {
        "trace" => Some("trace"),
        "debug" => Some("debug"),
        "info" => Some("info"),
        "warn" | "warning" => Some("warn"),
        "error" => Some("error"),
        _ => None,
    }
}

/// Normalise a CLI log level, falling back to `info`
pub fn normalize_level(level: &str) -> &'static str {
    parse_level(level).unwrap_or("info")
}

/// Default filter directive used when `RUST_LOG` is not set
pub fn default_directive(level: &str) -> String {
    format!("m3u_harvest={}", normalize_level(level))
}

/// Install the global subscriber: stdout always, daily files when `directory` is set
pub fn init_logging(level: &str, directory: Option<&Path>) -> Result<LoggerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_directive(level).into());

    let (file_layer, guard) = match directory {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let appender = RollingFileAppender::builder()
                .rotation(Rotation::DAILY)
                .filename_prefix(LOG_FILE_PREFIX)
                .filename_suffix("log")
                .build(dir)?;
            let (non_blocking, guard) = NonBlocking::new(appender);
            let layer = fmt::layer().with_writer(non_blocking).with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(file_layer)
        .try_init()?;

    if parse_level(level).is_none() {
        tracing::warn!("Invalid log level '{}', defaulting to 'info'", level);
    }

    Ok(LoggerGuard(guard))
}
