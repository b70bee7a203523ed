//! Logging setup
//!
//! Log lines go to stderr so tool output on stdout stays clean.
//! `RUST_LOG` wins over the configured level.

use anyhow::Result;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::EnvFilter;

use crate::core::{AppConfig, LogFormat};

/// Initialize logging with the default `info` level and text output
pub fn init_logging() -> Result<Option<WorkerGuard>> {
    init_logging_with(&AppConfig::default())
}

/// Initialize logging from configuration
///
/// Returns the file writer guard when `log_dir` is set; keep it alive for
/// the lifetime of the process or buffered lines are lost.
pub fn init_logging_with(config: &AppConfig) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let (file_writer, guard) = match &config.log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let appender = tracing_appender::rolling::daily(dir, "loongclaw.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (Some(writer), Some(guard))
        }
        None => (None, None),
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);

    let result = match (config.log_format, file_writer) {
        (LogFormat::Json, Some(file)) => builder
            .json()
            .with_writer(std::io::stderr.and(file))
            .try_init(),
        (LogFormat::Json, None) => builder.json().with_writer(std::io::stderr).try_init(),
        (LogFormat::Text, Some(file)) => builder
            .with_writer(std::io::stderr.and(file))
            .try_init(),
        (LogFormat::Text, None) => builder.with_writer(std::io::stderr).try_init(),
    };

    result.map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    Ok(guard)
}
