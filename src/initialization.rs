//! Logger and HTTP client construction.

use std::io::Write;
use std::time::Duration;

use crate::config::{Config, LogFormat};
use crate::error_handling::InitializationError;
use crate::http::ReqwestTransport;

/// Initializes the global logger with the given level and format.
///
/// The JSON format emits one object per line with `ts`, `level`, `target`
/// and `msg` fields.
pub fn init_logger_with(
    level: log::LevelFilter,
    format: LogFormat,
) -> Result<(), InitializationError> {
    let mut builder = env_logger::Builder::new();
    builder.filter_level(level);
    if matches!(format, LogFormat::Json) {
        builder.format(|buf, record| {
            let line = serde_json::json!({
                "ts": buf.timestamp_millis().to_string(),
                "level": record.level().to_string(),
                "target": record.target(),
                "msg": record.args().to_string(),
            });
            writeln!(buf, "{line}")
        });
    }
    builder.try_init()?;
    Ok(())
}

/// Builds the pipeline transport: redirects disabled, timeout from config.
pub fn init_transport(config: &Config) -> Result<ReqwestTransport, InitializationError> {
    Ok(ReqwestTransport::new(Duration::from_secs(
        config.timeout_seconds,
    ))?)
}

/// Builds the client for the notification webhook. Unlike the pipeline
/// transport it may follow redirects.
pub fn init_notifier_client(config: &Config) -> Result<reqwest::Client, InitializationError> {
    Ok(reqwest::ClientBuilder::new()
        .timeout(Duration::from_secs(config.timeout_seconds))
        .build()?)
}
