//! `tracing` subscriber setup.
//!
//! The edge runtime ships stdout to its log service, so the `lambda` command
//! logs JSON lines without ANSI colours. Local commands use the compact
//! human format. `RUST_LOG`, when set, takes precedence over `log_level`.

use thiserror::Error;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::ParseError;

#[derive(Error, Debug)]
pub enum LoggingError {
    #[error("invalid log filter: {0}")]
    Filter(#[from] ParseError),
    #[error("failed to install subscriber: {0}")]
    Install(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Compact,
}

/// Parse a filter directive such as `"info"` or `"image_edge=debug,aws=warn"`.
pub fn parse_filter(directive: &str) -> Result<EnvFilter, LoggingError> {
    Ok(EnvFilter::try_new(directive)?)
}

/// Install the global subscriber. Call once per process.
pub fn init(log_level: &str, format: LogFormat) -> Result<(), LoggingError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => parse_filter(log_level)?,
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);

    let installed = match format {
        LogFormat::Json => builder
            .json()
            .with_ansi(false)
            .with_current_span(true)
            .try_init(),
        LogFormat::Compact => builder.compact().with_writer(std::io::stderr).try_init(),
    };
    installed.map_err(|e| LoggingError::Install(e.to_string()))
}
