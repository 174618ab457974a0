//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the global tracing subscriber
//! - Map the configured level name onto a tracing level
//! - Pick the output format for the deployment environment
//!
//! # Design Decisions
//! - JSON lines for staging and production, human readable output locally
//! - `RUST_LOG` wins over the configured level when set

use thiserror::Error;
use tracing::Level;
use tracing_subscriber::{
    layer::SubscriberExt, util::SubscriberInitExt, util::TryInitError, EnvFilter,
};

use crate::config::ServiceConfig;

/// Error type for logging setup.
#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("failed to install log subscriber: {0}")]
    Init(#[from] TryInitError),
}

/// Parse a level name such as `WARN` or `debug`.
///
/// Panic and fatal levels collapse to `ERROR`; unknown names fall back to `INFO`.
pub fn parse_log_level(name: &str) -> Level {
    match name.trim().to_ascii_uppercase().as_str() {
        "DEBUG" => Level::DEBUG,
        "INFO" => Level::INFO,
        "WARN" | "WARNING" => Level::WARN,
        "ERROR" | "DPANIC" | "PANIC" | "FATAL" => Level::ERROR,
        _ => Level::INFO,
    }
}

/// Build the filter for `config`, preferring `RUST_LOG` when present.
pub fn env_filter(config: &ServiceConfig) -> EnvFilter {
    let level = parse_log_level(&config.observability.log_level);
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_ascii_lowercase()))
}

/// Install the global subscriber. Fails if one is already installed.
pub fn init_logging(config: &ServiceConfig) -> Result<(), LoggingError> {
    let json = !config.environment.is_local();

    let json_layer = json.then(|| {
        tracing_subscriber::fmt::layer()
            .json()
            .with_current_span(true)
            .with_target(true)
    });
    let console_layer = (!json).then(tracing_subscriber::fmt::layer);

    tracing_subscriber::registry()
        .with(env_filter(config))
        .with(json_layer)
        .with(console_layer)
        .try_init()?;

    tracing::debug!(
        environment = %config.environment,
        json,
        "Logging initialized"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_levels() {
        assert_eq!(parse_log_level("DEBUG"), Level::DEBUG);
        assert_eq!(parse_log_level("info"), Level::INFO);
        assert_eq!(parse_log_level("Warning"), Level::WARN);
        assert_eq!(parse_log_level("WARN"), Level::WARN);
        assert_eq!(parse_log_level("ERROR"), Level::ERROR);
    }

    #[test]
    fn test_panic_levels_collapse_to_error() {
        for name in ["DPANIC", "PANIC", "FATAL"] {
            assert_eq!(parse_log_level(name), Level::ERROR, "{name}");
        }
    }

    #[test]
    fn test_unknown_level_defaults_to_info() {
        assert_eq!(parse_log_level("verbose"), Level::INFO);
        assert_eq!(parse_log_level(""), Level::INFO);
    }
}
