//! Startup orchestration.
//!
//! # Responsibilities
//! - Load and validate configuration
//! - Register it under its name and read it back from the registry
//! - Initialize logging and metrics
//! - Build the application and hand it to the orchestrator
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Subsystems initialize in order, not concurrently
//! - Signal handlers are installed before the listener binds

use std::path::PathBuf;
use std::sync::Arc;

use axum::Router;
use metrics_exporter_prometheus::BuildError;
use thiserror::Error;

use super::orchestrator::{ExitOutcome, LifecycleError, ServerHandle};
use super::signals::Signals;
use crate::config::{self, ConfigError, ConfigRegistry, RegistryError, ServiceConfig};
use crate::http;
use crate::observability::{self, metrics, LoggingError};

/// Error type for process startup.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Logging(#[from] LoggingError),

    #[error("failed to install metrics recorder: {0}")]
    Metrics(#[from] BuildError),

    #[error("failed to install signal handlers: {0}")]
    Signals(#[source] std::io::Error),

    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
}

/// Inputs of a process start.
#[derive(Debug, Clone)]
pub struct StartupOptions {
    /// Optional dotenv file read before the environment.
    pub env_file: PathBuf,
    /// Registry name the configuration is stored under.
    pub config_name: String,
}

impl Default for StartupOptions {
    fn default() -> Self {
        Self {
            env_file: PathBuf::from(".env"),
            config_name: config::DEFAULT_CONFIG_NAME.to_string(),
        }
    }
}

/// Load the configuration from the environment into `registry`.
///
/// Returns the snapshot as stored in the registry and whether the env file
/// was found.
pub fn load_configuration(
    registry: &ConfigRegistry,
    options: &StartupOptions,
) -> Result<(Arc<ServiceConfig>, bool), StartupError> {
    let env_file_found = config::load_env_file(&options.env_file)?;
    let snapshot = config::load_from_env()?;
    registry.register(&options.config_name, snapshot)?;
    let config = registry.lookup(&options.config_name)?;
    Ok((config, env_file_found))
}

/// Build the application for `config`, installing the metrics recorder if enabled.
pub fn build_app(config: &ServiceConfig) -> Result<Router, StartupError> {
    let handle = if config.observability.metrics_enabled {
        Some(metrics::setup_metrics_recorder()?)
    } else {
        None
    };
    Ok(http::app(config, handle))
}

/// Run the whole process lifecycle with the OS signal handlers.
pub async fn run(options: StartupOptions) -> Result<ExitOutcome, StartupError> {
    let registry = ConfigRegistry::new();
    let (config, env_file_found) = load_configuration(&registry, &options)?;

    observability::init_logging(&config)?;
    if !env_file_found {
        tracing::info!(path = %options.env_file.display(), "No env file found, using process environment");
    }
    tracing::info!(
        name = %config.app.name,
        version = %config.app.version,
        environment = %config.environment,
        bind_address = %config.bind_address(),
        max_connections = config.listener.max_connections,
        "Configuration loaded"
    );

    let app = build_app(&config)?;
    let signals = Signals::os().map_err(StartupError::Signals)?;

    let outcome = ServerHandle::new(&config, app).run(signals).await?;
    tracing::info!(outcome = ?outcome, "Shutdown complete");
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let options = StartupOptions::default();
        assert_eq!(options.env_file, PathBuf::from(".env"));
        assert_eq!(options.config_name, "default");
    }

    #[test]
    fn test_build_app_without_metrics() {
        let config = ServiceConfig::default();
        assert!(build_app(&config).is_ok());
    }
}
