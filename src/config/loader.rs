//! Configuration loading from the process environment.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use envconfig::Envconfig;
use thiserror::Error;

use crate::config::schema::{
    AppConfig, InvalidEnvironmentError, ListenerConfig, ObservabilityConfig, SecurityConfig,
    ServiceConfig, TimeoutConfig,
};
use crate::config::validation::{validate_config, ValidationError};
use crate::security::proxies::{parse_proxy_list, InvalidProxyError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read env file {path}: {source}")]
    EnvFile {
        path: String,
        #[source]
        source: dotenvy::Error,
    },

    #[error("environment error: {0}")]
    Env(#[from] envconfig::Error),

    #[error(transparent)]
    InvalidEnvironment(#[from] InvalidEnvironmentError),

    #[error(transparent)]
    InvalidProxy(#[from] InvalidProxyError),

    #[error("validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Raw environment variables, before semantic conversion.
#[derive(Envconfig, Clone, Debug)]
pub struct EnvSettings {
    #[envconfig(from = "APP_NAME", default = "unknown")]
    pub app_name: String,

    #[envconfig(from = "APP_VERSION", default = "unknown")]
    pub app_version: String,

    #[envconfig(from = "APP_LOG_LEVEL", default = "INFO")]
    pub log_level: String,

    #[envconfig(from = "APP_ENVIRONMENT", default = "development")]
    pub environment: String,

    #[envconfig(from = "APP_HOST", default = "0.0.0.0")]
    pub host: String,

    #[envconfig(from = "APP_PORT", default = "8001")]
    pub port: u16,

    #[envconfig(from = "APP_NETWORKING_PROXIES", default = "")]
    pub trusted_proxies: String,

    #[envconfig(from = "APP_CORS_ALLOWED_ORIGINS", default = "")]
    pub cors_allowed_origins: String,

    #[envconfig(from = "APP_MAX_BODY_BYTES", default = "8388608")]
    pub max_body_bytes: usize,

    #[envconfig(from = "APP_MAX_CONNECTIONS", default = "10000")]
    pub max_connections: usize,

    #[envconfig(from = "APP_HTTP_READ_HEADER_TIMEOUT_SECS", default = "5")]
    pub read_header_timeout_secs: u64,

    #[envconfig(from = "APP_HTTP_READ_TIMEOUT_SECS", default = "15")]
    pub read_timeout_secs: u64,

    #[envconfig(from = "APP_HTTP_WRITE_TIMEOUT_SECS", default = "30")]
    pub write_timeout_secs: u64,

    #[envconfig(from = "APP_HTTP_IDLE_TIMEOUT_SECS", default = "120")]
    pub idle_timeout_secs: u64,

    #[envconfig(from = "APP_SHUTDOWN_GRACE_PERIOD_SECS", default = "10")]
    pub shutdown_grace_period_secs: u64,

    #[envconfig(from = "APP_METRICS_ENABLED", default = "false")]
    pub metrics_enabled: bool,
}

impl TryFrom<EnvSettings> for ServiceConfig {
    type Error = ConfigError;

    fn try_from(settings: EnvSettings) -> Result<Self, Self::Error> {
        let environment = settings.environment.trim().parse()?;

        let config = ServiceConfig {
            environment,
            app: AppConfig {
                name: settings.app_name,
                version: settings.app_version,
            },
            listener: ListenerConfig {
                host: strip_scheme(&settings.host).to_string(),
                port: settings.port,
                max_connections: settings.max_connections,
                trusted_proxies: parse_proxy_list(&settings.trusted_proxies)?,
            },
            timeouts: TimeoutConfig {
                read_header: Duration::from_secs(settings.read_header_timeout_secs),
                read: Duration::from_secs(settings.read_timeout_secs),
                write: Duration::from_secs(settings.write_timeout_secs),
                idle: Duration::from_secs(settings.idle_timeout_secs),
                shutdown_grace: Duration::from_secs(settings.shutdown_grace_period_secs),
            },
            security: SecurityConfig {
                max_body_size: settings.max_body_bytes,
                cors_allowed_origins: split_list(&settings.cors_allowed_origins),
            },
            observability: ObservabilityConfig {
                log_level: settings.log_level,
                metrics_enabled: settings.metrics_enabled,
            },
        };

        validate_config(&config).map_err(ConfigError::Validation)?;
        Ok(config)
    }
}

// APP_HOST historically carried a URL ("http://localhost"); only the host part binds.
fn strip_scheme(host: &str) -> &str {
    let host = host.trim();
    host.strip_prefix("http://")
        .or_else(|| host.strip_prefix("https://"))
        .unwrap_or(host)
        .trim_end_matches('/')
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(ToString::to_string)
        .collect()
}

/// Load variables from an env file into the process environment.
///
/// Returns `Ok(false)` when the file does not exist; variables already set
/// in the environment take precedence over the file.
pub fn load_env_file(path: &Path) -> Result<bool, ConfigError> {
    match dotenvy::from_path(path) {
        Ok(()) => Ok(true),
        Err(e) if e.not_found() => Ok(false),
        Err(source) => Err(ConfigError::EnvFile {
            path: path.display().to_string(),
            source,
        }),
    }
}

/// Build and validate a snapshot from the process environment.
pub fn load_from_env() -> Result<ServiceConfig, ConfigError> {
    EnvSettings::init_from_env()?.try_into()
}

/// Build and validate a snapshot from an explicit variable map.
pub fn load_from_map(vars: &HashMap<String, String>) -> Result<ServiceConfig, ConfigError> {
    EnvSettings::init_from_hashmap(vars)?.try_into()
}
