//! Configuration schema definitions.
//!
//! A [`ServiceConfig`] is the immutable snapshot every subsystem reads. It is
//! built once by the loader, validated, registered under a name and then only
//! handed out behind an `Arc`.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::security::proxies::TrustedProxy;

/// Deployment environment the service runs in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Environment {
    Testing,
    #[default]
    Development,
    Staging,
    Production,
}

impl Environment {
    /// Every supported environment, in declaration order.
    pub const ALL: [Environment; 4] = [
        Environment::Testing,
        Environment::Development,
        Environment::Staging,
        Environment::Production,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Testing => "testing",
            Environment::Development => "development",
            Environment::Staging => "staging",
            Environment::Production => "production",
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }

    /// Whether logs should be emitted for humans rather than collectors.
    pub fn is_local(&self) -> bool {
        matches!(self, Environment::Testing | Environment::Development)
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raised when an environment tag is outside the supported set.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid environment '{value}', supported environments are {supported}", supported = supported_list())]
pub struct InvalidEnvironmentError {
    /// The rejected tag, as provided.
    pub value: String,
}

impl InvalidEnvironmentError {
    pub fn allowed(&self) -> &'static [Environment] {
        &Environment::ALL
    }
}

fn supported_list() -> String {
    let names: Vec<&str> = Environment::ALL.iter().map(Environment::as_str).collect();
    format!("[{}]", names.join(", "))
}

impl FromStr for Environment {
    type Err = InvalidEnvironmentError;

    // Tags are matched exactly; "Production" is not "production".
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Environment::ALL
            .into_iter()
            .find(|env| env.as_str() == s)
            .ok_or_else(|| InvalidEnvironmentError {
                value: s.to_string(),
            })
    }
}

/// Root configuration snapshot.
#[derive(Debug, Clone, Default)]
pub struct ServiceConfig {
    /// Deployment environment tag.
    pub environment: Environment,

    /// Service identity.
    pub app: AppConfig,

    /// Listener configuration (bind address, connection limits, proxies).
    pub listener: ListenerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Request limits and CORS policy.
    pub security: SecurityConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl ServiceConfig {
    /// Defaults for the given environment tag.
    ///
    /// Fails when the tag is not one of the supported environments.
    pub fn for_environment(tag: &str) -> Result<Self, InvalidEnvironmentError> {
        Ok(Self {
            environment: tag.parse()?,
            ..Self::default()
        })
    }

    /// Address handed to the listener, e.g. `0.0.0.0:8001`.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.listener.host, self.listener.port)
    }

    /// Externally advertised URL of the service.
    pub fn public_url(&self) -> String {
        format!("http://{}:{}", self.listener.host, self.listener.port)
    }

    /// Human readable name used as the prefix of lifecycle logs.
    pub fn display_name(&self) -> String {
        format!(
            "Service {}-V{} ({})",
            self.app.name,
            self.app.version,
            self.bind_address()
        )
    }
}

/// Service identity.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub name: String,
    pub version: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            name: "unknown".to_string(),
            version: "unknown".to_string(),
        }
    }
}

/// Listener configuration.
#[derive(Debug, Clone)]
pub struct ListenerConfig {
    /// Host or IP to bind (e.g., "0.0.0.0").
    pub host: String,

    /// Port to bind. `0` asks the OS for an ephemeral port.
    pub port: u16,

    /// Maximum concurrent connections (backpressure).
    pub max_connections: usize,

    /// Peers whose forwarding headers are trusted.
    pub trusted_proxies: Vec<TrustedProxy>,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8001,
            max_connections: 10_000,
            trusted_proxies: Vec::new(),
        }
    }
}

/// Timeouts applied to every connection, plus the shutdown grace period.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeoutConfig {
    /// Time allowed to receive the request head.
    pub read_header: Duration,

    /// Time allowed to receive the whole request body.
    pub read: Duration,

    /// Time allowed to produce the response.
    pub write: Duration,

    /// Keep-alive connections without traffic are closed after this long.
    pub idle: Duration,

    /// Bounded window for in-flight requests once shutdown starts.
    pub shutdown_grace: Duration,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            read_header: Duration::from_secs(5),
            read: Duration::from_secs(15),
            write: Duration::from_secs(30),
            idle: Duration::from_secs(120),
            shutdown_grace: Duration::from_secs(10),
        }
    }
}

/// Request limits and cross-origin policy.
#[derive(Debug, Clone)]
pub struct SecurityConfig {
    /// Maximum body size in bytes.
    pub max_body_size: usize,

    /// Origins allowed in production. Ignored elsewhere, where any origin is accepted.
    pub cors_allowed_origins: Vec<String>,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_body_size: 8 * 1024 * 1024, // 8MiB
            cors_allowed_origins: Vec::new(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    /// Log level (DEBUG, INFO, WARN, ERROR, ...).
    pub log_level: String,

    /// Expose `/metrics` on the service router.
    pub metrics_enabled: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "INFO".to_string(),
            metrics_enabled: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_supported_environment_parses() {
        for tag in ["testing", "development", "staging", "production"] {
            let env: Environment = tag.parse().unwrap();
            assert_eq!(env.as_str(), tag);
        }
    }

    #[test]
    fn test_unknown_environment_is_rejected() {
        for tag in ["", "prod", "Production", "dev", " staging"] {
            let err = tag.parse::<Environment>().unwrap_err();
            assert_eq!(err.value, tag);
            assert_eq!(err.allowed().len(), 4);
        }
    }

    #[test]
    fn test_invalid_environment_message_lists_allowed_set() {
        let err = ServiceConfig::for_environment("qa").unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid environment 'qa', supported environments are [testing, development, staging, production]"
        );
    }

    #[test]
    fn test_default_config() {
        let config = ServiceConfig::default();
        assert_eq!(config.environment, Environment::Development);
        assert_eq!(config.listener.port, 8001);
        assert_eq!(config.security.max_body_size, 8 << 20);
        assert_eq!(config.timeouts.read_header, Duration::from_secs(5));
        assert_eq!(config.timeouts.read, Duration::from_secs(15));
        assert_eq!(config.timeouts.write, Duration::from_secs(30));
        assert_eq!(config.timeouts.idle, Duration::from_secs(120));
        assert_eq!(config.timeouts.shutdown_grace, Duration::from_secs(10));
    }

    #[test]
    fn test_display_name() {
        let mut config = ServiceConfig::for_environment("staging").unwrap();
        config.app.name = "billing".into();
        config.app.version = "1.2.0".into();
        config.listener.host = "localhost".into();
        config.listener.port = 9000;
        assert_eq!(config.bind_address(), "localhost:9000");
        assert_eq!(config.public_url(), "http://localhost:9000");
        assert_eq!(config.display_name(), "Service billing-V1.2.0 (localhost:9000)");
    }
}
