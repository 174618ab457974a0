//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (the loader handles syntax and types)
//! - Validate value ranges (timeouts > 0, limits > 0)
//! - Reject policies that are unsafe for the selected environment
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServiceConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the registry

use std::time::Duration;

use thiserror::Error;

use crate::config::schema::ServiceConfig;

/// A single semantic problem found in a configuration snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{0} must not be empty")]
    Empty(&'static str),

    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("wildcard CORS origin is not allowed in production")]
    WildcardOriginInProduction,
}

/// Validate a snapshot, collecting every problem.
pub fn validate_config(config: &ServiceConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.app.name.trim().is_empty() {
        errors.push(ValidationError::Empty("APP_NAME"));
    }
    if config.listener.host.trim().is_empty() {
        errors.push(ValidationError::Empty("APP_HOST"));
    }
    if config.listener.max_connections == 0 {
        errors.push(ValidationError::Zero("APP_MAX_CONNECTIONS"));
    }
    if config.security.max_body_size == 0 {
        errors.push(ValidationError::Zero("APP_MAX_BODY_BYTES"));
    }

    let timeouts = [
        ("APP_HTTP_READ_HEADER_TIMEOUT_SECS", config.timeouts.read_header),
        ("APP_HTTP_READ_TIMEOUT_SECS", config.timeouts.read),
        ("APP_HTTP_WRITE_TIMEOUT_SECS", config.timeouts.write),
        ("APP_HTTP_IDLE_TIMEOUT_SECS", config.timeouts.idle),
        ("APP_SHUTDOWN_GRACE_PERIOD_SECS", config.timeouts.shutdown_grace),
    ];
    for (name, value) in timeouts {
        if value == Duration::ZERO {
            errors.push(ValidationError::Zero(name));
        }
    }

    if config.environment.is_production()
        && config
            .security
            .cors_allowed_origins
            .iter()
            .any(|origin| origin == "*")
    {
        errors.push(ValidationError::WildcardOriginInProduction);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(validate_config(&ServiceConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_every_error() {
        let mut config = ServiceConfig::default();
        config.app.name = "  ".into();
        config.listener.max_connections = 0;
        config.timeouts.shutdown_grace = Duration::ZERO;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![
                ValidationError::Empty("APP_NAME"),
                ValidationError::Zero("APP_MAX_CONNECTIONS"),
                ValidationError::Zero("APP_SHUTDOWN_GRACE_PERIOD_SECS"),
            ]
        );
    }

    #[test]
    fn test_wildcard_origin_only_rejected_in_production() {
        let mut config = ServiceConfig::for_environment("staging").unwrap();
        config.security.cors_allowed_origins = vec!["*".into()];
        assert!(validate_config(&config).is_ok());

        config.environment = "production".parse().unwrap();
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors, vec![ValidationError::WildcardOriginInProduction]);
    }
}
