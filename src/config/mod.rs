//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! .env file (optional) + process environment
//!     → loader.rs (envconfig, type conversion)
//!     → validation.rs (semantic checks)
//!     → ServiceConfig (validated, immutable)
//!     → registry.rs (registered once under a name)
//!     → shared via Arc to all subsystems
//! ```
//!
//! # Design Decisions
//! - Config is immutable once registered; changes require a restart
//! - All fields have defaults to allow minimal environments
//! - The environment tag is checked at construction, not by the registry
//! - The registry is an explicit value, not a process global

pub mod loader;
pub mod registry;
pub mod schema;
pub mod validation;

pub use loader::{load_env_file, load_from_env, load_from_map, ConfigError, EnvSettings};
pub use registry::{ConfigRegistry, RegistryError, DEFAULT_CONFIG_NAME};
pub use schema::{
    AppConfig, Environment, InvalidEnvironmentError, ListenerConfig, ObservabilityConfig,
    SecurityConfig, ServiceConfig, TimeoutConfig,
};
pub use validation::{validate_config, ValidationError};
