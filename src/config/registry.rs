//! Named registry of configuration snapshots.
//!
//! Each name maps to exactly one snapshot for the lifetime of the registry.
//! Registration is write-once: a second registration under the same name is
//! a programming error and is rejected without touching the stored snapshot.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use thiserror::Error;

use crate::config::schema::ServiceConfig;

/// Name used by the binary for its own configuration.
pub const DEFAULT_CONFIG_NAME: &str = "default";

/// Error type for registry operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("configuration '{0}' already exists")]
    Duplicate(String),

    #[error("configuration '{0}' does not exist")]
    Unknown(String),
}

/// Write-once, read-many store of configuration snapshots.
///
/// Share it by reference (or `Arc`) with whatever builds the server.
#[derive(Debug, Default)]
pub struct ConfigRegistry {
    entries: Mutex<HashMap<String, Arc<ServiceConfig>>>,
}

impl ConfigRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `config` under `name`, returning the shared snapshot.
    pub fn register(
        &self,
        name: &str,
        config: ServiceConfig,
    ) -> Result<Arc<ServiceConfig>, RegistryError> {
        // The map is never left half-updated, so a poisoned lock is still usable.
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        if entries.contains_key(name) {
            return Err(RegistryError::Duplicate(name.to_string()));
        }

        let snapshot = Arc::new(config);
        entries.insert(name.to_string(), Arc::clone(&snapshot));
        tracing::debug!(name, environment = %snapshot.environment, "Configuration registered");
        Ok(snapshot)
    }

    /// Look up the snapshot registered under `name`.
    pub fn lookup(&self, name: &str) -> Result<Arc<ServiceConfig>, RegistryError> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries
            .get(name)
            .cloned()
            .ok_or_else(|| RegistryError::Unknown(name.to_string()))
    }

    /// Look up the snapshot registered under [`DEFAULT_CONFIG_NAME`].
    pub fn lookup_default(&self) -> Result<Arc<ServiceConfig>, RegistryError> {
        self.lookup(DEFAULT_CONFIG_NAME)
    }

    /// Number of registered snapshots.
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
