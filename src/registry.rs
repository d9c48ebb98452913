//! Name-keyed table of platform handler constructors.

use crate::{Error, PlatformHandler, ProviderConfig};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Builds a handler from configuration.
pub type HandlerConstructor =
    Arc<dyn Fn(&ProviderConfig) -> Result<Box<dyn PlatformHandler>, Error> + Send + Sync>;

/// Registry mapping platform names to handler constructors.
///
/// Owned by the application's composition root: populate it during startup,
/// then share it read-only (`&HandlerRegistry` or `Arc<HandlerRegistry>`)
/// for concurrent lookups.
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    constructors: HashMap<String, HandlerConstructor>,
}

impl HandlerRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding every platform shipped with this crate.
    pub fn with_builtin_providers() -> Self {
        let mut registry = Self::new();
        crate::providers::volcengine::register(&mut registry);
        crate::providers::alibaba::register(&mut registry);
        registry
    }

    /// Register the constructor for `name`, replacing any earlier registration.
    pub fn register<F>(&mut self, name: impl Into<String>, constructor: F)
    where
        F: Fn(&ProviderConfig) -> Result<Box<dyn PlatformHandler>, Error> + Send + Sync + 'static,
    {
        let name = name.into();
        if self
            .constructors
            .insert(name.clone(), Arc::new(constructor))
            .is_some()
        {
            tracing::debug!(provider = %name, "replaced handler registration");
        }
    }

    /// Construct the handler registered under `name`.
    pub fn resolve(
        &self,
        name: &str,
        config: &ProviderConfig,
    ) -> Result<Box<dyn PlatformHandler>, Error> {
        let constructor = self
            .constructors
            .get(name)
            .ok_or_else(|| Error::NotRegistered(name.to_string()))?;
        constructor(config)
    }

    /// Construct the handler for the platform named by `config.provider`.
    pub fn resolve_config(&self, config: &ProviderConfig) -> Result<Box<dyn PlatformHandler>, Error> {
        self.resolve(&config.provider, config)
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.constructors.contains_key(name)
    }

    /// Names of all registered platforms, in no particular order.
    pub fn list_registered(&self) -> Vec<String> {
        self.constructors.keys().cloned().collect()
    }
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("providers", &self.list_registered())
            .finish()
    }
}
