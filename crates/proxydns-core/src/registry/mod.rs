//! Plugin-based backend registry
//!
//! The registry allows proxy layers and alias stores to be registered
//! dynamically at runtime, avoiding hardcoded if-else chains in the daemon.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use proxydns_core::BackendRegistry;
//!
//! let registry = BackendRegistry::new();
//! proxydns_proxy_npm::register(&registry);
//! proxydns_resolver_pihole::register(&registry);
//!
//! let proxy = registry.create_proxy_layer(&config.proxy)?;
//! let store = registry.create_alias_store(&config.resolver)?;
//! ```

use crate::config::{ProxyConfig, ResolverConfig};
use crate::error::{Error, Result};
use crate::traits::{AliasStore, AliasStoreFactory, ProxyLayer, ProxyLayerFactory};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

/// Backend registry keyed by configuration type name
///
/// ## Thread Safety
///
/// The registry uses interior mutability with RwLock, allowing concurrent
/// reads and exclusive writes.
#[derive(Default)]
pub struct BackendRegistry {
    /// Registered proxy layer factories
    proxy_layers: RwLock<HashMap<String, Box<dyn ProxyLayerFactory>>>,

    /// Registered alias store factories
    alias_stores: RwLock<HashMap<String, Box<dyn AliasStoreFactory>>>,
}

impl BackendRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a proxy layer factory under `name` (e.g. "npm-api")
    pub fn register_proxy_layer(&self, name: impl Into<String>, factory: Box<dyn ProxyLayerFactory>) {
        self.proxy_layers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.into(), factory);
    }

    /// Register an alias store factory under `name` (e.g. "pihole")
    pub fn register_alias_store(&self, name: impl Into<String>, factory: Box<dyn AliasStoreFactory>) {
        self.alias_stores
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.into(), factory);
    }

    /// Create a proxy layer from configuration
    ///
    /// # Returns
    ///
    /// - `Ok(Box<dyn ProxyLayer>)`: Created layer
    /// - `Err(Error)`: If the type is not registered or creation fails
    pub fn create_proxy_layer(&self, config: &ProxyConfig) -> Result<Box<dyn ProxyLayer>> {
        let layer_type = config.type_name();
        let layers = self
            .proxy_layers
            .read()
            .unwrap_or_else(PoisonError::into_inner);

        let factory = layers
            .get(layer_type)
            .ok_or_else(|| Error::config(format!("Unknown proxy type: {}", layer_type)))?;

        factory.create(config)
    }

    /// Create an alias store from configuration
    pub fn create_alias_store(&self, config: &ResolverConfig) -> Result<Box<dyn AliasStore>> {
        let store_type = config.type_name();
        let stores = self
            .alias_stores
            .read()
            .unwrap_or_else(PoisonError::into_inner);

        let factory = stores
            .get(store_type)
            .ok_or_else(|| Error::config(format!("Unknown resolver type: {}", store_type)))?;

        factory.create(config)
    }

    /// List all registered proxy layer types
    pub fn list_proxy_layers(&self) -> Vec<String> {
        let layers = self
            .proxy_layers
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        layers.keys().cloned().collect()
    }

    /// List all registered alias store types
    pub fn list_alias_stores(&self) -> Vec<String> {
        let stores = self
            .alias_stores
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        stores.keys().cloned().collect()
    }

    /// Check if a proxy layer type is registered
    pub fn has_proxy_layer(&self, name: &str) -> bool {
        self.proxy_layers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }

    /// Check if an alias store type is registered
    pub fn has_alias_store(&self, name: &str) -> bool {
        self.alias_stores
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }
}
