// # Nginx Proxy Manager backend
//
// Drives proxy hosts through the proxy manager's REST API. The HTTP client
// implements `ProxyApi`; the diff itself (delete stale, create missing) is
// done by `ApiProxyReconciler` in the core crate.
//
// ## Behaviour
//
// - One HTTP request per logical operation, 30 second timeout each
// - Bearer token obtained lazily and cached for the process lifetime
// - A `401` triggers one re-login and one retry of the same request
// - No retry or backoff beyond that; the engine retries on its next cycle
//
// ## Security Requirements
//
// - The password NEVER appears in logs or Debug output
// - Credentials come from configuration only
//
// ## API Reference
//
// - Login: POST `/api/tokens` with `{identity, secret}`
// - List hosts: GET `/api/nginx/proxy-hosts`
// - Create host: POST `/api/nginx/proxy-hosts`
// - Delete host: DELETE `/api/nginx/proxy-hosts/:id`

mod client;
mod payload;

pub use client::{DEFAULT_HTTP_TIMEOUT, NpmClient};
pub use payload::ProxyHostPayload;

use proxydns_core::config::ProxyConfig;
use proxydns_core::traits::{ProxyLayer, ProxyLayerFactory};
use proxydns_core::{ApiProxyReconciler, BackendRegistry, Error, Result};

/// Factory for creating API-driven proxy layers
pub struct NpmApiFactory;

impl ProxyLayerFactory for NpmApiFactory {
    fn create(&self, config: &ProxyConfig) -> Result<Box<dyn ProxyLayer>> {
        match config {
            ProxyConfig::NpmApi {
                host,
                email,
                password,
                certificate_id,
            } => {
                if email.is_empty() || password.is_empty() {
                    return Err(Error::config("NPM email and password are required"));
                }

                let client = NpmClient::new(host, email.clone(), password.clone(), *certificate_id)?;
                tracing::debug!("NPM API client targeting {}", client.base_url());
                Ok(Box::new(ApiProxyReconciler::new(client)))
            }
            _ => Err(Error::config("Invalid config for NPM API proxy layer")),
        }
    }
}

/// Register the API-driven proxy layer with a registry
///
/// # Example
///
/// ```rust
/// use proxydns_core::BackendRegistry;
///
/// let registry = BackendRegistry::new();
/// proxydns_proxy_npm::register(&registry);
/// assert!(registry.has_proxy_layer("npm-api"));
/// ```
pub fn register(registry: &BackendRegistry) {
    registry.register_proxy_layer("npm-api", Box::new(NpmApiFactory));
}
