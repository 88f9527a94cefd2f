// # Proxy Traits
//
// Two levels of abstraction over the reverse proxy:
//
// - `ProxyLayer` is what the engine talks to. It converges the proxy for the
//   cycle's services and reports the desired domain set plus whether an
//   activation step (reload) succeeded.
// - `ProxyApi` is the remote CRUD surface of an API-configured proxy
//   manager. `ApiProxyReconciler` turns any `ProxyApi` into a `ProxyLayer`.
//
// ## Implementations
//
// - Proxy-manager HTTP API: `proxydns-proxy-npm` crate (`ProxyApi`)
// - Generated config files + reload: `proxydns-proxy-files` crate (`ProxyLayer`)
// - Existing nginx configs, read-only: `sources::nginx_scan` (`ProxyLayer`)

use async_trait::async_trait;

use crate::model::{DesiredDomainSet, ProxyHost, ServiceSpec, SyncContext};

/// Result of the proxy's activation step for a cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    /// The layer applies changes live; nothing to activate
    NotRequired,
    /// Reload succeeded (or was simulated in dry-run)
    Succeeded,
    /// Reload failed; running state may not match generated config
    Failed,
}

/// What a proxy layer reports back to the engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyOutcome {
    /// Domains desired this cycle, handed to DNS reconciliation
    pub domains: DesiredDomainSet,
    /// Activation result
    pub activation: Activation,
    /// Hosts or files created
    pub created: usize,
    /// Hosts deleted
    pub deleted: usize,
    /// Individual operations that failed
    pub failures: usize,
    /// Failures a later cycle may clear without operator action
    pub retryable: usize,
}

impl ProxyOutcome {
    /// Outcome carrying only a domain set
    pub fn new(domains: DesiredDomainSet, activation: Activation) -> Self {
        Self {
            domains,
            activation,
            created: 0,
            deleted: 0,
            failures: 0,
            retryable: 0,
        }
    }

    /// Count a failed operation, logging it by how likely a retry is to help
    pub fn record_failure(&mut self, what: &str, err: &crate::Error) {
        self.failures += 1;
        if err.is_transient() {
            self.retryable += 1;
            tracing::warn!("{} (will retry next cycle): {}", what, err);
        } else {
            tracing::error!("{}: {}", what, err);
        }
    }

    /// Whether DNS reconciliation may run on this outcome
    pub fn allows_dns(&self) -> bool {
        self.activation != Activation::Failed
    }
}

/// Reverse proxy as seen by the engine
#[async_trait]
pub trait ProxyLayer: Send + Sync {
    /// Converge the proxy towards `services`
    ///
    /// Per-item failures are absorbed into the outcome. An `Err` means the
    /// layer could not run at all this cycle.
    async fn converge(
        &self,
        services: &[ServiceSpec],
        ctx: &SyncContext,
    ) -> Result<ProxyOutcome, crate::Error>;

    /// Whether `converge` reads the cycle's services
    ///
    /// Read-only layers report domains found on the proxy itself; the engine
    /// then skips loading services.
    fn uses_services(&self) -> bool {
        true
    }

    /// Layer name (for logging)
    fn layer_name(&self) -> &'static str;
}

/// Remote proxy-host management surface
///
/// Implementations perform exactly one logical remote operation per call
/// and own their own authentication.
#[async_trait]
pub trait ProxyApi: Send + Sync {
    /// List every proxy host currently configured
    async fn list_hosts(&self) -> Result<Vec<ProxyHost>, crate::Error>;

    /// Create a host routing `domain` to `forward_host:forward_port`
    async fn create_host(
        &self,
        domain: &str,
        forward_host: &str,
        forward_port: u16,
    ) -> Result<ProxyHost, crate::Error>;

    /// Delete a host by its remote id
    async fn delete_host(&self, id: u64) -> Result<(), crate::Error>;

    /// API name (for logging)
    fn api_name(&self) -> &'static str;
}

/// Helper trait for constructing proxy layers from configuration
pub trait ProxyLayerFactory: Send + Sync {
    /// Create a ProxyLayer instance from configuration
    fn create(
        &self,
        config: &crate::config::ProxyConfig,
    ) -> Result<Box<dyn ProxyLayer>, crate::Error>;
}
