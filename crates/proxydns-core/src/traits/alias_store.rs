// # Alias Store Trait
//
// Raw administrative access to a resolver's CNAME alias list. The store
// moves opaque strings; parsing and rendering live in `crate::alias`, and
// the diff lives in `DnsReconciler`.
//
// ## Implementations
//
// - Pi-hole over SSH: `proxydns-resolver-pihole` crate
//
// ## Concurrency
//
// `read_aliases` followed by `write_aliases` is a read-modify-write with no
// optimistic-concurrency check. Callers must not run two reconciliations
// against the same store at once.

use async_trait::async_trait;

/// Raw resolver alias-list access
#[async_trait]
pub trait AliasStore: Send + Sync {
    /// Fetch the current alias list as the resolver prints it
    async fn read_aliases(&self) -> Result<String, crate::Error>;

    /// Replace the alias list with `payload` (already rendered)
    async fn write_aliases(&self, payload: &str) -> Result<(), crate::Error>;

    /// Restart the resolver so the new list takes effect
    async fn restart(&self) -> Result<(), crate::Error>;

    /// Human-readable description of the write for diagnostics
    fn describe_write(&self, payload: &str) -> String {
        payload.to_string()
    }

    /// Store name (for logging)
    fn store_name(&self) -> &'static str;
}

/// Helper trait for constructing alias stores from configuration
pub trait AliasStoreFactory: Send + Sync {
    /// Create an AliasStore instance from configuration
    fn create(
        &self,
        config: &crate::config::ResolverConfig,
    ) -> Result<Box<dyn AliasStore>, crate::Error>;
}
