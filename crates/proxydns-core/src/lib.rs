// # proxydns-core
//
// Core library for reconciling reverse-proxy routes and DNS aliases.
//
// ## Architecture Overview
//
// One sync cycle flows in a single direction:
//
// ```text
// ServiceSource ──▶ ProxyLayer ──▶ DnsReconciler ──▶ AliasStore
//  (desired)        (routes)        (CNAME diff)      (resolver)
// ```
//
// - **ServiceSource**: Produces the desired `ServiceSpec`s (env vars, JSON manifest)
// - **ProxyLayer**: Converges the reverse proxy and reports the desired domain set
//   (the nginx scan layer only reads domains back from existing configs)
// - **ProxyApi**: Remote proxy-host CRUD used by the API-driven proxy layer
// - **AliasStore**: Raw read/write/restart access to the resolver's alias list
// - **SyncEngine**: Runs cycles on a fixed interval until shutdown
// - **BackendRegistry**: Plugin-based construction of backends from configuration
//
// ## Design Principles
//
// 1. **Recompute every cycle**: desired and observed state are fetched fresh, nothing is cached
// 2. **Degrade, don't die**: transport failures skip work instead of stopping the loop
// 3. **Explicit context**: suffix, target host and dry-run travel in `SyncContext`
// 4. **Library-First**: the daemon is a thin layer over this crate

pub mod alias;
pub mod config;
pub mod engine;
pub mod error;
pub mod exec;
pub mod model;
pub mod reconcile;
pub mod registry;
pub mod sources;
pub mod traits;

// Re-export core types for convenience
pub use config::{EngineConfig, ProxyConfig, ResolverConfig, SourceConfig, SyncConfig};
pub use engine::{CycleReport, SkipReason, SyncEngine, SyncEvent};
pub use error::{Error, Result};
pub use exec::{CommandOutput, CommandRunner, SystemCommandRunner};
pub use model::{DesiredDomainSet, ProxyHost, ServiceSpec, SyncContext};
pub use reconcile::{ApiProxyReconciler, DnsOutcome, DnsReconciler};
pub use registry::BackendRegistry;
pub use traits::{Activation, AliasStore, ProxyApi, ProxyLayer, ProxyOutcome, ServiceSource};
