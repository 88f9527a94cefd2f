//! Core traits for the proxydns system
//!
//! This module defines the abstract interfaces that backends implement.
//!
//! - [`ServiceSource`]: Produce the desired services for a cycle
//! - [`ProxyLayer`]: Converge the reverse proxy and report desired domains
//! - [`ProxyApi`]: Remote proxy-host CRUD for the API-driven proxy layer
//! - [`AliasStore`]: Raw access to the resolver's alias list

pub mod alias_store;
pub mod proxy;
pub mod service_source;

pub use alias_store::{AliasStore, AliasStoreFactory};
pub use proxy::{Activation, ProxyApi, ProxyLayer, ProxyLayerFactory, ProxyOutcome};
pub use service_source::ServiceSource;
