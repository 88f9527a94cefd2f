//! Reconciliation logic
//!
//! - [`proxy`]: proxy-host diff/apply against a `ProxyApi`
//! - [`dns`]: additive alias-list diff/apply against an `AliasStore`

pub mod dns;
pub mod proxy;

pub use dns::{AliasPlan, DnsOutcome, DnsReconciler};
pub use proxy::{ApiProxyReconciler, ProxyPlan};
