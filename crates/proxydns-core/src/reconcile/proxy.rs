//! Proxy-host reconciliation against a remote proxy manager
//!
//! The diff is keyed on domain name only:
//!
//! 1. List all remote hosts and flatten them into `domain -> host id`
//! 2. Delete every host owning a domain that is no longer desired
//! 3. Create one single-domain host for every desired domain not present
//!
//! There is no update path. A service whose backend changed keeps its old
//! host until the host is removed by hand.

use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info, warn};

use crate::model::{DesiredDomainSet, ServiceSpec, SyncContext};
use crate::traits::{Activation, ProxyApi, ProxyLayer, ProxyOutcome};

/// Planned proxy changes for one cycle
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProxyPlan {
    /// Host ids to delete, each once, with the stale domain that triggered it
    pub deletes: Vec<(u64, String)>,
    /// Services needing a new host, one per domain
    pub creates: Vec<(String, ServiceSpec)>,
}

impl ProxyPlan {
    /// Compute the plan from the observed `domain -> id` map
    pub fn compute(
        existing: &BTreeMap<String, u64>,
        services: &[ServiceSpec],
        ctx: &SyncContext,
    ) -> Self {
        let expected = DesiredDomainSet::from_services(services, &ctx.domain_suffix);

        let mut seen_ids = BTreeSet::new();
        let deletes = existing
            .iter()
            .filter(|(domain, _)| !expected.contains(domain))
            .filter(|(_, id)| seen_ids.insert(**id))
            .map(|(domain, id)| (*id, domain.clone()))
            .collect();

        let mut seen_domains = BTreeSet::new();
        let creates = services
            .iter()
            .map(|service| (ctx.domain_for(service), service))
            .filter(|(domain, _)| !existing.contains_key(domain))
            .filter(|(domain, _)| seen_domains.insert(domain.clone()))
            .map(|(domain, service)| (domain, service.clone()))
            .collect();

        Self { deletes, creates }
    }

    /// Whether the plan changes anything
    pub fn is_empty(&self) -> bool {
        self.deletes.is_empty() && self.creates.is_empty()
    }
}

/// `ProxyLayer` driving any `ProxyApi`
///
/// Changes apply live on the proxy manager, so there is no activation step.
pub struct ApiProxyReconciler<A> {
    api: A,
}

impl<A: ProxyApi> ApiProxyReconciler<A> {
    /// Wrap a proxy API
    pub fn new(api: A) -> Self {
        Self { api }
    }

    /// Access the wrapped API
    pub fn api(&self) -> &A {
        &self.api
    }

    async fn observe(&self) -> crate::Result<BTreeMap<String, u64>> {
        let hosts = self.api.list_hosts().await?;
        info!("Found {} existing proxy hosts", hosts.len());

        let mut existing = BTreeMap::new();
        for host in hosts {
            for domain in host.domain_names {
                existing.insert(domain, host.id);
            }
        }
        Ok(existing)
    }
}

#[async_trait]
impl<A: ProxyApi> ProxyLayer for ApiProxyReconciler<A> {
    async fn converge(
        &self,
        services: &[ServiceSpec],
        ctx: &SyncContext,
    ) -> crate::Result<ProxyOutcome> {
        info!("Synchronizing proxy hosts with service definitions...");
        let expected = DesiredDomainSet::from_services(services, &ctx.domain_suffix);
        let mut outcome = ProxyOutcome::new(expected, Activation::NotRequired);

        let existing = match self.observe().await {
            Ok(existing) => existing,
            Err(e) => {
                // An empty view here would recreate every host; skip changes instead.
                outcome.record_failure(
                    &format!("Failed to fetch existing proxy hosts from {}", self.api.api_name()),
                    &e,
                );
                return Ok(outcome);
            }
        };

        let plan = ProxyPlan::compute(&existing, services, ctx);
        if plan.is_empty() {
            debug!("Proxy hosts already match service definitions");
        }

        for (id, domain) in &plan.deletes {
            info!("Removing unused proxy host: {} (id {})", domain, id);
            if ctx.dry_run {
                info!("[DRY-RUN] Would delete proxy host ID: {}", id);
                outcome.deleted += 1;
                continue;
            }
            match self.api.delete_host(*id).await {
                Ok(()) => {
                    info!("Deleted proxy host ID: {}", id);
                    outcome.deleted += 1;
                }
                Err(e) => {
                    outcome.record_failure(&format!("Failed to delete proxy host ID {}", id), &e);
                }
            }
        }

        for (domain, service) in &plan.creates {
            info!("Creating new proxy host: {}", domain);
            if ctx.dry_run {
                info!(
                    "[DRY-RUN] Would create proxy host: {} -> {}:{}",
                    domain, service.backend_address, service.backend_port
                );
                outcome.created += 1;
                continue;
            }
            match self
                .api
                .create_host(domain, &service.backend_address, service.backend_port)
                .await
            {
                Ok(host) => {
                    info!(
                        "Created proxy host: {} -> {}:{} (id {})",
                        domain, service.backend_address, service.backend_port, host.id
                    );
                    outcome.created += 1;
                }
                Err(e) => {
                    outcome
                        .record_failure(&format!("Failed to create proxy host for {}", domain), &e);
                }
            }
        }

        if outcome.failures > 0 {
            warn!(
                "Proxy host synchronization finished with {} failure(s), {} retryable",
                outcome.failures, outcome.retryable
            );
        }
        info!(
            "Proxy host synchronization complete. Configured {} domains",
            outcome.domains.len()
        );

        Ok(outcome)
    }

    fn layer_name(&self) -> &'static str {
        self.api.api_name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> SyncContext {
        SyncContext::new("lab.lan", "npm.lab.lan")
    }

    fn existing(pairs: &[(&str, u64)]) -> BTreeMap<String, u64> {
        pairs.iter().map(|(d, id)| (d.to_string(), *id)).collect()
    }

    #[test]
    fn test_plan_deletes_stale_and_keeps_present() {
        let services = vec![ServiceSpec::new("b", "10.0.0.2", 80)];
        let plan = ProxyPlan::compute(
            &existing(&[("a.lab.lan", 1), ("b.lab.lan", 2)]),
            &services,
            &ctx(),
        );

        assert_eq!(plan.deletes, vec![(1, "a.lab.lan".to_string())]);
        assert!(plan.creates.is_empty());
    }

    #[test]
    fn test_plan_creates_missing() {
        let services = vec![
            ServiceSpec::new("a", "10.0.0.1", 80),
            ServiceSpec::new("c", "10.0.0.3", 8080),
        ];
        let plan = ProxyPlan::compute(&existing(&[("a.lab.lan", 1)]), &services, &ctx());

        assert!(plan.deletes.is_empty());
        assert_eq!(plan.creates.len(), 1);
        assert_eq!(plan.creates[0].0, "c.lab.lan");
        assert_eq!(plan.creates[0].1.backend_port, 8080);
    }

    #[test]
    fn test_plan_deletes_shared_host_once() {
        let plan = ProxyPlan::compute(
            &existing(&[("x.lab.lan", 5), ("y.lab.lan", 5), ("z.lab.lan", 6)]),
            &[],
            &ctx(),
        );
        let ids: Vec<u64> = plan.deletes.iter().map(|(id, _)| *id).collect();
        assert_eq!(ids, vec![5, 6]);
    }

    #[test]
    fn test_plan_ignores_backend_changes() {
        let services = vec![ServiceSpec::new("a", "10.9.9.9", 9999)];
        let plan = ProxyPlan::compute(&existing(&[("a.lab.lan", 1)]), &services, &ctx());
        assert!(plan.is_empty());
    }

    #[test]
    fn test_plan_creates_duplicate_domain_once() {
        let services = vec![
            ServiceSpec::new("a", "10.0.0.1", 80),
            ServiceSpec::new("a", "10.0.0.2", 81),
        ];
        let plan = ProxyPlan::compute(&BTreeMap::new(), &services, &ctx());
        assert_eq!(plan.creates.len(), 1);
        assert_eq!(plan.creates[0].1.backend_address, "10.0.0.1");
    }
}
