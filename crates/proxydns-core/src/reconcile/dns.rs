//! DNS alias reconciliation
//!
//! Strictly additive: aliases for domains that are no longer desired are
//! left in place. The diff is keyed on the full `domain,target` string.

use std::collections::BTreeSet;
use tracing::{debug, error, info, warn};

use crate::alias::{AliasRecord, parse_alias_list, render_alias_list};
use crate::model::{DesiredDomainSet, SyncContext};
use crate::traits::AliasStore;

/// Computed alias changes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasPlan {
    /// Existing records plus additions
    pub records: BTreeSet<AliasRecord>,
    /// Records not present before, in sorted order
    pub added: Vec<AliasRecord>,
}

impl AliasPlan {
    /// Union `existing` with one record per desired domain pointing at `target`
    pub fn compute(
        existing: &BTreeSet<AliasRecord>,
        desired: &DesiredDomainSet,
        target: &str,
    ) -> Self {
        let mut records = existing.clone();
        let mut added = Vec::new();

        for domain in desired.iter() {
            let record = AliasRecord::new(domain, target);
            if existing.contains(&record) {
                debug!("CNAME record already exists: {} -> {}", domain, target);
            } else if records.insert(record.clone()) {
                info!("Adding CNAME record: {} -> {}", domain, target);
                added.push(record);
            }
        }

        Self { records, added }
    }

    /// Whether any record is added
    pub fn has_changes(&self) -> bool {
        !self.added.is_empty()
    }

    /// The write payload for the full record set
    pub fn payload(&self) -> String {
        render_alias_list(&self.records)
    }
}

/// Result of one DNS reconciliation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DnsOutcome {
    /// No desired domains were handed over
    NothingToDo,
    /// Every desired alias already existed
    Unchanged,
    /// The alias list was rewritten
    Updated {
        /// Number of aliases added
        added: usize,
        /// Whether the resolver restart succeeded
        restarted: bool,
    },
    /// Dry-run: the write that would have been made
    DryRun {
        /// Number of aliases that would be added
        added: usize,
        /// Payload that would be written
        payload: String,
    },
    /// The current list could not be read; nothing was written
    ReadFailed(String),
    /// The write was rejected; nothing changed remotely
    WriteFailed(String),
}

/// Converges a resolver's alias list towards the desired domains
pub struct DnsReconciler {
    store: Box<dyn AliasStore>,
}

impl DnsReconciler {
    /// Create a reconciler over `store`
    pub fn new(store: Box<dyn AliasStore>) -> Self {
        Self { store }
    }

    /// Run one reconciliation
    ///
    /// Never returns an error: every failure is reported through the outcome
    /// so the cycle keeps going.
    pub async fn reconcile(&self, desired: &DesiredDomainSet, ctx: &SyncContext) -> DnsOutcome {
        if desired.is_empty() {
            info!("No domains to process");
            return DnsOutcome::NothingToDo;
        }

        info!("Processing {} domains for CNAME records", desired.len());

        let raw = match self.store.read_aliases().await {
            Ok(raw) => raw,
            Err(e) => {
                // Writing on top of an unknown list would drop every existing alias.
                error!(
                    "Failed to read CNAME records from {}: {}",
                    self.store.store_name(),
                    e
                );
                return DnsOutcome::ReadFailed(e.to_string());
            }
        };

        debug!("Raw alias list: '{}'", raw);
        let existing = parse_alias_list(&raw);
        debug!("Parsed {} existing alias record(s)", existing.len());

        let plan = AliasPlan::compute(&existing, desired, &ctx.target_host);
        if !plan.has_changes() {
            info!("No changes detected");
            return DnsOutcome::Unchanged;
        }

        let added = plan.added.len();
        let payload = plan.payload();

        if ctx.dry_run {
            info!("[DRY-RUN] Would execute: {}", self.store.describe_write(&payload));
            info!(
                "[DRY-RUN] Would update {} CNAME records and restart {}",
                added,
                self.store.store_name()
            );
            return DnsOutcome::DryRun { added, payload };
        }

        if let Err(e) = self.store.write_aliases(&payload).await {
            error!(
                "Failed to update CNAME records: {}. Command: {}",
                e,
                self.store.describe_write(&payload)
            );
            return DnsOutcome::WriteFailed(e.to_string());
        }

        info!("CNAME records updated successfully");
        info!("Updated {} CNAME records", added);

        info!("Restarting {} to apply CNAME changes...", self.store.store_name());
        let restarted = match self.store.restart().await {
            Ok(()) => {
                info!("{} restarted successfully", self.store.store_name());
                true
            }
            Err(e) => {
                warn!(
                    "Failed to restart {}: {}. A manual restart may be needed",
                    self.store.store_name(),
                    e
                );
                false
            }
        };

        DnsOutcome::Updated { added, restarted }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn records(items: &[&str]) -> BTreeSet<AliasRecord> {
        items.iter().filter_map(|s| AliasRecord::parse(s)).collect()
    }

    #[test]
    fn test_plan_from_empty() {
        let desired: DesiredDomainSet = ["y.suffix", "x.suffix"].into_iter().collect();
        let plan = AliasPlan::compute(&BTreeSet::new(), &desired, "T");

        assert_eq!(plan.added.len(), 2);
        assert_eq!(plan.payload(), r#"[ "x.suffix,T", "y.suffix,T" ]"#);
    }

    #[test]
    fn test_plan_is_set_difference() {
        let existing = records(&["a.lan,T", "old.lan,T", "b.lan,OTHER"]);
        let desired: DesiredDomainSet = ["a.lan", "b.lan", "c.lan"].into_iter().collect();
        let plan = AliasPlan::compute(&existing, &desired, "T");

        let added: Vec<&str> = plan.added.iter().map(AliasRecord::as_str).collect();
        assert_eq!(added, vec!["b.lan,T", "c.lan,T"]);
        // Nothing is removed, including the retargeted and stale entries
        assert!(plan.records.is_superset(&existing));
        assert_eq!(plan.records.len(), existing.len() + 2);
    }

    #[test]
    fn test_plan_is_idempotent() {
        let desired: DesiredDomainSet = ["a.lan", "b.lan"].into_iter().collect();
        let first = AliasPlan::compute(&records(&["z.lan,T"]), &desired, "T");
        let second = AliasPlan::compute(&first.records, &desired, "T");

        assert!(first.has_changes());
        assert!(!second.has_changes());
        assert_eq!(second.records, first.records);
    }
}
