//! Data model shared by every stage of a sync cycle

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// One desired routing entry
///
/// `hostname` is a single DNS label; the full domain is formed by joining
/// it with the configured suffix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceSpec {
    /// Short host label (e.g. "grafana")
    pub hostname: String,
    /// Backend IP address or hostname
    pub backend_address: String,
    /// Backend port
    pub backend_port: u16,
    /// Optional free-form description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ServiceSpec {
    /// Create a new service spec
    pub fn new(
        hostname: impl Into<String>,
        backend_address: impl Into<String>,
        backend_port: u16,
    ) -> Self {
        Self {
            hostname: hostname.into(),
            backend_address: backend_address.into(),
            backend_port,
            description: None,
        }
    }

    /// Attach a description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Full domain for this service under `suffix`
    pub fn domain(&self, suffix: &str) -> String {
        format!("{}.{}", self.hostname, suffix)
    }

    /// Validate hostname, backend and port
    pub fn validate(&self) -> crate::Result<()> {
        validate_label(&self.hostname)?;

        if self.backend_address.trim().is_empty() {
            return Err(crate::Error::invalid_input(format!(
                "Service '{}' has an empty backend address",
                self.hostname
            )));
        }

        if self.backend_port == 0 {
            return Err(crate::Error::invalid_input(format!(
                "Service '{}' has port 0 (valid: 1-65535)",
                self.hostname
            )));
        }

        Ok(())
    }
}

/// Parse a port from its textual form, accepting 1-65535 only
pub fn parse_port(raw: &str) -> Option<u16> {
    raw.trim().parse::<u16>().ok().filter(|port| *port != 0)
}

/// Validate that a hostname is a single DNS label
///
/// Labels are 1-63 characters of ASCII alphanumerics and hyphens and may
/// not start or end with a hyphen.
pub fn validate_label(label: &str) -> crate::Result<()> {
    if label.is_empty() {
        return Err(crate::Error::invalid_input("Hostname cannot be empty"));
    }

    if label.len() > 63 {
        return Err(crate::Error::invalid_input(format!(
            "Hostname too long: {} chars (max 63). Got: '{}'",
            label.len(),
            label
        )));
    }

    if !label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        return Err(crate::Error::invalid_input(format!(
            "Hostname contains invalid characters: '{}'. Valid: alphanumeric and hyphen only.",
            label
        )));
    }

    if label.starts_with('-') || label.ends_with('-') {
        return Err(crate::Error::invalid_input(format!(
            "Hostname cannot start or end with hyphen: '{}'",
            label
        )));
    }

    Ok(())
}

/// Remote reverse-proxy route record as observed on the proxy manager
///
/// Only the fields the reconciler reads are modelled; the rest of the
/// remote record is ignored on deserialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyHost {
    /// Identifier assigned by the proxy manager
    pub id: u64,
    /// Full domains routed by this host
    #[serde(default)]
    pub domain_names: Vec<String>,
    /// Backend address
    #[serde(default)]
    pub forward_host: String,
    /// Backend port
    #[serde(default)]
    pub forward_port: u16,
}

/// The set of full domains desired in the current cycle
///
/// Iteration order is lexicographic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DesiredDomainSet(BTreeSet<String>);

impl DesiredDomainSet {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Derive the set from services under `suffix`
    pub fn from_services(services: &[ServiceSpec], suffix: &str) -> Self {
        services.iter().map(|s| s.domain(suffix)).collect()
    }

    /// Insert a domain, returning whether it was new
    pub fn insert(&mut self, domain: impl Into<String>) -> bool {
        self.0.insert(domain.into())
    }

    /// Whether `domain` is desired
    pub fn contains(&self, domain: &str) -> bool {
        self.0.contains(domain)
    }

    /// Number of domains
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the set is empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate domains in lexicographic order
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl FromIterator<String> for DesiredDomainSet {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> FromIterator<&'a str> for DesiredDomainSet {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        Self(iter.into_iter().map(str::to_string).collect())
    }
}

impl fmt::Display for DesiredDomainSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined: Vec<&str> = self.iter().collect();
        write!(f, "{{{}}}", joined.join(", "))
    }
}

/// Per-cycle context passed into every reconciliation call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncContext {
    /// Suffix joined to each hostname (e.g. "lab.example.com")
    pub domain_suffix: String,
    /// Host every alias points at
    pub target_host: String,
    /// Log mutations instead of performing them
    pub dry_run: bool,
}

impl SyncContext {
    /// Create a live (non dry-run) context
    pub fn new(domain_suffix: impl Into<String>, target_host: impl Into<String>) -> Self {
        Self {
            domain_suffix: domain_suffix.into(),
            target_host: target_host.into(),
            dry_run: false,
        }
    }

    /// Enable or disable dry-run
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Full domain for a service
    pub fn domain_for(&self, service: &ServiceSpec) -> String {
        service.domain(&self.domain_suffix)
    }
}
