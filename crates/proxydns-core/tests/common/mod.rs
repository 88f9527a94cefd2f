//! Test doubles and common utilities for reconciliation contract tests
//!
//! These doubles record every call so tests can assert on exactly which
//! remote operations a cycle performed.

#![allow(dead_code)]

use proxydns_core::config::{EngineConfig, ProxyConfig, ResolverConfig, SourceConfig, SyncConfig};
use proxydns_core::error::{Error, Result};
use proxydns_core::traits::{Activation, AliasStore, ProxyApi, ProxyLayer, ProxyOutcome, ServiceSource};
use proxydns_core::{DesiredDomainSet, ProxyHost, ServiceSpec, SyncContext};
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// A service source returning a fixed list (or a fixed error)
pub struct StaticServiceSource {
    services: Vec<ServiceSpec>,
    fail: bool,
    load_count: Arc<AtomicUsize>,
}

impl StaticServiceSource {
    pub fn new(services: Vec<ServiceSpec>) -> Self {
        Self {
            services,
            fail: false,
            load_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn failing() -> Self {
        Self {
            services: Vec::new(),
            fail: true,
            load_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn load_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.load_count)
    }
}

#[async_trait::async_trait]
impl ServiceSource for StaticServiceSource {
    async fn load(&self) -> Result<Vec<ServiceSpec>> {
        self.load_count.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(Error::manifest("manifest unreadable"));
        }
        Ok(self.services.clone())
    }

    fn source_name(&self) -> &'static str {
        "static"
    }
}

/// Shared, inspectable state of a `MockProxyApi`
#[derive(Default)]
pub struct ProxyApiState {
    pub hosts: Mutex<Vec<ProxyHost>>,
    pub created: Mutex<Vec<(String, String, u16)>>,
    pub deleted: Mutex<Vec<u64>>,
    pub list_calls: AtomicUsize,
    pub fail_list: Mutex<bool>,
    pub fail_create_for: Mutex<HashSet<String>>,
    pub fail_delete_for: Mutex<HashSet<u64>>,
    next_id: AtomicU64,
}

/// In-memory proxy manager
#[derive(Clone)]
pub struct MockProxyApi {
    pub state: Arc<ProxyApiState>,
}

impl MockProxyApi {
    pub fn new(hosts: Vec<ProxyHost>) -> Self {
        let state = ProxyApiState {
            next_id: AtomicU64::new(1000),
            ..Default::default()
        };
        *state.hosts.lock().unwrap() = hosts;
        Self {
            state: Arc::new(state),
        }
    }

    pub fn created_domains(&self) -> Vec<String> {
        self.state
            .created
            .lock()
            .unwrap()
            .iter()
            .map(|(d, _, _)| d.clone())
            .collect()
    }

    pub fn deleted_ids(&self) -> Vec<u64> {
        self.state.deleted.lock().unwrap().clone()
    }

    pub fn remote_domains(&self) -> Vec<String> {
        let mut domains: Vec<String> = self
            .state
            .hosts
            .lock()
            .unwrap()
            .iter()
            .flat_map(|h| h.domain_names.clone())
            .collect();
        domains.sort();
        domains
    }
}

pub fn host(id: u64, domains: &[&str]) -> ProxyHost {
    ProxyHost {
        id,
        domain_names: domains.iter().map(|d| d.to_string()).collect(),
        forward_host: "10.0.0.1".to_string(),
        forward_port: 80,
    }
}

#[async_trait::async_trait]
impl ProxyApi for MockProxyApi {
    async fn list_hosts(&self) -> Result<Vec<ProxyHost>> {
        self.state.list_calls.fetch_add(1, Ordering::SeqCst);
        if *self.state.fail_list.lock().unwrap() {
            return Err(Error::Timeout(std::time::Duration::from_secs(30)));
        }
        Ok(self.state.hosts.lock().unwrap().clone())
    }

    async fn create_host(&self, domain: &str, forward_host: &str, forward_port: u16) -> Result<ProxyHost> {
        if self.state.fail_create_for.lock().unwrap().contains(domain) {
            return Err(Error::status(400, "domain already in use"));
        }
        let id = self.state.next_id.fetch_add(1, Ordering::SeqCst);
        let created = ProxyHost {
            id,
            domain_names: vec![domain.to_string()],
            forward_host: forward_host.to_string(),
            forward_port,
        };
        self.state
            .created
            .lock()
            .unwrap()
            .push((domain.to_string(), forward_host.to_string(), forward_port));
        self.state.hosts.lock().unwrap().push(created.clone());
        Ok(created)
    }

    async fn delete_host(&self, id: u64) -> Result<()> {
        if self.state.fail_delete_for.lock().unwrap().contains(&id) {
            return Err(Error::status(500, "internal error"));
        }
        self.state.deleted.lock().unwrap().push(id);
        self.state.hosts.lock().unwrap().retain(|h| h.id != id);
        Ok(())
    }

    fn api_name(&self) -> &'static str {
        "mock-api"
    }
}

/// Shared, inspectable state of a `MockAliasStore`
#[derive(Default)]
pub struct AliasStoreState {
    /// What the resolver prints on read
    pub current: Mutex<String>,
    pub writes: Mutex<Vec<String>>,
    pub read_calls: AtomicUsize,
    pub restart_calls: AtomicUsize,
    pub fail_read: Mutex<bool>,
    pub fail_write: Mutex<bool>,
    pub fail_restart: Mutex<bool>,
}

/// In-memory resolver that echoes writes back without quotes, like the real one
#[derive(Clone)]
pub struct MockAliasStore {
    pub state: Arc<AliasStoreState>,
}

impl MockAliasStore {
    pub fn new(current: &str) -> Self {
        let state = AliasStoreState::default();
        *state.current.lock().unwrap() = current.to_string();
        Self {
            state: Arc::new(state),
        }
    }

    pub fn writes(&self) -> Vec<String> {
        self.state.writes.lock().unwrap().clone()
    }

    pub fn read_calls(&self) -> usize {
        self.state.read_calls.load(Ordering::SeqCst)
    }

    pub fn restart_calls(&self) -> usize {
        self.state.restart_calls.load(Ordering::SeqCst)
    }

    pub fn set_fail_read(&self, fail: bool) {
        *self.state.fail_read.lock().unwrap() = fail;
    }

    pub fn set_fail_write(&self, fail: bool) {
        *self.state.fail_write.lock().unwrap() = fail;
    }

    pub fn set_fail_restart(&self, fail: bool) {
        *self.state.fail_restart.lock().unwrap() = fail;
    }
}

#[async_trait::async_trait]
impl AliasStore for MockAliasStore {
    async fn read_aliases(&self) -> Result<String> {
        self.state.read_calls.fetch_add(1, Ordering::SeqCst);
        if *self.state.fail_read.lock().unwrap() {
            return Err(Error::CommandFailed {
                status: Some(255),
                stderr: "ssh: connect to host refused".to_string(),
            });
        }
        Ok(self.state.current.lock().unwrap().clone())
    }

    async fn write_aliases(&self, payload: &str) -> Result<()> {
        if *self.state.fail_write.lock().unwrap() {
            return Err(Error::Timeout(std::time::Duration::from_secs(30)));
        }
        self.state.writes.lock().unwrap().push(payload.to_string());
        *self.state.current.lock().unwrap() = payload.replace('"', "");
        Ok(())
    }

    async fn restart(&self) -> Result<()> {
        self.state.restart_calls.fetch_add(1, Ordering::SeqCst);
        if *self.state.fail_restart.lock().unwrap() {
            return Err(Error::CommandFailed {
                status: Some(1),
                stderr: "Failed to restart".to_string(),
            });
        }
        Ok(())
    }

    fn store_name(&self) -> &'static str {
        "mock-resolver"
    }
}

/// A proxy layer with a fixed activation result (models the file variant)
pub struct FixedActivationLayer {
    pub activation: Activation,
    pub converge_calls: Arc<AtomicUsize>,
}

impl FixedActivationLayer {
    pub fn new(activation: Activation) -> Self {
        Self {
            activation,
            converge_calls: Arc::new(AtomicUsize::new(0)),
        }
    }
}

#[async_trait::async_trait]
impl ProxyLayer for FixedActivationLayer {
    async fn converge(&self, services: &[ServiceSpec], ctx: &SyncContext) -> Result<ProxyOutcome> {
        self.converge_calls.fetch_add(1, Ordering::SeqCst);
        let domains = DesiredDomainSet::from_services(services, &ctx.domain_suffix);
        Ok(ProxyOutcome::new(domains, self.activation))
    }

    fn layer_name(&self) -> &'static str {
        "fixed"
    }
}

/// A proxy layer that fails outright
pub struct BrokenLayer;

#[async_trait::async_trait]
impl ProxyLayer for BrokenLayer {
    async fn converge(&self, _services: &[ServiceSpec], _ctx: &SyncContext) -> Result<ProxyOutcome> {
        Err(Error::Io(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "config dir not writable",
        )))
    }

    fn layer_name(&self) -> &'static str {
        "broken"
    }
}

pub const SUFFIX: &str = "lab.lan";
pub const TARGET: &str = "npm.lab.lan";

pub fn ctx() -> SyncContext {
    SyncContext::new(SUFFIX, TARGET)
}

pub fn services(names: &[&str]) -> Vec<ServiceSpec> {
    names
        .iter()
        .enumerate()
        .map(|(i, name)| ServiceSpec::new(*name, format!("10.0.0.{}", i + 10), 8080))
        .collect()
}

/// Helper to create a minimal SyncConfig for testing
pub fn minimal_config() -> SyncConfig {
    SyncConfig {
        domain_suffix: SUFFIX.to_string(),
        target_host: TARGET.to_string(),
        dry_run: false,
        source: SourceConfig::Env,
        proxy: ProxyConfig::NpmApi {
            host: "npm.test:81".to_string(),
            email: "admin@example.test".to_string(),
            password: "secret".to_string(),
            certificate_id: 1,
        },
        resolver: ResolverConfig::Pihole {
            host: "pihole.test".to_string(),
            ssh_key_path: "/tmp/id_rsa".into(),
            known_hosts_path: "/tmp/known_hosts".into(),
        },
        engine: EngineConfig {
            interval_secs: 1,
            retry_delay_secs: 1,
            event_channel_capacity: 100,
        },
    }
}
