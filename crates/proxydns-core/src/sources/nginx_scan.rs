// # nginx Config Domain Source
//
// Collects domains from the `server_name` directives of every `*.conf` file
// in a directory the reverse proxy already maintains:
//
// ```nginx
// server_name grafana.lab.lan metrics.lab.lan;
// ```
//
// The proxy is read here, never written, so the cycle becomes alias-only:
// scanned domains go straight to DNS reconciliation. Domains are taken as
// full names; the domain suffix is not applied.
//
// - Missing directory: error log, empty result
// - Unreadable file: error log, remaining files still scanned
// - Files not ending in `.conf`: ignored

use async_trait::async_trait;
use regex::Regex;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};

use crate::config::ProxyConfig;
use crate::error::{Error, Result};
use crate::model::{DesiredDomainSet, ServiceSpec, SyncContext};
use crate::registry::BackendRegistry;
use crate::traits::{Activation, ProxyLayer, ProxyLayerFactory, ProxyOutcome};

const SERVER_NAME_PATTERN: &str = r"server_name\s+([^;]+);";

/// Domain source over a directory of nginx configs
#[derive(Debug, Clone)]
pub struct NginxConfigDomainSource {
    config_dir: PathBuf,
}

impl NginxConfigDomainSource {
    /// Scan `config_dir` on every cycle
    pub fn new(config_dir: impl Into<PathBuf>) -> Self {
        Self {
            config_dir: config_dir.into(),
        }
    }

    /// Directory being scanned
    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// Collect every `server_name` domain in the directory
    ///
    /// Only an invalid pattern is an error; filesystem trouble is logged.
    pub async fn scan(&self) -> Result<DesiredDomainSet> {
        let pattern = server_name_pattern()?;
        let mut domains = DesiredDomainSet::new();

        let mut entries = match tokio::fs::read_dir(&self.config_dir).await {
            Ok(entries) => entries,
            Err(e) => {
                error!(
                    "{} directory not readable ({}). Check your volume mount.",
                    self.config_dir.display(),
                    e
                );
                return Ok(domains);
            }
        };

        let mut files = Vec::new();
        loop {
            match entries.next_entry().await {
                Ok(Some(entry)) => {
                    let path = entry.path();
                    if path.extension().is_some_and(|ext| ext == "conf") {
                        files.push(path);
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    error!("Error listing {}: {}", self.config_dir.display(), e);
                    break;
                }
            }
        }
        files.sort();

        info!(
            "Found {} files in {}",
            files.len(),
            self.config_dir.display()
        );

        for path in &files {
            match tokio::fs::read_to_string(path).await {
                Ok(content) => {
                    for domain in server_names(&pattern, &content) {
                        domains.insert(domain);
                    }
                }
                Err(e) => error!("Error reading {}: {}", path.display(), e),
            }
        }

        debug!("Scanned domains: {}", domains);
        Ok(domains)
    }
}

fn server_name_pattern() -> Result<Regex> {
    Regex::new(SERVER_NAME_PATTERN)
        .map_err(|e| Error::config(format!("Invalid server_name pattern: {}", e)))
}

/// Every name listed by `server_name` directives in `content`
pub fn server_names(pattern: &Regex, content: &str) -> Vec<String> {
    pattern
        .captures_iter(content)
        .filter_map(|caps| caps.get(1))
        .flat_map(|names| names.as_str().split_whitespace())
        .map(str::to_string)
        .collect()
}

#[async_trait]
impl ProxyLayer for NginxConfigDomainSource {
    async fn converge(
        &self,
        _services: &[ServiceSpec],
        _ctx: &SyncContext,
    ) -> Result<ProxyOutcome> {
        let domains = self.scan().await?;
        info!("Total domains found: {}", domains.len());
        Ok(ProxyOutcome::new(domains, Activation::NotRequired))
    }

    fn uses_services(&self) -> bool {
        false
    }

    fn layer_name(&self) -> &'static str {
        "nginx-scan"
    }
}

/// Factory for the read-only nginx scan layer
pub struct NginxScanFactory;

impl ProxyLayerFactory for NginxScanFactory {
    fn create(&self, config: &ProxyConfig) -> Result<Box<dyn ProxyLayer>> {
        match config {
            ProxyConfig::NginxScan { config_dir } => {
                Ok(Box::new(NginxConfigDomainSource::new(config_dir.clone())))
            }
            _ => Err(Error::config("Invalid config for nginx scan proxy layer")),
        }
    }
}

/// Register the nginx scan layer with a registry
pub fn register(registry: &BackendRegistry) {
    registry.register_proxy_layer("nginx-scan", Box::new(NginxScanFactory));
}
