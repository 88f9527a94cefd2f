//! File-generating proxy layer
//!
//! Each cycle renders one `<domain>.conf` per service into the config
//! directory, prunes managed files for domains no longer desired, and then
//! reloads nginx inside its container. The reload result is the layer's
//! activation: a failed reload means the running proxy does not match the
//! files, and the engine skips DNS for that cycle.

use async_trait::async_trait;
use proxydns_core::traits::{Activation, ProxyLayer, ProxyOutcome};
use proxydns_core::{CommandRunner, DesiredDomainSet, Result, ServiceSpec, SyncContext};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

use crate::template::{ConfigTemplate, MANAGED_MARKER};

const CONFIG_EXTENSION: &str = "conf";

/// Proxy layer writing nginx config files and reloading the container
pub struct FileProxyLayer<R> {
    /// Output directory
    config_dir: PathBuf,

    /// Container running nginx
    container: String,

    /// Replacement template file; `None` uses the built-in template
    template_path: Option<PathBuf>,

    /// Runs the reload command
    runner: R,
}

impl<R: CommandRunner> FileProxyLayer<R> {
    /// Create a layer writing into `config_dir` and reloading `container`
    pub fn new(config_dir: impl Into<PathBuf>, container: impl Into<String>, runner: R) -> Self {
        Self {
            config_dir: config_dir.into(),
            container: container.into(),
            template_path: None,
            runner,
        }
    }

    /// Use a template file instead of the built-in one
    pub fn with_template_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.template_path = Some(path.into());
        self
    }

    /// Path of the generated file for `domain`
    pub fn config_path(&self, domain: &str) -> PathBuf {
        self.config_dir
            .join(format!("{}.{}", domain, CONFIG_EXTENSION))
    }

    /// Arguments of `docker exec <container> nginx -s reload`
    pub fn reload_args(&self) -> Vec<String> {
        vec![
            "exec".to_string(),
            self.container.clone(),
            "nginx".to_string(),
            "-s".to_string(),
            "reload".to_string(),
        ]
    }

    async fn template(&self) -> Result<ConfigTemplate> {
        match &self.template_path {
            Some(path) => ConfigTemplate::load(path).await,
            None => Ok(ConfigTemplate::builtin()),
        }
    }

    /// Managed files in the config directory whose domain is not desired
    async fn stale_files(&self, desired: &DesiredDomainSet) -> Result<Vec<PathBuf>> {
        let mut stale = Vec::new();
        let mut entries = match tokio::fs::read_dir(&self.config_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(stale),
            Err(e) => return Err(e.into()),
        };

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(CONFIG_EXTENSION) {
                continue;
            }
            let Some(domain) = path.file_stem().and_then(|stem| stem.to_str()) else {
                continue;
            };
            if desired.contains(domain) {
                continue;
            }
            if is_managed(&path).await {
                stale.push(path);
            } else {
                debug!("Leaving unmanaged config {}", path.display());
            }
        }

        stale.sort();
        Ok(stale)
    }

    async fn reload(&self, ctx: &SyncContext) -> Activation {
        if ctx.dry_run {
            info!(
                "[DRY-RUN] Would reload nginx config in container: {}",
                self.container
            );
            return Activation::Succeeded;
        }

        info!("Reloading nginx configuration in container: {}", self.container);
        match self.runner.run("docker", &self.reload_args()).await {
            Ok(_) => {
                info!("Nginx configuration reloaded successfully");
                Activation::Succeeded
            }
            Err(e) => {
                error!("Failed to reload nginx config: {}", e);
                Activation::Failed
            }
        }
    }
}

async fn is_managed(path: &Path) -> bool {
    match tokio::fs::read_to_string(path).await {
        Ok(contents) => contents.lines().next() == Some(MANAGED_MARKER),
        Err(_) => false,
    }
}

#[async_trait]
impl<R: CommandRunner> ProxyLayer for FileProxyLayer<R> {
    async fn converge(&self, services: &[ServiceSpec], ctx: &SyncContext) -> Result<ProxyOutcome> {
        info!("Generating nginx configurations from services...");

        let template = self.template().await?;
        let domains = DesiredDomainSet::from_services(services, &ctx.domain_suffix);
        let mut outcome = ProxyOutcome::new(domains, Activation::NotRequired);

        if !ctx.dry_run {
            tokio::fs::create_dir_all(&self.config_dir).await?;
        }

        for service in services {
            let domain = ctx.domain_for(service);
            let path = self.config_path(&domain);
            let contents = template.render(service, &domain);

            if ctx.dry_run {
                info!("[DRY-RUN] Would write {}", path.display());
                outcome.created += 1;
                continue;
            }

            match tokio::fs::write(&path, contents).await {
                Ok(()) => {
                    info!(
                        "Generated config for {} -> {}:{}",
                        domain, service.backend_address, service.backend_port
                    );
                    outcome.created += 1;
                }
                Err(e) => {
                    error!("Failed to write config {}: {}", path.display(), e);
                    outcome.failures += 1;
                }
            }
        }

        match self.stale_files(&outcome.domains).await {
            Ok(stale) => {
                for path in stale {
                    if ctx.dry_run {
                        info!("[DRY-RUN] Would remove {}", path.display());
                        outcome.deleted += 1;
                        continue;
                    }
                    match tokio::fs::remove_file(&path).await {
                        Ok(()) => {
                            info!("Removed unused config {}", path.display());
                            outcome.deleted += 1;
                        }
                        Err(e) => {
                            error!("Failed to remove config {}: {}", path.display(), e);
                            outcome.failures += 1;
                        }
                    }
                }
            }
            Err(e) => {
                warn!("Could not scan {} for stale configs: {}", self.config_dir.display(), e);
                outcome.failures += 1;
            }
        }

        outcome.activation = self.reload(ctx).await;
        Ok(outcome)
    }

    fn layer_name(&self) -> &'static str {
        "nginx-files"
    }
}
