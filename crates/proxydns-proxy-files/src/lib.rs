// # File-generating proxy layer
//
// For reverse proxies configured from files rather than an API. Each cycle
// renders one nginx server block per service and reloads nginx in its
// container with `docker exec <container> nginx -s reload`.
//
// The reload is the activation step: on failure the engine skips DNS for
// that cycle, since the running proxy no longer matches the files on disk.

mod layer;
mod template;

pub use layer::FileProxyLayer;
pub use template::{ConfigTemplate, MANAGED_MARKER};

use proxydns_core::config::ProxyConfig;
use proxydns_core::traits::{ProxyLayer, ProxyLayerFactory};
use proxydns_core::{BackendRegistry, Error, Result, SystemCommandRunner};

/// Factory for creating file-generating proxy layers
pub struct NginxFilesFactory;

impl ProxyLayerFactory for NginxFilesFactory {
    fn create(&self, config: &ProxyConfig) -> Result<Box<dyn ProxyLayer>> {
        match config {
            ProxyConfig::NginxFiles {
                config_dir,
                container,
                template_path,
            } => {
                let mut layer =
                    FileProxyLayer::new(config_dir.clone(), container.clone(), SystemCommandRunner::new());
                if let Some(path) = template_path {
                    layer = layer.with_template_path(path.clone());
                }
                Ok(Box::new(layer))
            }
            _ => Err(Error::config("Invalid config for nginx file proxy layer")),
        }
    }
}

/// Register the file-generating proxy layer with a registry
pub fn register(registry: &BackendRegistry) {
    registry.register_proxy_layer("nginx-files", Box::new(NginxFilesFactory));
}
