// # Environment Service Source
//
// Reads enumerated service definitions:
//
// ```bash
// SERVICE_1_NAME=grafana
// SERVICE_1_IP=10.0.0.5
// SERVICE_1_PORT=3000
// SERVICE_2_NAME=...
// ```
//
// The scan starts at 1 and stops at the first index without a NAME. An index
// with a NAME but missing IP or PORT is skipped and the scan continues.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::model::{ServiceSpec, parse_port};
use crate::traits::ServiceSource;

type Lookup = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Service source over `SERVICE_<n>_{NAME,IP,PORT}` variables
#[derive(Clone)]
pub struct EnvServiceSource {
    lookup: Lookup,
}

impl EnvServiceSource {
    /// Read from the process environment
    pub fn from_env() -> Self {
        Self::with_lookup(|key| std::env::var(key).ok())
    }

    /// Read through a custom lookup (used by tests and embedders)
    pub fn with_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        Self {
            lookup: Arc::new(lookup),
        }
    }

    /// Scan the variables synchronously
    pub fn scan(&self) -> Vec<ServiceSpec> {
        let get = |key: String| {
            (self.lookup)(&key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let mut services = Vec::new();
        let mut index = 1usize;

        while let Some(name) = get(format!("SERVICE_{index}_NAME")) {
            let ip = get(format!("SERVICE_{index}_IP"));
            let port = get(format!("SERVICE_{index}_PORT"));

            match (ip, port) {
                (Some(ip), Some(port)) => match parse_port(&port) {
                    Some(port) => {
                        let spec = ServiceSpec::new(&name, ip, port);
                        match spec.validate() {
                            Ok(()) => {
                                info!(
                                    "Loaded service: {} -> {}:{}",
                                    spec.hostname, spec.backend_address, spec.backend_port
                                );
                                services.push(spec);
                            }
                            Err(e) => warn!("Skipping SERVICE_{} ({}): {}", index, name, e),
                        }
                    }
                    None => error!("Invalid port for service {}: {}", name, port),
                },
                _ => warn!("Incomplete service config for {}: missing IP or PORT", name),
            }

            index += 1;
        }

        services
    }
}

impl std::fmt::Debug for EnvServiceSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnvServiceSource").finish_non_exhaustive()
    }
}

#[async_trait]
impl ServiceSource for EnvServiceSource {
    async fn load(&self) -> Result<Vec<ServiceSpec>, crate::Error> {
        Ok(self.scan())
    }

    fn source_name(&self) -> &'static str {
        "env"
    }
}
