//! Configuration types for the proxydns system
//!
//! This module defines all configuration structures used throughout the crate.
//! The daemon fills them from environment variables; embedders may build
//! them directly or deserialize them.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Main sync configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Suffix joined to every service hostname
    pub domain_suffix: String,

    /// Host every CNAME alias points at
    pub target_host: String,

    /// Log mutations instead of performing them
    #[serde(default)]
    pub dry_run: bool,

    /// Where desired services come from
    #[serde(default)]
    pub source: SourceConfig,

    /// Reverse proxy backend
    pub proxy: ProxyConfig,

    /// DNS resolver backend
    pub resolver: ResolverConfig,

    /// Loop timing
    #[serde(default)]
    pub engine: EngineConfig,
}

impl SyncConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        // Scanned domains are already complete; no suffix gets joined
        let needs_suffix = !matches!(self.proxy, ProxyConfig::NginxScan { .. });
        if needs_suffix && self.domain_suffix.trim().is_empty() {
            return Err(crate::Error::config("Domain suffix cannot be empty"));
        }

        if self.domain_suffix.starts_with('.') || self.domain_suffix.ends_with('.') {
            return Err(crate::Error::config(format!(
                "Domain suffix must not start or end with a dot: '{}'",
                self.domain_suffix
            )));
        }

        if self.target_host.trim().is_empty() {
            return Err(crate::Error::config("Alias target host cannot be empty"));
        }

        if self.target_host.contains(',') || self.target_host.contains(char::is_whitespace) {
            return Err(crate::Error::config(format!(
                "Alias target host contains a comma or whitespace: '{}'",
                self.target_host
            )));
        }

        self.source.validate()?;
        self.proxy.validate()?;
        self.resolver.validate()?;
        self.engine.validate()?;

        Ok(())
    }

    /// Build the per-cycle context from this configuration
    pub fn context(&self) -> crate::SyncContext {
        crate::SyncContext::new(&self.domain_suffix, &self.target_host).with_dry_run(self.dry_run)
    }
}

/// Desired-state source configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum SourceConfig {
    /// Enumerated `SERVICE_<n>_{NAME,IP,PORT}` environment variables
    #[default]
    Env,

    /// JSON manifest with a `services` list
    Manifest {
        /// Path to the manifest file
        path: PathBuf,
    },
}

impl SourceConfig {
    /// Validate the source configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            SourceConfig::Env => Ok(()),
            SourceConfig::Manifest { path } => {
                if path.as_os_str().is_empty() {
                    return Err(crate::Error::config("Manifest path cannot be empty"));
                }
                Ok(())
            }
        }
    }

    /// Build the configured service source
    pub fn build(&self) -> Box<dyn crate::ServiceSource> {
        match self {
            SourceConfig::Env => Box::new(crate::sources::EnvServiceSource::from_env()),
            SourceConfig::Manifest { path } => {
                Box::new(crate::sources::ManifestServiceSource::new(path.clone()))
            }
        }
    }
}

/// Reverse proxy configuration
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ProxyConfig {
    /// Proxy manager driven through its HTTP API
    NpmApi {
        /// Host (and optional port) of the proxy manager, without scheme
        host: String,
        /// Login identity
        email: String,
        /// Login secret
        password: String,
        /// Certificate attached to created hosts
        #[serde(default = "default_certificate_id")]
        certificate_id: u64,
    },

    /// Config files generated into a directory, then a container reload
    NginxFiles {
        /// Directory the generated `.conf` files are written to
        config_dir: PathBuf,
        /// Container running nginx
        container: String,
        /// Optional template file replacing the built-in template
        #[serde(default)]
        template_path: Option<PathBuf>,
    },

    /// Existing nginx configs read for their `server_name` domains only
    NginxScan {
        /// Directory holding the proxy's `.conf` files
        config_dir: PathBuf,
    },
}

impl ProxyConfig {
    /// Validate the proxy configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            ProxyConfig::NpmApi {
                host,
                email,
                password,
                ..
            } => {
                if host.is_empty() {
                    return Err(crate::Error::config("Proxy manager host cannot be empty"));
                }
                if host.contains("://") {
                    return Err(crate::Error::config(format!(
                        "Proxy manager host must not include a scheme: '{}'",
                        host
                    )));
                }
                if email.is_empty() || password.is_empty() {
                    return Err(crate::Error::config(
                        "Proxy manager email and password are required",
                    ));
                }
                Ok(())
            }
            ProxyConfig::NginxFiles {
                config_dir,
                container,
                ..
            } => {
                if config_dir.as_os_str().is_empty() {
                    return Err(crate::Error::config("Proxy config directory cannot be empty"));
                }
                if container.is_empty() {
                    return Err(crate::Error::config("Proxy container name cannot be empty"));
                }
                Ok(())
            }
            ProxyConfig::NginxScan { config_dir } => {
                if config_dir.as_os_str().is_empty() {
                    return Err(crate::Error::config("Proxy config directory cannot be empty"));
                }
                Ok(())
            }
        }
    }

    /// Get the proxy backend type name
    pub fn type_name(&self) -> &str {
        match self {
            ProxyConfig::NpmApi { .. } => "npm-api",
            ProxyConfig::NginxFiles { .. } => "nginx-files",
            ProxyConfig::NginxScan { .. } => "nginx-scan",
        }
    }
}

// Custom Debug implementation that hides the password
impl fmt::Debug for ProxyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProxyConfig::NpmApi {
                host,
                email,
                certificate_id,
                ..
            } => f
                .debug_struct("NpmApi")
                .field("host", host)
                .field("email", email)
                .field("password", &"<REDACTED>")
                .field("certificate_id", certificate_id)
                .finish(),
            ProxyConfig::NginxFiles {
                config_dir,
                container,
                template_path,
            } => f
                .debug_struct("NginxFiles")
                .field("config_dir", config_dir)
                .field("container", container)
                .field("template_path", template_path)
                .finish(),
            ProxyConfig::NginxScan { config_dir } => f
                .debug_struct("NginxScan")
                .field("config_dir", config_dir)
                .finish(),
        }
    }
}

fn default_certificate_id() -> u64 {
    1
}

/// DNS resolver configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ResolverConfig {
    /// Pi-hole reached over SSH
    Pihole {
        /// SSH destination (host or user@host)
        host: String,
        /// Private key used for SSH
        #[serde(default = "default_ssh_key_path")]
        ssh_key_path: PathBuf,
        /// known_hosts file the resolver key is appended to
        #[serde(default = "default_known_hosts_path")]
        known_hosts_path: PathBuf,
    },
}

impl ResolverConfig {
    /// Validate the resolver configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            ResolverConfig::Pihole { host, .. } => {
                if host.is_empty() {
                    return Err(crate::Error::config("Resolver host cannot be empty"));
                }
                if host.starts_with('-') {
                    return Err(crate::Error::config(format!(
                        "Resolver host must not start with '-': '{}'",
                        host
                    )));
                }
                Ok(())
            }
        }
    }

    /// Get the resolver type name
    pub fn type_name(&self) -> &str {
        match self {
            ResolverConfig::Pihole { .. } => "pihole",
        }
    }
}

fn default_ssh_key_path() -> PathBuf {
    PathBuf::from("/root/.ssh/id_rsa")
}

fn default_known_hosts_path() -> PathBuf {
    PathBuf::from("/root/.ssh/known_hosts")
}

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Seconds between the end of one cycle and the start of the next
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    /// Seconds to wait after a cycle failed unexpectedly
    ///
    /// Shorter than the interval so a hiccup is retried soon.
    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: u64,

    /// Capacity of the internal event channel
    ///
    /// When full, new events are dropped (with a warning log).
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

impl EngineConfig {
    /// Validate the engine configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.interval_secs == 0 {
            return Err(crate::Error::config("Sync interval must be > 0"));
        }
        if self.retry_delay_secs == 0 {
            return Err(crate::Error::config("Retry delay must be > 0"));
        }
        if self.event_channel_capacity == 0 {
            return Err(crate::Error::config("Event channel capacity must be > 0"));
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            retry_delay_secs: default_retry_delay_secs(),
            event_channel_capacity: default_event_channel_capacity(),
        }
    }
}

fn default_interval_secs() -> u64 {
    900
}

fn default_retry_delay_secs() -> u64 {
    60
}

fn default_event_channel_capacity() -> usize {
    1000
}
