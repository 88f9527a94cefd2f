// # proxydnsd - proxy and DNS alias sync daemon
//
// A thin integration layer over proxydns-core. It is responsible for:
// 1. Reading configuration from environment variables
// 2. Making sure SSH access to the resolver is set up
// 3. Registering proxy and resolver backends
// 4. Running the sync engine until SIGTERM/SIGINT
//
// ## Configuration
//
// ### Required
// - `DOMAIN_SUFFIX`: suffix joined to every service hostname (e.g. `lab.lan`);
//   not used when `PROXY_MODE=scan`
// - `NPM_TARGET_HOST`: host every CNAME alias points at
// - `PIHOLE_HOST`: resolver SSH destination
//
// ### Services
// - `SERVICE_SOURCE`: `env` (default) or `manifest`
// - `SERVICE_<n>_NAME`, `SERVICE_<n>_IP`, `SERVICE_<n>_PORT`: services, n = 1, 2, ...
// - `SERVICES_FILE`: manifest path (default `/app/services.json`)
//
// ### Proxy
// - `PROXY_MODE`: `api` (default), `files`, or `scan` (read `server_name`
//   domains from `NPM_CONFIG_DIR/*.conf` and only add DNS aliases)
// - `NPM_HOST`, `NPM_EMAIL`, `NPM_PASSWORD`: proxy manager API access (api mode)
// - `NPM_CERTIFICATE_ID`: certificate attached to created hosts (default 1)
// - `NPM_CONFIG_DIR`, `NPM_CONTAINER`, `NPM_TEMPLATE`: files mode output
//   (`NPM_CONFIG_DIR` is also the scan mode input)
//
// ### Resolver
// - `SSH_KEY_PATH`, `SSH_KNOWN_HOSTS`: SSH identity and known_hosts file
//
// ### Loop
// - `TESTING_MODE`: `true` to log changes instead of applying them
// - `SLEEP_INTERVAL`: seconds between cycles (default 900)
// - `RETRY_DELAY`: seconds to wait after a failed cycle (default 60)
// - `LOG_LEVEL`: trace, debug, info, warn, error (default info)
//
// ## Example
//
// ```bash
// export DOMAIN_SUFFIX=lab.lan
// export NPM_TARGET_HOST=npm.lab.lan
// export PIHOLE_HOST=pi@192.168.1.2
// export NPM_HOST=192.168.1.3:81 NPM_EMAIL=admin@lab.lan NPM_PASSWORD=...
// export SERVICE_1_NAME=grafana SERVICE_1_IP=192.168.1.10 SERVICE_1_PORT=3000
//
// proxydnsd
// ```

use anyhow::{Context, Result};
use proxydns_core::{
    BackendRegistry, EngineConfig, ProxyConfig, ResolverConfig, SourceConfig, SyncConfig,
    SyncEngine,
};
use proxydns_resolver_pihole::SshReadiness;
use std::env;
use std::path::PathBuf;
use std::process::ExitCode;
use tokio::sync::oneshot;
use tracing::{Level, debug, error, info};
use tracing_subscriber::FmtSubscriber;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Left in place by the sample `.env`; never a real resolver
const PIHOLE_HOST_PLACEHOLDER: &str = "192.168.0.0";

/// Left in place by the sample `.env`; never a real proxy
const TARGET_HOST_PLACEHOLDER: &str = "npm.example.com";

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration error or SSH setup requiring operator action
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DaemonExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (unexpected failure)
    RuntimeError = 2,
}

impl From<DaemonExitCode> for ExitCode {
    fn from(code: DaemonExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Application configuration, as read from the environment
struct Config {
    domain_suffix: String,
    target_host: String,
    pihole_host: String,
    service_source: String,
    services_file: PathBuf,
    proxy_mode: String,
    npm_host: Option<String>,
    npm_email: Option<String>,
    npm_password: Option<String>,
    npm_certificate_id: u64,
    npm_config_dir: PathBuf,
    npm_container: String,
    npm_template: Option<PathBuf>,
    ssh_key_path: PathBuf,
    known_hosts_path: PathBuf,
    testing_mode: bool,
    sleep_interval: u64,
    retry_delay: u64,
    log_level: String,
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through `lookup`; blank values count as unset
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let get_or = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());
        let get_number = |key: &str, default: u64| -> Result<u64> {
            match get(key) {
                Some(raw) => raw
                    .parse()
                    .with_context(|| format!("{} must be a whole number. Got: '{}'", key, raw)),
                None => Ok(default),
            }
        };

        Ok(Self {
            domain_suffix: get_or("DOMAIN_SUFFIX", ""),
            target_host: get_or("NPM_TARGET_HOST", TARGET_HOST_PLACEHOLDER),
            pihole_host: get_or("PIHOLE_HOST", PIHOLE_HOST_PLACEHOLDER),
            service_source: get_or("SERVICE_SOURCE", "env").to_lowercase(),
            services_file: PathBuf::from(get_or("SERVICES_FILE", "/app/services.json")),
            proxy_mode: get_or("PROXY_MODE", "api").to_lowercase(),
            npm_host: get("NPM_HOST"),
            npm_email: get("NPM_EMAIL"),
            npm_password: get("NPM_PASSWORD"),
            npm_certificate_id: get_number("NPM_CERTIFICATE_ID", 1)?,
            npm_config_dir: PathBuf::from(get_or("NPM_CONFIG_DIR", "/app/npm")),
            npm_container: get_or("NPM_CONTAINER", "nginx-proxy-manager"),
            npm_template: get("NPM_TEMPLATE").map(PathBuf::from),
            ssh_key_path: PathBuf::from(get_or("SSH_KEY_PATH", "/root/.ssh/id_rsa")),
            known_hosts_path: PathBuf::from(get_or("SSH_KNOWN_HOSTS", "/root/.ssh/known_hosts")),
            testing_mode: get_or("TESTING_MODE", "false").eq_ignore_ascii_case("true"),
            sleep_interval: get_number("SLEEP_INTERVAL", 900)?,
            retry_delay: get_number("RETRY_DELAY", 60)?,
            log_level: get_or("LOG_LEVEL", "info"),
        })
    }

    /// Validate the configuration
    ///
    /// Messages tell the operator which variable to set.
    fn validate(&self) -> Result<()> {
        if self.domain_suffix.is_empty() && self.proxy_mode != "scan" {
            anyhow::bail!(
                "DOMAIN_SUFFIX is required. \
                Set it via: export DOMAIN_SUFFIX=lab.lan"
            );
        }

        if self.pihole_host == PIHOLE_HOST_PLACEHOLDER {
            anyhow::bail!("Please set PIHOLE_HOST in .env file");
        }

        if self.target_host == TARGET_HOST_PLACEHOLDER {
            anyhow::bail!("Please set NPM_TARGET_HOST in .env file");
        }

        match self.service_source.as_str() {
            "env" | "manifest" => {}
            _ => anyhow::bail!(
                "SERVICE_SOURCE '{}' is not supported. \
                Supported sources: env, manifest",
                self.service_source
            ),
        }

        match self.proxy_mode.as_str() {
            "api" => {
                for (name, value) in [
                    ("NPM_HOST", &self.npm_host),
                    ("NPM_EMAIL", &self.npm_email),
                    ("NPM_PASSWORD", &self.npm_password),
                ] {
                    if value.is_none() {
                        anyhow::bail!("{} is required when PROXY_MODE=api", name);
                    }
                }
            }
            "files" | "scan" => {}
            _ => anyhow::bail!(
                "PROXY_MODE '{}' is not supported. \
                Supported modes: api, files, scan",
                self.proxy_mode
            ),
        }

        if self.sleep_interval == 0 {
            anyhow::bail!("SLEEP_INTERVAL must be at least 1 second");
        }

        if self.retry_delay == 0 {
            anyhow::bail!("RETRY_DELAY must be at least 1 second");
        }

        match self.log_level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!(
                "LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        }

        self.to_sync_config()
            .validate()
            .context("Invalid configuration")?;

        Ok(())
    }

    /// Build the core configuration
    fn to_sync_config(&self) -> SyncConfig {
        let source = match self.service_source.as_str() {
            "manifest" => SourceConfig::Manifest {
                path: self.services_file.clone(),
            },
            _ => SourceConfig::Env,
        };

        let proxy = match self.proxy_mode.as_str() {
            "files" => ProxyConfig::NginxFiles {
                config_dir: self.npm_config_dir.clone(),
                container: self.npm_container.clone(),
                template_path: self.npm_template.clone(),
            },
            "scan" => ProxyConfig::NginxScan {
                config_dir: self.npm_config_dir.clone(),
            },
            _ => ProxyConfig::NpmApi {
                host: self.npm_host.clone().unwrap_or_default(),
                email: self.npm_email.clone().unwrap_or_default(),
                password: self.npm_password.clone().unwrap_or_default(),
                certificate_id: self.npm_certificate_id,
            },
        };

        SyncConfig {
            domain_suffix: self.domain_suffix.clone(),
            target_host: self.target_host.clone(),
            dry_run: self.testing_mode,
            source,
            proxy,
            resolver: ResolverConfig::Pihole {
                host: self.pihole_host.clone(),
                ssh_key_path: self.ssh_key_path.clone(),
                known_hosts_path: self.known_hosts_path.clone(),
            },
            engine: EngineConfig {
                interval_secs: self.sleep_interval,
                retry_delay_secs: self.retry_delay,
                ..EngineConfig::default()
            },
        }
    }

    fn tracing_level(&self) -> Level {
        match self.log_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        }
    }
}

fn main() -> ExitCode {
    // Load configuration from environment
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            return DaemonExitCode::ConfigError.into();
        }
    };

    // Validate configuration
    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {:#}", e);
        return DaemonExitCode::ConfigError.into();
    }

    let subscriber = FmtSubscriber::builder()
        .with_max_level(config.tracing_level())
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return DaemonExitCode::ConfigError.into();
    }

    info!("Starting proxydnsd daemon");

    // One cycle at a time; nothing here benefits from worker threads
    let rt = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return DaemonExitCode::RuntimeError.into();
        }
    };

    let result = rt.block_on(async {
        match run_daemon(config.to_sync_config()).await {
            Ok(code) => code,
            Err(e) => {
                error!("Daemon error: {:#}", e);
                DaemonExitCode::RuntimeError
            }
        }
    });

    result.into()
}

/// Register every backend compiled into this binary
fn build_registry() -> BackendRegistry {
    let registry = BackendRegistry::new();

    #[cfg(feature = "npm-api")]
    {
        debug!("Registering NPM API proxy layer");
        proxydns_proxy_npm::register(&registry);
    }

    #[cfg(feature = "nginx-files")]
    {
        debug!("Registering nginx file proxy layer");
        proxydns_proxy_files::register(&registry);
    }

    debug!("Registering nginx config scanner");
    proxydns_core::sources::nginx_scan::register(&registry);

    debug!("Registering Pi-hole resolver");
    proxydns_resolver_pihole::register(&registry);

    registry
}

/// Run the daemon
async fn run_daemon(config: SyncConfig) -> Result<DaemonExitCode> {
    match proxydns_resolver_pihole::ensure_ssh_ready(&config.resolver).await {
        Ok(SshReadiness::Ready) => {}
        Ok(SshReadiness::KeyGenerated { .. }) => return Ok(DaemonExitCode::ConfigError),
        Err(e) => {
            error!("SSH setup failed: {}", e);
            return Ok(DaemonExitCode::ConfigError);
        }
    }

    let registry = build_registry();
    let proxy = match registry.create_proxy_layer(&config.proxy) {
        Ok(proxy) => proxy,
        Err(e) => {
            error!("{} (compiled proxy layers: {:?})", e, registry.list_proxy_layers());
            return Ok(DaemonExitCode::ConfigError);
        }
    };
    let store = match registry.create_alias_store(&config.resolver) {
        Ok(store) => store,
        Err(e) => {
            error!("{}", e);
            return Ok(DaemonExitCode::ConfigError);
        }
    };

    info!("Proxy backend: {}", config.proxy.type_name());
    info!("Resolver backend: {}", config.resolver.type_name());

    let (engine, mut events) = SyncEngine::new(config.source.build(), proxy, store, &config)?;

    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            debug!("Engine event: {:?}", event);
        }
    });

    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    tokio::spawn(async move {
        match wait_for_shutdown_signal().await {
            Ok(signal) => info!("Received shutdown signal: {}", signal),
            Err(e) => error!("Signal handling failed: {}", e),
        }
        let _ = shutdown_tx.send(());
    });

    engine.run_with_shutdown(shutdown_rx).await?;
    Ok(DaemonExitCode::CleanShutdown)
}

/// Wait for shutdown signals (SIGTERM, SIGINT)
#[cfg(unix)]
async fn wait_for_shutdown_signal() -> Result<&'static str> {
    let mut sigterm =
        signal(SignalKind::terminate()).context("Failed to setup SIGTERM handler")?;
    let mut sigint = signal(SignalKind::interrupt()).context("Failed to setup SIGINT handler")?;

    let name = tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    };
    Ok(name)
}

/// Wait for shutdown signals (SIGINT only)
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
async fn wait_for_shutdown_signal() -> Result<&'static str> {
    tokio::signal::ctrl_c()
        .await
        .context("Failed to wait for CTRL-C")?;
    Ok("SIGINT")
}
