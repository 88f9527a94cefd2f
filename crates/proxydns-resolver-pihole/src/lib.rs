// # Pi-hole resolver backend
//
// Reads and writes Pi-hole's CNAME list with `pihole-FTL --config
// dns.cnameRecords` over SSH, and restarts FTL after a write.
//
// ## Remote commands
//
// - read:    `sudo pihole-FTL --config dns.cnameRecords`
// - write:   `sudo pihole-FTL --config dns.cnameRecords '<payload>'`
// - restart: `sudo systemctl restart pihole-FTL`
//
// Each command is one `ssh` invocation with a 30 second deadline. The
// store never interprets the list; parsing and diffing are done in core.

mod ssh;
mod store;

pub use ssh::{SshReadiness, SshSetup};
pub use store::{PiholeStore, READ_COMMAND, RESTART_COMMAND, shell_quote, write_command};

use proxydns_core::config::ResolverConfig;
use proxydns_core::traits::{AliasStore, AliasStoreFactory};
use proxydns_core::{BackendRegistry, Result, SystemCommandRunner};

/// Factory for creating Pi-hole alias stores
pub struct PiholeFactory;

impl AliasStoreFactory for PiholeFactory {
    fn create(&self, config: &ResolverConfig) -> Result<Box<dyn AliasStore>> {
        match config {
            ResolverConfig::Pihole {
                host,
                ssh_key_path,
                known_hosts_path,
            } => Ok(Box::new(PiholeStore::new(
                host.clone(),
                ssh_key_path.clone(),
                known_hosts_path.clone(),
                SystemCommandRunner::new(),
            ))),
        }
    }
}

/// SSH readiness check for a resolver configuration
pub async fn ensure_ssh_ready(config: &ResolverConfig) -> Result<SshReadiness> {
    match config {
        ResolverConfig::Pihole {
            host,
            ssh_key_path,
            known_hosts_path,
        } => {
            SshSetup::new(
                host.clone(),
                ssh_key_path.clone(),
                known_hosts_path.clone(),
                SystemCommandRunner::new(),
            )
            .ensure_ready()
            .await
        }
    }
}

/// Register the Pi-hole alias store with a registry
pub fn register(registry: &BackendRegistry) {
    registry.register_alias_store("pihole", Box::new(PiholeFactory));
}
