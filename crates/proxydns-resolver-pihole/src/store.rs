//! Alias store speaking to Pi-hole FTL over SSH

use async_trait::async_trait;
use proxydns_core::traits::AliasStore;
use proxydns_core::{CommandRunner, Result};
use std::path::PathBuf;

/// Prints the CNAME list, e.g. `[ a.lan,proxy.lan, b.lan,proxy.lan ]`
pub const READ_COMMAND: &str = "sudo pihole-FTL --config dns.cnameRecords";

/// Restarts FTL so a new CNAME list takes effect
pub const RESTART_COMMAND: &str = "sudo systemctl restart pihole-FTL";

/// Quote `value` as one single-quoted word for a POSIX shell
pub fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

/// Remote command replacing the CNAME list with `payload`
pub fn write_command(payload: &str) -> String {
    format!("{} {}", READ_COMMAND, shell_quote(payload))
}

/// Pi-hole alias store
///
/// Every operation is one `ssh` invocation running one remote command.
#[derive(Debug)]
pub struct PiholeStore<R> {
    /// SSH destination (host or user@host)
    host: String,

    /// Identity file
    ssh_key_path: PathBuf,

    /// known_hosts file holding the resolver key
    known_hosts_path: PathBuf,

    runner: R,
}

impl<R: CommandRunner> PiholeStore<R> {
    /// Store reaching `host` with the given identity and known_hosts files
    pub fn new(
        host: impl Into<String>,
        ssh_key_path: impl Into<PathBuf>,
        known_hosts_path: impl Into<PathBuf>,
        runner: R,
    ) -> Self {
        Self {
            host: host.into(),
            ssh_key_path: ssh_key_path.into(),
            known_hosts_path: known_hosts_path.into(),
            runner,
        }
    }

    /// SSH destination
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Arguments for `ssh` running `command` on the resolver
    pub fn ssh_args(&self, command: &str) -> Vec<String> {
        vec![
            "-i".to_string(),
            self.ssh_key_path.display().to_string(),
            "-o".to_string(),
            format!("UserKnownHostsFile={}", self.known_hosts_path.display()),
            "-o".to_string(),
            "BatchMode=yes".to_string(),
            self.host.clone(),
            command.to_string(),
        ]
    }

    async fn remote(&self, command: &str) -> Result<String> {
        tracing::debug!("ssh {}: {}", self.host, command);
        let output = self.runner.run("ssh", &self.ssh_args(command)).await?;
        Ok(output.stdout)
    }
}

#[async_trait]
impl<R: CommandRunner> AliasStore for PiholeStore<R> {
    async fn read_aliases(&self) -> Result<String> {
        self.remote(READ_COMMAND).await
    }

    async fn write_aliases(&self, payload: &str) -> Result<()> {
        self.remote(&write_command(payload)).await?;
        Ok(())
    }

    async fn restart(&self) -> Result<()> {
        self.remote(RESTART_COMMAND).await?;
        Ok(())
    }

    fn describe_write(&self, payload: &str) -> String {
        write_command(payload)
    }

    fn store_name(&self) -> &'static str {
        "pihole"
    }
}
