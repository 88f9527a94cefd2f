//! SSH readiness checks run once before the first cycle
//!
//! Without an identity file nothing can reach the resolver, and installing
//! the public key on it is a manual step. In that case a key pair is
//! generated, the operator is told how to install it, and the daemon exits.

use proxydns_core::{CommandRunner, Error, Result};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

/// Result of the readiness check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SshReadiness {
    /// Identity present, resolver reachable as far as we can tell
    Ready,
    /// A new key was generated and must be installed on the resolver first
    KeyGenerated {
        /// Command the operator has to run
        copy_id_command: String,
    },
}

/// SSH setup for one resolver host
pub struct SshSetup<R> {
    host: String,
    key_path: PathBuf,
    known_hosts_path: PathBuf,
    runner: R,
}

impl<R: CommandRunner> SshSetup<R> {
    /// Readiness check for `host` using the given key and known_hosts files
    pub fn new(
        host: impl Into<String>,
        key_path: impl Into<PathBuf>,
        known_hosts_path: impl Into<PathBuf>,
        runner: R,
    ) -> Self {
        Self {
            host: host.into(),
            key_path: key_path.into(),
            known_hosts_path: known_hosts_path.into(),
            runner,
        }
    }

    /// `ssh-copy-id -i <key> <host>`
    pub fn copy_id_command(&self) -> String {
        format!("ssh-copy-id -i {} {}", self.key_path.display(), self.host)
    }

    /// Make sure an identity exists and the resolver key is trusted
    ///
    /// Key generation failures are errors. Host key scanning is best effort.
    pub async fn ensure_ready(&self) -> Result<SshReadiness> {
        if !tokio::fs::try_exists(&self.key_path).await? {
            self.generate_key().await?;

            let copy_id_command = self.copy_id_command();
            tracing::info!("SSH key generated. Please copy it to your Pi-hole host:");
            tracing::info!("{}", copy_id_command);
            tracing::info!("Then restart this container.");
            return Ok(SshReadiness::KeyGenerated { copy_id_command });
        }

        if let Err(e) = self.trust_host().await {
            tracing::debug!("Ignoring ssh-keyscan failure for {}: {}", self.host, e);
        }
        Ok(SshReadiness::Ready)
    }

    async fn generate_key(&self) -> Result<()> {
        tracing::info!("Generating SSH key...");
        if let Some(parent) = non_empty_parent(&self.key_path) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let args = vec![
            "-t".to_string(),
            "rsa".to_string(),
            "-N".to_string(),
            String::new(),
            "-f".to_string(),
            self.key_path.display().to_string(),
        ];

        self.runner
            .run("ssh-keygen", &args)
            .await
            .map_err(|e| Error::config(format!("Failed to generate SSH key: {}", e)))?;
        Ok(())
    }

    /// Append the resolver's host key to known_hosts
    async fn trust_host(&self) -> Result<()> {
        let output = self
            .runner
            .run("ssh-keyscan", &["-H".to_string(), self.host.clone()])
            .await?;
        if output.stdout.is_empty() {
            return Ok(());
        }

        if let Some(parent) = non_empty_parent(&self.known_hosts_path) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.known_hosts_path)
            .await?;
        file.write_all(output.stdout.as_bytes()).await?;
        file.write_all(b"\n").await?;
        file.flush().await?;
        Ok(())
    }
}

fn non_empty_parent(path: &Path) -> Option<&Path> {
    path.parent().filter(|parent| !parent.as_os_str().is_empty())
}
