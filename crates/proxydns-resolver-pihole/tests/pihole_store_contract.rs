//! Contract Test: Pi-hole Alias Store
//!
//! Drives the store through a fake `ssh` that behaves like pihole-FTL:
//! it prints the list without quotes and replaces it on write.
//!
//! Constraints verified:
//! - Every operation is exactly one ssh call with the expected remote command
//! - The payload reaches the remote shell single-quoted
//! - Reconciling through the store is idempotent
//! - ssh failures surface as errors, never as an empty list

use async_trait::async_trait;
use proxydns_core::traits::AliasStore;
use proxydns_core::{
    CommandOutput, CommandRunner, DesiredDomainSet, DnsOutcome, DnsReconciler, Error, Result,
    SyncContext,
};
use proxydns_resolver_pihole::{PiholeStore, READ_COMMAND, RESTART_COMMAND};
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct FtlState {
    cname_records: String,
    commands: Vec<Vec<String>>,
    unreachable: bool,
}

#[derive(Clone, Default)]
struct FakeSsh {
    state: Arc<Mutex<FtlState>>,
}

impl FakeSsh {
    fn with_records(records: &str) -> Self {
        let fake = Self::default();
        fake.state.lock().unwrap().cname_records = records.to_string();
        fake
    }

    fn remote_commands(&self) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .commands
            .iter()
            .map(|args| args.last().cloned().unwrap_or_default())
            .collect()
    }
}

#[async_trait]
impl CommandRunner for FakeSsh {
    async fn run(&self, program: &str, args: &[String]) -> Result<CommandOutput> {
        assert_eq!(program, "ssh");
        let mut state = self.state.lock().unwrap();
        state.commands.push(args.to_vec());

        if state.unreachable {
            return Err(Error::CommandFailed {
                status: Some(255),
                stderr: "ssh: connect to host pi.lan port 22: No route to host".to_string(),
            });
        }

        let command = args.last().cloned().unwrap_or_default();
        let stdout = if command == READ_COMMAND {
            state.cname_records.clone()
        } else if let Some(quoted) = command.strip_prefix(&format!("{} ", READ_COMMAND)) {
            let payload = quoted.trim_matches('\'');
            state.cname_records = payload.replace('"', "");
            String::new()
        } else if command == RESTART_COMMAND {
            String::new()
        } else {
            panic!("unexpected remote command: {}", command);
        };

        Ok(CommandOutput {
            stdout,
            stderr: String::new(),
        })
    }
}

fn store(fake: &FakeSsh) -> PiholeStore<FakeSsh> {
    PiholeStore::new("pi.lan", "/keys/id_rsa", "/keys/known_hosts", fake.clone())
}

fn ctx() -> SyncContext {
    SyncContext::new("lab.lan", "npm.lab.lan")
}

#[tokio::test]
async fn ssh_invocation_shape() {
    let fake = FakeSsh::with_records("[]");

    store(&fake).read_aliases().await.unwrap();

    let commands = fake.state.lock().unwrap().commands.clone();
    assert_eq!(
        commands,
        vec![vec![
            "-i".to_string(),
            "/keys/id_rsa".to_string(),
            "-o".to_string(),
            "UserKnownHostsFile=/keys/known_hosts".to_string(),
            "-o".to_string(),
            "BatchMode=yes".to_string(),
            "pi.lan".to_string(),
            READ_COMMAND.to_string(),
        ]]
    );
}

#[tokio::test]
async fn reconcile_reads_writes_then_restarts() {
    let fake = FakeSsh::with_records("[ old.lab.lan,npm.lab.lan ]");
    let reconciler = DnsReconciler::new(Box::new(store(&fake)));
    let desired: DesiredDomainSet = ["grafana.lab.lan"].into_iter().collect();

    let outcome = reconciler.reconcile(&desired, &ctx()).await;

    assert_eq!(
        outcome,
        DnsOutcome::Updated {
            added: 1,
            restarted: true
        }
    );
    assert_eq!(
        fake.remote_commands(),
        vec![
            READ_COMMAND.to_string(),
            format!(
                "{} '{}'",
                READ_COMMAND, r#"[ "grafana.lab.lan,npm.lab.lan", "old.lab.lan,npm.lab.lan" ]"#
            ),
            RESTART_COMMAND.to_string(),
        ]
    );
}

#[tokio::test]
async fn second_reconcile_only_reads() {
    let fake = FakeSsh::with_records("[]");
    let reconciler = DnsReconciler::new(Box::new(store(&fake)));
    let desired: DesiredDomainSet = ["a.lab.lan", "b.lab.lan"].into_iter().collect();

    reconciler.reconcile(&desired, &ctx()).await;
    let before = fake.remote_commands().len();
    let outcome = reconciler.reconcile(&desired, &ctx()).await;

    assert_eq!(outcome, DnsOutcome::Unchanged);
    assert_eq!(fake.remote_commands().len(), before + 1);
}

#[tokio::test]
async fn unreachable_resolver_is_an_error_not_an_empty_list() {
    let fake = FakeSsh::with_records("[ a.lab.lan,npm.lab.lan ]");
    fake.state.lock().unwrap().unreachable = true;

    let err = store(&fake).read_aliases().await.unwrap_err();
    assert!(matches!(err, Error::CommandFailed { status: Some(255), .. }));

    let reconciler = DnsReconciler::new(Box::new(store(&fake)));
    let desired: DesiredDomainSet = ["b.lab.lan"].into_iter().collect();
    let outcome = reconciler.reconcile(&desired, &ctx()).await;

    assert!(matches!(outcome, DnsOutcome::ReadFailed(_)));
    assert_eq!(fake.remote_commands(), vec![READ_COMMAND.to_string(); 2]);
}
