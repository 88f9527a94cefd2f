//! Core sync engine
//!
//! The SyncEngine is responsible for:
//! - Loading desired services from a ServiceSource
//! - Converging the reverse proxy through a ProxyLayer
//! - Converging resolver aliases through the DnsReconciler
//! - Repeating on a fixed interval until shutdown
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────┐  services  ┌─────────────┐  domains  ┌───────────────┐
//! │ ServiceSource │───────────▶│ ProxyLayer  │──────────▶│ DnsReconciler │
//! └───────────────┘            └─────────────┘           └───────────────┘
//!                                     │ activation failed        │
//!                                     └──── skip DNS ◀───────────┘
//! ```
//!
//! ## Cycle Flow
//!
//! 1. Load services; none → skip the rest of the cycle (read-only proxy
//!    layers report their own domains and skip this step)
//! 2. Converge the proxy; reload failure or empty domain set → skip DNS
//! 3. Add missing aliases, restart the resolver if anything changed
//!
//! Cycles never overlap. Shutdown is honoured between cycles only, so an
//! in-flight cycle always runs to completion (each remote call has its own
//! deadline).

use chrono::{DateTime, Utc};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

use crate::config::SyncConfig;
use crate::error::Result;
use crate::model::{DesiredDomainSet, ServiceSpec, SyncContext};
use crate::reconcile::{DnsOutcome, DnsReconciler};
use crate::traits::{AliasStore, ProxyLayer, ProxyOutcome, ServiceSource};

/// Why a cycle stopped early
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The source produced no services
    NoServices,
    /// The proxy layer reported no domains
    NoDomains,
    /// The proxy reload failed, so DNS would point at stale routes
    ActivationFailed,
}

/// Summary of one cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    /// When the cycle started
    pub started_at: DateTime<Utc>,
    /// Number of services loaded
    pub services: usize,
    /// Proxy stage result, if it ran
    pub proxy: Option<ProxyOutcome>,
    /// DNS stage result, if it ran
    pub dns: Option<DnsOutcome>,
    /// Set when the cycle stopped before the DNS stage
    pub skipped: Option<SkipReason>,
}

impl CycleReport {
    fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            started_at,
            services: 0,
            proxy: None,
            dns: None,
            skipped: None,
        }
    }

    /// Domains handed to DNS reconciliation (empty if the proxy stage didn't run)
    pub fn domains(&self) -> DesiredDomainSet {
        self.proxy
            .as_ref()
            .map(|outcome| outcome.domains.clone())
            .unwrap_or_default()
    }
}

/// Events emitted by the SyncEngine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    /// Engine loop started
    Started {
        interval_secs: u64,
        dry_run: bool,
    },

    /// A cycle began
    CycleStarted { at: DateTime<Utc> },

    /// Services were loaded
    ServicesLoaded { count: usize },

    /// The proxy stage finished
    ProxyConverged {
        domains: usize,
        created: usize,
        deleted: usize,
        failures: usize,
    },

    /// The DNS stage finished
    AliasesReconciled { outcome: DnsOutcome },

    /// A cycle stopped early
    CycleSkipped { reason: SkipReason },

    /// A cycle failed unexpectedly
    CycleFailed { error: String },

    /// Engine stopped
    Stopped { reason: String },
}

/// Core sync engine
///
/// Owns one instance of each stage and runs them strictly sequentially.
pub struct SyncEngine {
    /// Desired-state source
    source: Box<dyn ServiceSource>,

    /// Reverse proxy layer
    proxy: Box<dyn ProxyLayer>,

    /// Alias reconciliation over the resolver
    dns: DnsReconciler,

    /// Per-cycle context
    ctx: SyncContext,

    /// Delay between successful cycles
    interval: Duration,

    /// Delay after a failed cycle
    retry_delay: Duration,

    /// Event sender for external monitoring
    event_tx: mpsc::Sender<SyncEvent>,
}

impl SyncEngine {
    /// Create a new sync engine
    ///
    /// # Returns
    ///
    /// A tuple of (engine, event_receiver) where event_receiver yields engine events
    pub fn new(
        source: Box<dyn ServiceSource>,
        proxy: Box<dyn ProxyLayer>,
        store: Box<dyn AliasStore>,
        config: &SyncConfig,
    ) -> Result<(Self, mpsc::Receiver<SyncEvent>)> {
        config.validate()?;

        let (tx, rx) = mpsc::channel(config.engine.event_channel_capacity);

        let engine = Self {
            source,
            proxy,
            dns: DnsReconciler::new(store),
            ctx: config.context(),
            interval: Duration::from_secs(config.engine.interval_secs),
            retry_delay: Duration::from_secs(config.engine.retry_delay_secs),
            event_tx: tx,
        };

        Ok((engine, rx))
    }

    /// The context every cycle runs with
    pub fn context(&self) -> &SyncContext {
        &self.ctx
    }

    /// Run a single cycle
    ///
    /// Per-item and transport failures are absorbed into the report. An
    /// `Err` is an unexpected failure of a whole stage.
    pub async fn run_cycle(&self) -> Result<CycleReport> {
        let started_at = Utc::now();
        info!("Starting check");
        self.emit_event(SyncEvent::CycleStarted { at: started_at });

        let mut report = CycleReport::new(started_at);

        let services = if self.proxy.uses_services() {
            let services = self.load_services().await;
            report.services = services.len();
            if services.is_empty() {
                warn!("No services found in {} source", self.source.source_name());
                return Ok(self.skip(report, SkipReason::NoServices));
            }
            services
        } else {
            debug!(
                "{} reports its own domains, not loading services",
                self.proxy.layer_name()
            );
            Vec::new()
        };

        let outcome = self.proxy.converge(&services, &self.ctx).await?;
        info!(
            "Total domains configured via {}: {}",
            self.proxy.layer_name(),
            outcome.domains.len()
        );
        self.emit_event(SyncEvent::ProxyConverged {
            domains: outcome.domains.len(),
            created: outcome.created,
            deleted: outcome.deleted,
            failures: outcome.failures,
        });

        let allows_dns = outcome.allows_dns();
        let no_domains = outcome.domains.is_empty();
        report.proxy = Some(outcome);

        if !allows_dns {
            error!("Proxy activation failed, skipping DNS update this cycle");
            return Ok(self.skip(report, SkipReason::ActivationFailed));
        }

        if no_domains {
            return Ok(self.skip(report, SkipReason::NoDomains));
        }

        let domains = report.domains();
        let dns = self.dns.reconcile(&domains, &self.ctx).await;
        debug!("DNS outcome: {:?}", dns);
        self.emit_event(SyncEvent::AliasesReconciled {
            outcome: dns.clone(),
        });
        report.dns = Some(dns);

        Ok(report)
    }

    async fn load_services(&self) -> Vec<ServiceSpec> {
        let services = match self.source.load().await {
            Ok(services) => services,
            Err(e) => {
                error!(
                    "Failed to load services from {} source: {}",
                    self.source.source_name(),
                    e
                );
                Vec::new()
            }
        };
        self.emit_event(SyncEvent::ServicesLoaded {
            count: services.len(),
        });
        services
    }

    fn skip(&self, mut report: CycleReport, reason: SkipReason) -> CycleReport {
        debug!("Cycle skipped: {:?}", reason);
        self.emit_event(SyncEvent::CycleSkipped { reason });
        report.skipped = Some(reason);
        report
    }

    /// Run the engine until SIGINT (Ctrl-C)
    pub async fn run(&self) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                let _ = tx.send(());
            }
        });
        self.run_with_shutdown(rx).await
    }

    /// Run cycles until `shutdown` fires (or its sender is dropped)
    pub async fn run_with_shutdown(&self, mut shutdown: oneshot::Receiver<()>) -> Result<()> {
        info!("Starting");
        if self.ctx.dry_run {
            info!("*** TESTING MODE ENABLED - No changes will be applied ***");
        }
        info!("Check interval: {} seconds", self.interval.as_secs());
        self.emit_event(SyncEvent::Started {
            interval_secs: self.interval.as_secs(),
            dry_run: self.ctx.dry_run,
        });

        loop {
            if !matches!(shutdown.try_recv(), Err(oneshot::error::TryRecvError::Empty)) {
                break;
            }

            let delay = match self.run_cycle().await {
                Ok(_) => self.interval,
                Err(e) => {
                    error!("Error in main loop: {}", e);
                    self.emit_event(SyncEvent::CycleFailed {
                        error: e.to_string(),
                    });
                    self.retry_delay
                }
            };

            info!("Sleeping for {} seconds...", delay.as_secs());
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = &mut shutdown => break,
            }
        }

        info!("Shutting down...");
        self.emit_event(SyncEvent::Stopped {
            reason: "Shutdown signal".to_string(),
        });
        Ok(())
    }

    /// Emit an engine event
    fn emit_event(&self, event: SyncEvent) {
        // Never block a cycle on a slow consumer; a dropped receiver means nobody listens
        if let Err(mpsc::error::TrySendError::Full(_)) = self.event_tx.try_send(event) {
            warn!(
                "Event channel full, dropping event. Consider increasing event_channel_capacity."
            );
        }
    }
}
