//! Scanner module - the scan engine.
//!
//! Wires the target generator, the batch-barrier [`Scheduler`], the TCP
//! [`ProbeWorker`]s and the shared [`Aggregator`] into a complete run.

pub mod report;
pub mod scheduler;
pub mod tcp;
pub mod traits;

use crate::banner::default_payloads;
use crate::error::{ScanError, ScanResult};
use crate::types::{PortList, Targets};
use chrono::{DateTime, Utc};
use indicatif::ProgressBar;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::info;

pub use report::{Aggregator, PortReport, Report};
pub use scheduler::{BatchStats, Completion, Scheduler, WaitGroup};
pub use tcp::{Connection, ProbeEvent, ProbeWorker, TcpProbe, READ_MARGIN};
pub use traits::{Connector, PortState, Probe, TcpConnector};

/// Default cap on simultaneously running probes.
pub const DEFAULT_MAX_CONCURRENCY: usize = 1024;

/// Default per-target time budget.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(5000);

/// Configuration for a scan.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Hosts to scan, in order.
    pub hosts: Vec<String>,
    /// Ports to scan on every host, in order.
    pub ports: PortList,
    /// Requested concurrency cap, before clamping to the target count.
    pub max_concurrency: usize,
    /// Per-target budget: connect gets `timeout - READ_MARGIN`, the banner
    /// exchange gets whatever remains.
    pub timeout: Duration,
    /// Payload templates written to every open port.
    pub payloads: Vec<String>,
}

impl ScanConfig {
    pub fn new(hosts: Vec<String>, ports: PortList) -> Self {
        Self {
            hosts,
            ports,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            timeout: DEFAULT_TIMEOUT,
            payloads: default_payloads(),
        }
    }

    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_payloads(mut self, payloads: Vec<String>) -> Self {
        self.payloads = payloads;
        self
    }

    /// Number of (host, port) targets in this run.
    pub fn total_targets(&self) -> usize {
        Targets::total(&self.hosts, self.ports.as_slice())
    }

    /// The cap actually used: never more than the number of targets.
    pub fn effective_concurrency(&self) -> usize {
        self.max_concurrency.min(self.total_targets()).max(1)
    }

    /// A fresh pass over every target, hosts outer and ports inner.
    pub fn targets(&self) -> Targets<'_> {
        Targets::new(&self.hosts, self.ports.as_slice())
    }

    pub fn validate(&self) -> ScanResult<()> {
        if self.hosts.is_empty() {
            return Err(ScanError::InvalidConfig("no hosts to scan".to_string()));
        }
        if let Some(blank) = self.hosts.iter().position(|h| h.trim().is_empty()) {
            return Err(ScanError::InvalidConfig(format!(
                "host #{} is empty",
                blank + 1
            )));
        }
        if self.ports.is_empty() {
            return Err(ScanError::InvalidConfig("no ports to scan".to_string()));
        }
        if self.max_concurrency == 0 {
            return Err(ScanError::InvalidConfig(
                "max concurrency must be at least 1".to_string(),
            ));
        }
        if self.timeout <= READ_MARGIN {
            return Err(ScanError::InvalidConfig(format!(
                "timeout must exceed {}ms",
                READ_MARGIN.as_millis()
            )));
        }
        Ok(())
    }
}

/// Aggregate facts about a finished run.
#[derive(Debug, Clone, Serialize)]
pub struct ScanSummary {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub targets: usize,
    pub max_concurrency: usize,
    pub batch_sizes: Vec<usize>,
    pub open: usize,
    pub closed: usize,
    pub filtered: usize,
    pub error: usize,
}

/// Everything a run produced: the report snapshot and its summary.
#[derive(Debug, Clone, Serialize)]
pub struct ScanRun {
    pub summary: ScanSummary,
    pub report: Report,
}

/// Execute a complete scan over plain TCP connects.
pub async fn run_scan(config: &ScanConfig, progress: Option<ProgressBar>) -> ScanResult<ScanRun> {
    run_scan_with(config, TcpConnector, progress).await
}

/// Execute a complete scan dialing through `connector`.
///
/// The report is snapshotted only after the last batch barrier releases,
/// so every target has published its outcome by then.
pub async fn run_scan_with<C: Connector>(
    config: &ScanConfig,
    connector: C,
    progress: Option<ProgressBar>,
) -> ScanResult<ScanRun> {
    config.validate()?;

    let started_at = Utc::now();
    let start = Instant::now();
    let max_concurrency = config.effective_concurrency();

    info!(
        targets = config.total_targets(),
        max_concurrency, "starting scan"
    );

    let aggregator = Aggregator::new();
    let probe = Arc::new(TcpProbe::with_connector(
        connector,
        config.timeout,
        config.payloads.clone(),
        aggregator.clone(),
    ));

    let mut scheduler = Scheduler::new(max_concurrency);
    if let Some(progress) = progress {
        scheduler = scheduler.with_progress(progress);
    }
    let stats = scheduler.run(config.targets(), probe).await;

    let report = aggregator.snapshot()?;
    let duration = start.elapsed();
    info!(
        batches = stats.batches(),
        duration_ms = duration.as_millis() as u64,
        "scan complete"
    );

    let summary = ScanSummary {
        started_at,
        finished_at: Utc::now(),
        duration_ms: duration.as_millis() as u64,
        targets: stats.total(),
        max_concurrency,
        open: report.count_state(PortState::Open),
        closed: report.count_state(PortState::Closed),
        filtered: report.count_state(PortState::Filtered),
        error: report.count_state(PortState::Error),
        batch_sizes: stats.batch_sizes,
    };

    Ok(ScanRun { summary, report })
}
