//! Concurrency-safe aggregation of probe outcomes.
//!
//! Workers publish partial reports through [`Aggregator::merge`]; the caller
//! reads a [`Report`] copy with [`Aggregator::snapshot`] once the scheduler
//! has drained every batch.

use super::traits::PortState;
use crate::error::{ScanError, ScanResult};
use crate::types::Port;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

/// Aggregated outcome of one (host, port) cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortReport {
    pub state: PortState,
    pub banners: Vec<String>,
}

/// `host → port → (state, banners)`.
///
/// Backed by ordered maps, so iteration already yields hosts
/// lexicographically and ports ascending.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Report {
    hosts: BTreeMap<String, BTreeMap<Port, PortReport>>,
}

impl Report {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one partial outcome into the report.
    ///
    /// State is last-write-wins; banners are append-only.
    pub fn merge(&mut self, host: &str, port: Port, state: PortState, banner: Option<String>) {
        let ports = self.hosts.entry(host.to_string()).or_default();
        match ports.get_mut(&port) {
            Some(cell) => {
                cell.banners.extend(banner);
                cell.state = state;
            }
            None => {
                ports.insert(
                    port,
                    PortReport {
                        state,
                        banners: banner.into_iter().collect(),
                    },
                );
            }
        }
    }

    pub fn get(&self, host: &str, port: Port) -> Option<&PortReport> {
        self.hosts.get(host).and_then(|ports| ports.get(&port))
    }

    /// Hosts in lexicographic order, each with its ports ascending.
    pub fn hosts(&self) -> impl Iterator<Item = (&str, &BTreeMap<Port, PortReport>)> {
        self.hosts.iter().map(|(host, ports)| (host.as_str(), ports))
    }

    /// Every cell as `(host, port, report)`, in rendering order.
    pub fn cells(&self) -> impl Iterator<Item = (&str, Port, &PortReport)> {
        self.hosts().flat_map(|(host, ports)| {
            ports.iter().map(move |(port, cell)| (host, *port, cell))
        })
    }

    pub fn cell_count(&self) -> usize {
        self.hosts.values().map(BTreeMap::len).sum()
    }

    pub fn count_state(&self, state: PortState) -> usize {
        self.cells().filter(|(_, _, cell)| cell.state == state).count()
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }
}

/// Shared handle to the run's report.
///
/// Cloning is cheap; all clones merge into the same report. Each merge holds
/// the write lock for its whole update, so a snapshot never observes a
/// half-built cell.
#[derive(Debug, Clone, Default)]
pub struct Aggregator {
    inner: Arc<RwLock<Report>>,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge one partial outcome for `host:port`.
    ///
    /// Fails only if a previous writer panicked mid-merge; the report can no
    /// longer be trusted then and the run must not present it.
    pub fn merge(
        &self,
        host: &str,
        port: Port,
        state: PortState,
        banner: Option<String>,
    ) -> ScanResult<()> {
        let mut report = self
            .inner
            .write()
            .map_err(|_| ScanError::ReportUnavailable("report lock poisoned".to_string()))?;
        report.merge(host, port, state, banner);
        Ok(())
    }

    /// Read-consistent copy of the full report.
    pub fn snapshot(&self) -> ScanResult<Report> {
        self.inner
            .read()
            .map(|report| report.clone())
            .map_err(|_| ScanError::ReportUnavailable("report lock poisoned".to_string()))
    }
}
