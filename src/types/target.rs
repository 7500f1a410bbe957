//! Scan targets and the host × port target generator.

use super::Port;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::FusedIterator;

/// One (host, port) pair to probe.
///
/// The host is kept exactly as configured (hostname or IP literal); name
/// resolution happens when the probe dials.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScanTarget {
    pub host: String,
    pub port: Port,
}

impl ScanTarget {
    pub fn new(host: impl Into<String>, port: Port) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl fmt::Display for ScanTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Lazy cross product of hosts × ports.
///
/// Hosts form the outer loop and ports the inner loop, both in the order
/// given. Nothing is deduplicated. Calling [`Targets::new`] again over the
/// same slices restarts the sequence from the beginning.
#[derive(Debug, Clone)]
pub struct Targets<'a> {
    hosts: &'a [String],
    ports: &'a [Port],
    host_idx: usize,
    port_idx: usize,
}

impl<'a> Targets<'a> {
    pub fn new(hosts: &'a [String], ports: &'a [Port]) -> Self {
        Self {
            hosts,
            ports,
            host_idx: 0,
            port_idx: 0,
        }
    }

    /// Total number of targets the full sequence yields.
    pub fn total(hosts: &[String], ports: &[Port]) -> usize {
        hosts.len() * ports.len()
    }
}

impl Iterator for Targets<'_> {
    type Item = ScanTarget;

    fn next(&mut self) -> Option<Self::Item> {
        if self.ports.is_empty() {
            return None;
        }
        let host = self.hosts.get(self.host_idx)?;
        let target = ScanTarget::new(host.as_str(), self.ports[self.port_idx]);

        self.port_idx += 1;
        if self.port_idx == self.ports.len() {
            self.port_idx = 0;
            self.host_idx += 1;
        }

        Some(target)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = if self.ports.is_empty() || self.host_idx >= self.hosts.len() {
            0
        } else {
            (self.hosts.len() - self.host_idx) * self.ports.len() - self.port_idx
        };
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Targets<'_> {}

impl FusedIterator for Targets<'_> {}
