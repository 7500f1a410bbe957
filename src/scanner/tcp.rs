//! TCP connect probe workers.
//!
//! One [`ProbeWorker`] owns one target's connection for its whole life:
//!
//! ```text
//! Idle -> Connecting -> Connected -> Reading -> Terminated
//!              |                                   ^
//!              +-------- connect failed -----------+
//! ```
//!
//! The host name is resolved first; the per-target time budget starts once
//! an address is known. A successful connect is reported `OPEN` straight
//! away. Every configured payload is then written without waiting for
//! replies, and each chunk the remote sends back is recorded as one more
//! banner until the remote closes, a read or write fails, or the budget
//! runs out.

use super::report::Aggregator;
use super::scheduler::Completion;
use super::traits::{Connector, PortState, Probe, TcpConnector};
use crate::banner::{decode_banner, render_payload, READ_CHUNK_SIZE};
use crate::error::ScanError;
use crate::types::ScanTarget;
use async_trait::async_trait;
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::{timeout, timeout_at, Instant};
use tracing::{debug, error, warn};

/// Share of the per-target timeout held back from the connect for the
/// banner exchange.
pub const READ_MARGIN: Duration = Duration::from_millis(500);

/// Something that happened to a worker's connection.
#[derive(Debug)]
pub enum ProbeEvent<S> {
    Connected(S),
    ConnectFailed(ScanError),
    DataReceived(Vec<u8>),
    ConnectionClosed,
    ReadFailed(io::Error),
    DeadlineElapsed,
}

/// Where a worker is in its lifecycle.
enum Phase<S> {
    Idle,
    Connecting,
    Connected(Connection<S>),
    Reading(Connection<S>),
    Terminated,
}

/// An established stream that is shut down at most once.
#[derive(Debug)]
pub struct Connection<S> {
    stream: S,
    closed: bool,
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            closed: false,
        }
    }

    pub async fn send(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.stream.write_all(bytes).await?;
        self.stream.flush().await
    }

    /// Wait for the next chunk from the remote, or for the reason there
    /// will be none.
    pub async fn next_event(&mut self, buf: &mut [u8], deadline: Instant) -> ProbeEvent<S> {
        if self.closed {
            return ProbeEvent::ConnectionClosed;
        }
        match timeout_at(deadline, self.stream.read(buf)).await {
            Ok(Ok(0)) => ProbeEvent::ConnectionClosed,
            Ok(Ok(n)) => ProbeEvent::DataReceived(buf[..n].to_vec()),
            Ok(Err(e)) => ProbeEvent::ReadFailed(e),
            Err(_) => ProbeEvent::DeadlineElapsed,
        }
    }

    /// Shut the stream down. Calling this again is a no-op.
    pub async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        if let Err(e) = self.stream.shutdown().await {
            debug!("shutdown after close: {}", e);
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

/// Spawns a [`ProbeWorker`] per target, sharing dial, payloads and report.
pub struct TcpProbe<C = TcpConnector> {
    connector: C,
    timeout: Duration,
    payloads: Arc<[String]>,
    report: Aggregator,
}

impl TcpProbe<TcpConnector> {
    /// Probe over plain OS TCP connects.
    pub fn new(timeout: Duration, payloads: Vec<String>, report: Aggregator) -> Self {
        Self::with_connector(TcpConnector, timeout, payloads, report)
    }
}

impl<C: Connector> TcpProbe<C> {
    pub fn with_connector(
        connector: C,
        timeout: Duration,
        payloads: Vec<String>,
        report: Aggregator,
    ) -> Self {
        Self {
            connector,
            timeout,
            payloads: payloads.into(),
            report,
        }
    }

    /// Deadline for the connect phase.
    pub fn connect_timeout(&self) -> Duration {
        self.timeout.saturating_sub(READ_MARGIN)
    }

    /// A worker for `target` in the `Idle` phase.
    pub fn worker(&self, target: ScanTarget) -> ProbeWorker<'_, C> {
        ProbeWorker {
            target,
            connector: &self.connector,
            connect_timeout: self.connect_timeout(),
            timeout: self.timeout,
            payloads: &self.payloads,
            report: &self.report,
        }
    }
}

#[async_trait]
impl<C: Connector> Probe for TcpProbe<C> {
    async fn probe(&self, target: ScanTarget, done: Completion) {
        self.worker(target).run(done).await;
    }
}

/// One target's connection lifecycle.
pub struct ProbeWorker<'a, C: Connector> {
    target: ScanTarget,
    connector: &'a C,
    connect_timeout: Duration,
    timeout: Duration,
    payloads: &'a [String],
    report: &'a Aggregator,
}

impl<C: Connector> ProbeWorker<'_, C> {
    /// Drive the state machine to `Terminated`, then signal `done`.
    pub async fn run(self, done: Completion) {
        let mut deadline = Instant::now() + self.timeout;
        let mut buf = vec![0u8; READ_CHUNK_SIZE];
        let mut phase = Phase::Idle;

        loop {
            phase = match phase {
                Phase::Idle => Phase::Connecting,
                Phase::Connecting => {
                    let event = match self.resolve().await {
                        Ok(addr) => {
                            deadline = Instant::now() + self.timeout;
                            self.connect(&addr).await
                        }
                        Err(cause) => ProbeEvent::ConnectFailed(cause),
                    };
                    self.on_connect(event)
                }
                Phase::Connected(mut conn) => {
                    match timeout_at(deadline, self.send_payloads(&mut conn)).await {
                        Ok(Ok(())) => Phase::Reading(conn),
                        Ok(Err(e)) => {
                            debug!("{}: payload write failed: {}", self.target, e);
                            conn.close().await;
                            Phase::Terminated
                        }
                        Err(_) => {
                            debug!("{}: payload write ran out of time", self.target);
                            conn.close().await;
                            Phase::Terminated
                        }
                    }
                }
                Phase::Reading(mut conn) => {
                    let event = conn.next_event(&mut buf, deadline).await;
                    self.on_read(event, conn).await
                }
                Phase::Terminated => break,
            };
        }

        done.done();
    }

    /// Look up the target's address. Any failure, including a lookup that
    /// outlives the whole budget, is unclassified.
    async fn resolve(&self) -> Result<C::Addr, ScanError> {
        let host = self.target.host.as_str();
        let port = self.target.port.as_u16();

        match timeout(self.timeout, self.connector.resolve(host, port)).await {
            Ok(Ok(addr)) => Ok(addr),
            Ok(Err(e)) => Err(ScanError::UnclassifiedConnectFailure(e)),
            Err(_) => Err(ScanError::UnclassifiedConnectFailure(io::Error::new(
                io::ErrorKind::TimedOut,
                "name resolution timed out",
            ))),
        }
    }

    async fn connect(&self, addr: &C::Addr) -> ProbeEvent<C::Stream> {
        match timeout(self.connect_timeout, self.connector.connect(addr)).await {
            Ok(Ok(stream)) => ProbeEvent::Connected(stream),
            Ok(Err(e)) => ProbeEvent::ConnectFailed(ScanError::from_connect(e)),
            Err(_) => ProbeEvent::ConnectFailed(ScanError::ConnectTimeout),
        }
    }

    fn on_connect(&self, event: ProbeEvent<C::Stream>) -> Phase<C::Stream> {
        match event {
            ProbeEvent::Connected(stream) => {
                debug!("{} is {}", self.target, PortState::Open);
                self.publish(PortState::Open, None);
                Phase::Connected(Connection::new(stream))
            }
            ProbeEvent::ConnectFailed(cause) => {
                self.fail(cause);
                Phase::Terminated
            }
            other => {
                self.fail(ScanError::UnexpectedProtocolEvent(describe(&other)));
                Phase::Terminated
            }
        }
    }

    async fn send_payloads(&self, conn: &mut Connection<C::Stream>) -> io::Result<()> {
        for template in self.payloads {
            conn.send(&render_payload(template, &self.target.host)).await?;
        }
        Ok(())
    }

    async fn on_read(
        &self,
        event: ProbeEvent<C::Stream>,
        mut conn: Connection<C::Stream>,
    ) -> Phase<C::Stream> {
        match event {
            ProbeEvent::DataReceived(data) => {
                let banner = decode_banner(&data);
                debug!("{} replied with {}", self.target, banner);
                self.publish(PortState::Open, Some(banner));
                return Phase::Reading(conn);
            }
            ProbeEvent::ConnectionClosed => {
                debug!("{} closed the connection", self.target);
            }
            ProbeEvent::ReadFailed(e) => {
                debug!("{} read failed: {}", self.target, e);
            }
            ProbeEvent::DeadlineElapsed => {
                debug!("{} banner exchange ran out of time", self.target);
            }
            ProbeEvent::Connected(_) | ProbeEvent::ConnectFailed(_) => {
                warn!("Error: {}: {}", self.target, describe(&event));
            }
        }

        conn.close().await;
        Phase::Terminated
    }

    fn fail(&self, cause: ScanError) {
        let state = cause.port_state();
        if state == PortState::Error {
            warn!("Error: {}: {}", self.target, cause);
        }
        debug!("{} is {}", self.target, state);
        self.publish(state, None);
    }

    fn publish(&self, state: PortState, banner: Option<String>) {
        if let Err(e) = self
            .report
            .merge(&self.target.host, self.target.port, state, banner)
        {
            error!("{}: outcome {} lost: {}", self.target, state, e);
        }
    }
}

fn describe<S>(event: &ProbeEvent<S>) -> String {
    match event {
        ProbeEvent::Connected(_) => "unexpected connect".to_string(),
        ProbeEvent::ConnectFailed(cause) => format!("unexpected connect failure: {}", cause),
        ProbeEvent::DataReceived(data) => format!("unexpected {} bytes of data", data.len()),
        ProbeEvent::ConnectionClosed => "connection closed".to_string(),
        ProbeEvent::ReadFailed(e) => format!("read failed: {}", e),
        ProbeEvent::DeadlineElapsed => "deadline elapsed".to_string(),
    }
}
