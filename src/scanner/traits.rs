//! Scanner trait abstractions.
//!
//! Defines the seams between the scheduler, the probe workers and the
//! network, enabling different dial implementations and easier testing.

use super::scheduler::Completion;
use crate::types::ScanTarget;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io;
use std::net::SocketAddr;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{lookup_host, TcpStream};

/// Reachability of a scanned port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PortState {
    /// Connection succeeded.
    Open,
    /// Remote actively refused the connection.
    Closed,
    /// Connect attempt timed out, typically a firewall drop.
    Filtered,
    /// Any other failure (DNS, unexpected event, protocol violation).
    Error,
}

impl fmt::Display for PortState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open => write!(f, "OPEN"),
            Self::Closed => write!(f, "CLOSED"),
            Self::Filtered => write!(f, "FILTERED"),
            Self::Error => write!(f, "ERROR"),
        }
    }
}

/// The TCP dial primitive a probe worker connects through.
///
/// Name resolution and the dial are separate steps: the worker applies its
/// connect deadline around [`Connector::connect`] only, so a slow lookup is
/// never mistaken for a filtered port.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    /// Resolved form of a target, handed back to [`Connector::connect`].
    type Addr: Send + Sync + 'static;

    /// Byte stream produced by a successful connect.
    type Stream: AsyncRead + AsyncWrite + Unpin + Send + 'static;

    /// Resolve `host:port` to something that can be dialed.
    async fn resolve(&self, host: &str, port: u16) -> io::Result<Self::Addr>;

    /// Open a connection to a resolved address.
    async fn connect(&self, addr: &Self::Addr) -> io::Result<Self::Stream>;
}

/// Plain operating-system TCP connects.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpConnector;

#[async_trait]
impl Connector for TcpConnector {
    type Addr = SocketAddr;
    type Stream = TcpStream;

    async fn resolve(&self, host: &str, port: u16) -> io::Result<SocketAddr> {
        lookup_host((host, port)).await?.next().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("no addresses found for {host}"),
            )
        })
    }

    async fn connect(&self, addr: &SocketAddr) -> io::Result<TcpStream> {
        TcpStream::connect(*addr).await
    }
}

/// Runs one target's probe lifecycle to completion.
///
/// Implementations must publish their outcome before consuming `done`, and
/// must never panic on network failure: every failure resolves into a
/// [`PortState`].
#[async_trait]
pub trait Probe: Send + Sync + 'static {
    async fn probe(&self, target: ScanTarget, done: Completion);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_state_display() {
        assert_eq!(PortState::Open.to_string(), "OPEN");
        assert_eq!(PortState::Closed.to_string(), "CLOSED");
        assert_eq!(PortState::Filtered.to_string(), "FILTERED");
        assert_eq!(PortState::Error.to_string(), "ERROR");
    }

    #[test]
    fn test_port_state_serialization() {
        let json = serde_json::to_string(&PortState::Filtered).unwrap();
        assert_eq!(json, "\"FILTERED\"");
    }

    #[tokio::test]
    async fn test_resolve_literal_address() {
        let addr = TcpConnector.resolve("127.0.0.1", 8080).await.unwrap();
        assert_eq!(addr, "127.0.0.1:8080".parse::<SocketAddr>().unwrap());
    }

    #[tokio::test]
    async fn test_resolve_failure_is_an_error() {
        assert!(TcpConnector.resolve("no-such-host.invalid", 80).await.is_err());
    }
}
