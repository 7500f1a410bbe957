//! Error types for portscan.
//!
//! Uses `thiserror` for ergonomic error definitions.

use crate::scanner::PortState;
use crate::types::PortError;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for scanning operations.
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("connect timeout")]
    ConnectTimeout,

    #[error("connection refused")]
    ConnectionRefused,

    #[error("connect failed: {0}")]
    UnclassifiedConnectFailure(#[source] io::Error),

    #[error("unexpected protocol event: {0}")]
    UnexpectedProtocolEvent(String),

    #[error("report unavailable: {0}")]
    ReportUnavailable(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl ScanError {
    /// Classify a failed connect attempt by its OS error kind.
    pub fn from_connect(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::TimedOut => Self::ConnectTimeout,
            io::ErrorKind::ConnectionRefused => Self::ConnectionRefused,
            _ => Self::UnclassifiedConnectFailure(err),
        }
    }

    /// Terminal port state recorded for a probe that ended with this error.
    pub fn port_state(&self) -> PortState {
        match self {
            Self::ConnectTimeout => PortState::Filtered,
            Self::ConnectionRefused => PortState::Closed,
            _ => PortState::Error,
        }
    }
}

/// Result type alias for scan operations.
pub type ScanResult<T> = Result<T, ScanError>;

/// Errors raised while loading settings.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("could not determine configuration directory")]
    DirectoryNotFound,

    #[error("failed to read {path}: {reason}")]
    ReadFailed { path: PathBuf, reason: String },

    #[error("invalid settings format: {0}")]
    InvalidFormat(String),
}

/// Result type alias for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Top-level error for the command-line front end.
#[derive(Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    Scan(#[from] ScanError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Ports(#[from] PortError),

    #[error("output error: {0}")]
    Output(#[from] io::Error),
}

/// Result type alias for CLI operations.
pub type CliResult<T> = Result<T, CliError>;
