//! # portscan - a concurrent TCP port scanner
//!
//! Probes every (host, port) pair with a TCP connect, classifies the port
//! as open, closed, filtered or error, optionally writes probe payloads to
//! open ports to coax out service banners, and aggregates everything into a
//! per-host, per-port report.
//!
//! ## Example Usage
//!
//! ```rust,ignore
//! use portscan::scanner::{run_scan, ScanConfig};
//! use portscan::types::PortList;
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = ScanConfig::new(vec!["scanme.nmap.org".into()], "22,80".parse().unwrap())
//!         .with_max_concurrency(10);
//!
//!     let run = run_scan(&config, None).await.unwrap();
//!     for (host, port, cell) in run.report.cells() {
//!         println!("{host}:{port} {} {:?}", cell.state, cell.banners);
//!     }
//! }
//! ```
//!
//! ## Architecture
//!
//! - [`types`] - ports, port lists, scan targets and the target generator
//! - [`scanner`] - scheduler, probe workers, aggregator and the run driver
//! - [`banner`] - payload templating and banner decoding
//! - [`config`] - settings file and defaults
//! - [`output`] - tree, JSON and CSV renderers
//! - [`error`] - error types

pub mod banner;
pub mod cli;
pub mod config;
pub mod error;
pub mod output;
pub mod scanner;
pub mod types;

// Re-export commonly used types
pub use error::{CliError, ScanError};
pub use scanner::{run_scan, Aggregator, PortState, Report, ScanConfig, ScanRun};
pub use types::{Port, PortList, ScanTarget, Targets};
