//! Command-line interface definitions for portscan.
//!
//! Uses `clap` derive macros for declarative argument parsing.

mod scan;

pub use scan::ScanCommand;

use clap::{ArgAction, Parser};
use std::fmt;
use std::path::PathBuf;

/// portscan - a concurrent TCP port scanner.
///
/// Probes every host × port pair, classifies each as open, closed, filtered
/// or error, and captures whatever banners open services send back.
#[derive(Parser, Debug)]
#[command(name = "portscan")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "A concurrent TCP port scanner with banner capture", long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub scan: ScanCommand,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress the header and progress bar
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to a JSON settings file
    #[arg(long, global = true, value_name = "PATH", env = "PORTSCAN_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Output format for results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable tree per host
    #[default]
    Plain,
    /// JSON structured output
    Json,
    /// CSV format for data analysis
    Csv,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Plain => write!(f, "plain"),
            Self::Json => write!(f, "json"),
            Self::Csv => write!(f, "csv"),
        }
    }
}
