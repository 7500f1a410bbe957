//! Scan command implementation.
//!
//! Merges command-line overrides into the loaded settings, runs the scan
//! and prints the report.

use crate::cli::OutputFormat;
use crate::config::Settings;
use crate::error::CliResult;
use crate::output;
use crate::scanner::{run_scan, ScanConfig};
use crate::types::PortList;
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Scan hosts for open ports.
#[derive(Args, Debug)]
pub struct ScanCommand {
    /// Hosts to scan (hostnames or IP addresses), in order
    #[arg(value_name = "HOST")]
    pub hosts: Vec<String>,

    /// Ports to scan, in order (e.g. "22", "22,80,443", "8000-8010")
    #[arg(short, long)]
    pub ports: Option<String>,

    /// Maximum number of probes in flight (one batch)
    #[arg(short = 'c', long = "max-concurrency")]
    pub max_concurrency: Option<usize>,

    /// Per-target timeout in milliseconds; connects get this minus 500ms
    #[arg(short = 't', long)]
    pub timeout: Option<u64>,

    /// Probe payload sent to open ports; `#host#` becomes the scanned host
    #[arg(long = "payload", value_name = "TEMPLATE", conflicts_with = "no_payloads")]
    pub payloads: Vec<String>,

    /// Send no probe payloads, only capture what services volunteer
    #[arg(long)]
    pub no_payloads: bool,

    /// Output format for results
    #[arg(short, long, value_enum, default_value = "plain")]
    pub output: OutputFormat,
}

impl ScanCommand {
    /// Layer the command-line flags over `settings`.
    pub fn apply(&self, settings: Settings) -> CliResult<ScanConfig> {
        let mut config = settings.into_scan_config();

        if !self.hosts.is_empty() {
            config.hosts = self.hosts.clone();
        }
        if let Some(ports) = &self.ports {
            config.ports = ports.parse::<PortList>()?;
        }
        if let Some(max_concurrency) = self.max_concurrency {
            config.max_concurrency = max_concurrency;
        }
        if let Some(timeout) = self.timeout {
            config.timeout = Duration::from_millis(timeout);
        }
        if self.no_payloads {
            config.payloads.clear();
        } else if !self.payloads.is_empty() {
            config.payloads = self.payloads.clone();
        }

        config.validate()?;
        Ok(config)
    }

    /// Execute the scan command.
    pub async fn execute(&self, settings: Settings, quiet: bool) -> CliResult<()> {
        let config = self.apply(settings)?;
        let chatty = !quiet && self.output == OutputFormat::Plain;

        if chatty {
            output::print_scan_header(&config.hosts, config.ports.len());
        }

        let progress = chatty.then(|| progress_bar(config.total_targets() as u64));
        let run = run_scan(&config, progress.clone()).await?;

        if let Some(pb) = progress {
            pb.finish_and_clear();
        }

        output::format_results(&run, self.output)?;
        Ok(())
    }
}

fn progress_bar(total: u64) -> ProgressBar {
    let pb = ProgressBar::new(total);
    let style = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%)")
        .map(|s| s.progress_chars("=>-"))
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    pb.set_style(style);
    pb
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use crate::error::CliError;
    use clap::Parser;

    fn command(args: &[&str]) -> ScanCommand {
        let mut argv = vec!["portscan"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap().scan
    }

    #[test]
    fn test_flags_override_settings() {
        let settings = Settings {
            hosts: Some(vec!["from-file".into()]),
            timeout_ms: Some(9000),
            ..Settings::default()
        };

        let config = command(&["cli-host", "-p", "443,22", "-c", "8"]).apply(settings).unwrap();
        assert_eq!(config.hosts, vec!["cli-host"]);
        assert_eq!(config.ports.to_string(), "443,22");
        assert_eq!(config.max_concurrency, 8);
        assert_eq!(config.timeout, Duration::from_millis(9000));
    }

    #[test]
    fn test_settings_used_when_flags_absent() {
        let config = command(&[]).apply(Settings::default()).unwrap();
        assert_eq!(config.hosts, vec!["scanme.nmap.org", "github.com"]);
        assert_eq!(config.ports.len(), 24);
    }

    #[test]
    fn test_payload_flags() {
        let config = command(&["--no-payloads"]).apply(Settings::default()).unwrap();
        assert!(config.payloads.is_empty());

        let config = command(&["--payload", "A #host#", "--payload", "B"])
            .apply(Settings::default())
            .unwrap();
        assert_eq!(config.payloads, vec!["A #host#", "B"]);
    }

    #[test]
    fn test_bad_flags_are_errors() {
        assert!(matches!(
            command(&["-p", "0"]).apply(Settings::default()),
            Err(CliError::Ports(_))
        ));
        assert!(matches!(
            command(&["-t", "500"]).apply(Settings::default()),
            Err(CliError::Scan(_))
        ));
    }
}
