//! Plain text output formatting.
//!
//! Renders the report as one tree per host, with colors.

use crate::scanner::{PortState, Report, ScanSummary};
use console::{style, StyledObject};
use std::io::{self, Write};

const BRANCH: &str = "├── ";
const LAST_BRANCH: &str = "╰── ";
const PIPE: &str = "│   ";
const SPACE: &str = "    ";

/// Render the report as a tree per host.
///
/// Hosts come out lexicographically, ports ascending, and each banner is a
/// leaf under its port.
pub fn render_tree<W: Write>(out: &mut W, report: &Report) -> io::Result<()> {
    for (host, ports) in report.hosts() {
        writeln!(out, "{}", style(host).blue().bright().bold())?;

        let port_count = ports.len();
        for (i, (port, cell)) in ports.iter().enumerate() {
            let last_port = i + 1 == port_count;
            let (branch, indent) = if last_port {
                (LAST_BRANCH, SPACE)
            } else {
                (BRANCH, PIPE)
            };

            writeln!(
                out,
                "{}{}",
                branch,
                state_style(format!("{} ({})", port, cell.state), cell.state)
            )?;

            let banner_count = cell.banners.len();
            for (j, banner) in cell.banners.iter().enumerate() {
                let last_banner = j + 1 == banner_count;
                let (leaf, leaf_indent) = if last_banner {
                    (LAST_BRANCH, SPACE)
                } else {
                    (BRANCH, PIPE)
                };

                // Multi-line banners keep their continuation lines under the leaf.
                for (k, line) in banner.lines().enumerate() {
                    let prefix = if k == 0 { leaf } else { leaf_indent };
                    writeln!(out, "{}{}{}", indent, prefix, style(line).yellow())?;
                }
                if banner.is_empty() {
                    writeln!(out, "{}{}", indent, leaf)?;
                }
            }
        }

        writeln!(out)?;
    }

    Ok(())
}

fn state_style(text: String, state: PortState) -> StyledObject<String> {
    match state {
        PortState::Open => style(text).green().bright(),
        PortState::Closed => style(text).red().bright(),
        PortState::Filtered | PortState::Error => style(text).black().bright(),
    }
}

/// Render the plain report followed by a one-line summary.
pub fn print_plain<W: Write>(out: &mut W, report: &Report, summary: &ScanSummary) -> io::Result<()> {
    render_tree(out, report)?;
    writeln!(
        out,
        "{} targets in {:.2}s ({} batches): {} open, {} closed, {} filtered, {} error",
        style(summary.targets).bold(),
        summary.duration_ms as f64 / 1000.0,
        summary.batch_sizes.len(),
        style(summary.open).green().bold(),
        style(summary.closed).red(),
        style(summary.filtered).yellow(),
        style(summary.error).dim()
    )
}

/// Print a scan header before scanning begins.
pub fn print_scan_header(hosts: &[String], ports: usize) {
    println!(
        "\n{}\n",
        style(format!("Scanning {} ports on [{}]", ports, hosts.join(", ")))
            .cyan()
            .bright()
    );
}

/// Print an error message.
pub fn print_error(msg: &str) {
    eprintln!("{} {}", style("Error:").red().bold(), msg);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Port;

    fn render(report: &Report) -> String {
        console::set_colors_enabled(false);
        let mut out = Vec::new();
        render_tree(&mut out, report).unwrap();
        String::from_utf8(out).unwrap()
    }

    fn port(n: u16) -> Port {
        Port::new(n).unwrap()
    }

    #[test]
    fn test_tree_layout() {
        let mut report = Report::new();
        report.merge("scanme.nmap.org", port(80), PortState::Open, None);
        report.merge("scanme.nmap.org", port(80), PortState::Open, Some("HTTP/1.1 200 OK".into()));
        report.merge("scanme.nmap.org", port(22), PortState::Open, Some("SSH-2.0-OpenSSH".into()));
        report.merge("scanme.nmap.org", port(445), PortState::Filtered, None);
        report.merge("github.com", port(23), PortState::Closed, None);

        let expected = "\
github.com
╰── 23 (CLOSED)

scanme.nmap.org
├── 22 (OPEN)
│   ╰── SSH-2.0-OpenSSH
├── 80 (OPEN)
│   ╰── HTTP/1.1 200 OK
╰── 445 (FILTERED)

";
        assert_eq!(render(&report), expected);
    }

    #[test]
    fn test_multiple_and_multiline_banners() {
        let mut report = Report::new();
        report.merge("h", port(25), PortState::Open, Some("220 mail\r\n250 ok".into()));
        report.merge("h", port(25), PortState::Open, Some("221 bye".into()));

        let expected = "\
h
╰── 25 (OPEN)
    ├── 220 mail
    │   250 ok
    ╰── 221 bye

";
        assert_eq!(render(&report), expected);
    }

    #[test]
    fn test_ports_sorted_numerically() {
        let mut report = Report::new();
        for p in [8080, 21, 443, 3306] {
            report.merge("h", port(p), PortState::Closed, None);
        }

        let rendered = render(&report);
        let ports: Vec<&str> = rendered
            .lines()
            .filter_map(|l| l.split_whitespace().nth(1))
            .collect();
        assert_eq!(ports, vec!["21", "443", "3306", "8080"]);
    }

    #[test]
    fn test_empty_report_renders_nothing() {
        assert_eq!(render(&Report::new()), "");
    }
}
