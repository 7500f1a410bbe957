//! Output formatting module.
//!
//! Provides formatters for plain text, JSON, and CSV output of scan results.

mod csv_format;
mod json_format;
mod plain;

pub use csv_format::print_csv;
pub use json_format::print_json;
pub use plain::{print_error, print_plain, print_scan_header, render_tree};

use crate::cli::OutputFormat;
use crate::scanner::ScanRun;
use std::io::{self, Write};

/// Format and print scan results to stdout according to the specified format.
pub fn format_results(run: &ScanRun, format: OutputFormat) -> io::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();

    match format {
        OutputFormat::Plain => print_plain(&mut out, &run.report, &run.summary)?,
        OutputFormat::Json => print_json(&mut out, run)?,
        OutputFormat::Csv => print_csv(&mut out, &run.report)?,
    }

    out.flush()
}
