//! JSON output formatting.

use crate::scanner::ScanRun;
use std::io::{self, Write};

/// Write the run (summary and report) as pretty-printed JSON.
pub fn print_json<W: Write>(out: &mut W, run: &ScanRun) -> io::Result<()> {
    serde_json::to_writer_pretty(&mut *out, run)?;
    writeln!(out)
}
