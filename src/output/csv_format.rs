//! CSV output formatting.

use crate::scanner::Report;
use std::io::{self, Write};

/// Write one row per banner, or a single row with an empty banner column
/// for cells without any.
pub fn print_csv<W: Write>(out: &mut W, report: &Report) -> io::Result<()> {
    let mut wtr = csv::Writer::from_writer(out);

    wtr.write_record(["host", "port", "state", "banner"])?;

    for (host, port, cell) in report.cells() {
        let port = port.to_string();
        let state = cell.state.to_string();

        if cell.banners.is_empty() {
            wtr.write_record([host, port.as_str(), state.as_str(), ""])?;
        }
        for banner in &cell.banners {
            wtr.write_record([host, port.as_str(), state.as_str(), banner.as_str()])?;
        }
    }

    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::PortState;
    use crate::types::Port;

    #[test]
    fn test_csv_rows() {
        let mut report = Report::new();
        let p = |n| Port::new(n).unwrap();
        report.merge("b", p(21), PortState::Open, Some("220 ftp, ready".into()));
        report.merge("b", p(21), PortState::Open, Some("230 ok".into()));
        report.merge("a", p(23), PortState::Closed, None);

        let mut out = Vec::new();
        print_csv(&mut out, &report).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert_eq!(
            text,
            "host,port,state,banner\n\
             a,23,CLOSED,\n\
             b,21,OPEN,\"220 ftp, ready\"\n\
             b,21,OPEN,230 ok\n"
        );
    }
}
