//! `scan` command: list the script containers of a document.
//!
//! Runs only the locator, so it is safe on any input and never invokes an
//! adapter. Output goes to stdout, either as a table or as JSON:
//!
//! ```text
//!    #  line  bytes  status            attributes
//!    0     4     42  transform         type="text/javascript"
//!    1     9      0  skip (external)   src="app.js" defer
//! ```

use std::io::{self, Write};

use anyhow::Result;
use serde::Serialize;

use super::{ScanArgs, build::read_document};
use crate::{
    config::Config,
    log,
    script::{Region, RegionKind, locate},
    utils::plural_count,
};

/// One row of scan output.
#[derive(Debug, Serialize)]
struct RegionRow<'a> {
    index: usize,
    line: usize,
    bytes: usize,
    #[serde(flatten)]
    kind: &'a RegionKind,
    attributes: &'a str,
}

impl<'a> RegionRow<'a> {
    fn new(region: &'a Region, document: &str) -> Self {
        Self {
            index: region.index,
            line: line_of(document, region.span.start),
            bytes: region.payload.len(),
            kind: &region.kind,
            attributes: region.attrs.trim(),
        }
    }
}

/// 1-based line number of byte `offset`.
fn line_of(document: &str, offset: usize) -> usize {
    document.as_bytes()[..offset.min(document.len())]
        .iter()
        .filter(|&&b| b == b'\n')
        .count()
        + 1
}

/// Scan the configured input document.
pub fn scan_document(config: &Config, args: &ScanArgs) -> Result<()> {
    let document = read_document(&config.build.input)?;
    let extraction = locate(&document);
    let rows: Vec<_> = extraction
        .regions
        .iter()
        .map(|region| RegionRow::new(region, &document))
        .collect();

    let mut out = io::stdout().lock();
    if args.json {
        serde_json::to_writer_pretty(&mut out, &rows)?;
        writeln!(out)?;
    } else {
        write_table(&mut out, &rows)?;
    }
    out.flush()?;

    log!(
        "scan";
        "{}: {}, {} transformable",
        config.root_relative(&config.build.input).display(),
        plural_count(rows.len(), "script"),
        extraction.transformable_count()
    );
    Ok(())
}

fn write_table(out: &mut impl Write, rows: &[RegionRow<'_>]) -> io::Result<()> {
    writeln!(
        out,
        "{:>4}  {:>4}  {:>5}  {:<16}  attributes",
        "#", "line", "bytes", "status"
    )?;
    for row in rows {
        writeln!(
            out,
            "{:>4}  {:>4}  {:>5}  {:<16}  {}",
            row.index,
            row.line,
            row.bytes,
            row.kind.to_string(),
            row.attributes
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOCUMENT: &str = "<html>\n<head>\n<script src=\"app.js\" defer></script>\n</head>\n<body>\n<script type=\"text/javascript\">go()</script>\n</body>\n</html>\n";

    fn rows(document: &str) -> Vec<(usize, usize, usize, String)> {
        locate(document)
            .regions
            .iter()
            .map(|r| {
                let row = RegionRow::new(r, document);
                (row.index, row.line, row.bytes, row.kind.to_string())
            })
            .collect()
    }

    #[test]
    fn test_line_of() {
        assert_eq!(line_of("a\nb\nc", 0), 1);
        assert_eq!(line_of("a\nb\nc", 2), 2);
        assert_eq!(line_of("a\nb\nc", 4), 3);
        assert_eq!(line_of("a", 99), 1);
    }

    #[test]
    fn test_rows() {
        assert_eq!(
            rows(DOCUMENT),
            vec![
                (0, 3, 0, "skip (external)".to_string()),
                (1, 6, 4, "transform".to_string()),
            ]
        );
    }

    #[test]
    fn test_table() {
        let extraction = locate(DOCUMENT);
        let rows: Vec<_> = extraction
            .regions
            .iter()
            .map(|r| RegionRow::new(r, DOCUMENT))
            .collect();

        let mut out = Vec::new();
        write_table(&mut out, &rows).unwrap();
        let table = String::from_utf8(out).unwrap();
        let lines: Vec<_> = table.lines().collect();

        assert_eq!(lines.len(), 3);
        assert!(lines[1].contains("skip (external)"));
        assert!(lines[1].ends_with("src=\"app.js\" defer"));
        assert!(lines[2].contains("transform"));
    }

    #[test]
    fn test_json_rows() {
        let extraction = locate(DOCUMENT);
        let rows: Vec<_> = extraction
            .regions
            .iter()
            .map(|r| RegionRow::new(r, DOCUMENT))
            .collect();

        let json = serde_json::to_value(&rows).unwrap();
        assert_eq!(json[0]["status"], "pass_through");
        assert_eq!(json[0]["reason"], "external");
        assert_eq!(json[0]["attributes"], "src=\"app.js\" defer");
        assert_eq!(json[1]["status"], "transformable");
        assert_eq!(json[1]["bytes"], 4);
    }
}
