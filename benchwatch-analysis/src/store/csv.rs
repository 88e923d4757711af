//! Result-file payload parsing.
//!
//! Throughput files hold one numeric sample per cell; unit files hold
//! `key: status` lines. Either may open with a comment line describing
//! unit and polarity. Malformed cells are logged and skipped, never fatal.

use std::collections::BTreeMap;
use std::path::Path;

use benchwatch_core::units::Unit;
use regex::Regex;
use tracing::warn;

/// Unit and polarity recovered from a result file's comment header.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultHeader {
    pub unit: String,
    /// Explicit `(more|less) is better` marker, when present.
    pub polarity: Option<bool>,
    pub name: Option<String>,
}

impl ResultHeader {
    /// Resolved polarity: the explicit marker wins, then the known unit
    /// family, then the more-is-better default.
    pub fn more_is_better(&self) -> bool {
        self.polarity
            .or_else(|| Unit::parse(&self.unit).map(|u| u.more_is_better()))
            .unwrap_or(true)
    }
}

fn header_regex() -> Regex {
    // Infallible: the pattern is a compile-time constant.
    #[allow(clippy::unwrap_used)]
    Regex::new(
        r"^# (?P<unit>.+?)(?: \((?P<polarity>more|less) is better\))? of '(?P<name>.+?)' using (?:commit|version) (?P<id>\S+)$",
    )
    .unwrap()
}

/// Parse `# <unit> [(<more|less> is better)] of '<name>' using commit <id>`.
pub fn parse_header(line: &str) -> Option<ResultHeader> {
    let caps = header_regex().captures(line.trim_end())?;
    Some(ResultHeader {
        unit: caps["unit"].to_string(),
        polarity: caps.name("polarity").map(|p| p.as_str() == "more"),
        name: caps.name("name").map(|m| m.as_str().to_string()),
    })
}

/// Parse a throughput result file into numeric samples.
///
/// Cells are comma-separated within a line; blank lines and comment lines
/// other than the recognized header are skipped.
pub fn parse_samples(path: &Path, contents: &str) -> (Vec<f64>, Option<ResultHeader>) {
    let mut samples = Vec::new();
    let mut header = None;

    for (line_no, line) in contents.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line.starts_with('#') {
            if header.is_none() {
                header = parse_header(line);
            }
            continue;
        }
        for cell in line.split(',') {
            let cell = cell.trim();
            if cell.is_empty() {
                continue;
            }
            match cell.parse::<f64>() {
                Ok(value) => samples.push(value),
                Err(_) => warn!(
                    file = %path.display(),
                    line = line_no + 1,
                    cell,
                    "skipping malformed numeric cell"
                ),
            }
        }
    }
    (samples, header)
}

/// Parse a unit-test run file of `key: status` lines.
pub fn parse_unit_statuses(path: &Path, contents: &str) -> (BTreeMap<String, String>, Option<ResultHeader>) {
    let mut statuses = BTreeMap::new();
    let mut header = None;

    for (line_no, line) in contents.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line.starts_with('#') {
            if header.is_none() {
                header = parse_header(line);
            }
            continue;
        }
        match line.split_once(':') {
            Some((key, status)) => {
                statuses.insert(key.trim().to_string(), status.trim().to_string());
            }
            None => warn!(
                file = %path.display(),
                line = line_no + 1,
                "skipping unit line without a status separator"
            ),
        }
    }
    (statuses, header)
}
