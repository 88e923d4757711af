//! Append-only per-report journal.
//!
//! Everything the engine decides about a report lands here with a severity
//! tag and a timestamp, so an operator can reconstruct why a round was
//! scheduled or a mode changed long after the fact. The format is read by
//! shell tooling; keep it one line per entry.

use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Local;
use tracing::warn;

pub const JOURNAL_FILE: &str = "benchwatch.log";

/// Severity tag of one journal line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warning,
    Error,
    Debug,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            Self::Info => "II",
            Self::Warning => "WW",
            Self::Error => "EE",
            Self::Debug => "DD",
        };
        f.write_str(tag)
    }
}

/// Writer for one report's journal file.
pub struct Journal {
    path: PathBuf,
}

impl Journal {
    /// Journal of the report stored in `log_folder`.
    pub fn new(log_folder: &Path) -> Self {
        Self {
            path: log_folder.join(JOURNAL_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one line. Journal failures are reported on the tracing side
    /// and otherwise swallowed; losing a log line must never fail the
    /// operation being logged.
    pub fn log(&self, severity: Severity, message: &str) {
        let stamp = Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
        let line = format!("{severity} [{stamp}] {message}\n");

        let result = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .and_then(|mut file| file.write_all(line.as_bytes()));
        if let Err(e) = result {
            warn!(path = %self.path.display(), error = %e, "journal append failed");
        }
    }

    pub fn info(&self, message: &str) {
        self.log(Severity::Info, message);
    }

    pub fn warning(&self, message: &str) {
        self.log(Severity::Warning, message);
    }

    pub fn error(&self, message: &str) {
        self.log(Severity::Error, message);
    }

    pub fn debug(&self, message: &str) {
        self.log(Severity::Debug, message);
    }
}
