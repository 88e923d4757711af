//! Result-store parse errors.
//!
//! Only structural problems (missing log directory, missing commit list)
//! are errors; malformed rows inside result files are logged and skipped.

use super::error_code::{self, BenchwatchErrorCode};

/// Errors that can occur while parsing a log directory into a report.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("Log directory {path} does not exist or is not readable: {message}")]
    LogDirUnreadable { path: String, message: String },

    #[error("Log directory {path} does not contain a commit_list file")]
    MissingCommitList { path: String },

    #[error("The commit_list file is empty")]
    EmptyCommitList,
}

impl BenchwatchErrorCode for ParseError {
    fn error_code(&self) -> &'static str {
        error_code::PARSE_ERROR
    }
}
