//! Commit-history errors.

use super::error_code::{self, BenchwatchErrorCode};

/// Errors that can occur while loading the commit history.
#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    #[error("Failed to open repository at {path}: {message}")]
    RepoOpenFailed { path: String, message: String },

    #[error("Failed to walk repository history: {message}")]
    WalkFailed { message: String },

    #[error("Malformed history line {line_no}: {line:?}")]
    MalformedLine { line_no: usize, line: String },
}

impl BenchwatchErrorCode for HistoryError {
    fn error_code(&self) -> &'static str {
        error_code::HISTORY_ERROR
    }
}
