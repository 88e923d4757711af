//! External benchmark-runner errors.

use super::error_code::{self, BenchwatchErrorCode};

/// Errors that can occur while invoking the external benchmark runner.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    #[error("Failed to spawn runner {command}: {message}")]
    SpawnFailed { command: String, message: String },

    #[error("Failed to feed benchmark names to the runner: {message}")]
    StdinFailed { message: String },

    #[error("Runner terminated by a signal")]
    Killed,

    #[error("Runner reported an unrecoverable setup failure (exit code {code})")]
    Unrecoverable { code: i32 },
}

impl BenchwatchErrorCode for RunnerError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Unrecoverable { .. } => error_code::RUNNER_ABORTED,
            _ => error_code::RUNNER_ERROR,
        }
    }
}
