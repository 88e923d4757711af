//! Driver errors, aggregating subsystem errors via `From` conversions.

use super::error_code::{self, BenchwatchErrorCode};
use super::{ConfigError, HistoryError, ParseError, RunnerError, StateError};

/// Errors that can occur during a full run/schedule pass.
#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("History error: {0}")]
    History(#[from] HistoryError),

    #[error("State error: {0}")]
    State(#[from] StateError),

    #[error("Runner error: {0}")]
    Runner(#[from] RunnerError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Run cancelled")]
    Cancelled,
}

impl BenchwatchErrorCode for DriverError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Parse(e) => e.error_code(),
            Self::History(e) => e.error_code(),
            Self::State(e) => e.error_code(),
            Self::Runner(e) => e.error_code(),
            Self::Config(e) => e.error_code(),
            Self::Cancelled => error_code::CANCELLED,
        }
    }
}
