//! Persistent-state errors.
//!
//! A corrupt state document is deliberately NOT an error at load time: the
//! store logs it and falls back to a fresh state. The variants here cover
//! the cases that must refuse the requested mutation instead.

use super::error_code::{self, BenchwatchErrorCode};

/// Errors that can occur while reading or mutating the persistent task state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("I/O error on state file {path}: {message}")]
    Io { path: String, message: String },

    #[error("Failed to acquire exclusive lock on {path}: {message}")]
    LockFailed { path: String, message: String },

    #[error("State document version {found} is newer than supported version {supported}")]
    UnsupportedVersion { found: u32, supported: u32 },

    #[error("Illegal running-mode transition: {from} -> {to}")]
    IllegalTransition { from: String, to: String },

    #[error("Profile is already set to '{current}', refusing to change it to '{requested}'")]
    ProfileAlreadySet { current: String, requested: String },

    #[error("Invalid profile name: {0:?}")]
    InvalidProfile(String),

    #[error("Failed to serialize state: {message}")]
    Serialize { message: String },
}

impl BenchwatchErrorCode for StateError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::LockFailed { .. } => error_code::STATE_LOCKED,
            Self::UnsupportedVersion { .. } => error_code::STATE_VERSION,
            Self::IllegalTransition { .. } => error_code::STATE_TRANSITION,
            _ => error_code::STATE_ERROR,
        }
    }
}
