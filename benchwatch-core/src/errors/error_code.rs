//! Stable machine-readable error codes.

/// Trait implemented by every subsystem error enum, mapping each error to a
/// stable code that log consumers can match on.
pub trait BenchwatchErrorCode {
    fn error_code(&self) -> &'static str;
}

pub const CONFIG_ERROR: &str = "BW1000";
pub const PARSE_ERROR: &str = "BW2000";
pub const HISTORY_ERROR: &str = "BW3000";
pub const STATE_ERROR: &str = "BW4000";
pub const STATE_LOCKED: &str = "BW4001";
pub const STATE_VERSION: &str = "BW4002";
pub const STATE_TRANSITION: &str = "BW4003";
pub const RUNNER_ERROR: &str = "BW5000";
pub const RUNNER_ABORTED: &str = "BW5001";
pub const CANCELLED: &str = "BW9000";
