//! Error handling for benchwatch.
//! One error enum per subsystem, `thiserror` only, zero `anyhow`.

pub mod config_error;
pub mod driver_error;
pub mod error_code;
pub mod history_error;
pub mod parse_error;
pub mod runner_error;
pub mod state_error;

pub use config_error::ConfigError;
pub use driver_error::DriverError;
pub use error_code::BenchwatchErrorCode;
pub use history_error::HistoryError;
pub use parse_error::ParseError;
pub use runner_error::RunnerError;
pub use state_error::StateError;
