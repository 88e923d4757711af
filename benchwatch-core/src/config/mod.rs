//! Configuration system for benchwatch.
//! TOML-based, layered resolution: env > project > defaults.

pub mod report_config;
pub mod runner_config;
pub mod sched_config;
pub mod watch_config;

pub use report_config::ReportConfig;
pub use runner_config::RunnerConfig;
pub use sched_config::SchedConfig;
pub use watch_config::WatchConfig;
