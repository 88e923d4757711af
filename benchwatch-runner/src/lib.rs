//! Run driver for continuous benchmark tracking: reconciles the persisted
//! task tree against observed results, dispatches the external runner,
//! and feeds synthesized events back into the schedule.

pub mod driver;
pub mod runner;
pub mod scheduler;

pub use driver::{remaining_tasks, RunDriver, Task};
pub use runner::{BenchRunner, RepoInfo, RunOutcome, RunRequest, ShellRunner, NOOP_BENCHMARK};
pub use scheduler::{schedule_enhancements, ProposedTask};
