//! Persistent side of the tracking engine: the locked, crash-safe task
//! state document and the append-only per-report journal.

pub mod journal;
pub mod state;

pub use journal::Journal;
pub use state::{BenchTask, CommitTasks, RunningMode, StateFile, TaskState};
