//! Serialized shape of the task state document.
//!
//! The JSON layout (key names included) is a public contract shared with
//! dashboards and shell tooling that read the file directly.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Versions newer than this are refused rather than half-understood.
pub const STATE_VERSION: u32 = 1;

/// Lifecycle mode of one tracked report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "i32", into = "i32")]
pub enum RunningMode {
    /// Fresh state, never armed. Equivalent to [`Self::Run`] for arming.
    Initial,
    /// Armed: the next run call may dispatch work.
    Run,
    /// A run call is currently dispatching work.
    Running,
    /// Operator asked for a prompt stop; checked between tasks.
    Pause,
    /// An unrecoverable runner failure; requires a manual mode reset.
    Error,
}

impl RunningMode {
    pub fn as_i32(self) -> i32 {
        i32::from(self)
    }

    /// True for the states from which a run call may start dispatching.
    pub fn is_armable(self) -> bool {
        matches!(self, Self::Initial | Self::Run)
    }
}

impl From<RunningMode> for i32 {
    fn from(mode: RunningMode) -> Self {
        match mode {
            RunningMode::Initial => 0,
            RunningMode::Run => 1,
            RunningMode::Running => 2,
            RunningMode::Pause => 3,
            RunningMode::Error => 4,
        }
    }
}

impl From<i32> for RunningMode {
    /// Unknown integers map to [`Self::Error`]: a document written by a
    /// newer tool must not silently arm the runner.
    fn from(value: i32) -> Self {
        match value {
            0 => Self::Initial,
            1 => Self::Run,
            2 => Self::Running,
            3 => Self::Pause,
            4 => Self::Error,
            _ => Self::Error,
        }
    }
}

impl fmt::Display for RunningMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Initial => "INITIAL",
            Self::Run => "RUN",
            Self::Running => "RUNNING",
            Self::Pause => "PAUSE",
            Self::Error => "ERROR",
        };
        f.write_str(name)
    }
}

/// Remaining rounds of one benchmark on one commit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BenchTask {
    pub rounds: usize,
}

/// All scheduled benchmarks of one commit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitTasks {
    pub benchmarks: BTreeMap<String, BenchTask>,
}

impl CommitTasks {
    pub fn is_empty(&self) -> bool {
        self.benchmarks.is_empty()
    }
}

/// The whole persisted document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskState {
    pub version: u32,
    pub commits: BTreeMap<String, CommitTasks>,
    pub mode: RunningMode,
    pub profile: Option<String>,
    pub conf_script: Option<String>,
    pub commit_url: Option<String>,
    #[serde(rename = "beenRunBefore")]
    pub been_run_before: bool,
}

impl Default for TaskState {
    fn default() -> Self {
        Self {
            version: STATE_VERSION,
            commits: BTreeMap::new(),
            mode: RunningMode::Initial,
            profile: None,
            conf_script: None,
            commit_url: None,
            been_run_before: false,
        }
    }
}

impl TaskState {
    /// Rounds currently scheduled for (commit, benchmark), 0 when absent.
    pub fn scheduled_rounds(&self, commit: &str, benchmark: &str) -> usize {
        self.commits
            .get(commit)
            .and_then(|c| c.benchmarks.get(benchmark))
            .map_or(0, |t| t.rounds)
    }

    /// Raise the scheduled rounds of (commit, benchmark) to `total`,
    /// returning how many rounds that adds. Never lowers an entry.
    pub fn raise_rounds(&mut self, commit: &str, benchmark: &str, total: usize) -> usize {
        let entry = self
            .commits
            .entry(commit.to_string())
            .or_default()
            .benchmarks
            .entry(benchmark.to_string())
            .or_default();
        if total <= entry.rounds {
            return 0;
        }
        let added = total - entry.rounds;
        entry.rounds = total;
        added
    }

    /// Remove `count` rounds from (commit, benchmark), clamped at zero.
    /// Empty entries and empty commits are dropped.
    pub fn consume_rounds(&mut self, commit: &str, benchmark: &str, count: usize) {
        if let Some(tasks) = self.commits.get_mut(commit) {
            if let Some(task) = tasks.benchmarks.get_mut(benchmark) {
                task.rounds = task.rounds.saturating_sub(count);
                if task.rounds == 0 {
                    tasks.benchmarks.remove(benchmark);
                }
            }
            if tasks.is_empty() {
                self.commits.remove(commit);
            }
        }
    }

    pub fn has_work(&self) -> bool {
        self.commits.values().any(|c| !c.is_empty())
    }
}
