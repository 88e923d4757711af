//! The run driver: one pass of the continuous tracking loop.
//!
//! A pass reconciles the persisted task tree against the results already
//! on disk, dispatches the external runner for whatever remains, and
//! classifies its exit statuses. Re-invoking with no new results is a
//! guaranteed no-op: reality on disk, not the task tree, is the source
//! of truth for what has been done.

use std::path::{Path, PathBuf};

use benchwatch_core::config::WatchConfig;
use benchwatch_core::errors::{DriverError, RunnerError};
use benchwatch_core::traits::Cancellable;
use benchwatch_storage::{Journal, RunningMode, StateFile, TaskState};
use rustc_hash::FxHashSet;
use tracing::{info, warn};

use benchwatch_analysis::history::CommitHistory;
use benchwatch_analysis::report::Report;
use benchwatch_analysis::store::ResultStore;
use benchwatch_analysis::synth::enhance_report;

use crate::runner::{BenchRunner, RunRequest, NOOP_BENCHMARK};
use crate::scheduler;

pub const STATE_FILE: &str = "benchwatch.state";

/// One unit of outstanding work after reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub commit: String,
    pub benchmark: String,
    pub rounds: usize,
}

/// Drives one report: parse, reconcile, dispatch, schedule.
pub struct RunDriver<R> {
    log_folder: PathBuf,
    config: WatchConfig,
    state_file: StateFile,
    journal: Journal,
    runner: R,
}

impl<R: BenchRunner> RunDriver<R> {
    pub fn new(log_folder: impl Into<PathBuf>, config: WatchConfig, runner: R) -> Self {
        let log_folder = log_folder.into();
        Self {
            state_file: StateFile::new(log_folder.join(STATE_FILE)),
            journal: Journal::new(&log_folder),
            log_folder,
            config,
            runner,
        }
    }

    pub fn state_file(&self) -> &StateFile {
        &self.state_file
    }

    pub fn journal(&self) -> &Journal {
        &self.journal
    }

    pub fn log_folder(&self) -> &Path {
        &self.log_folder
    }

    /// Parse the log directory and, when a history is given, enhance the
    /// report with positions and events.
    pub fn report(&self, history: Option<&CommitHistory>) -> Result<Report, DriverError> {
        let mut report = ResultStore::new(&self.log_folder)
            .with_frametime(self.config.report.frametime)
            .parse(None)?;
        enhance_report(&mut report, history, &self.config.sched);
        Ok(report)
    }

    /// Score the report's events and persist the best commit's new rounds.
    pub fn schedule_enhancements(
        &self,
        report: &Report,
        history: &CommitHistory,
    ) -> Result<usize, DriverError> {
        let added = scheduler::schedule_enhancements(
            &self.state_file,
            &self.journal,
            report,
            history,
            &self.config.sched,
        )?;
        Ok(added)
    }

    /// One dispatch pass. Returns `false` without running anything when
    /// the mode is not armable or no work remains.
    pub fn run(&self, token: &dyn Cancellable) -> Result<bool, DriverError> {
        let state = self.state_file.load()?;
        if !state.mode.is_armable() {
            self.journal.warning(&format!(
                "run requested while in mode {}, not dispatching",
                state.mode
            ));
            return Ok(false);
        }

        // A missing or empty log directory just means nothing ran yet.
        let report = match ResultStore::new(&self.log_folder).parse(None) {
            Ok(report) => report,
            Err(e) => {
                self.journal.debug(&format!("no parseable results yet: {e}"));
                Report::default()
            }
        };

        let tasks = remaining_tasks(&state, &report);
        if tasks.is_empty() {
            self.journal.info("task tree is empty, nothing to run");
            return Ok(false);
        }
        info!(tasks = tasks.len(), "dispatching outstanding work");

        self.state_file.force_running_mode(RunningMode::Running)?;
        let outcome = self.dispatch(&tasks, &report, token);

        // Leave an externally requested PAUSE in place; otherwise re-arm.
        self.state_file.with_exclusive_lock(|state| {
            state.been_run_before = true;
            if state.mode == RunningMode::Running {
                state.mode = RunningMode::Run;
            }
            Ok(())
        })?;
        outcome?;
        Ok(true)
    }

    fn dispatch(
        &self,
        tasks: &[Task],
        report: &Report,
        token: &dyn Cancellable,
    ) -> Result<(), DriverError> {
        let ordered = self.deployed_first(tasks);
        // Commits whose compile log already records a build failure stay
        // skipped across passes, not just within the one that saw them fail.
        let mut broken: FxHashSet<String> = report
            .commits
            .iter()
            .filter(|commit| commit.build_broken())
            .map(|commit| commit.sha1.clone())
            .collect();

        for task in &ordered {
            if token.is_cancelled() {
                self.journal.info("cancellation requested, stopping between tasks");
                return Err(DriverError::Cancelled);
            }
            if self.state_file.load()?.mode == RunningMode::Pause {
                self.journal.info("pause requested, stopping between tasks");
                return Ok(());
            }
            if broken.iter().any(|b| sha_matches(b, &task.commit)) {
                self.journal.warning(&format!(
                    "skipping {} on {}: commit is broken",
                    task.benchmark, task.commit
                ));
                continue;
            }

            let benchmarks = [task.benchmark.clone()];
            let request = RunRequest {
                commit: &task.commit,
                benchmarks: &benchmarks,
                rounds: task.rounds,
                dry_run: false,
            };
            let outcome = self.runner.run(&request)?;

            if outcome.status.is_ok() {
                continue;
            }
            if outcome.status.breaks_build() {
                self.journal.error(&format!(
                    "commit {} does not build ({}), skipping its remaining tasks",
                    task.commit, outcome.status
                ));
                broken.insert(task.commit.clone());
            } else if outcome.status.is_unrecoverable() {
                self.journal.error(&format!(
                    "runner reported an unrecoverable failure ({}), entering ERROR mode",
                    outcome.status
                ));
                self.state_file.force_running_mode(RunningMode::Error)?;
                return Err(RunnerError::Unrecoverable {
                    code: outcome.status.code(),
                }
                .into());
            } else {
                self.journal.warning(&format!(
                    "runner failed transiently on {} ({}), will retry next pass",
                    task.commit, outcome.status
                ));
            }
        }
        Ok(())
    }

    /// Put tasks for the currently deployed commit first: re-deploying is
    /// the expensive part of a task switch.
    fn deployed_first(&self, tasks: &[Task]) -> Vec<Task> {
        let deployed = tasks.first().and_then(|first| {
            let benchmarks = [NOOP_BENCHMARK.to_string()];
            let probe = RunRequest {
                commit: &first.commit,
                benchmarks: &benchmarks,
                rounds: 0,
                dry_run: true,
            };
            match self.runner.run(&probe) {
                Ok(outcome) => outcome.repo.map(|r| r.deployed_version),
                Err(e) => {
                    warn!(error = %e, "could not probe the deployed version");
                    None
                }
            }
        });

        let mut ordered: Vec<Task> = tasks.to_vec();
        if let Some(deployed) = deployed {
            ordered.sort_by_key(|t| !sha_matches(&t.commit, &deployed));
        }
        ordered
    }
}

/// Prefix match in either direction: state keys and runner output may
/// carry hashes of different lengths.
fn sha_matches(a: &str, b: &str) -> bool {
    !a.is_empty() && !b.is_empty() && (a.starts_with(b) || b.starts_with(a))
}

/// Subtract the rounds already observable in the report from the task
/// tree. A no-op task counts as done once the commit's build status is
/// known; a benchmark task once enough samples or runs exist.
pub fn remaining_tasks(state: &TaskState, report: &Report) -> Vec<Task> {
    let mut tasks = Vec::new();
    for (commit_key, commit_tasks) in &state.commits {
        let observed_commit = report
            .commits
            .iter()
            .find(|c| sha_matches(&c.sha1, commit_key));

        for (bench_name, task) in &commit_tasks.benchmarks {
            let observed = match observed_commit {
                None => 0,
                Some(commit) => {
                    if bench_name == NOOP_BENCHMARK {
                        if commit.compile_status == benchwatch_core::status::RunnerStatus::Unknown {
                            0
                        } else {
                            task.rounds
                        }
                    } else {
                        report
                            .benchmark_index(bench_name)
                            .and_then(|idx| commit.result_for(idx))
                            .map_or(0, |r| r.rounds())
                    }
                }
            };
            let remaining = task.rounds.saturating_sub(observed);
            if remaining > 0 {
                tasks.push(Task {
                    commit: commit_key.clone(),
                    benchmark: bench_name.clone(),
                    rounds: remaining,
                });
            }
        }
    }
    tasks
}
