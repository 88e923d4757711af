//! Event-driven enhancement scheduling.
//!
//! Turns the synthesized event timeline into proposed benchmark rounds,
//! scores them, and persists the winning commit's tasks. Round counts in
//! the task state are desired totals; reconciliation in the driver
//! subtracts what already exists on disk.

use benchwatch_core::config::SchedConfig;
use benchwatch_core::events::{CommitRange, Event};
use benchwatch_storage::{Journal, StateFile, TaskState};
use tracing::debug;

use benchwatch_analysis::history::CommitHistory;
use benchwatch_analysis::report::Report;

use crate::runner::NOOP_BENCHMARK;

const PRIORITY_BUILD: f64 = 0.5;
const PRIORITY_PERF: f64 = 0.75;
const PRIORITY_SIGNIFICANCE: f64 = 1.0;
const PRIORITY_UNIT_CHANGE: f64 = 1.0;

/// Additional rounds asked for when a result is under-sampled.
const SIGNIFICANCE_STEP: usize = 2;

/// One scored unit of proposed work.
#[derive(Debug, Clone, PartialEq)]
pub struct ProposedTask {
    pub commit: String,
    pub benchmark: String,
    /// Desired total rounds for (commit, benchmark).
    pub rounds: usize,
    pub score: f64,
}

/// Map every event to at most one proposed task.
pub fn propose(
    report: &Report,
    history: &CommitHistory,
    state: &TaskState,
    sched: &SchedConfig,
) -> Vec<ProposedTask> {
    let mut tasks: Vec<ProposedTask> = Vec::new();
    for event in &report.events {
        if let Some(task) = propose_for_event(event, report, history, state, sched) {
            merge_task(&mut tasks, task);
        }
    }
    tasks
}

/// Same (commit, benchmark) from several events keeps the higher ask and
/// the higher score.
fn merge_task(tasks: &mut Vec<ProposedTask>, task: ProposedTask) {
    match tasks
        .iter_mut()
        .find(|t| t.commit == task.commit && t.benchmark == task.benchmark)
    {
        Some(existing) => {
            existing.rounds = existing.rounds.max(task.rounds);
            existing.score = existing.score.max(task.score);
        }
        None => tasks.push(task),
    }
}

fn propose_for_event(
    event: &Event,
    report: &Report,
    history: &CommitHistory,
    state: &TaskState,
    sched: &SchedConfig,
) -> Option<ProposedTask> {
    match event {
        Event::BuildBroken { range } => {
            let (mid_idx, sha) = range_midpoint(range, history)?;
            Some(ProposedTask {
                commit: sha,
                benchmark: NOOP_BENCHMARK.to_string(),
                rounds: 1,
                score: score(history, mid_idx, 1.0, 1.0, PRIORITY_BUILD),
            })
        }
        Event::BuildFixed { fixed, .. } => {
            let (mid_idx, sha) = range_midpoint(fixed, history)?;
            Some(ProposedTask {
                commit: sha,
                benchmark: NOOP_BENCHMARK.to_string(),
                rounds: 1,
                score: score(history, mid_idx, 1.0, 1.0, PRIORITY_BUILD),
            })
        }
        Event::PerfChange {
            benchmark,
            range,
            confidence,
            ..
        } => {
            // An endpoint too noisy to trust must not steer bisection.
            let old_sha = &range.old.as_ref()?.sha1;
            let (old_rounds, old_margin) = result_shape(report, old_sha, benchmark)?;
            let (new_rounds, new_margin) = result_shape(report, &range.new.sha1, benchmark)?;
            if old_margin > sched.max_variance || new_margin > sched.max_variance {
                debug!(benchmark, "perf event skipped, endpoint margin too wide");
                return None;
            }

            let (mid_idx, sha) = range_midpoint(range, history)?;
            let diff = event.perf_diff().unwrap_or(0.0).abs().min(1.0);
            Some(ProposedTask {
                commit: sha,
                benchmark: benchmark.clone(),
                rounds: ((old_rounds + new_rounds) / 2).max(1),
                score: score(
                    history,
                    mid_idx,
                    bench_weight(report, benchmark),
                    diff * confidence,
                    PRIORITY_PERF,
                ),
            })
        }
        Event::InsufficientSignificance {
            benchmark,
            commit,
            rounds,
            ..
        } => {
            if *rounds >= sched.max_rounds {
                debug!(benchmark, rounds, "significance event dropped, round ceiling reached");
                return None;
            }
            let wanted = (*rounds + SIGNIFICANCE_STEP).min(sched.max_rounds);
            let already = state.scheduled_rounds(&commit.sha1, benchmark);
            if wanted <= already {
                return None;
            }
            let missing = wanted - rounds;
            let severity = (missing as f64 / (*rounds).max(1) as f64).min(1.0);
            // A commit we cannot place in history scores as the oldest one.
            let idx = commit
                .history_index
                .unwrap_or_else(|| history.len().saturating_sub(1));
            Some(ProposedTask {
                commit: commit.sha1.clone(),
                benchmark: benchmark.clone(),
                rounds: wanted,
                score: score(
                    history,
                    idx,
                    bench_weight(report, benchmark),
                    severity,
                    PRIORITY_SIGNIFICANCE,
                ),
            })
        }
        Event::UnitResultChange {
            benchmark, range, ..
        } => {
            let (mid_idx, sha) = range_midpoint(range, history)?;
            Some(ProposedTask {
                commit: sha,
                benchmark: benchmark.clone(),
                rounds: 1,
                score: score(
                    history,
                    mid_idx,
                    bench_weight(report, benchmark),
                    1.0,
                    PRIORITY_UNIT_CHANGE,
                ),
            })
        }
        // Instability inside one commit is a diagnosis, not a bisection
        // target.
        Event::UnitResultUnstable { .. } => None,
    }
}

/// Bisection target of a range, or `None` when the range is already a
/// single commit or degenerates onto an endpoint.
fn range_midpoint(range: &CommitRange, history: &CommitHistory) -> Option<(usize, String)> {
    if range.is_single_commit() {
        return None;
    }
    let old_idx = range.old.as_ref()?.history_index?;
    let new_idx = range.new.history_index?;
    let mid = history.midpoint(old_idx, new_idx)?;
    Some((mid, history.sha_at(mid)?.to_string()))
}

/// Recent commits matter more: weight falls linearly with history depth.
fn score(
    history: &CommitHistory,
    history_index: usize,
    bench_weight: f64,
    severity: f64,
    priority: f64,
) -> f64 {
    let len = history.len().max(1) as f64;
    let history_weight = 1.0 - history_index as f64 / len;
    history_weight * bench_weight * severity * priority
}

fn bench_weight(report: &Report, benchmark: &str) -> f64 {
    report
        .benchmark_index(benchmark)
        .map_or(1.0, |idx| report.benchmarks[idx].weight)
}

fn result_shape(report: &Report, sha1: &str, benchmark: &str) -> Option<(usize, f64)> {
    let bench_idx = report.benchmark_index(benchmark)?;
    let result = report.commit(sha1)?.result_for(bench_idx)?;
    Some((result.rounds(), result.margin()))
}

/// Score the proposals and persist the best commit's tasks.
///
/// Only the top `commit_schedule_max` commits (ranked by their single
/// highest-scoring task) receive work per pass; all tasks sharing a chosen
/// commit are applied together. Returns the number of rounds added.
pub fn schedule_enhancements(
    state_file: &StateFile,
    journal: &Journal,
    report: &Report,
    history: &CommitHistory,
    sched: &SchedConfig,
) -> Result<usize, benchwatch_core::errors::StateError> {
    state_file.with_exclusive_lock(|state| {
        let tasks = propose(report, history, state, sched);
        if tasks.is_empty() {
            journal.info("no enhancement worth scheduling");
            return Ok(0);
        }

        let mut commits: Vec<(String, f64)> = Vec::new();
        for task in &tasks {
            match commits.iter_mut().find(|(c, _)| *c == task.commit) {
                Some((_, best)) => *best = best.max(task.score),
                None => commits.push((task.commit.clone(), task.score)),
            }
        }
        commits.sort_by(|a, b| b.1.total_cmp(&a.1));
        commits.truncate(sched.commit_schedule_max);

        let mut added = 0;
        for task in &tasks {
            if !commits.iter().any(|(c, _)| *c == task.commit) {
                continue;
            }
            let delta = state.raise_rounds(&task.commit, &task.benchmark, task.rounds);
            if delta > 0 {
                journal.info(&format!(
                    "scheduled {} round(s) of {} on {} (score {:.3})",
                    delta, task.benchmark, task.commit, task.score
                ));
                added += delta;
            }
        }
        Ok(added)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use benchwatch_analysis::history::HistoryEntry;
    use benchwatch_core::events::{CommitRange, CommitRef};

    fn history_of(shas: &[&str]) -> CommitHistory {
        CommitHistory::new(
            shas.iter()
                .map(|s| HistoryEntry {
                    sha1: (*s).to_string(),
                    timestamp: 0,
                })
                .collect(),
        )
    }

    fn range(old: &str, old_idx: usize, new: &str, new_idx: usize) -> CommitRange {
        CommitRange::new(
            Some(CommitRef::new(old).with_index(old_idx)),
            CommitRef::new(new).with_index(new_idx),
        )
    }

    #[test]
    fn adjacent_build_break_needs_no_bisection() {
        let history = history_of(&["e", "d", "c", "b", "a"]);
        let report = Report::default();
        let state = TaskState::default();
        let event = Event::BuildBroken {
            range: range("b", 3, "c", 2),
        };
        let mut rep = report;
        rep.events.push(event);
        assert!(propose(&rep, &history, &state, &SchedConfig::default()).is_empty());
    }

    #[test]
    fn wide_build_break_bisects_the_middle() {
        let history = history_of(&["f", "e", "d", "c", "b", "a"]);
        let mut report = Report::default();
        report.events.push(Event::BuildBroken {
            range: range("a", 5, "e", 1),
        });
        let tasks = propose(&report, &history, &TaskState::default(), &SchedConfig::default());
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].commit, "c");
        assert_eq!(tasks[0].benchmark, NOOP_BENCHMARK);
        assert_eq!(tasks[0].rounds, 1);
    }

    #[test]
    fn significance_event_asks_for_two_more_rounds() {
        let history = history_of(&["b", "a"]);
        let mut report = Report::default();
        report.events.push(Event::InsufficientSignificance {
            benchmark: "glmark2".to_string(),
            commit: CommitRef::new("a").with_index(1),
            margin: 0.08,
            wanted_margin: 0.025,
            rounds: 3,
        });
        let tasks = propose(&report, &history, &TaskState::default(), &SchedConfig::default());
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].commit, "a");
        assert_eq!(tasks[0].rounds, 5);
    }

    #[test]
    fn significance_event_respects_the_round_ceiling() {
        let history = history_of(&["a"]);
        let sched = SchedConfig {
            max_rounds: 4,
            ..SchedConfig::default()
        };
        let mut report = Report::default();
        report.events.push(Event::InsufficientSignificance {
            benchmark: "glmark2".to_string(),
            commit: CommitRef::new("a").with_index(0),
            margin: 0.08,
            wanted_margin: 0.025,
            rounds: 4,
        });
        assert!(propose(&report, &history, &TaskState::default(), &sched).is_empty());

        report.events.clear();
        report.events.push(Event::InsufficientSignificance {
            benchmark: "glmark2".to_string(),
            commit: CommitRef::new("a").with_index(0),
            margin: 0.08,
            wanted_margin: 0.025,
            rounds: 3,
        });
        let tasks = propose(&report, &history, &TaskState::default(), &sched);
        assert_eq!(tasks[0].rounds, 4);
    }

    #[test]
    fn recent_commits_outscore_old_ones() {
        let history = history_of(&["d", "c", "b", "a"]);
        let recent = score(&history, 0, 1.0, 1.0, 1.0);
        let old = score(&history, 3, 1.0, 1.0, 1.0);
        assert!(recent > old);
        assert!((recent - 1.0).abs() < 1e-12);
        assert!((old - 0.25).abs() < 1e-12);
    }

    #[test]
    fn commits_absent_from_history_score_as_the_oldest() {
        let history = history_of(&["d", "c", "b", "a"]);
        let mut report = Report::default();
        report.events.push(Event::InsufficientSignificance {
            benchmark: "glmark2".to_string(),
            commit: CommitRef::new("feature-branch"),
            margin: 0.08,
            wanted_margin: 0.025,
            rounds: 3,
        });
        let tasks = propose(&report, &history, &TaskState::default(), &SchedConfig::default());
        assert_eq!(tasks.len(), 1);
        let severity = (2.0f64 / 3.0).min(1.0);
        let oldest = score(&history, 3, 1.0, severity, PRIORITY_SIGNIFICANCE);
        assert!((tasks[0].score - oldest).abs() < 1e-12);
        assert!(tasks[0].score < score(&history, 0, 1.0, severity, PRIORITY_SIGNIFICANCE));
    }

    #[test]
    fn only_the_top_commit_is_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let state_file = StateFile::new(dir.path().join("state"));
        let journal = Journal::new(dir.path());
        let history = history_of(&["f", "e", "d", "c", "b", "a"]);

        let mut report = Report::default();
        // Significance on a recent commit outranks a build bisection
        // (severity 2/3 * priority 1.0 at depth 1 vs 1.0 * 0.5 mid-history).
        report.events.push(Event::InsufficientSignificance {
            benchmark: "glmark2".to_string(),
            commit: CommitRef::new("e").with_index(1),
            margin: 0.08,
            wanted_margin: 0.025,
            rounds: 3,
        });
        report.events.push(Event::BuildBroken {
            range: range("a", 5, "e", 1),
        });

        let added = schedule_enhancements(
            &state_file,
            &journal,
            &report,
            &history,
            &SchedConfig::default(),
        )
        .unwrap();
        assert_eq!(added, 5);

        let state = state_file.load().unwrap();
        assert_eq!(state.scheduled_rounds("e", "glmark2"), 5);
        assert_eq!(state.scheduled_rounds("c", NOOP_BENCHMARK), 0);
    }
}
