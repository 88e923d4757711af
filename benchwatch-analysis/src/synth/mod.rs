//! Event synthesis.
//!
//! One linear pass over the report's commits in history order turns raw
//! results into the event timeline: build breaks and fixes, significant
//! performance changes, under-sampled results and unit-test status churn.

use benchwatch_core::config::SchedConfig;
use benchwatch_core::events::{CommitRange, CommitRef, Event};
use rustc_hash::FxHashMap;
use tracing::{debug, info};

use crate::history::CommitHistory;
use crate::report::{Commit, Report, RunData, TestType};
use crate::stats::pooled_t_test;

/// Annotate the report with history positions and synthesize its events.
///
/// Without a history only events that need no commit ordering are emitted
/// (insufficient significance and intra-commit unit instability). With a
/// history, commits are reordered oldest first; commits absent from the
/// history keep their relative order at the tail and contribute only
/// non-ordering events.
pub fn enhance_report(report: &mut Report, history: Option<&CommitHistory>, sched: &SchedConfig) {
    report.events.clear();

    if let Some(history) = history {
        for commit in &mut report.commits {
            commit.history_index = history.position_of(&commit.sha1);
        }
        // Oldest first: descending history index, unknown positions last.
        report
            .commits
            .sort_by_key(|c| match c.history_index {
                Some(idx) => (0u8, usize::MAX - idx),
                None => (1u8, 0),
            });
    }

    let mut events = Vec::new();
    let mut pass = OrderedPass::default();

    for commit in &report.commits {
        emit_unordered_events(report, commit, sched, &mut events);
        if history.is_some() && commit.history_index.is_some() {
            pass.step(report, commit, sched, &mut events);
        }
    }

    info!(
        report = %report.name,
        events = events.len(),
        ordered = history.is_some(),
        "synthesized events"
    );
    report.events = events;
}

fn commit_ref(commit: &Commit) -> CommitRef {
    let mut r = CommitRef::new(commit.sha1.clone());
    r.label = commit.label.clone();
    r.history_index = commit.history_index;
    r
}

/// Events that need no notion of a previous commit.
fn emit_unordered_events(
    report: &Report,
    commit: &Commit,
    sched: &SchedConfig,
    events: &mut Vec<Event>,
) {
    for result in &commit.results {
        let benchmark = &report.benchmarks[result.benchmark].full_name;
        match result.test_type {
            TestType::Bench => {
                let margin = result.margin();
                if margin > sched.max_variance {
                    debug!(%benchmark, commit = %commit.sha1, margin, "under-sampled result");
                    events.push(Event::InsufficientSignificance {
                        benchmark: benchmark.clone(),
                        commit: commit_ref(commit),
                        margin,
                        wanted_margin: sched.max_variance,
                        rounds: result.rounds(),
                    });
                }
            }
            TestType::Unit => {
                for subtest in result.subtest_names() {
                    if let Some((old_status, new_status)) = first_status_flip(result, subtest) {
                        events.push(Event::UnitResultUnstable {
                            benchmark: benchmark.clone(),
                            subtest: subtest.to_string(),
                            commit: commit_ref(commit),
                            old_status,
                            new_status,
                        });
                    }
                }
            }
        }
    }
}

/// First pair of consecutive runs where `subtest` changed status.
fn first_status_flip(
    result: &crate::report::BenchResult,
    subtest: &str,
) -> Option<(String, String)> {
    let mut prev: Option<&str> = None;
    for run in &result.runs {
        let RunData::UnitStatuses(map) = run else {
            continue;
        };
        let Some(status) = map.get(subtest) else {
            continue;
        };
        if let Some(prev_status) = prev {
            if prev_status != status {
                return Some((prev_status.to_string(), status.clone()));
            }
        }
        prev = Some(status);
    }
    None
}

/// State threaded through the history-ordered pass.
#[derive(Default)]
struct OrderedPass {
    prev_commit: Option<CommitRef>,
    prev_broken: bool,
    /// Range that opened the current broken span, if any.
    open_break: Option<CommitRange>,
    /// Last seen samples per benchmark index.
    prev_samples: FxHashMap<usize, (CommitRef, Vec<f64>)>,
    /// Last stabilized status and instability flag per (benchmark, subtest).
    prev_statuses: FxHashMap<(usize, String), (CommitRef, String, bool)>,
}

impl OrderedPass {
    fn step(
        &mut self,
        report: &Report,
        commit: &Commit,
        sched: &SchedConfig,
        events: &mut Vec<Event>,
    ) {
        let current = commit_ref(commit);
        self.step_build(commit, &current, events);

        for result in &commit.results {
            let benchmark = &report.benchmarks[result.benchmark].full_name;
            match result.test_type {
                TestType::Bench if !result.data.is_empty() => {
                    self.step_perf(result.benchmark, benchmark, result, &current, sched, events);
                }
                TestType::Unit => {
                    self.step_unit(result.benchmark, benchmark, result, &current, events);
                }
                _ => {}
            }
        }

        self.prev_commit = Some(current);
        self.prev_broken = commit.build_broken();
    }

    /// One BuildBroken/BuildFixed pair brackets a whole broken span,
    /// however many consecutive commits it covers.
    fn step_build(&mut self, commit: &Commit, current: &CommitRef, events: &mut Vec<Event>) {
        let broken = commit.build_broken();
        if broken && !self.prev_broken {
            let range = CommitRange::new(self.prev_commit.clone(), current.clone());
            events.push(Event::BuildBroken {
                range: range.clone(),
            });
            self.open_break = Some(range);
        } else if !broken && self.prev_broken {
            if let Some(open) = self.open_break.take() {
                events.push(Event::BuildFixed {
                    broken: open,
                    fixed: CommitRange::new(self.prev_commit.clone(), current.clone()),
                });
            }
        }
    }

    fn step_perf(
        &mut self,
        bench_idx: usize,
        benchmark: &str,
        result: &crate::report::BenchResult,
        current: &CommitRef,
        sched: &SchedConfig,
        events: &mut Vec<Event>,
    ) {
        if let Some((prev_ref, prev_data)) = self.prev_samples.get(&bench_idx) {
            let test = pooled_t_test(prev_data, &result.data);
            let old_value = prev_data.iter().sum::<f64>() / prev_data.len() as f64;
            let new_value = result.result();
            let rel_change = if old_value != 0.0 {
                (new_value / old_value - 1.0).abs()
            } else {
                f64::INFINITY
            };
            if test.confidence >= sched.confidence_threshold && rel_change >= sched.min_change {
                events.push(Event::PerfChange {
                    benchmark: benchmark.to_string(),
                    range: CommitRange::new(Some(prev_ref.clone()), current.clone()),
                    old_value,
                    new_value,
                    confidence: test.confidence,
                });
            }
        }
        self.prev_samples
            .insert(bench_idx, (current.clone(), result.data.clone()));
    }

    fn step_unit(
        &mut self,
        bench_idx: usize,
        benchmark: &str,
        result: &crate::report::BenchResult,
        current: &CommitRef,
        events: &mut Vec<Event>,
    ) {
        for subtest in result.subtest_names() {
            let Some(status) = result.stabilized_status(subtest) else {
                continue;
            };
            let unstable = result.subtest_is_unstable(subtest);
            let key = (bench_idx, subtest.to_string());

            if let Some((prev_ref, prev_status, prev_unstable)) = self.prev_statuses.get(&key) {
                // An unstable endpoint makes the comparison unreliable.
                if prev_status != status && !unstable && !prev_unstable {
                    events.push(Event::UnitResultChange {
                        benchmark: benchmark.to_string(),
                        subtest: subtest.to_string(),
                        range: CommitRange::new(Some(prev_ref.clone()), current.clone()),
                        old_status: prev_status.clone(),
                        new_status: status.to_string(),
                    });
                }
            }
            self.prev_statuses
                .insert(key, (current.clone(), status.to_string(), unstable));
        }
    }
}
