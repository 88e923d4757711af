//! Property tests for the comparator, bisection and event pairing.

use benchwatch_analysis::history::{CommitHistory, HistoryEntry};
use benchwatch_analysis::report::{BenchResult, Commit, Report, TestType};
use benchwatch_analysis::stats::sample_stats;
use benchwatch_analysis::synth::enhance_report;
use benchwatch_core::config::SchedConfig;
use benchwatch_core::events::{Event, EventKind};
use benchwatch_core::status::RunnerStatus;
use proptest::prelude::*;

proptest! {
    /// Doubling the sample (same mean, same spread shape) never widens the
    /// relative margin.
    #[test]
    fn margin_shrinks_with_more_samples(
        data in prop::collection::vec(1.0f64..1000.0, 2..40),
    ) {
        let doubled: Vec<f64> = data.iter().chain(data.iter()).copied().collect();

        let small = sample_stats(&data, 0.95);
        let large = sample_stats(&doubled, 0.95);
        let margin = |s: benchwatch_analysis::stats::SampleStats| {
            if s.mean == 0.0 { 0.0 } else { s.half_width / s.mean.abs() }
        };
        prop_assert!(margin(large) <= margin(small) + 1e-12);
    }

    /// A bisection midpoint lies strictly between its endpoints, or there
    /// is none when the endpoints are adjacent.
    #[test]
    fn midpoint_is_strictly_inside(
        len in 2usize..200,
        pair in (0usize..200, 0usize..200),
    ) {
        let history = CommitHistory::new(
            (0..len)
                .map(|i| HistoryEntry { sha1: format!("{i:07x}"), timestamp: 0 })
                .collect(),
        );
        let (a, b) = pair;
        let (old_idx, new_idx) = (a.max(b) % len, a.min(b) % len);
        match history.midpoint(old_idx, new_idx) {
            Some(mid) => {
                prop_assert!(old_idx > new_idx);
                prop_assert!(mid > new_idx && mid < old_idx);
            }
            None => prop_assert!(old_idx <= new_idx || old_idx - new_idx <= 1),
        }
    }

    /// Every BuildFixed pairs with exactly one earlier BuildBroken whose
    /// range opened the same broken span; no orphan BuildFixed exists.
    #[test]
    fn build_events_pair_up(broken_flags in prop::collection::vec(any::<bool>(), 1..30)) {
        let mut report = Report::default();
        report.intern_benchmark("glmark2", TestType::Bench);
        let mut shas_newest_first = Vec::new();

        for (i, broken) in broken_flags.iter().enumerate() {
            let sha = format!("c{i:06}");
            let mut commit = Commit::new(sha.clone(), sha.clone());
            commit.compile_status = if *broken {
                RunnerStatus::CompilationFailed
            } else {
                RunnerStatus::NoError
            };
            let mut result = BenchResult::new(0, TestType::Bench, "f");
            result.data = vec![10.0, 10.0];
            commit.results.push(result);
            report.commits.push(commit);
            shas_newest_first.insert(0, sha);
        }

        let history = CommitHistory::new(
            shas_newest_first
                .into_iter()
                .map(|sha1| HistoryEntry { sha1, timestamp: 0 })
                .collect(),
        );
        enhance_report(&mut report, Some(&history), &SchedConfig::default());

        let mut open_breaks: Vec<&Event> = Vec::new();
        let mut pairs = 0usize;
        for event in &report.events {
            match event {
                Event::BuildBroken { .. } => open_breaks.push(event),
                Event::BuildFixed { broken, .. } => {
                    let matching = open_breaks.pop();
                    prop_assert!(matching.is_some(), "BuildFixed without a BuildBroken");
                    if let Some(Event::BuildBroken { range }) = matching {
                        prop_assert_eq!(range, broken);
                    }
                    pairs += 1;
                }
                _ => {}
            }
        }
        // At most one break can remain open (a trailing broken span).
        prop_assert!(open_breaks.len() <= 1);

        // Cross-check against the raw flags: count ok->broken transitions.
        let mut expected_breaks = 0usize;
        let mut prev = false;
        for &flag in &broken_flags {
            if flag && !prev {
                expected_breaks += 1;
            }
            prev = flag;
        }
        prop_assert_eq!(pairs + open_breaks.len(), expected_breaks);
    }
}
