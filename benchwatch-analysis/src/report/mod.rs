//! The structured report model.
//!
//! A [`Report`] is the root aggregate: ordered benchmarks, ordered commits
//! (each holding its results) and, once enhanced with a commit history, the
//! synthesized event timeline.

pub mod types;

pub use types::{
    BenchKey, BenchResult, Benchmark, Commit, CommitMeta, Metric, Report, RunData, TestType,
};
