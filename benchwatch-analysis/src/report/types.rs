//! Report data model: benchmarks, commits, results.

use std::cell::{Cell, OnceCell};
use std::collections::BTreeMap;

use benchwatch_core::events::Event;
use benchwatch_core::status::RunnerStatus;

/// Whether a result file carries throughput samples or pass/fail statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestType {
    /// Throughput-style: one numeric sample per round.
    Bench,
    /// Unit-style: `key: status` pairs per round.
    Unit,
}

impl TestType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bench => "bench",
            Self::Unit => "unit",
        }
    }
}

/// A benchmark name parsed once from its wire form.
///
/// The wire format `base[sub1|sub2]` is a persisted external contract; it is
/// decoded exactly once at parse time and never re-split afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BenchKey {
    pub base: String,
    pub subtests: Vec<String>,
}

impl BenchKey {
    /// Decode `name` or `name[a|b|c]`.
    pub fn parse(full_name: &str) -> Self {
        if let Some(open) = full_name.find('[') {
            if let Some(stripped) = full_name[open..].strip_prefix('[') {
                if let Some(inner) = stripped.strip_suffix(']') {
                    let subtests = inner
                        .split('|')
                        .filter(|s| !s.is_empty())
                        .map(str::to_string)
                        .collect();
                    return Self {
                        base: full_name[..open].to_string(),
                        subtests,
                    };
                }
            }
        }
        Self {
            base: full_name.to_string(),
            subtests: Vec::new(),
        }
    }
}

/// A named, repeatable performance or correctness test.
///
/// Identity is the full (wire) name; the unit string may be updated when a
/// later commit declares a different one, and the weight biases scheduling.
#[derive(Debug, Clone)]
pub struct Benchmark {
    pub full_name: String,
    pub key: BenchKey,
    pub test_type: TestType,
    pub unit_str: String,
    pub weight: f64,
}

impl Benchmark {
    pub fn new(full_name: impl Into<String>, test_type: TestType) -> Self {
        let full_name = full_name.into();
        Self {
            key: BenchKey::parse(&full_name),
            full_name,
            test_type,
            unit_str: "undefined".to_string(),
            weight: 1.0,
        }
    }
}

/// One named auxiliary time-series extracted from a sidecar metrics file.
#[derive(Debug, Clone, PartialEq)]
pub struct Metric {
    pub name: String,
    pub unit: String,
    /// Sample timestamps, in the unit declared by the file's time column.
    pub times: Vec<f64>,
    pub values: Vec<f64>,
}

impl Metric {
    pub fn average(&self) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }
        self.values.iter().sum::<f64>() / self.values.len() as f64
    }

    /// Wall time covered by the series, 0 when fewer than two samples.
    pub fn duration(&self) -> f64 {
        match (self.times.first(), self.times.last()) {
            (Some(first), Some(last)) if self.times.len() > 1 => last - first,
            _ => 0.0,
        }
    }
}

/// The per-round payload of one run file.
#[derive(Debug, Clone, PartialEq)]
pub enum RunData {
    /// Raw numeric samples of a throughput run.
    Samples(Vec<f64>),
    /// Sub-test name to status, for unit-style runs.
    UnitStatuses(BTreeMap<String, String>),
}

/// The measurement of one benchmark on one commit.
#[derive(Debug)]
pub struct BenchResult {
    /// Index into [`Report::benchmarks`].
    pub benchmark: usize,
    pub test_type: TestType,
    /// Primary result file name, relative to the log directory.
    pub data_raw_file: String,
    pub unit_str: String,
    pub more_is_better: bool,
    /// One sample per execution round.
    pub data: Vec<f64>,
    /// Per-run payloads, ordered by run number.
    pub runs: Vec<RunData>,
    /// Auxiliary metrics by name (power, energy, ...), including derived ones.
    pub metrics: BTreeMap<String, Metric>,
    /// Environment-dump file per run, where captured.
    pub env_files: Vec<Option<String>>,

    // Derived values, computed on demand and invalidated explicitly.
    pub(crate) mean_cache: Cell<Option<f64>>,
    pub(crate) margin_cache: Cell<Option<f64>>,
}

impl BenchResult {
    pub fn new(benchmark: usize, test_type: TestType, data_raw_file: impl Into<String>) -> Self {
        Self {
            benchmark,
            test_type,
            data_raw_file: data_raw_file.into(),
            unit_str: "undefined".to_string(),
            more_is_better: true,
            data: Vec::new(),
            runs: Vec::new(),
            metrics: BTreeMap::new(),
            env_files: Vec::new(),
            mean_cache: Cell::new(None),
            margin_cache: Cell::new(None),
        }
    }

    /// Rounds already executed for this result.
    pub fn rounds(&self) -> usize {
        match self.test_type {
            TestType::Bench => self.data.len(),
            TestType::Unit => self.runs.len().max(self.data.len()),
        }
    }

    /// Drop the cached point estimate and margin. Must be called whenever
    /// `data` changes after a derived value was requested.
    pub fn invalidate_caches(&self) {
        self.mean_cache.set(None);
        self.margin_cache.set(None);
    }

    /// Status of `subtest` in run `run_idx`, for unit-style results.
    pub fn subtest_status(&self, run_idx: usize, subtest: &str) -> Option<&str> {
        match self.runs.get(run_idx)? {
            RunData::UnitStatuses(map) => map.get(subtest).map(String::as_str),
            RunData::Samples(_) => None,
        }
    }

    /// Stabilized status of `subtest`: the status reported by the most
    /// recent run that knows the sub-test.
    pub fn stabilized_status(&self, subtest: &str) -> Option<&str> {
        self.runs.iter().rev().find_map(|run| match run {
            RunData::UnitStatuses(map) => map.get(subtest).map(String::as_str),
            RunData::Samples(_) => None,
        })
    }

    /// True when `subtest` reported different statuses across two
    /// consecutive runs of this commit.
    pub fn subtest_is_unstable(&self, subtest: &str) -> bool {
        let statuses: Vec<&str> = self
            .runs
            .iter()
            .filter_map(|run| match run {
                RunData::UnitStatuses(map) => map.get(subtest).map(String::as_str),
                RunData::Samples(_) => None,
            })
            .collect();
        statuses.windows(2).any(|pair| pair[0] != pair[1])
    }

    /// Every sub-test name any run of this result reported.
    pub fn subtest_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for run in &self.runs {
            if let RunData::UnitStatuses(map) = run {
                for key in map.keys() {
                    if !names.contains(&key.as_str()) {
                        names.push(key);
                    }
                }
            }
        }
        names
    }
}

/// Metadata recovered from a commit's `.patch` header block.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommitMeta {
    pub author: Option<String>,
    pub author_date: Option<String>,
    pub commit_date: Option<String>,
    pub title: Option<String>,
    pub signed_off_by: Vec<String>,
    pub reviewed_by: Vec<String>,
    pub tested_by: Vec<String>,
    /// Bug URLs, from `Bugzilla:` trailers and inline `fdo#NNNN` references.
    pub bugs: Vec<String>,
}

/// One revision under test.
///
/// Immutable after construction except for the lazily computed geometric
/// mean and the history-index annotation added when a report is enhanced.
#[derive(Debug)]
pub struct Commit {
    pub sha1: String,
    /// Full commit title line from `commit_list`.
    pub full_name: String,
    /// Human-friendly alias, or the sha1 when no label was assigned.
    pub label: String,
    pub compile_log: String,
    pub patch: String,
    pub meta: Option<CommitMeta>,
    pub compile_status: RunnerStatus,
    pub results: Vec<BenchResult>,
    /// Position in the supplied history (newest commit at 0); only
    /// meaningful after [`crate::synth::enhance_report`].
    pub history_index: Option<usize>,

    geom_mean_cache: OnceCell<f64>,
}

impl Commit {
    pub fn new(sha1: impl Into<String>, full_name: impl Into<String>) -> Self {
        let sha1 = sha1.into();
        Self {
            compile_log: format!("{sha1}_compile_log"),
            patch: format!("{sha1}.patch"),
            label: sha1.clone(),
            sha1,
            full_name: full_name.into(),
            meta: None,
            compile_status: RunnerStatus::Unknown,
            results: Vec::new(),
            history_index: None,
            geom_mean_cache: OnceCell::new(),
        }
    }

    /// True when the compile log recorded a failing exit status. A missing
    /// log (status [`RunnerStatus::Unknown`]) is not evidence of breakage.
    pub fn build_broken(&self) -> bool {
        !matches!(
            self.compile_status,
            RunnerStatus::NoError | RunnerStatus::Unknown
        )
    }

    /// Geometric mean over the mean of every result carrying data.
    /// Computed once per commit, never invalidated.
    pub fn geom_mean(&self) -> f64 {
        *self.geom_mean_cache.get_or_init(|| {
            let mut product = 1.0_f64;
            let mut count = 0u32;
            for result in &self.results {
                if !result.data.is_empty() {
                    product *= result.data.iter().sum::<f64>() / result.data.len() as f64;
                    count += 1;
                }
            }
            if count > 0 {
                product.powf(1.0 / f64::from(count))
            } else {
                0.0
            }
        })
    }

    pub fn result_for(&self, benchmark: usize) -> Option<&BenchResult> {
        self.results.iter().find(|r| r.benchmark == benchmark)
    }
}

/// The root aggregate produced by the result store.
#[derive(Debug, Default)]
pub struct Report {
    /// Report (log directory) name.
    pub name: String,
    /// Sorted by full name.
    pub benchmarks: Vec<Benchmark>,
    /// In `commit_list` order until enhanced, then oldest-first.
    pub commits: Vec<Commit>,
    pub notes: Vec<String>,
    /// Empty until the report is enhanced with a commit history.
    pub events: Vec<Event>,
}

impl Report {
    pub fn benchmark_index(&self, full_name: &str) -> Option<usize> {
        self.benchmarks.iter().position(|b| b.full_name == full_name)
    }

    pub fn commit(&self, sha1: &str) -> Option<&Commit> {
        self.commits.iter().find(|c| c.sha1 == sha1)
    }

    /// Register (or look up) a benchmark, returning its index.
    pub fn intern_benchmark(&mut self, full_name: &str, test_type: TestType) -> usize {
        if let Some(idx) = self.benchmark_index(full_name) {
            return idx;
        }
        self.benchmarks.push(Benchmark::new(full_name, test_type));
        self.benchmarks.len() - 1
    }
}
