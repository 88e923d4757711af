//! Result store: turns a runner log directory into a [`Report`].

pub mod csv;
pub mod discovery;
pub mod metrics;
pub mod patch;

use std::fs;
use std::path::{Path, PathBuf};

use benchwatch_core::errors::ParseError;
use benchwatch_core::status::RunnerStatus;
use benchwatch_core::units::{self, Unit};
use regex::Regex;
use rustc_hash::FxHashMap;
use tracing::{debug, info, warn};

use crate::report::{BenchResult, Commit, Report, RunData, TestType};
use discovery::{FileIndex, FileRole, ResultFile};

/// Reads one log directory written by the external runner.
pub struct ResultStore {
    log_folder: PathBuf,
    frametime: bool,
}

impl ResultStore {
    pub fn new(log_folder: impl Into<PathBuf>) -> Self {
        Self {
            log_folder: log_folder.into(),
            frametime: false,
        }
    }

    /// Present rate results as frame times: FPS samples convert to
    /// milliseconds per frame and the polarity flips with the unit.
    pub fn with_frametime(mut self, frametime: bool) -> Self {
        self.frametime = frametime;
        self
    }

    pub fn log_folder(&self) -> &Path {
        &self.log_folder
    }

    /// Parse the directory into a report. When `restrict` is given, only
    /// commits whose hash or label appears in it are kept.
    pub fn parse(&self, restrict: Option<&[String]>) -> Result<Report, ParseError> {
        if !self.log_folder.is_dir() {
            return Err(ParseError::LogDirUnreadable {
                path: self.log_folder.display().to_string(),
                message: "not a directory".to_string(),
            });
        }

        let commit_lines = self.read_commit_list()?;
        let labels = self.read_commit_labels();
        let index = FileIndex::build(&self.log_folder)?;

        let mut report = Report {
            name: self
                .log_folder
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            ..Report::default()
        };
        report.notes = self.read_notes();

        for full_name in commit_lines {
            let Some(sha1) = full_name.split_whitespace().next() else {
                continue;
            };
            let label = labels.get(sha1).cloned().unwrap_or_else(|| sha1.to_string());
            if let Some(wanted) = restrict {
                if !wanted.iter().any(|w| w == sha1 || *w == label) {
                    continue;
                }
            }

            let mut commit = Commit::new(sha1, full_name.clone());
            commit.label = label;
            commit.compile_status = self.read_compile_status(sha1);
            commit.meta = self.read_patch_meta(sha1);
            self.collect_results(&mut report, &mut commit, index.files_for(sha1));
            report.commits.push(commit);
        }

        sort_benchmarks(&mut report);
        info!(
            report = %report.name,
            commits = report.commits.len(),
            benchmarks = report.benchmarks.len(),
            "parsed log directory"
        );
        Ok(report)
    }

    fn read_commit_list(&self) -> Result<Vec<String>, ParseError> {
        let path = self.log_folder.join("commit_list");
        let contents = fs::read_to_string(&path).map_err(|_| ParseError::MissingCommitList {
            path: self.log_folder.display().to_string(),
        })?;
        let lines: Vec<String> = contents
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect();
        if lines.is_empty() {
            return Err(ParseError::EmptyCommitList);
        }
        Ok(lines)
    }

    fn read_commit_labels(&self) -> FxHashMap<String, String> {
        let mut labels = FxHashMap::default();
        let path = self.log_folder.join("commit_labels");
        let Ok(contents) = fs::read_to_string(&path) else {
            return labels;
        };
        for line in contents.lines() {
            if let Some((sha1, label)) = line.trim().split_once(char::is_whitespace) {
                labels.insert(sha1.to_string(), label.trim().to_string());
            }
        }
        labels
    }

    fn read_notes(&self) -> Vec<String> {
        match fs::read_to_string(self.log_folder.join("notes")) {
            Ok(contents) => contents.lines().map(str::to_string).collect(),
            Err(_) => Vec::new(),
        }
    }

    /// Exit status from the trailing `Exiting with error code <N>` line of
    /// the commit's compile log. Absent or unparseable logs stay UNKNOWN.
    fn read_compile_status(&self, sha1: &str) -> RunnerStatus {
        let path = self.log_folder.join(format!("{sha1}_compile_log"));
        let Ok(contents) = fs::read_to_string(&path) else {
            return RunnerStatus::Unknown;
        };
        // Infallible: the pattern is a compile-time constant.
        #[allow(clippy::unwrap_used)]
        let pattern = Regex::new(r"^Exiting with error code (?P<code>-?\d+)$").unwrap();
        contents
            .lines()
            .rev()
            .find(|l| !l.trim().is_empty())
            .and_then(|last| pattern.captures(last.trim()))
            .and_then(|caps| caps["code"].parse::<i32>().ok())
            .map_or(RunnerStatus::Unknown, RunnerStatus::from_code)
    }

    fn read_patch_meta(&self, sha1: &str) -> Option<crate::report::CommitMeta> {
        let path = self.log_folder.join(format!("{sha1}.patch"));
        let contents = fs::read_to_string(&path).ok()?;
        Some(patch::parse_patch(&contents))
    }

    /// Fold one commit's classified files into results, one per benchmark.
    fn collect_results(&self, report: &mut Report, commit: &mut Commit, files: &[ResultFile]) {
        // file_name sort puts the primary before its runs and sidecars.
        let mut by_bench: Vec<(String, TestType, Vec<&ResultFile>)> = Vec::new();
        for file in files {
            match by_bench
                .iter_mut()
                .find(|(name, tt, _)| *name == file.bench_name && *tt == file.test_type)
            {
                Some((_, _, group)) => group.push(file),
                None => by_bench.push((file.bench_name.clone(), file.test_type, vec![file])),
            }
        }

        for (bench_name, test_type, group) in by_bench {
            let bench_idx = report.intern_benchmark(&bench_name, test_type);
            if let Some(result) = self.build_result(report, bench_idx, test_type, &group) {
                commit.results.push(result);
            }
        }
    }

    fn build_result(
        &self,
        report: &mut Report,
        bench_idx: usize,
        test_type: TestType,
        group: &[&ResultFile],
    ) -> Option<BenchResult> {
        let primary = group.iter().find(|f| f.role == FileRole::Primary)?;
        let mut result = BenchResult::new(bench_idx, test_type, primary.file_name.clone());

        let contents = match fs::read_to_string(&primary.path) {
            Ok(c) => c,
            Err(e) => {
                warn!(file = %primary.path.display(), error = %e, "unreadable result file");
                return None;
            }
        };
        let header = match test_type {
            TestType::Bench => {
                let (samples, header) = csv::parse_samples(&primary.path, &contents);
                result.data = samples;
                header
            }
            TestType::Unit => {
                let (statuses, header) = csv::parse_unit_statuses(&primary.path, &contents);
                if !statuses.is_empty() {
                    result.runs.push(RunData::UnitStatuses(statuses));
                }
                header
            }
        };
        let mut to_frametime = false;
        if let Some(header) = header {
            result.more_is_better = header.more_is_better();
            result.unit_str = header.unit.clone();
            to_frametime = self.frametime
                && test_type == TestType::Bench
                && Unit::parse(&header.unit) == Some(Unit::Fps);
            if to_frametime {
                result.unit_str = Unit::Ms.as_str().to_string();
                result.more_is_better = false;
            }
            update_benchmark_unit(report, bench_idx, &result.unit_str);
        }

        for file in group {
            match &file.role {
                FileRole::Primary => {}
                FileRole::Run(n) => self.parse_run_file(&mut result, file, *n),
                FileRole::Metrics { .. } => {
                    let Ok(contents) = fs::read_to_string(&file.path) else {
                        warn!(file = %file.path.display(), "unreadable metrics file");
                        continue;
                    };
                    // Series of the same name from several runs concatenate.
                    for parsed in metrics::parse_metrics_file(&file.path, &contents) {
                        result
                            .metrics
                            .entry(parsed.name.clone())
                            .and_modify(|existing| {
                                existing.times.extend_from_slice(&parsed.times);
                                existing.values.extend_from_slice(&parsed.values);
                            })
                            .or_insert(parsed);
                    }
                }
                FileRole::EnvDump { run } => {
                    let slot = run.unwrap_or(result.env_files.len());
                    if result.env_files.len() <= slot {
                        result.env_files.resize(slot + 1, None);
                    }
                    result.env_files[slot] = Some(file.file_name.clone());
                }
            }
        }
        if to_frametime {
            for v in &mut result.data {
                *v = units::convert(*v, Unit::Fps, Unit::Ms);
            }
            for run in &mut result.runs {
                if let RunData::Samples(samples) = run {
                    for v in samples.iter_mut() {
                        *v = units::convert(*v, Unit::Fps, Unit::Ms);
                    }
                }
            }
        }
        metrics::add_derived_metrics(&mut result);

        let has_data = match test_type {
            TestType::Bench => !result.data.is_empty(),
            TestType::Unit => !result.runs.is_empty(),
        };
        if !has_data {
            debug!(file = %primary.file_name, "result file without usable data");
            return None;
        }
        Some(result)
    }

    fn parse_run_file(&self, result: &mut BenchResult, file: &ResultFile, _run: usize) {
        let Ok(contents) = fs::read_to_string(&file.path) else {
            warn!(file = %file.path.display(), "unreadable run file");
            return;
        };
        match result.test_type {
            TestType::Bench => {
                let (samples, _) = csv::parse_samples(&file.path, &contents);
                result.runs.push(RunData::Samples(samples));
            }
            TestType::Unit => {
                let (statuses, _) = csv::parse_unit_statuses(&file.path, &contents);
                result.runs.push(RunData::UnitStatuses(statuses));
            }
        }
    }
}

/// A later commit may declare a different unit for a known benchmark.
/// That is a warning, not an error; the latest declaration wins.
fn update_benchmark_unit(report: &mut Report, bench_idx: usize, unit: &str) {
    let benchmark = &mut report.benchmarks[bench_idx];
    if benchmark.unit_str != "undefined" && benchmark.unit_str != unit {
        warn!(
            benchmark = %benchmark.full_name,
            old_unit = %benchmark.unit_str,
            new_unit = %unit,
            "benchmark changed its unit between commits"
        );
    }
    benchmark.unit_str = unit.to_string();
}

/// Stable-sort benchmarks by full name, rewriting result indices to match.
fn sort_benchmarks(report: &mut Report) {
    let mut order: Vec<usize> = (0..report.benchmarks.len()).collect();
    order.sort_by(|&a, &b| {
        report.benchmarks[a]
            .full_name
            .cmp(&report.benchmarks[b].full_name)
    });

    let mut remap = vec![0usize; order.len()];
    for (new_idx, &old_idx) in order.iter().enumerate() {
        remap[old_idx] = new_idx;
    }

    let mut sorted = Vec::with_capacity(report.benchmarks.len());
    for &old_idx in &order {
        sorted.push(report.benchmarks[old_idx].clone());
    }
    report.benchmarks = sorted;

    for commit in &mut report.commits {
        for result in &mut commit.results {
            result.benchmark = remap[result.benchmark];
        }
        commit.results.sort_by_key(|r| r.benchmark);
    }
}
