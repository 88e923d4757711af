//! One-pass classification of a log directory.
//!
//! The runner names every file it writes after the commit it belongs to,
//! so a single directory walk is enough to group files by commit. The
//! per-benchmark lookup then works off this index instead of re-scanning
//! the directory for each (commit, benchmark) pair.

use std::path::{Path, PathBuf};

use benchwatch_core::errors::ParseError;
use regex::Regex;
use rustc_hash::FxHashMap;
use tracing::debug;
use walkdir::WalkDir;

use crate::report::TestType;

/// What a discovered result file contributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileRole {
    /// `<sha1>_<kind>_<name>`: the aggregate result.
    Primary,
    /// `...#<N>`: one round's own output.
    Run(usize),
    /// `....metrics_<metric>`: sidecar time-series.
    Metrics { run: Option<usize>, metric: String },
    /// `....env_dump`: environment capture for one run.
    EnvDump { run: Option<usize> },
}

/// One classified result file.
#[derive(Debug, Clone)]
pub struct ResultFile {
    pub sha1: String,
    pub test_type: TestType,
    pub bench_name: String,
    pub role: FileRole,
    pub path: PathBuf,
    pub file_name: String,
}

/// All result files of one log directory, grouped by commit hash.
#[derive(Debug, Default)]
pub struct FileIndex {
    by_commit: FxHashMap<String, Vec<ResultFile>>,
}

impl FileIndex {
    /// Walk `log_folder` once and classify every result file.
    /// Non-result files (commit_list, logs, stderr captures) are skipped.
    pub fn build(log_folder: &Path) -> Result<Self, ParseError> {
        // <sha1>_<bench|unit>_<name>[#N][.metrics_<m>|.env_dump|.stderr|.stdout|.errors]
        let pattern = Regex::new(
            r"^(?P<sha>[A-Za-z0-9.\-]+)_(?P<kind>bench|unit)_(?P<name>.+?)(?:#(?P<run>\d+))?(?:\.(?P<side>metrics_.+|env_dump|stderr|stdout|errors))?$",
        )
        .map_err(|e| ParseError::LogDirUnreadable {
            path: log_folder.display().to_string(),
            message: e.to_string(),
        })?;

        let mut index = Self::default();
        let walker = WalkDir::new(log_folder).min_depth(1).max_depth(1);
        for entry in walker {
            let entry = entry.map_err(|e| ParseError::LogDirUnreadable {
                path: log_folder.display().to_string(),
                message: e.to_string(),
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let file_name = entry.file_name().to_string_lossy().into_owned();
            let Some(caps) = pattern.captures(&file_name) else {
                continue;
            };

            let run = caps
                .name("run")
                .and_then(|m| m.as_str().parse::<usize>().ok());
            let role = match caps.name("side").map(|m| m.as_str()) {
                None => match run {
                    Some(n) => FileRole::Run(n),
                    None => FileRole::Primary,
                },
                Some("env_dump") => FileRole::EnvDump { run },
                Some("stderr") | Some("stdout") | Some("errors") => continue,
                Some(side) => match side.strip_prefix("metrics_") {
                    Some(metric) => FileRole::Metrics {
                        run,
                        metric: metric.to_string(),
                    },
                    None => continue,
                },
            };

            let test_type = match &caps["kind"] {
                "unit" => TestType::Unit,
                _ => TestType::Bench,
            };
            let file = ResultFile {
                sha1: caps["sha"].to_string(),
                test_type,
                bench_name: caps["name"].to_string(),
                role,
                path: entry.path().to_path_buf(),
                file_name,
            };
            debug!(file = %file.file_name, sha1 = %file.sha1, "classified result file");
            index.by_commit.entry(file.sha1.clone()).or_default().push(file);
        }

        // Deterministic order within a commit: runs sort numerically.
        for files in index.by_commit.values_mut() {
            files.sort_by(|a, b| a.file_name.cmp(&b.file_name));
        }
        Ok(index)
    }

    /// Every classified file of one commit, or an empty slice.
    pub fn files_for(&self, sha1: &str) -> &[ResultFile] {
        self.by_commit.get(sha1).map_or(&[], Vec::as_slice)
    }

    pub fn commit_count(&self) -> usize {
        self.by_commit.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(dir: &Path, name: &str) {
        fs::write(dir.join(name), "").unwrap();
    }

    #[test]
    fn classifies_the_naming_convention() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "abc1234_bench_glmark2");
        touch(dir.path(), "abc1234_bench_glmark2#0");
        touch(dir.path(), "abc1234_bench_glmark2#0.metrics_power");
        touch(dir.path(), "abc1234_bench_glmark2#0.env_dump");
        touch(dir.path(), "abc1234_bench_glmark2#0.stderr");
        touch(dir.path(), "abc1234_unit_piglit");
        touch(dir.path(), "commit_list");

        let index = FileIndex::build(dir.path()).unwrap();
        let files = index.files_for("abc1234");
        assert_eq!(files.len(), 5);

        let roles: Vec<&FileRole> = files.iter().map(|f| &f.role).collect();
        assert!(roles.contains(&&FileRole::Primary));
        assert!(roles.contains(&&FileRole::Run(0)));
        assert!(roles.contains(&&FileRole::EnvDump { run: Some(0) }));
        assert!(roles.contains(&&FileRole::Metrics {
            run: Some(0),
            metric: "power".to_string()
        }));
        assert!(files
            .iter()
            .any(|f| f.test_type == TestType::Unit && f.bench_name == "piglit"));
    }

    #[test]
    fn unknown_commit_has_no_files() {
        let dir = tempfile::tempdir().unwrap();
        let index = FileIndex::build(dir.path()).unwrap();
        assert!(index.files_for("fffffff").is_empty());
    }

    #[test]
    fn benchmark_names_may_contain_underscores() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "abc1234_bench_gtk_perf[circles|gears]");
        let index = FileIndex::build(dir.path()).unwrap();
        let files = index.files_for("abc1234");
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].bench_name, "gtk_perf[circles|gears]");
    }
}
