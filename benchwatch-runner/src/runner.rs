//! External benchmark-runner invocation.
//!
//! The runner is a shell program with a stable command-line contract; the
//! engine talks to it through flags, benchmark names on stdin and two
//! recognized stdout lines. Everything else it prints is operator noise.

use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use benchwatch_core::config::RunnerConfig;
use benchwatch_core::errors::RunnerError;
use benchwatch_core::status::RunnerStatus;
use regex::Regex;
use tracing::{debug, info};

/// The pseudo-benchmark that builds and deploys a commit without
/// measuring anything. Used for build bisection.
pub const NOOP_BENCHMARK: &str = "no-op";

/// Repository facts reported by the runner's banner line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepoInfo {
    pub repo_type: String,
    pub directory: String,
    pub version: String,
    pub deployed_version: String,
}

/// Parsed outcome of one runner invocation.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub status: RunnerStatus,
    pub repo: Option<RepoInfo>,
    /// Benchmarks the runner resolved from the names it was fed.
    pub tests: Vec<String>,
}

/// One dispatchable unit of work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRequest<'a> {
    pub commit: &'a str,
    pub benchmarks: &'a [String],
    pub rounds: usize,
    /// Resolve and report without executing anything.
    pub dry_run: bool,
}

/// Abstraction over the external runner, so the driver can be exercised
/// without a shell environment.
pub trait BenchRunner {
    fn run(&self, request: &RunRequest<'_>) -> Result<RunOutcome, RunnerError>;
}

/// The production runner: spawns the configured shell program.
pub struct ShellRunner {
    runner_path: PathBuf,
    config: RunnerConfig,
    report_name: String,
    profile: Option<String>,
    conf_script: Option<String>,
    excluded: Vec<String>,
}

impl ShellRunner {
    pub fn new(runner_path: impl Into<PathBuf>, config: RunnerConfig, report_name: impl Into<String>) -> Self {
        Self {
            runner_path: runner_path.into(),
            config,
            report_name: report_name.into(),
            profile: None,
            conf_script: None,
            excluded: Vec::new(),
        }
    }

    pub fn with_profile(mut self, profile: Option<String>) -> Self {
        self.profile = profile;
        self
    }

    pub fn with_conf_script(mut self, conf_script: Option<String>) -> Self {
        self.conf_script = conf_script;
        self
    }

    pub fn with_excluded(mut self, excluded: Vec<String>) -> Self {
        self.excluded = excluded;
        self
    }

    fn command(&self, request: &RunRequest<'_>) -> Command {
        let mut cmd = Command::new(&self.runner_path);
        if let Some(profile) = &self.profile {
            cmd.arg("-P").arg(profile);
        }
        if let Some(repo) = &self.config.repo_path {
            cmd.arg("-p").arg(repo);
        }
        // Benchmark names arrive on stdin, one per line.
        cmd.arg("-b").arg("-");
        for excluded in &self.excluded {
            cmd.arg("-B").arg(excluded);
        }
        cmd.arg("-r").arg(request.rounds.to_string());
        if let Some(make) = &self.config.make_command {
            cmd.arg("-m").arg(make);
        }
        cmd.arg("-N").arg(&self.report_name);
        if let Some(tests) = &self.config.tests_folder {
            cmd.arg("-T").arg(tests);
        }
        if let Some(conf) = &self.conf_script {
            cmd.arg("-c").arg(conf);
        }
        if request.dry_run {
            cmd.arg("-k");
        }
        cmd.arg(request.commit);
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit());
        cmd
    }
}

impl BenchRunner for ShellRunner {
    fn run(&self, request: &RunRequest<'_>) -> Result<RunOutcome, RunnerError> {
        let mut cmd = self.command(request);
        debug!(command = ?cmd, "invoking external runner");

        let mut child = cmd.spawn().map_err(|e| RunnerError::SpawnFailed {
            command: self.runner_path.display().to_string(),
            message: e.to_string(),
        })?;

        if let Some(mut stdin) = child.stdin.take() {
            let names = request.benchmarks.join("\n");
            stdin
                .write_all(names.as_bytes())
                .and_then(|()| stdin.write_all(b"\n"))
                .map_err(|e| RunnerError::StdinFailed {
                    message: e.to_string(),
                })?;
        }

        let output = child.wait_with_output().map_err(|e| RunnerError::SpawnFailed {
            command: self.runner_path.display().to_string(),
            message: e.to_string(),
        })?;
        let code = output.status.code().ok_or(RunnerError::Killed)?;
        let status = RunnerStatus::from_code(code);

        let stdout = String::from_utf8_lossy(&output.stdout);
        let (repo, tests) = parse_runner_output(&stdout);
        info!(
            commit = request.commit,
            rounds = request.rounds,
            %status,
            tests = tests.len(),
            "runner finished"
        );
        Ok(RunOutcome { status, repo, tests })
    }
}

/// Extract the banner and resolved-test lines from runner stdout.
pub fn parse_runner_output(stdout: &str) -> (Option<RepoInfo>, Vec<String>) {
    // Infallible: the patterns are compile-time constants.
    #[allow(clippy::unwrap_used)]
    let banner = Regex::new(
        r"^Repo type = (?P<type>.+?), directory = (?P<dir>.+?), version = (?P<ver>.+?), deployed version = (?P<dep>.+)$",
    )
    .unwrap();
    #[allow(clippy::unwrap_used)]
    let tests_line = Regex::new(r"^Tests that will be run:\s*(?P<tests>.*)$").unwrap();

    let mut repo = None;
    let mut tests = Vec::new();
    for line in stdout.lines() {
        if let Some(caps) = banner.captures(line) {
            repo = Some(RepoInfo {
                repo_type: caps["type"].to_string(),
                directory: caps["dir"].to_string(),
                version: caps["ver"].to_string(),
                deployed_version: caps["dep"].to_string(),
            });
        } else if let Some(caps) = tests_line.captures(line) {
            tests = caps["tests"]
                .split_whitespace()
                .map(str::to_string)
                .collect();
        }
    }
    (repo, tests)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_banner_and_test_list() {
        let stdout = "\
Some chatter\n\
Repo type = git, directory = /src/mesa, version = abc1234, deployed version = def5678\n\
Tests that will be run: glmark2 glxgears:fullscreen\n";
        let (repo, tests) = parse_runner_output(stdout);
        let repo = repo.unwrap();
        assert_eq!(repo.repo_type, "git");
        assert_eq!(repo.deployed_version, "def5678");
        assert_eq!(tests, vec!["glmark2", "glxgears:fullscreen"]);
    }

    #[test]
    fn no_banner_no_repo() {
        let (repo, tests) = parse_runner_output("nothing useful\n");
        assert!(repo.is_none());
        assert!(tests.is_empty());
    }

    #[test]
    fn command_carries_the_documented_flags() {
        let config = RunnerConfig {
            repo_path: Some(PathBuf::from("/src/mesa")),
            make_command: Some("ninja".to_string()),
            tests_folder: None,
            runner_path: None,
        };
        let runner = ShellRunner::new("/opt/bench/core.sh", config, "nightly")
            .with_profile(Some("gl-desktop".to_string()))
            .with_excluded(vec!["slow:.*".to_string()]);
        let benchmarks = vec!["glmark2".to_string()];
        let request = RunRequest {
            commit: "abc1234",
            benchmarks: &benchmarks,
            rounds: 3,
            dry_run: true,
        };
        let cmd = runner.command(&request);
        let args: Vec<String> = cmd
            .get_args()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            args,
            vec![
                "-P", "gl-desktop", "-p", "/src/mesa", "-b", "-", "-B", "slow:.*", "-r", "3",
                "-m", "ninja", "-N", "nightly", "-k", "abc1234",
            ]
        );
    }
}
