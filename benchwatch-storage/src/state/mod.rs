//! The on-disk task state and its locked mutation protocol.
//!
//! Several independent processes (CLI invocations, the polling daemon,
//! dashboards) mutate the same document. Every mutation takes an
//! exclusive advisory lock on a sibling lock file, reloads the document
//! while holding it, applies the change and publishes via write-to-temp
//! plus atomic rename. A reader can therefore never observe a torn file,
//! and a crash mid-write leaves the previous document intact.

mod model;

pub use model::{BenchTask, CommitTasks, RunningMode, TaskState, STATE_VERSION};

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use benchwatch_core::errors::StateError;
use tracing::{debug, error, info};

/// Handle on one report's persistent task state document.
pub struct StateFile {
    path: PathBuf,
    lock_path: PathBuf,
}

impl StateFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let mut lock_path = path.clone();
        lock_path.as_mut_os_string().push(".lock");
        Self { path, lock_path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read-only snapshot of the current document.
    ///
    /// A missing or corrupt file yields a fresh default state (logged at
    /// error severity for the corrupt case); a document written by a newer
    /// tool version is refused instead of being half-understood.
    pub fn load(&self) -> Result<TaskState, StateError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no state document yet, starting fresh");
                return Ok(TaskState::default());
            }
            Err(e) => {
                error!(path = %self.path.display(), error = %e, "unreadable state document, starting fresh");
                return Ok(TaskState::default());
            }
        };
        let state: TaskState = match serde_json::from_str(&contents) {
            Ok(s) => s,
            Err(e) => {
                error!(path = %self.path.display(), error = %e, "corrupt state document, starting fresh");
                return Ok(TaskState::default());
            }
        };
        if state.version > STATE_VERSION {
            return Err(StateError::UnsupportedVersion {
                found: state.version,
                supported: STATE_VERSION,
            });
        }
        Ok(state)
    }

    /// Run `transform` on the current document under the exclusive lock
    /// and persist the result atomically.
    ///
    /// The document is reloaded from disk after the lock is acquired; an
    /// in-memory copy from before the lock is never trusted across a
    /// mutation. When `transform` fails nothing is written.
    pub fn with_exclusive_lock<T>(
        &self,
        transform: impl FnOnce(&mut TaskState) -> Result<T, StateError>,
    ) -> Result<T, StateError> {
        let lock_file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&self.lock_path)
            .map_err(|e| StateError::Io {
                path: self.lock_path.display().to_string(),
                message: e.to_string(),
            })?;
        let mut lock = fd_lock::RwLock::new(lock_file);
        let _guard = lock.write().map_err(|e| StateError::LockFailed {
            path: self.lock_path.display().to_string(),
            message: e.to_string(),
        })?;

        let mut state = self.load()?;
        let outcome = transform(&mut state)?;
        self.write_atomic(&state)?;
        Ok(outcome)
    }

    fn write_atomic(&self, state: &TaskState) -> Result<(), StateError> {
        let json = serde_json::to_string_pretty(state).map_err(|e| StateError::Serialize {
            message: e.to_string(),
        })?;

        let mut tmp_path = self.path.clone();
        tmp_path.as_mut_os_string().push(".tmp");
        let io_err = |e: std::io::Error| StateError::Io {
            path: tmp_path.display().to_string(),
            message: e.to_string(),
        };

        let mut tmp = File::create(&tmp_path).map_err(io_err)?;
        tmp.write_all(json.as_bytes()).map_err(io_err)?;
        tmp.sync_all().map_err(io_err)?;
        drop(tmp);

        fs::rename(&tmp_path, &self.path).map_err(|e| StateError::Io {
            path: self.path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Raise the scheduled rounds of (commit, benchmark) to `rounds`,
    /// returning how many rounds of work that adds. Calling again with the
    /// same total is a no-op returning 0.
    pub fn force_benchmark_rounds(
        &self,
        commit: &str,
        benchmark: &str,
        rounds: usize,
    ) -> Result<usize, StateError> {
        let added = self.with_exclusive_lock(|state| {
            Ok(state.raise_rounds(commit, benchmark, rounds))
        })?;
        if added > 0 {
            info!(commit, benchmark, added, total = rounds, "scheduled benchmark rounds");
        }
        Ok(added)
    }

    /// Select the runner profile. Once set, the profile is fixed for the
    /// lifetime of the report; changing it would make old and new results
    /// incomparable.
    pub fn set_profile(&self, profile: &str) -> Result<(), StateError> {
        if profile.is_empty() || profile.contains(['/', '\\']) {
            return Err(StateError::InvalidProfile(profile.to_string()));
        }
        self.with_exclusive_lock(|state| match &state.profile {
            Some(current) if current != profile => Err(StateError::ProfileAlreadySet {
                current: current.clone(),
                requested: profile.to_string(),
            }),
            Some(_) => Ok(()),
            None => {
                info!(profile, "profile selected");
                state.profile = Some(profile.to_string());
                Ok(())
            }
        })
    }

    /// Operator-facing mode change. RUN and PAUSE are the only modes an
    /// operator may request; INITIAL and RUNNING are internal. Setting RUN
    /// is also the manual reset out of ERROR.
    pub fn set_running_mode(&self, mode: RunningMode) -> Result<(), StateError> {
        if matches!(mode, RunningMode::Initial | RunningMode::Running) {
            let current = self.load()?.mode;
            return Err(StateError::IllegalTransition {
                from: current.to_string(),
                to: mode.to_string(),
            });
        }
        self.with_exclusive_lock(|state| {
            info!(from = %state.mode, to = %mode, "running mode changed");
            state.mode = mode;
            Ok(())
        })
    }

    /// Driver-internal mode change, bypassing the operator restrictions.
    /// Used to enter RUNNING around a dispatch and ERROR on unrecoverable
    /// runner failures.
    pub fn force_running_mode(&self, mode: RunningMode) -> Result<(), StateError> {
        self.with_exclusive_lock(|state| {
            debug!(from = %state.mode, to = %mode, "running mode forced");
            state.mode = mode;
            Ok(())
        })
    }

    /// Snapshot of the scheduled work, commit by commit.
    pub fn task_tree(&self) -> Result<std::collections::BTreeMap<String, CommitTasks>, StateError> {
        Ok(self.load()?.commits)
    }

    pub fn mark_been_run(&self) -> Result<(), StateError> {
        self.with_exclusive_lock(|state| {
            state.been_run_before = true;
            Ok(())
        })
    }

    pub fn set_conf_script(&self, script: &str) -> Result<(), StateError> {
        self.with_exclusive_lock(|state| {
            state.conf_script = Some(script.to_string());
            Ok(())
        })
    }

    pub fn set_commit_url(&self, url: &str) -> Result<(), StateError> {
        self.with_exclusive_lock(|state| {
            state.commit_url = Some(url.to_string());
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state_file(dir: &tempfile::TempDir) -> StateFile {
        StateFile::new(dir.path().join("benchwatch.state"))
    }

    #[test]
    fn missing_document_is_a_fresh_state() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_file(&dir).load().unwrap();
        assert_eq!(state, TaskState::default());
    }

    #[test]
    fn corrupt_document_is_a_fresh_state() {
        let dir = tempfile::tempdir().unwrap();
        let file = state_file(&dir);
        fs::write(file.path(), "{not json").unwrap();
        assert_eq!(file.load().unwrap(), TaskState::default());
    }

    #[test]
    fn newer_version_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let file = state_file(&dir);
        fs::write(file.path(), r#"{"version": 99}"#).unwrap();
        assert!(matches!(
            file.load(),
            Err(StateError::UnsupportedVersion { found: 99, .. })
        ));
        assert!(matches!(
            file.force_benchmark_rounds("abc", "b", 1),
            Err(StateError::UnsupportedVersion { .. })
        ));
    }

    #[test]
    fn force_benchmark_rounds_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let file = state_file(&dir);
        assert_eq!(file.force_benchmark_rounds("abc123", "glmark2", 5).unwrap(), 5);
        assert_eq!(file.load().unwrap().scheduled_rounds("abc123", "glmark2"), 5);
        assert_eq!(file.force_benchmark_rounds("abc123", "glmark2", 5).unwrap(), 0);
        assert_eq!(file.load().unwrap().scheduled_rounds("abc123", "glmark2"), 5);
    }

    #[test]
    fn task_tree_reflects_scheduled_work() {
        let dir = tempfile::tempdir().unwrap();
        let file = state_file(&dir);
        assert!(file.task_tree().unwrap().is_empty());
        file.force_benchmark_rounds("abc123", "glmark2", 3).unwrap();
        let tree = file.task_tree().unwrap();
        assert_eq!(tree["abc123"].benchmarks["glmark2"].rounds, 3);
        assert!(!file.load().unwrap().been_run_before);
        file.mark_been_run().unwrap();
        assert!(file.load().unwrap().been_run_before);
    }

    #[test]
    fn profile_is_set_once() {
        let dir = tempfile::tempdir().unwrap();
        let file = state_file(&dir);
        file.set_profile("gl-desktop").unwrap();
        file.set_profile("gl-desktop").unwrap();
        assert!(matches!(
            file.set_profile("vk-desktop"),
            Err(StateError::ProfileAlreadySet { .. })
        ));
        assert_eq!(file.load().unwrap().profile.as_deref(), Some("gl-desktop"));
    }

    #[test]
    fn invalid_profile_is_refused_before_touching_state() {
        let dir = tempfile::tempdir().unwrap();
        let file = state_file(&dir);
        assert!(matches!(
            file.set_profile("../escape"),
            Err(StateError::InvalidProfile(_))
        ));
        assert!(!file.path().exists());
    }

    #[test]
    fn operator_cannot_request_internal_modes() {
        let dir = tempfile::tempdir().unwrap();
        let file = state_file(&dir);
        assert!(matches!(
            file.set_running_mode(RunningMode::Running),
            Err(StateError::IllegalTransition { .. })
        ));
        file.set_running_mode(RunningMode::Pause).unwrap();
        assert_eq!(file.load().unwrap().mode, RunningMode::Pause);
        file.set_running_mode(RunningMode::Run).unwrap();
        assert_eq!(file.load().unwrap().mode, RunningMode::Run);
    }

    #[test]
    fn document_stays_valid_json_after_every_write() {
        let dir = tempfile::tempdir().unwrap();
        let file = state_file(&dir);
        for i in 1..=5 {
            file.force_benchmark_rounds("abc", "b", i).unwrap();
            let raw = fs::read_to_string(file.path()).unwrap();
            let parsed: serde_json::Value = serde_json::from_str(&raw).unwrap();
            assert_eq!(parsed["commits"]["abc"]["benchmarks"]["b"]["rounds"], i);
        }
    }
}
