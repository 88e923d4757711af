//! Exit-status contract of the external benchmark runner.
//!
//! The runner communicates through its process exit code and through the
//! trailing line of each per-commit compile log (`Exiting with error code N`).
//! Codes below [`RunnerStatus::UNRECOVERABLE_LIMIT`] indicate a setup or
//! dependency problem that an operator must fix before any retry makes
//! sense; compilation and deployment failures only poison the one commit
//! they occurred on.

/// Enumerated outcome of one external-runner invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunnerStatus {
    NoError,
    /// Another process already holds the report (10).
    ReportLocked,
    /// The requested profile does not exist (11).
    ProfileInvalid,
    /// No profile was supplied where one is required (12).
    ProfileMissing,
    /// The configuration script could not be found (13).
    ConfScriptMissing,
    /// The round count argument did not parse (14).
    RoundsInvalid,
    /// A shell dependency of the runner is missing (30).
    ShellDepsMissing,
    /// The log folder could not be created (31).
    LogFolderCreation,
    /// The source repository is not accessible (32).
    RepoAccess,
    /// The commit identifier was rejected by the VCS (40).
    GitInvalidCommit,
    /// Checking out the commit failed (41).
    GitCheckoutFailed,
    /// The commit did not compile (50).
    CompilationFailed,
    /// The compiled artifacts could not be deployed (60).
    DeploymentFailed,
    /// Deployment tooling itself failed (61).
    DeploymentError,
    /// The machine must be rebooted before continuing (70).
    RebootNeeded,
    /// The runner honored an early-exit request (71).
    EarlyExit,
    /// A test name did not match any known test (100).
    TestInvalidName,
    /// The runner failed for an unknown reason (255).
    Unknown,
    /// Any exit code without a defined meaning.
    Unrecognized(i32),
}

impl RunnerStatus {
    /// Codes strictly below this value (other than 0) cannot be fixed by
    /// retrying and move the whole state machine to ERROR.
    pub const UNRECOVERABLE_LIMIT: i32 = 40;

    pub fn from_code(code: i32) -> Self {
        match code {
            0 => Self::NoError,
            10 => Self::ReportLocked,
            11 => Self::ProfileInvalid,
            12 => Self::ProfileMissing,
            13 => Self::ConfScriptMissing,
            14 => Self::RoundsInvalid,
            30 => Self::ShellDepsMissing,
            31 => Self::LogFolderCreation,
            32 => Self::RepoAccess,
            40 => Self::GitInvalidCommit,
            41 => Self::GitCheckoutFailed,
            50 => Self::CompilationFailed,
            60 => Self::DeploymentFailed,
            61 => Self::DeploymentError,
            70 => Self::RebootNeeded,
            71 => Self::EarlyExit,
            100 => Self::TestInvalidName,
            255 => Self::Unknown,
            other => Self::Unrecognized(other),
        }
    }

    pub fn code(&self) -> i32 {
        match self {
            Self::NoError => 0,
            Self::ReportLocked => 10,
            Self::ProfileInvalid => 11,
            Self::ProfileMissing => 12,
            Self::ConfScriptMissing => 13,
            Self::RoundsInvalid => 14,
            Self::ShellDepsMissing => 30,
            Self::LogFolderCreation => 31,
            Self::RepoAccess => 32,
            Self::GitInvalidCommit => 40,
            Self::GitCheckoutFailed => 41,
            Self::CompilationFailed => 50,
            Self::DeploymentFailed => 60,
            Self::DeploymentError => 61,
            Self::RebootNeeded => 70,
            Self::EarlyExit => 71,
            Self::TestInvalidName => 100,
            Self::Unknown => 255,
            Self::Unrecognized(code) => *code,
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Self::NoError)
    }

    /// Setup or dependency failure requiring a manual reset before retrying.
    pub fn is_unrecoverable(&self) -> bool {
        let code = self.code();
        code != 0 && code < Self::UNRECOVERABLE_LIMIT
    }

    /// Failure that marks only the affected commit as broken.
    pub fn breaks_build(&self) -> bool {
        matches!(
            self,
            Self::CompilationFailed | Self::DeploymentFailed | Self::DeploymentError
        )
    }
}

impl std::fmt::Display for RunnerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unrecognized(code) => write!(f, "UNRECOGNIZED({code})"),
            other => write!(f, "{other:?}"),
        }
    }
}
