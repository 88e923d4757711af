//! External benchmark-runner invocation settings.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Where and how to invoke the external benchmark runner.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Path to the runner executable.
    pub runner_path: Option<PathBuf>,

    /// Path to the source repository under test (`-p`).
    pub repo_path: Option<PathBuf>,

    /// Build command override (`-m`).
    pub make_command: Option<String>,

    /// Folder holding the test definitions (`-T`).
    pub tests_folder: Option<PathBuf>,
}
