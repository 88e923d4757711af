//! Scheduling thresholds.

use serde::{Deserialize, Serialize};

/// Knobs of the event synthesizer and the enhancement scheduler.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedConfig {
    /// Minimum t-test confidence (1 - p) for a perf change to become an event.
    pub confidence_threshold: f64,

    /// Minimum relative mean change for a perf change to become an event.
    /// Both gates must pass; statistically significant micro-changes are
    /// noise to a human reader.
    pub min_change: f64,

    /// Maximum acceptable fractional margin of a result. Results above it
    /// raise an InsufficientSignificance event and are excluded from
    /// bisection decisions.
    pub max_variance: f64,

    /// Hard ceiling of rounds per (commit, benchmark) entry.
    pub max_rounds: usize,

    /// How many distinct commits may receive new work per scheduling pass.
    pub commit_schedule_max: usize,
}

impl Default for SchedConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.95,
            min_change: 0.005,
            max_variance: 0.025,
            max_rounds: 100,
            commit_schedule_max: 1,
        }
    }
}
