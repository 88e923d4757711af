//! Top-level benchwatch configuration with layered resolution.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::{ReportConfig, RunnerConfig, SchedConfig};
use crate::errors::ConfigError;

/// Top-level configuration aggregating all sub-configs.
///
/// Resolution order (highest priority first):
/// 1. Environment variables (`BENCHWATCH_*`)
/// 2. Project config (`benchwatch.toml` in the report/project root)
/// 3. Compiled defaults
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    pub sched: SchedConfig,
    pub runner: RunnerConfig,
    pub report: ReportConfig,
}

impl WatchConfig {
    /// Load configuration with layered resolution.
    pub fn load(root: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        let project_config_path = root.join("benchwatch.toml");
        if project_config_path.exists() {
            let raw = std::fs::read_to_string(&project_config_path).map_err(|e| {
                ConfigError::ReadError {
                    path: project_config_path.display().to_string(),
                    message: e.to_string(),
                }
            })?;
            config = toml::from_str(&raw).map_err(|e| ConfigError::ParseError {
                path: project_config_path.display().to_string(),
                message: e.to_string(),
            })?;
        }

        Self::apply_env_overrides(&mut config);
        Self::validate(&config)?;

        Ok(config)
    }

    /// Load configuration from a TOML string (for testing).
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(toml_str).map_err(|e| ConfigError::ParseError {
            path: "<string>".to_string(),
            message: e.to_string(),
        })?;
        Self::validate(&config)?;
        Ok(config)
    }

    fn apply_env_overrides(config: &mut Self) {
        if let Some(v) = env_f64("BENCHWATCH_SCHED_CONFIDENCE_THRESHOLD") {
            config.sched.confidence_threshold = v;
        }
        if let Some(v) = env_f64("BENCHWATCH_SCHED_MIN_CHANGE") {
            config.sched.min_change = v;
        }
        if let Some(v) = env_f64("BENCHWATCH_SCHED_MAX_VARIANCE") {
            config.sched.max_variance = v;
        }
        if let Some(v) = env_usize("BENCHWATCH_SCHED_MAX_ROUNDS") {
            config.sched.max_rounds = v;
        }
        if let Some(v) = env_usize("BENCHWATCH_SCHED_COMMIT_SCHEDULE_MAX") {
            config.sched.commit_schedule_max = v;
        }
        if let Ok(v) = std::env::var("BENCHWATCH_RUNNER_PATH") {
            config.runner.runner_path = Some(v.into());
        }
        if let Ok(v) = std::env::var("BENCHWATCH_REPO_PATH") {
            config.runner.repo_path = Some(v.into());
        }
        if let Ok(v) = std::env::var("BENCHWATCH_COMMIT_URL") {
            config.report.commit_url = Some(v);
        }
    }

    /// Validate the configuration values. Refused configs leave any prior
    /// state untouched; the caller keeps running on its previous config.
    pub fn validate(config: &Self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("sched.confidence_threshold", config.sched.confidence_threshold),
            ("sched.min_change", config.sched.min_change),
            ("sched.max_variance", config.sched.max_variance),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::ValidationFailed {
                    field: field.to_string(),
                    message: "must be between 0.0 and 1.0".to_string(),
                });
            }
        }
        if config.sched.max_rounds == 0 {
            return Err(ConfigError::ValidationFailed {
                field: "sched.max_rounds".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        if config.sched.commit_schedule_max == 0 {
            return Err(ConfigError::ValidationFailed {
                field: "sched.commit_schedule_max".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        if let Some(url) = &config.report.commit_url {
            if !url.contains("{commit}") {
                return Err(ConfigError::ValidationFailed {
                    field: "report.commit_url".to_string(),
                    message: "must contain a {commit} placeholder".to_string(),
                });
            }
        }
        Ok(())
    }
}

fn env_f64(key: &str) -> Option<f64> {
    let raw = std::env::var(key).ok()?;
    match raw.parse() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!(key, value = %raw, "ignoring unparseable override");
            None
        }
    }
}

fn env_usize(key: &str) -> Option<usize> {
    let raw = std::env::var(key).ok()?;
    match raw.parse() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!(key, value = %raw, "ignoring unparseable override");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = WatchConfig::default();
        assert!(WatchConfig::validate(&config).is_ok());
        assert!((config.sched.confidence_threshold - 0.95).abs() < 1e-12);
        assert!((config.sched.max_variance - 0.025).abs() < 1e-12);
        assert_eq!(config.sched.max_rounds, 100);
        assert_eq!(config.sched.commit_schedule_max, 1);
    }

    #[test]
    fn from_toml_overrides_fields() {
        let config = WatchConfig::from_toml(
            r#"
[sched]
max_variance = 0.05
commit_schedule_max = 3

[report]
commit_url = "https://cgit.example.org/commit/?id={commit}"
"#,
        )
        .unwrap();
        assert!((config.sched.max_variance - 0.05).abs() < 1e-12);
        assert_eq!(config.sched.commit_schedule_max, 3);
        // Untouched fields keep their defaults.
        assert!((config.sched.min_change - 0.005).abs() < 1e-12);
    }

    #[test]
    fn out_of_range_threshold_is_refused() {
        let err = WatchConfig::from_toml("[sched]\nconfidence_threshold = 1.5\n").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::ValidationFailed { ref field, .. } if field == "sched.confidence_threshold"
        ));
    }

    #[test]
    fn unparseable_env_override_falls_back() {
        std::env::set_var("BENCHWATCH_TEST_F64_BAD", "fast");
        assert_eq!(env_f64("BENCHWATCH_TEST_F64_BAD"), None);
        std::env::set_var("BENCHWATCH_TEST_F64_OK", "0.5");
        assert_eq!(env_f64("BENCHWATCH_TEST_F64_OK"), Some(0.5));
        std::env::set_var("BENCHWATCH_TEST_USIZE_BAD", "-3");
        assert_eq!(env_usize("BENCHWATCH_TEST_USIZE_BAD"), None);
    }

    #[test]
    fn commit_url_requires_placeholder() {
        let err =
            WatchConfig::from_toml("[report]\ncommit_url = \"https://example.org/\"\n")
                .unwrap_err();
        assert!(matches!(err, ConfigError::ValidationFailed { .. }));
    }
}
