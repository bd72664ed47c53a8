//! Scheduler configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::SchedulerError;
use crate::util::serde::{LogLevel, Priority};

/// Environment variable overriding [`SchedulerConfig::max_run_count`].
pub const ENV_MAX_RUN_COUNT: &str = "JOB_SCHEDULER_MAX_RUN_COUNT";
/// Environment variable overriding [`SchedulerConfig::rerun_delay_ms`].
pub const ENV_RERUN_DELAY_MS: &str = "JOB_SCHEDULER_RERUN_DELAY_MS";
/// Environment variable overriding [`SchedulerConfig::default_priority`].
pub const ENV_DEFAULT_PRIORITY: &str = "JOB_SCHEDULER_DEFAULT_PRIORITY";
/// Environment variable overriding [`SchedulerConfig::log_level`].
pub const ENV_LOG_LEVEL: &str = "JOB_SCHEDULER_LOG_LEVEL";

/// Defaults applied to jobs that do not set their own values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Priority of jobs added without one.
    pub default_priority: Priority,
    /// Invocations allowed per step before a failure is terminal.
    pub max_run_count: u32,
    /// Wait before rerunning a failed step, in milliseconds.
    pub rerun_delay_ms: u64,
    /// Log verbosity of jobs and groups added without one.
    pub log_level: LogLevel,
    /// Priority of jobs created by `Scheduler::wait`.
    pub wait_priority: Priority,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            default_priority: Priority::Medium,
            max_run_count: 3,
            rerun_delay_ms: 5_000,
            log_level: LogLevel::Normal,
            wait_priority: Priority::High,
        }
    }
}

impl SchedulerConfig {
    /// Create a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the default priority.
    #[must_use]
    pub const fn with_default_priority(mut self, priority: Priority) -> Self {
        self.default_priority = priority;
        self
    }

    /// Set the default run budget.
    #[must_use]
    pub const fn with_max_run_count(mut self, max_run_count: u32) -> Self {
        self.max_run_count = max_run_count;
        self
    }

    /// Set the default rerun delay.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn with_rerun_delay(mut self, delay: Duration) -> Self {
        self.rerun_delay_ms = delay.as_millis() as u64;
        self
    }

    /// Set the default log level.
    #[must_use]
    pub const fn with_log_level(mut self, log_level: LogLevel) -> Self {
        self.log_level = log_level;
        self
    }

    /// Set the priority used by `Scheduler::wait`.
    #[must_use]
    pub const fn with_wait_priority(mut self, priority: Priority) -> Self {
        self.wait_priority = priority;
        self
    }

    /// Default rerun delay as a [`Duration`].
    #[must_use]
    pub const fn rerun_delay(&self) -> Duration {
        Duration::from_millis(self.rerun_delay_ms)
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::InvalidConfig`] when `max_run_count` is zero.
    pub fn validate(&self) -> Result<(), SchedulerError> {
        if self.max_run_count == 0 {
            return Err(SchedulerError::InvalidConfig(
                "max_run_count must be greater than 0".into(),
            ));
        }
        Ok(())
    }

    /// Parse and validate a JSON document. Missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::Config`] for malformed JSON and
    /// [`SchedulerError::InvalidConfig`] for invalid values.
    pub fn from_json_str(input: &str) -> Result<Self, SchedulerError> {
        let config: Self =
            serde_json::from_str(input).map_err(|e| SchedulerError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load defaults overridden by `JOB_SCHEDULER_*` environment variables,
    /// reading a `.env` file first when one is present.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::Config`] when a variable does not parse and
    /// [`SchedulerError::InvalidConfig`] for invalid values.
    pub fn from_env() -> Result<Self, SchedulerError> {
        if let Err(e) = dotenvy::dotenv() {
            if !e.not_found() {
                tracing::warn!(error = %e, "failed to load .env file");
            }
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`from_env`](Self::from_env), reading variables through `lookup`.
    ///
    /// # Errors
    ///
    /// Same as [`from_env`](Self::from_env).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, SchedulerError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(raw) = lookup(ENV_MAX_RUN_COUNT) {
            config.max_run_count = parse_var(ENV_MAX_RUN_COUNT, &raw)?;
        }
        if let Some(raw) = lookup(ENV_RERUN_DELAY_MS) {
            config.rerun_delay_ms = parse_var(ENV_RERUN_DELAY_MS, &raw)?;
        }
        if let Some(raw) = lookup(ENV_DEFAULT_PRIORITY) {
            config.default_priority = parse_var(ENV_DEFAULT_PRIORITY, &raw)?;
        }
        if let Some(raw) = lookup(ENV_LOG_LEVEL) {
            config.log_level = parse_var(ENV_LOG_LEVEL, &raw)?;
        }
        config.validate()?;
        Ok(config)
    }
}

fn parse_var<T>(key: &str, raw: &str) -> Result<T, SchedulerError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e| SchedulerError::Config(format!("{key}={raw}: {e}")))
}
