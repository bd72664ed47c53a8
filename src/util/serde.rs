//! Serializable identifiers and enums shared across the scheduler.

use serde::{Deserialize, Serialize};

/// Identifier shared by jobs and groups; allocated from one counter per scheduler.
pub type JobId = u64;

/// Scheduling priority of a job. Ordinal: `High > Medium > Low`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    /// Runs only when no Medium job is ready.
    Low,
    /// Default priority.
    #[default]
    Medium,
    /// Selected ahead of everything else and never blocked by the Low/Medium slot.
    High,
}

/// Controls which log sink operations a job or group emits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    /// Route to `running`, `completed`, `failed` and `debug` as named.
    #[default]
    Normal,
    /// Route every message to `debug`.
    DebugOnly,
    /// Drop `running`, `completed` and `failed`; `debug` still passes.
    Quiet,
}

impl std::str::FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            other => Err(format!("unknown priority `{other}`")),
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "normal" => Ok(Self::Normal),
            "debug_only" | "debugonly" => Ok(Self::DebugOnly),
            "quiet" => Ok(Self::Quiet),
            other => Err(format!("unknown log level `{other}`")),
        }
    }
}
