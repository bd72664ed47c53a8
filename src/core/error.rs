//! Error types for scheduler construction and configuration.
//!
//! Scheduling operations themselves never fail: handler failures are retried,
//! cancellation is a terminal state, and misuse is logged and asserted.

use thiserror::Error;

/// Errors produced while building or configuring a scheduler.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// Configuration failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// Configuration could not be read or parsed.
    #[error("config error: {0}")]
    Config(String),
    /// No tokio runtime was available to back the default host adapters.
    #[error("no tokio runtime available")]
    NoRuntime,
}

/// Application-facing result using anyhow for higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;
