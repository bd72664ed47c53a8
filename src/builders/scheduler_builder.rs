//! Builder wiring a scheduler to its configuration and host collaborators.

use std::sync::Arc;

use crate::config::SchedulerConfig;
use crate::core::{LogSink, Scheduler, SchedulerError, Spawn, Timer, TracingLogSink};
use crate::runtime::{TokioSpawner, TokioTimer};

/// Assembles a [`Scheduler`]. Collaborators left unset default to
/// [`TracingLogSink`], [`TokioTimer`] and [`TokioSpawner`] on the current
/// Tokio runtime.
#[derive(Default)]
pub struct SchedulerBuilder {
    config: SchedulerConfig,
    log_sink: Option<Arc<dyn LogSink>>,
    timer: Option<Arc<dyn Timer>>,
    spawner: Option<Arc<dyn Spawn>>,
}

impl SchedulerBuilder {
    /// Builder with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder seeded from [`SchedulerConfig::from_env`].
    ///
    /// # Errors
    ///
    /// Propagates configuration errors.
    pub fn from_env() -> Result<Self, SchedulerError> {
        Ok(Self::new().with_config(SchedulerConfig::from_env()?))
    }

    /// Replace the configuration.
    #[must_use]
    pub fn with_config(mut self, config: SchedulerConfig) -> Self {
        self.config = config;
        self
    }

    /// Route job and group messages to `sink`.
    #[must_use]
    pub fn with_log_sink(mut self, sink: Arc<dyn LogSink>) -> Self {
        self.log_sink = Some(sink);
        self
    }

    /// Use `timer` to arm dispatch.
    #[must_use]
    pub fn with_timer(mut self, timer: Arc<dyn Timer>) -> Self {
        self.timer = Some(timer);
        self
    }

    /// Use `spawner` for cancellation handlers.
    #[must_use]
    pub fn with_spawner(mut self, spawner: Arc<dyn Spawn>) -> Self {
        self.spawner = Some(spawner);
        self
    }

    /// Configuration the scheduler will be built with.
    #[must_use]
    pub const fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Validate the configuration and build the scheduler.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::InvalidConfig`] for an invalid configuration
    /// and [`SchedulerError::NoRuntime`] when a Tokio adapter is needed outside
    /// a runtime.
    pub fn build(self) -> Result<Scheduler, SchedulerError> {
        self.config.validate()?;

        let timer: Arc<dyn Timer> = match self.timer {
            Some(timer) => timer,
            None => Arc::new(TokioTimer::current()?),
        };
        let spawner: Arc<dyn Spawn> = match self.spawner {
            Some(spawner) => spawner,
            None => Arc::new(TokioSpawner::current()?),
        };
        let log_sink = self
            .log_sink
            .unwrap_or_else(|| Arc::new(TracingLogSink));

        Ok(Scheduler::new(self.config, log_sink, timer, spawner))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_outside_runtime_fails() {
        let err = SchedulerBuilder::new().build().err();
        assert!(matches!(err, Some(SchedulerError::NoRuntime)));
    }

    #[test]
    fn test_invalid_config_rejected_first() {
        let err = SchedulerBuilder::new()
            .with_config(SchedulerConfig::new().with_max_run_count(0))
            .build()
            .err();
        assert!(matches!(err, Some(SchedulerError::InvalidConfig(_))));
    }

    #[tokio::test]
    async fn test_build_inside_runtime() {
        let scheduler = SchedulerBuilder::new().build().unwrap();
        assert_eq!(scheduler.config(), &SchedulerConfig::default());
        assert_eq!(scheduler.stats().queued_jobs, 0);
    }
}
