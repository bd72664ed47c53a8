//! Configuration model and loading.

pub mod scheduler;

pub use scheduler::SchedulerConfig;
