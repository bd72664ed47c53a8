//! Tokio adapters for the timer and spawner collaborators.

pub mod tokio_spawner;
pub mod tokio_timer;

pub use tokio_spawner::TokioSpawner;
pub use tokio_timer::{TokioTimer, TokioTimerHandle};
