//! Tests for tokio adapters

use prometheus_job_scheduler::core::{BoxFuture, Spawn, Timer};
use prometheus_job_scheduler::runtime::{TokioSpawner, TokioTimer};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_tokio_spawner_spawn() {
    let spawner = TokioSpawner::new(tokio::runtime::Handle::current());

    let (tx, rx) = tokio::sync::oneshot::channel();
    spawner.spawn(Box::pin(async move {
        tx.send(123).unwrap();
    }));

    let result = rx.await.expect("oneshot result");
    assert_eq!(result, 123);
}

#[tokio::test(start_paused = true)]
async fn test_dropped_timer_handle_disarms() {
    let timer = TokioTimer::current().unwrap();
    let fired = Arc::new(AtomicU32::new(0));

    let counter = Arc::clone(&fired);
    let handle = timer.arm_once(
        Duration::from_millis(100),
        Box::new(move || -> BoxFuture {
            Box::pin(async move {
                counter.fetch_add(1, Ordering::SeqCst);
            })
        }),
    );
    drop(handle);

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(fired.load(Ordering::SeqCst), 0);
}
