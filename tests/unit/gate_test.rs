//! Tests for the concurrency gate

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use slot_dispatch::core::ConcurrencyGate;

#[tokio::test]
async fn test_available_parallelism_gate() {
    let gate = ConcurrencyGate::with_available_parallelism().unwrap();
    assert_eq!(gate.capacity(), num_cpus_hint());
    assert_eq!(gate.available(), gate.capacity());
}

fn num_cpus_hint() -> usize {
    slot_dispatch::config::DispatcherConfig::default().max_concurrency
}

#[tokio::test]
async fn test_acquire_waits_for_release() {
    let gate = ConcurrencyGate::new(1).unwrap();
    let held = gate.acquire().await.unwrap();

    let waiter_gate = gate.clone();
    let waiter = tokio::spawn(async move { waiter_gate.acquire().await.map(|p| p.release()) });

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(!waiter.is_finished());

    held.release();
    waiter.await.unwrap().unwrap();
    assert_eq!(gate.outstanding(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_outstanding_never_exceeds_capacity() {
    let gate = ConcurrencyGate::new(3).unwrap();
    let active = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));

    let tasks = (0..24).map(|_| {
        let gate = gate.clone();
        let active = Arc::clone(&active);
        let peak = Arc::clone(&peak);
        tokio::spawn(async move {
            let permit = gate.acquire().await.unwrap();
            let now = active.fetch_add(1, Ordering::SeqCst) + 1;
            peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(2)).await;
            active.fetch_sub(1, Ordering::SeqCst);
            drop(permit);
        })
    });

    for result in futures::future::join_all(tasks).await {
        result.unwrap();
    }
    assert!(peak.load(Ordering::SeqCst) <= 3);
    assert!(gate.peak_outstanding() <= 3);
    assert_eq!(gate.available(), 3);
}
