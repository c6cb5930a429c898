//! Tests for the resource ledger under concurrent use

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use rand::Rng;
use slot_dispatch::core::ResourceLedger;

#[test]
fn test_round_trip() {
    let ledger = ResourceLedger::new();
    assert!(ledger.try_claim(0, 1));
    assert!(!ledger.try_claim(0, 2));
    assert_eq!(ledger.release(0), Some(1));
    assert!(ledger.try_claim(0, 3));
}

#[test]
fn test_concurrent_claims_single_winner() {
    let ledger = Arc::new(ResourceLedger::new());
    let winners = Arc::new(AtomicUsize::new(0));

    let handles: Vec<_> = (1..=16u64)
        .map(|holder| {
            let ledger = Arc::clone(&ledger);
            let winners = Arc::clone(&winners);
            std::thread::spawn(move || {
                if ledger.try_claim(7, holder) {
                    winners.fetch_add(1, Ordering::SeqCst);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(winners.load(Ordering::SeqCst), 1);
    assert_eq!(ledger.len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_random_claim_release_never_double_claims() {
    let ledger = Arc::new(ResourceLedger::new());
    let inside = Arc::new([
        AtomicUsize::new(0),
        AtomicUsize::new(0),
        AtomicUsize::new(0),
    ]);

    let tasks = (1..=12u64).map(|holder| {
        let ledger = Arc::clone(&ledger);
        let inside = Arc::clone(&inside);
        tokio::spawn(async move {
            for _ in 0..200 {
                let resource: u32 = rand::rng().random_range(0..3);
                if ledger.try_claim(resource, holder) {
                    let idx = resource as usize;
                    assert_eq!(inside[idx].fetch_add(1, Ordering::SeqCst), 0);
                    tokio::task::yield_now().await;
                    inside[idx].fetch_sub(1, Ordering::SeqCst);
                    assert_eq!(ledger.release(resource), Some(holder));
                }
                tokio::task::yield_now().await;
            }
        })
    });

    for result in futures::future::join_all(tasks).await {
        result.unwrap();
    }
    assert!(ledger.is_empty());
}
