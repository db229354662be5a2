//! Integration tests for the ledger guard under concurrent callers
//!
//! Every test runs on a multi-threaded runtime so operations really race for
//! the lock rather than interleaving on one thread.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic

use futures::future::join_all;
use ledger_core::{AccountTable, Amount, LedgerError};
use ledger_runtime::{Ledger, LedgerConfig};
use ledger_testing::{init_tracing, test_ledger};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

// ============================================================================
// Conservation
// ============================================================================

/// 1000 deposits of 50 and 1000 withdrawals of 20 on one account
///
/// Every operation must land exactly once, whatever the interleaving.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_deposits_and_withdrawals_are_not_lost() {
    init_tracing();
    let ledger = Ledger::with_config(
        AccountTable::new().with_account("acc1", 1000),
        LedgerConfig::default().with_metrics(false),
    )
    .unwrap();

    let deposits = (0..1000).map(|_| {
        let ledger = ledger.clone();
        tokio::spawn(async move { ledger.deposit("acc1", 50).await })
    });
    let withdrawals = (0..1000).map(|_| {
        let ledger = ledger.clone();
        tokio::spawn(async move { ledger.withdraw("acc1", 20).await })
    });

    let results = join_all(deposits.chain(withdrawals)).await;
    for result in results {
        // The account starts at 1000 and each withdrawal takes 20, so even a
        // schedule running every withdrawal first never overdraws.
        result.expect("task panicked").expect("operation rejected");
    }

    assert_eq!(
        ledger.balance(&"acc1".into()).await,
        Some(Amount::new(1000 + 1000 * 50 - 1000 * 20))
    );
    assert_eq!(ledger.history_depth().await, 2000);
}

/// Concurrent transfers never change the total, as seen by concurrent readers
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_transfers_are_atomic_to_readers() {
    init_tracing();
    let ledger = test_ledger();
    let initial_total = ledger.total().await;
    let done = Arc::new(AtomicBool::new(false));

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let ledger = ledger.clone();
            let done = Arc::clone(&done);
            tokio::spawn(async move {
                let mut observations = 0_u64;
                while !done.load(Ordering::Acquire) {
                    let snapshot = ledger.balances().await;
                    assert_eq!(snapshot.total(), initial_total, "observed a torn transfer");
                    assert!(snapshot.iter().all(|(_, balance)| !balance.is_negative()));
                    observations += 1;
                    tokio::task::yield_now().await;
                }
                observations
            })
        })
        .collect();

    let routes = [("acc1", "acc2"), ("acc2", "acc3"), ("acc3", "acc1")];
    let writers: Vec<_> = (0..300)
        .map(|i| {
            let ledger = ledger.clone();
            let (from, to) = routes[i % routes.len()];
            tokio::spawn(async move { ledger.transfer(from, to, 7).await })
        })
        .collect();

    for result in join_all(writers).await {
        match result.expect("task panicked") {
            Ok(_) | Err(LedgerError::InsufficientFunds { .. }) => {}
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
    done.store(true, Ordering::Release);

    for reader in join_all(readers).await {
        reader.expect("reader panicked");
    }

    assert_eq!(ledger.total().await, initial_total);
}

// ============================================================================
// Rollback under contention
// ============================================================================

/// Every mutation, applied or not, leaves exactly one snapshot
///
/// After all tasks finish, unwinding the whole history restores the table
/// the ledger started with.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_full_unwind_after_concurrent_operations() {
    init_tracing();
    let ledger = test_ledger();
    let initial = ledger.balances().await;

    let tasks: Vec<_> = (0..4)
        .map(|worker| {
            let ledger = ledger.clone();
            tokio::spawn(async move {
                // Mirrors the demo workers: deposit, withdraw, then transfer.
                let _ = ledger.deposit("acc1", 200).await;
                let _ = ledger.withdraw("acc2", 100).await;
                let to = if worker % 2 == 0 { "acc3" } else { "acc1" };
                let _ = ledger.transfer("acc2", to, 75).await;
            })
        })
        .collect();

    for task in join_all(tasks).await {
        task.expect("task panicked");
    }

    let depth = ledger.history_depth().await;
    assert_eq!(depth, 12);

    for _ in 0..depth {
        ledger.rollback().await.unwrap();
    }

    assert_eq!(ledger.balances().await, initial);
    assert_eq!(ledger.rollback().await, Err(LedgerError::EmptyHistory));
}

/// Concurrent rollbacks each consume exactly one snapshot
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_rollbacks_consume_history_once() {
    init_tracing();
    let ledger = test_ledger();

    for _ in 0..10 {
        ledger.deposit("acc3", 1).await.unwrap();
    }

    let rollbacks: Vec<_> = (0..16)
        .map(|_| {
            let ledger = ledger.clone();
            tokio::spawn(async move { ledger.rollback().await })
        })
        .collect();

    let results: Vec<_> = join_all(rollbacks)
        .await
        .into_iter()
        .map(|r| r.expect("task panicked"))
        .collect();

    let applied = results.iter().filter(|r| r.is_ok()).count();
    let empty = results
        .iter()
        .filter(|r| matches!(r, Err(LedgerError::EmptyHistory)))
        .count();

    assert_eq!(applied, 10);
    assert_eq!(empty, 6);
    assert_eq!(ledger.balance(&"acc3".into()).await, Some(Amount::new(300)));
}
