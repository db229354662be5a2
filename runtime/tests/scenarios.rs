//! End-to-end ledger scenarios through the guarded handle

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic

use ledger_core::environment::Clock;
use ledger_core::{AccountId, AccountTable, Amount, LedgerError, Operation, OperationKind};
use ledger_runtime::{Ledger, LedgerConfig};
use ledger_testing::fixtures::ledger_with;
use ledger_testing::{standard_accounts, test_clock, test_ledger};
use std::sync::Arc;

fn table(entries: &[(&str, i64)]) -> AccountTable {
    entries.iter().map(|&(id, balance)| (id, balance)).collect()
}

async fn balance(ledger: &Ledger, id: &str) -> i64 {
    ledger
        .balance(&AccountId::new(id))
        .await
        .expect("account exists")
        .units()
}

/// Deposit, withdraw, transfer, failed withdraw, then unwind step by step
#[tokio::test]
async fn test_standard_scenario() {
    let ledger = test_ledger();

    ledger.deposit("acc1", 200).await.unwrap();
    assert_eq!(balance(&ledger, "acc1").await, 1200);

    ledger.withdraw("acc2", 100).await.unwrap();
    assert_eq!(balance(&ledger, "acc2").await, 400);

    ledger.transfer("acc1", "acc3", 150).await.unwrap();
    assert_eq!(balance(&ledger, "acc1").await, 1050);
    assert_eq!(balance(&ledger, "acc3").await, 450);

    let before_failure = ledger.balances().await;
    assert_eq!(
        ledger.withdraw("acc3", 500).await,
        Err(LedgerError::InsufficientFunds {
            account: "acc3".into(),
            available: Amount::new(450),
            requested: Amount::new(500),
        })
    );
    assert_eq!(ledger.balances().await, before_failure);

    // The rejected withdrawal still pushed a snapshot, so the first rollback
    // is a no-op on balances.
    assert_eq!(ledger.history_depth().await, 4);
    let outcome = ledger.rollback().await.unwrap();
    assert!(outcome.changes.is_empty());
    assert_eq!(ledger.balances().await, before_failure);

    // Undo the transfer.
    ledger.rollback().await.unwrap();
    assert_eq!(
        ledger.balances().await,
        table(&[("acc1", 1200), ("acc2", 400), ("acc3", 300)])
    );

    // Undo the withdrawal and the deposit.
    ledger.rollback().await.unwrap();
    ledger.rollback().await.unwrap();
    assert_eq!(ledger.balances().await, standard_accounts());
    assert_eq!(ledger.rollback().await, Err(LedgerError::EmptyHistory));
}

/// Two successful operations, two rollbacks, back to the start
#[tokio::test]
async fn test_rollback_restores_initial_balances() {
    let ledger = test_ledger();

    ledger.deposit("acc1", 200).await.unwrap();
    ledger.withdraw("acc2", 100).await.unwrap();

    ledger.rollback().await.unwrap();
    ledger.rollback().await.unwrap();

    assert_eq!(ledger.balances().await, standard_accounts());
    assert_eq!(ledger.history_depth().await, 0);
}

#[tokio::test]
async fn test_unknown_accounts_are_rejected() {
    let ledger = test_ledger();

    assert_eq!(
        ledger.deposit("nope", 1).await,
        Err(LedgerError::UnknownAccount {
            account: "nope".into()
        })
    );
    assert_eq!(
        ledger.withdraw("nope", 1).await,
        Err(LedgerError::UnknownAccount {
            account: "nope".into()
        })
    );

    // Sender is checked before receiver.
    assert_eq!(
        ledger.transfer("ghost", "nope", 1).await,
        Err(LedgerError::UnknownAccount {
            account: "ghost".into()
        })
    );
    assert_eq!(
        ledger.transfer("acc1", "nope", 1).await,
        Err(LedgerError::UnknownAccount {
            account: "nope".into()
        })
    );

    assert_eq!(ledger.balances().await, standard_accounts());
    assert_eq!(ledger.history_depth().await, 4);
}

#[tokio::test]
async fn test_insufficient_transfer_leaves_both_sides_untouched() {
    let ledger = test_ledger();

    let result = ledger.transfer("acc3", "acc1", 301).await;
    assert!(matches!(
        result,
        Err(LedgerError::InsufficientFunds { ref account, .. }) if account.as_str() == "acc3"
    ));
    assert_eq!(ledger.balances().await, standard_accounts());
}

#[tokio::test]
async fn test_rollback_on_fresh_ledger_fails() {
    let ledger = test_ledger();
    assert_eq!(ledger.rollback().await, Err(LedgerError::EmptyHistory));
    assert_eq!(ledger.balances().await, standard_accounts());
}

#[tokio::test]
async fn test_withdraw_to_exactly_zero() {
    let ledger = test_ledger();
    ledger.withdraw("acc3", 300).await.unwrap();
    assert_eq!(balance(&ledger, "acc3").await, 0);
}

#[tokio::test]
async fn test_self_transfer_is_a_net_no_op() {
    let ledger = test_ledger();

    let outcome = ledger.transfer("acc2", "acc2", 200).await.unwrap();
    assert_eq!(outcome.changes.len(), 1);
    assert_eq!(balance(&ledger, "acc2").await, 500);
    assert_eq!(ledger.history_depth().await, 1);

    // Still needs the funds.
    assert!(ledger.transfer("acc2", "acc2", 501).await.is_err());
}

#[tokio::test]
async fn test_send_accepts_operation_values() {
    let ledger = test_ledger();

    let outcome = ledger
        .send(Operation::transfer("acc1", "acc2", 250))
        .await
        .unwrap();

    assert_eq!(outcome.kind, OperationKind::Transfer);
    assert_eq!(outcome.history_depth, 1);
    let debit = outcome.change_for(&"acc1".into()).unwrap();
    assert_eq!((debit.before, debit.after), (Amount::new(1000), Amount::new(750)));
    let credit = outcome.change_for(&"acc2".into()).unwrap();
    assert_eq!((credit.before, credit.after), (Amount::new(500), Amount::new(750)));
}

#[tokio::test]
async fn test_overflow_is_rejected_without_change() {
    let ledger = ledger_with(table(&[("big", i64::MAX - 1), ("small", 10)]));

    assert_eq!(
        ledger.deposit("big", 2).await,
        Err(LedgerError::BalanceOverflow {
            account: "big".into()
        })
    );
    assert_eq!(
        ledger.transfer("small", "big", 5).await,
        Err(LedgerError::BalanceOverflow {
            account: "big".into()
        })
    );
    assert_eq!(balance(&ledger, "big").await, i64::MAX - 1);
    assert_eq!(balance(&ledger, "small").await, 10);
}

#[tokio::test]
async fn test_history_timestamps_come_from_the_clock() {
    let ledger = Ledger::with_clock(
        standard_accounts(),
        LedgerConfig::default(),
        Arc::new(test_clock()),
    )
    .unwrap();

    ledger.deposit("acc1", 1).await.unwrap();
    ledger.withdraw("acc1", 5000).await.unwrap_err();

    let history = ledger.history().await;
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].cause, OperationKind::Deposit);
    assert_eq!(history[1].cause, OperationKind::Withdraw);
    assert!(history.iter().all(|info| info.taken_at == test_clock().now()));
}

#[tokio::test]
async fn test_config_from_lookup_drives_history_bound() {
    let config = LedgerConfig::from_lookup(|key| {
        (key == ledger_runtime::config::MAX_HISTORY_DEPTH_VAR).then(|| "1".to_string())
    })
    .unwrap();
    let ledger = Ledger::with_config(standard_accounts(), config).unwrap();

    ledger.deposit("acc1", 10).await.unwrap();
    ledger.deposit("acc1", 10).await.unwrap();

    assert_eq!(ledger.history_depth().await, 1);
    ledger.rollback().await.unwrap();
    assert_eq!(balance(&ledger, "acc1").await, 1010);
    assert_eq!(ledger.rollback().await, Err(LedgerError::EmptyHistory));
}
