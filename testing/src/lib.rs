//! # Ledger Testing
//!
//! Testing utilities and helpers for the ledger state machine.
//!
//! This crate provides:
//! - A deterministic [`Clock`] for reproducible snapshot timestamps
//! - Account fixtures matching the standard three-account scenario
//! - A Given-When-Then harness for the reducer ([`ReducerTest`])
//! - proptest strategies for random operation sequences
//!
//! ## Example
//!
//! ```ignore
//! use ledger_core::Amount;
//! use ledger_testing::test_ledger;
//!
//! #[tokio::test]
//! async fn test_deposit() {
//!     let ledger = test_ledger();
//!     ledger.deposit("acc1", 200).await.unwrap();
//!     assert_eq!(ledger.balance(&"acc1".into()).await, Some(Amount::new(1200)));
//! }
//! ```

use chrono::{DateTime, Utc};
use ledger_core::environment::Clock;


pub use reducer_test::{ReducerTest, assertions};

/// Mock implementations of Environment traits
pub mod mocks {
    use super::{Clock, DateTime, Utc};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use ledger_testing::mocks::FixedClock;
    /// use ledger_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// let time1 = clock.now();
    /// let time2 = clock.now();
    /// assert_eq!(time1, time2); // Always the same!
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    ///
    /// # Panics
    ///
    /// This function will panic if the hardcoded timestamp fails to parse,
    /// which should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }
}

/// Account fixtures and ready-made ledgers
pub mod fixtures {
    use super::mocks::test_clock;
    use ledger_core::{AccountTable, LedgerEnvironment, LedgerState};
    use ledger_runtime::{Ledger, LedgerConfig};
    use std::sync::Arc;

    /// Identifiers of the standard accounts, in key order
    pub const ACCOUNT_IDS: [&str; 3] = ["acc1", "acc2", "acc3"];

    /// `{acc1: 1000, acc2: 500, acc3: 300}`
    #[must_use]
    pub fn standard_accounts() -> AccountTable {
        AccountTable::new()
            .with_account("acc1", 1000)
            .with_account("acc2", 500)
            .with_account("acc3", 300)
    }

    /// Reducer environment backed by [`test_clock`]
    #[must_use]
    pub fn test_environment() -> LedgerEnvironment {
        LedgerEnvironment::new(Arc::new(test_clock()))
    }

    /// Reducer state over [`standard_accounts`]
    ///
    /// # Panics
    ///
    /// Never in practice: the standard table is not empty.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn standard_state() -> LedgerState {
        LedgerState::new(standard_accounts()).expect("standard accounts are not empty")
    }

    /// Ledger over `accounts` with the default config and [`test_clock`]
    ///
    /// # Panics
    ///
    /// Panics if `accounts` is empty.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn ledger_with(accounts: AccountTable) -> Ledger {
        Ledger::with_clock(accounts, LedgerConfig::default(), Arc::new(test_clock()))
            .expect("fixture ledgers need at least one account")
    }
}

/// Property-based testing utilities using proptest
pub mod properties {
    use ledger_core::Operation;
    use proptest::prelude::*;

    /// Strategy picking one of `ids`
    pub fn account_id(ids: &'static [&'static str]) -> impl Strategy<Value = String> {
        proptest::sample::select(ids).prop_map(str::to_string)
    }

    /// Strategy for positive amounts small enough never to overflow
    pub fn amount() -> impl Strategy<Value = i64> {
        1..=2_000_i64
    }

    /// Deposits, withdrawals and transfers over `ids`, never rollbacks
    pub fn mutation(ids: &'static [&'static str]) -> impl Strategy<Value = Operation> {
        prop_oneof![
            (account_id(ids), amount()).prop_map(|(id, amount)| Operation::deposit(id, amount)),
            (account_id(ids), amount()).prop_map(|(id, amount)| Operation::withdraw(id, amount)),
            (account_id(ids), account_id(ids), amount())
                .prop_map(|(from, to, amount)| Operation::transfer(from, to, amount)),
        ]
    }

    /// Any operation over `ids`, rollbacks included
    pub fn operation(ids: &'static [&'static str]) -> impl Strategy<Value = Operation> {
        prop_oneof![
            4 => mutation(ids),
            1 => Just(Operation::Rollback),
        ]
    }
}

/// Install a `tracing` subscriber for a test run
///
/// Honors `RUST_LOG` and writes through the test harness's captured output.
/// Safe to call from several tests; only the first call installs anything.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

// Re-export commonly used items
pub use fixtures::{standard_accounts, standard_state, test_environment};
pub use mocks::{FixedClock, test_clock};

/// Ledger over [`standard_accounts`], ready for a test
#[must_use]
pub fn test_ledger() -> ledger_runtime::Ledger {
    fixtures::ledger_with(standard_accounts())
}
