//! # Ledger Core
//!
//! Core types and business logic for an in-memory ledger state machine.
//!
//! The ledger is a fixed set of named accounts with integer balances, changed
//! through four operations: deposit, withdraw, transfer and rollback. Every
//! mutating operation pushes a full copy of the account table onto an undo log
//! before it validates anything, so rollback always returns to the exact state
//! that preceded the most recent call.
//!
//! ## Core Concepts
//!
//! - **State**: [`LedgerState`], the account table plus its history log
//! - **Operation**: [`Operation`], every request that can change the state
//! - **Reducer**: [`reducer::Reducer`], `(State, Operation, Environment) → Result<Outcome, LedgerError>`
//! - **Environment**: injected dependencies (a [`environment::Clock`] for snapshot timestamps)
//!
//! This crate does no locking. The runtime crate wraps a [`LedgerState`] in a
//! single guard and calls the reducer while holding it.
//!
//! ## Example
//!
//! ```
//! use ledger_core::{
//!     AccountTable, Amount, LedgerEnvironment, LedgerReducer, LedgerState, Operation,
//!     environment::SystemClock, reducer::Reducer,
//! };
//! use std::sync::Arc;
//!
//! # fn main() -> Result<(), ledger_core::LedgerError> {
//! let accounts = AccountTable::new()
//!     .with_account("acc1", 1000)
//!     .with_account("acc2", 500);
//! let mut state = LedgerState::new(accounts)?;
//! let env = LedgerEnvironment::new(Arc::new(SystemClock));
//!
//! LedgerReducer::new().reduce(&mut state, Operation::transfer("acc1", "acc2", 150), &env)?;
//! assert_eq!(state.balance(&"acc2".into()), Some(Amount::new(650)));
//!
//! LedgerReducer::new().reduce(&mut state, Operation::Rollback, &env)?;
//! assert_eq!(state.balance(&"acc2".into()), Some(Amount::new(500)));
//! # Ok(())
//! # }
//! ```

pub use chrono::{DateTime, Utc};
pub use smallvec::{SmallVec, smallvec};

pub mod accounts;
pub mod history;
pub mod ledger;
pub mod operation;
pub mod types;

pub use accounts::AccountTable;
pub use error::LedgerError;
pub use history::{History, Snapshot, SnapshotInfo};
pub use ledger::{LedgerEnvironment, LedgerReducer, LedgerState};
pub use operation::{BalanceChange, Operation, OperationKind, Outcome};
pub use types::{AccountId, Amount};

/// Error types for ledger operations
pub mod error {
    use crate::types::{AccountId, Amount};
    use thiserror::Error;

    /// Reasons an operation can be rejected
    ///
    /// None of these are fatal: the ledger stays usable after any of them.
    /// Rejections of deposit, withdraw and transfer still leave the snapshot
    /// they pushed in history.
    #[derive(Error, Debug, Clone, PartialEq, Eq)]
    pub enum LedgerError {
        /// The referenced account is not in the table
        #[error("Unknown account: {account}")]
        UnknownAccount {
            /// Identifier that was not found
            account: AccountId,
        },

        /// A withdrawal or transfer debit exceeds the available balance
        #[error("Insufficient funds in {account}: available {available}, requested {requested}")]
        InsufficientFunds {
            /// Account that would have been debited
            account: AccountId,
            /// Balance at the time of the request
            available: Amount,
            /// Amount that was requested
            requested: Amount,
        },

        /// Rollback was requested with nothing recorded to restore
        #[error("Nothing to roll back: history is empty")]
        EmptyHistory,

        /// Applying the amount would overflow the balance type
        #[error("Balance overflow in {account}")]
        BalanceOverflow {
            /// Account whose balance would have overflowed
            account: AccountId,
        },

        /// A ledger was constructed without any accounts
        #[error("A ledger needs at least one account")]
        NoAccounts,

        /// A ledger was constructed with a history that keeps no snapshots
        #[error("History depth must be at least 1 (use no limit for unbounded)")]
        ZeroHistoryDepth,
    }
}

/// Reducer module - the trait that carries all business logic
///
/// Reducers are plain functions over borrowed state:
/// `(State, Action, Environment) → Result<Output, Error>`.
/// They never lock, sleep or perform I/O, which keeps them deterministic and
/// lets the runtime hold its guard for exactly one reducer call.
pub mod reducer {
    /// The Reducer trait - core abstraction for business logic
    ///
    /// # Type Parameters
    ///
    /// - `State`: The domain state this reducer operates on
    /// - `Action`: The operation type this reducer processes
    /// - `Environment`: The injected dependencies this reducer needs
    /// - `Output`: What a successful reduction reports back
    /// - `Error`: Why a reduction was rejected
    pub trait Reducer {
        /// The state type this reducer operates on
        type State;

        /// The action type this reducer processes
        type Action;

        /// The environment type with injected dependencies
        type Environment;

        /// Result of a successful reduction
        type Output;

        /// Rejection reason
        type Error;

        /// Reduce an action into a state change
        ///
        /// 1. Validates the action
        /// 2. Updates state in place
        /// 3. Reports what changed, or why nothing (further) did
        ///
        /// # Errors
        ///
        /// Returns `Self::Error` when validation rejects the action.
        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            env: &Self::Environment,
        ) -> Result<Self::Output, Self::Error>;
    }
}

/// Environment module - Dependency injection traits
pub mod environment {
    use chrono::{DateTime, Utc};

    /// Clock trait - abstracts time operations for testability
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Production clock backed by the system time
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }
}
