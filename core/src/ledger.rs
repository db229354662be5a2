//! Ledger state and the reducer that applies operations to it.
//!
//! Every deposit, withdraw and transfer runs the same three steps:
//!
//! 1. push a snapshot of the current table onto history
//! 2. validate the operation against the table
//! 3. apply the balance changes
//!
//! Step 1 happens even when step 2 rejects the operation, so a rejected call
//! still occupies one history slot and a following rollback restores the
//! table as it was before that call.

use crate::accounts::AccountTable;
use crate::environment::Clock;
use crate::error::LedgerError;
use crate::history::{History, Snapshot, SnapshotInfo};
use crate::operation::{BalanceChange, Operation, OperationKind, Outcome};
use crate::reducer::Reducer;
use crate::types::{AccountId, Amount};
use serde::{Deserialize, Serialize};
use smallvec::{SmallVec, smallvec};
use std::sync::Arc;

/// The account table together with its undo log
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerState {
    accounts: AccountTable,
    history: History,
}

impl LedgerState {
    /// Creates a state with an unbounded, empty history
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::NoAccounts`] if `accounts` is empty.
    pub fn new(accounts: AccountTable) -> Result<Self, LedgerError> {
        Self::with_max_history_depth(accounts, None)
    }

    /// Creates a state whose history keeps at most `max_depth` snapshots
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::NoAccounts`] if `accounts` is empty and
    /// [`LedgerError::ZeroHistoryDepth`] if `max_depth` is `Some(0)`.
    pub fn with_max_history_depth(
        accounts: AccountTable,
        max_depth: Option<usize>,
    ) -> Result<Self, LedgerError> {
        if accounts.is_empty() {
            return Err(LedgerError::NoAccounts);
        }
        if max_depth == Some(0) {
            return Err(LedgerError::ZeroHistoryDepth);
        }

        Ok(Self {
            accounts,
            history: History::with_max_depth(max_depth),
        })
    }

    /// Current balances
    #[must_use]
    pub const fn accounts(&self) -> &AccountTable {
        &self.accounts
    }

    /// Undo log
    #[must_use]
    pub const fn history(&self) -> &History {
        &self.history
    }

    /// Balance of one account
    #[must_use]
    pub fn balance(&self, id: &AccountId) -> Option<Amount> {
        self.accounts.get(id)
    }

    /// Number of snapshots available to roll back
    #[must_use]
    pub fn history_depth(&self) -> usize {
        self.history.len()
    }

    /// Summaries of the retained snapshots, oldest first
    #[must_use]
    pub fn history_infos(&self) -> Vec<SnapshotInfo> {
        self.history.infos()
    }
}

/// Environment dependencies for the ledger reducer
#[derive(Clone)]
pub struct LedgerEnvironment {
    /// Clock used to timestamp snapshots
    pub clock: Arc<dyn Clock>,
}

impl LedgerEnvironment {
    /// Creates a new `LedgerEnvironment`
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }
}

impl std::fmt::Debug for LedgerEnvironment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LedgerEnvironment").finish_non_exhaustive()
    }
}

/// Reducer for ledger operations
#[derive(Clone, Copy, Debug, Default)]
pub struct LedgerReducer;

impl LedgerReducer {
    /// Creates a new `LedgerReducer`
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Pushes a copy of the live table onto history
    fn record_snapshot(state: &mut LedgerState, cause: OperationKind, env: &LedgerEnvironment) {
        let snapshot = Snapshot::capture(&state.accounts, env.clock.now(), cause);
        state.history.push(snapshot);
    }

    /// Looks up the balance of an account that must exist
    fn require(state: &LedgerState, account: &AccountId) -> Result<Amount, LedgerError> {
        state
            .accounts
            .get(account)
            .ok_or_else(|| LedgerError::UnknownAccount {
                account: account.clone(),
            })
    }

    /// Checks that `account` can cover a debit of `amount`
    fn ensure_funds(
        account: &AccountId,
        available: Amount,
        requested: Amount,
    ) -> Result<(), LedgerError> {
        if available < requested {
            return Err(LedgerError::InsufficientFunds {
                account: account.clone(),
                available,
                requested,
            });
        }
        Ok(())
    }

    fn overflow(account: &AccountId) -> LedgerError {
        LedgerError::BalanceOverflow {
            account: account.clone(),
        }
    }

    fn outcome(
        state: &LedgerState,
        kind: OperationKind,
        changes: SmallVec<[BalanceChange; 2]>,
    ) -> Outcome {
        Outcome {
            kind,
            changes,
            history_depth: state.history.len(),
        }
    }

    fn deposit(
        state: &mut LedgerState,
        account: AccountId,
        amount: Amount,
    ) -> Result<Outcome, LedgerError> {
        let before = Self::require(state, &account)?;
        let after = before
            .checked_add(amount)
            .ok_or_else(|| Self::overflow(&account))?;

        state.accounts.set(&account, after);

        Ok(Self::outcome(
            state,
            OperationKind::Deposit,
            smallvec![BalanceChange::new(account, before, after)],
        ))
    }

    fn withdraw(
        state: &mut LedgerState,
        account: AccountId,
        amount: Amount,
    ) -> Result<Outcome, LedgerError> {
        let before = Self::require(state, &account)?;
        Self::ensure_funds(&account, before, amount)?;
        let after = before
            .checked_sub(amount)
            .ok_or_else(|| Self::overflow(&account))?;

        state.accounts.set(&account, after);

        Ok(Self::outcome(
            state,
            OperationKind::Withdraw,
            smallvec![BalanceChange::new(account, before, after)],
        ))
    }

    fn transfer(
        state: &mut LedgerState,
        from: AccountId,
        to: AccountId,
        amount: Amount,
    ) -> Result<Outcome, LedgerError> {
        let from_before = Self::require(state, &from)?;
        let to_balance = Self::require(state, &to)?;
        Self::ensure_funds(&from, from_before, amount)?;

        // A self-transfer nets to zero, so only the funds check applies.
        if from == to {
            return Ok(Self::outcome(
                state,
                OperationKind::Transfer,
                smallvec![BalanceChange::new(from, from_before, from_before)],
            ));
        }

        // Both sides are computed before either is written.
        let from_after = from_before
            .checked_sub(amount)
            .ok_or_else(|| Self::overflow(&from))?;
        let to_after = to_balance
            .checked_add(amount)
            .ok_or_else(|| Self::overflow(&to))?;

        state.accounts.set(&from, from_after);
        state.accounts.set(&to, to_after);

        let changes = smallvec![
            BalanceChange::new(from, from_before, from_after),
            BalanceChange::new(to, to_balance, to_after),
        ];

        Ok(Self::outcome(state, OperationKind::Transfer, changes))
    }

    fn rollback(state: &mut LedgerState) -> Result<Outcome, LedgerError> {
        let snapshot = state.history.pop().ok_or(LedgerError::EmptyHistory)?;

        let changes = state
            .accounts
            .changes_to(&snapshot.accounts)
            .into_iter()
            .map(|(account, before, after)| BalanceChange::new(account, before, after))
            .collect();

        state.accounts = snapshot.accounts;

        Ok(Self::outcome(state, OperationKind::Rollback, changes))
    }
}

impl Reducer for LedgerReducer {
    type State = LedgerState;
    type Action = Operation;
    type Environment = LedgerEnvironment;
    type Output = Outcome;
    type Error = LedgerError;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> Result<Self::Output, Self::Error> {
        match action {
            Operation::Deposit { account, amount } => {
                Self::record_snapshot(state, OperationKind::Deposit, env);
                Self::deposit(state, account, amount)
            }
            Operation::Withdraw { account, amount } => {
                Self::record_snapshot(state, OperationKind::Withdraw, env);
                Self::withdraw(state, account, amount)
            }
            Operation::Transfer { from, to, amount } => {
                Self::record_snapshot(state, OperationKind::Transfer, env);
                Self::transfer(state, from, to, amount)
            }
            // Rollback is not itself recorded.
            Operation::Rollback => Self::rollback(state),
        }
    }
}
