//! Operations accepted by the ledger and the outcomes they produce.

use crate::types::{AccountId, Amount};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Discriminant of an [`Operation`], used for history metadata and metric labels
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    /// Credit a single account
    Deposit,
    /// Debit a single account
    Withdraw,
    /// Move funds between two accounts
    Transfer,
    /// Undo the most recent snapshot
    Rollback,
}

impl OperationKind {
    /// Stable lowercase name
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Deposit => "deposit",
            Self::Withdraw => "withdraw",
            Self::Transfer => "transfer",
            Self::Rollback => "rollback",
        }
    }
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A request to change the ledger
///
/// Amounts are not sign-checked. Zero and negative values flow through the
/// same validation as positive ones.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Operation {
    /// Add `amount` to `account`
    Deposit {
        /// Account to credit
        account: AccountId,
        /// Amount to add
        amount: Amount,
    },

    /// Subtract `amount` from `account` if its balance covers it
    Withdraw {
        /// Account to debit
        account: AccountId,
        /// Amount to subtract
        amount: Amount,
    },

    /// Debit `from` and credit `to` by `amount` as a single step
    Transfer {
        /// Sending account
        from: AccountId,
        /// Receiving account
        to: AccountId,
        /// Amount to move
        amount: Amount,
    },

    /// Restore the table captured by the most recent snapshot
    Rollback,
}

impl Operation {
    /// Builds a deposit
    #[must_use]
    pub fn deposit(account: impl Into<AccountId>, amount: i64) -> Self {
        Self::Deposit {
            account: account.into(),
            amount: Amount::new(amount),
        }
    }

    /// Builds a withdrawal
    #[must_use]
    pub fn withdraw(account: impl Into<AccountId>, amount: i64) -> Self {
        Self::Withdraw {
            account: account.into(),
            amount: Amount::new(amount),
        }
    }

    /// Builds a transfer
    #[must_use]
    pub fn transfer(
        from: impl Into<AccountId>,
        to: impl Into<AccountId>,
        amount: i64,
    ) -> Self {
        Self::Transfer {
            from: from.into(),
            to: to.into(),
            amount: Amount::new(amount),
        }
    }

    /// Returns the kind of this operation
    #[must_use]
    pub const fn kind(&self) -> OperationKind {
        match self {
            Self::Deposit { .. } => OperationKind::Deposit,
            Self::Withdraw { .. } => OperationKind::Withdraw,
            Self::Transfer { .. } => OperationKind::Transfer,
            Self::Rollback => OperationKind::Rollback,
        }
    }
}

/// One account's balance before and after an operation
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceChange {
    /// Account that changed
    pub account: AccountId,
    /// Balance before the operation
    pub before: Amount,
    /// Balance after the operation
    pub after: Amount,
}

impl BalanceChange {
    /// Creates a new `BalanceChange`
    #[must_use]
    pub const fn new(account: AccountId, before: Amount, after: Amount) -> Self {
        Self {
            account,
            before,
            after,
        }
    }
}

/// Result of a successful operation
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outcome {
    /// Which operation produced this outcome
    pub kind: OperationKind,
    /// Balances touched by the operation
    ///
    /// Deposits and withdrawals report one entry and transfers two (one for a
    /// self-transfer). Rollbacks report every account whose balance the
    /// restored snapshot changed.
    pub changes: SmallVec<[BalanceChange; 2]>,
    /// Number of snapshots left in history after the operation
    pub history_depth: usize,
}

impl Outcome {
    /// Returns the recorded change for `account`, if it was touched
    #[must_use]
    pub fn change_for(&self, account: &AccountId) -> Option<&BalanceChange> {
        self.changes.iter().find(|change| &change.account == account)
    }
}
