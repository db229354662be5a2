//! The account balance table.

use crate::types::{AccountId, Amount};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Mapping from account identifier to current balance
///
/// The key set is fixed once the table is handed to a [`crate::LedgerState`]:
/// nothing in the crate inserts or removes accounts afterwards, only
/// [`AccountTable::set`] on keys that already exist.
///
/// Cloning produces a fully independent copy (owned keys and values, no shared
/// storage), which is what history snapshots rely on.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountTable {
    balances: BTreeMap<AccountId, Amount>,
}

impl AccountTable {
    /// Creates an empty table
    #[must_use]
    pub const fn new() -> Self {
        Self {
            balances: BTreeMap::new(),
        }
    }

    /// Adds an account while the table is still being built
    ///
    /// Consumes and returns the table so it cannot be called on a table
    /// already owned by a ledger.
    #[must_use]
    pub fn with_account(mut self, id: impl Into<AccountId>, balance: i64) -> Self {
        self.balances.insert(id.into(), Amount::new(balance));
        self
    }

    /// Returns the balance of an account
    #[must_use]
    pub fn get(&self, id: &AccountId) -> Option<Amount> {
        self.balances.get(id).copied()
    }

    /// Checks if an account exists
    #[must_use]
    pub fn contains(&self, id: &AccountId) -> bool {
        self.balances.contains_key(id)
    }

    /// Returns the number of accounts
    #[must_use]
    pub fn len(&self) -> usize {
        self.balances.len()
    }

    /// Checks if the table has no accounts
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.balances.is_empty()
    }

    /// Iterates accounts in key order
    pub fn iter(&self) -> impl Iterator<Item = (&AccountId, Amount)> {
        self.balances.iter().map(|(id, balance)| (id, *balance))
    }

    /// Iterates account identifiers in key order
    pub fn ids(&self) -> impl Iterator<Item = &AccountId> {
        self.balances.keys()
    }

    /// Sum of all balances
    ///
    /// Widened to `i128` so the sum of any number of `i64` balances that fits
    /// in memory cannot overflow.
    #[must_use]
    pub fn total(&self) -> i128 {
        self.balances
            .values()
            .map(|balance| i128::from(balance.units()))
            .sum()
    }

    /// Overwrites the balance of an existing account
    ///
    /// Returns `false` and leaves the table untouched when the account is
    /// unknown.
    pub(crate) fn set(&mut self, id: &AccountId, balance: Amount) -> bool {
        match self.balances.get_mut(id) {
            Some(slot) => {
                *slot = balance;
                true
            }
            None => false,
        }
    }

    /// Balances that differ between `self` and `other`, keyed by `self`
    ///
    /// Accounts are compared by key, reporting `before` from `self` and
    /// `after` from `other`.
    pub(crate) fn changes_to(&self, other: &Self) -> Vec<(AccountId, Amount, Amount)> {
        self.balances
            .iter()
            .filter_map(|(id, before)| {
                let after = other.get(id)?;
                (after != *before).then(|| (id.clone(), *before, after))
            })
            .collect()
    }
}

impl<K, V> FromIterator<(K, V)> for AccountTable
where
    K: Into<AccountId>,
    V: Into<Amount>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            balances: iter
                .into_iter()
                .map(|(id, balance)| (id.into(), balance.into()))
                .collect(),
        }
    }
}

impl std::fmt::Display for AccountTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("{")?;
        for (index, (id, balance)) in self.balances.iter().enumerate() {
            if index > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{id}: {balance}")?;
        }
        f.write_str("}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> AccountTable {
        AccountTable::new()
            .with_account("acc1", 1000)
            .with_account("acc2", 500)
            .with_account("acc3", 300)
    }

    #[test]
    fn test_table_lookup_and_total() {
        let table = sample();
        assert_eq!(table.len(), 3);
        assert_eq!(table.get(&"acc2".into()), Some(Amount::new(500)));
        assert_eq!(table.get(&"missing".into()), None);
        assert_eq!(table.total(), 1800);
    }

    #[test]
    fn test_set_ignores_unknown_accounts() {
        let mut table = sample();
        assert!(!table.set(&"missing".into(), Amount::new(1)));
        assert_eq!(table.len(), 3);
        assert!(table.set(&"acc1".into(), Amount::new(7)));
        assert_eq!(table.get(&"acc1".into()), Some(Amount::new(7)));
    }

    #[test]
    fn test_clone_is_independent() {
        let mut live = sample();
        let copy = live.clone();
        live.set(&"acc1".into(), Amount::new(0));
        assert_eq!(copy.get(&"acc1".into()), Some(Amount::new(1000)));
    }

    #[test]
    fn test_changes_to_reports_only_differences() {
        let before = sample();
        let after = before.clone().with_account("acc3", 450);
        let changes = before.changes_to(&after);
        assert_eq!(
            changes,
            vec![(AccountId::from("acc3"), Amount::new(300), Amount::new(450))]
        );
    }

    #[test]
    fn test_display_is_key_ordered() {
        let table: AccountTable = [("b", 2_i64), ("a", 1_i64)].into_iter().collect();
        assert_eq!(table.to_string(), "{a: 1, b: 2}");
    }
}
