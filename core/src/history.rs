//! Undo log of full-table snapshots.

use crate::accounts::AccountTable;
use crate::operation::OperationKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// A deep copy of the account table taken before an operation ran
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Balances at capture time
    pub accounts: AccountTable,
    /// When the snapshot was taken
    pub taken_at: DateTime<Utc>,
    /// Operation that pushed this snapshot
    pub cause: OperationKind,
}

impl Snapshot {
    /// Captures `accounts` by cloning it
    #[must_use]
    pub fn capture(accounts: &AccountTable, taken_at: DateTime<Utc>, cause: OperationKind) -> Self {
        Self {
            accounts: accounts.clone(),
            taken_at,
            cause,
        }
    }
}

/// Balance-free summary of a snapshot, safe to hand to callers
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotInfo {
    /// Position in the log, 0 being the oldest retained snapshot
    pub index: usize,
    /// When the snapshot was taken
    pub taken_at: DateTime<Utc>,
    /// Operation that pushed the snapshot
    pub cause: OperationKind,
}

/// Ordered snapshot log, most recent last
///
/// With a maximum depth set, pushing onto a full log drops the oldest
/// snapshot. Without one the log grows until rolled back.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct History {
    entries: VecDeque<Snapshot>,
    max_depth: Option<usize>,
    evicted: u64,
}

impl History {
    /// Creates an empty, unbounded log
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: VecDeque::new(),
            max_depth: None,
            evicted: 0,
        }
    }

    /// Creates an empty log capped at `max_depth` snapshots
    ///
    /// `None` means unbounded.
    #[must_use]
    pub const fn with_max_depth(max_depth: Option<usize>) -> Self {
        Self {
            entries: VecDeque::new(),
            max_depth,
            evicted: 0,
        }
    }

    /// Appends a snapshot, evicting the oldest one if the log is full
    ///
    /// Returns the evicted snapshot, if any.
    pub fn push(&mut self, snapshot: Snapshot) -> Option<Snapshot> {
        let evicted = match self.max_depth {
            // A zero-depth log keeps nothing.
            Some(0) => {
                self.evicted += 1;
                return Some(snapshot);
            }
            Some(max) if self.entries.len() >= max => self.entries.pop_front(),
            _ => None,
        };
        if evicted.is_some() {
            self.evicted += 1;
        }
        self.entries.push_back(snapshot);
        evicted
    }

    /// Removes and returns the most recent snapshot
    pub fn pop(&mut self) -> Option<Snapshot> {
        self.entries.pop_back()
    }

    /// Returns the most recent snapshot without removing it
    #[must_use]
    pub fn last(&self) -> Option<&Snapshot> {
        self.entries.back()
    }

    /// Number of snapshots available to roll back
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Checks if there is nothing to roll back
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Configured maximum depth
    #[must_use]
    pub const fn max_depth(&self) -> Option<usize> {
        self.max_depth
    }

    /// Total number of snapshots dropped because the log was full
    #[must_use]
    pub const fn evicted(&self) -> u64 {
        self.evicted
    }

    /// Summaries of every retained snapshot, oldest first
    #[must_use]
    pub fn infos(&self) -> Vec<SnapshotInfo> {
        self.entries
            .iter()
            .enumerate()
            .map(|(index, snapshot)| SnapshotInfo {
                index,
                taken_at: snapshot.taken_at,
                cause: snapshot.cause,
            })
            .collect()
    }
}
