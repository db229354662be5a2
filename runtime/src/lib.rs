//! # Ledger Runtime
//!
//! Runtime for the ledger state machine.
//!
//! This crate provides [`Ledger`], the single serialization point in front of
//! a [`LedgerState`]. Every operation acquires the same guard, runs the
//! reducer to completion and releases the guard, so no caller can ever
//! observe half of a transfer or a history log out of step with the table.
//!
//! ## Core Components
//!
//! - **Ledger**: cloneable handle sharing one guarded state between tasks
//! - **`LedgerConfig`**: history bound and metrics switch, loadable from the environment
//! - **Metrics**: counters and histograms via the `metrics` facade, with a Prometheus exporter
//!
//! ## Example
//!
//! ```no_run
//! use ledger_core::AccountTable;
//! use ledger_runtime::Ledger;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let ledger = Ledger::new(
//!     AccountTable::new()
//!         .with_account("acc1", 1000)
//!         .with_account("acc2", 500),
//! )?;
//!
//! ledger.transfer("acc1", "acc2", 150).await?;
//! ledger.rollback().await?;
//!
//! let total = ledger.total().await;
//! assert_eq!(total, 1500);
//! # Ok(())
//! # }
//! ```

use ledger_core::{LedgerError, LedgerState};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Prometheus metrics for observability
pub mod metrics;

/// Error types for the ledger runtime
pub mod error {
    use thiserror::Error;

    pub use ledger_core::LedgerError;

    /// Errors raised while loading or validating a [`crate::LedgerConfig`]
    #[derive(Error, Debug, Clone, PartialEq, Eq)]
    pub enum ConfigError {
        /// A variable was set but could not be parsed
        #[error("Failed to parse {key}={value:?}: {reason}")]
        Parse {
            /// Variable name
            key: String,
            /// Raw value
            value: String,
            /// Why parsing failed
            reason: String,
        },

        /// The values parsed but do not make a usable configuration
        #[error("Configuration validation failed: {0}")]
        Validation(String),
    }
}

/// Runtime configuration
pub mod config {
    use super::error::ConfigError;

    /// Variable holding the maximum history depth (`none` or empty for unbounded)
    pub const MAX_HISTORY_DEPTH_VAR: &str = "LEDGER_MAX_HISTORY_DEPTH";

    /// Variable toggling metric emission (`true`/`false`/`1`/`0`)
    pub const METRICS_ENABLED_VAR: &str = "LEDGER_METRICS_ENABLED";

    /// Configuration for [`crate::Ledger`] instances
    ///
    /// # Example
    ///
    /// ```
    /// use ledger_runtime::LedgerConfig;
    ///
    /// let config = LedgerConfig::default()
    ///     .with_max_history_depth(Some(1000))
    ///     .with_metrics(false);
    /// assert!(config.validate().is_ok());
    /// ```
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct LedgerConfig {
        /// Maximum number of snapshots kept for rollback (`None` = unbounded)
        ///
        /// When the log is full the oldest snapshot is dropped.
        pub max_history_depth: Option<usize>,
        /// Whether operations emit metrics
        pub metrics_enabled: bool,
    }

    impl LedgerConfig {
        /// Create a new configuration with custom values
        #[must_use]
        pub const fn new(max_history_depth: Option<usize>, metrics_enabled: bool) -> Self {
            Self {
                max_history_depth,
                metrics_enabled,
            }
        }

        /// Set the maximum history depth
        #[must_use]
        pub const fn with_max_history_depth(mut self, depth: Option<usize>) -> Self {
            self.max_history_depth = depth;
            self
        }

        /// Enable or disable metrics
        #[must_use]
        pub const fn with_metrics(mut self, enabled: bool) -> Self {
            self.metrics_enabled = enabled;
            self
        }

        /// Load configuration from process environment variables
        ///
        /// Unset variables keep their defaults.
        ///
        /// # Errors
        ///
        /// Returns error if a variable cannot be parsed or the result is invalid
        pub fn from_env() -> Result<Self, ConfigError> {
            Self::from_lookup(|key| std::env::var(key).ok())
        }

        /// Load configuration through an arbitrary variable lookup
        ///
        /// # Errors
        ///
        /// Returns error if a variable cannot be parsed or the result is invalid
        pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
        where
            F: Fn(&str) -> Option<String>,
        {
            let mut config = Self::default();

            if let Some(raw) = lookup(MAX_HISTORY_DEPTH_VAR) {
                config.max_history_depth = parse_depth(&raw)?;
            }

            if let Some(raw) = lookup(METRICS_ENABLED_VAR) {
                config.metrics_enabled = parse_flag(METRICS_ENABLED_VAR, &raw)?;
            }

            config.validate()?;
            Ok(config)
        }

        /// Validate the configuration
        ///
        /// # Errors
        ///
        /// Returns error if the maximum history depth is zero
        pub fn validate(&self) -> Result<(), ConfigError> {
            if self.max_history_depth == Some(0) {
                return Err(ConfigError::Validation(
                    "max_history_depth must be at least 1 (use none for unbounded)".to_string(),
                ));
            }
            Ok(())
        }
    }

    impl Default for LedgerConfig {
        fn default() -> Self {
            Self {
                max_history_depth: None,
                metrics_enabled: true,
            }
        }
    }

    fn parse_depth(raw: &str) -> Result<Option<usize>, ConfigError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("none") {
            return Ok(None);
        }
        trimmed
            .parse::<usize>()
            .map(Some)
            .map_err(|e| ConfigError::Parse {
                key: MAX_HISTORY_DEPTH_VAR.to_string(),
                value: raw.to_string(),
                reason: e.to_string(),
            })
    }

    fn parse_flag(key: &str, raw: &str) -> Result<bool, ConfigError> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::Parse {
                key: key.to_string(),
                value: raw.to_string(),
                reason: "expected a boolean".to_string(),
            }),
        }
    }

}

pub use config::LedgerConfig;
pub use error::ConfigError;

/// The guarded ledger handle
pub mod store {
    use super::{Arc, LedgerConfig, LedgerError, LedgerState, RwLock};
    use crate::metrics::LedgerMetrics;
    use ledger_core::environment::{Clock, SystemClock};
    use ledger_core::reducer::Reducer;
    use ledger_core::{
        AccountId, AccountTable, Amount, LedgerEnvironment, LedgerReducer, Operation, Outcome,
        SnapshotInfo,
    };
    use std::time::Instant;

    /// The Ledger - concurrency-safe front of a [`LedgerState`]
    ///
    /// The Ledger manages:
    /// 1. State (account table + history, behind one `RwLock`)
    /// 2. Reducer (validation and mutation logic)
    /// 3. Environment (clock for snapshot timestamps)
    ///
    /// Every mutating operation holds the write half of the lock for the whole
    /// reducer call, snapshot included. Queries take the read half, so they see
    /// either all of an operation or none of it. Clones share the same state.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let ledger = Ledger::new(accounts)?;
    ///
    /// let handles: Vec<_> = (0..4)
    ///     .map(|_| {
    ///         let ledger = ledger.clone();
    ///         tokio::spawn(async move { ledger.deposit("acc1", 200).await })
    ///     })
    ///     .collect();
    /// ```
    pub struct Ledger {
        state: Arc<RwLock<LedgerState>>,
        reducer: LedgerReducer,
        environment: LedgerEnvironment,
        config: LedgerConfig,
    }

    impl Ledger {
        /// Create a ledger over `accounts` with the default configuration
        ///
        /// # Errors
        ///
        /// Returns [`LedgerError::NoAccounts`] if `accounts` is empty.
        pub fn new(accounts: AccountTable) -> Result<Self, LedgerError> {
            Self::with_config(accounts, LedgerConfig::default())
        }

        /// Create a ledger with a custom configuration
        ///
        /// # Errors
        ///
        /// Returns [`LedgerError::NoAccounts`] if `accounts` is empty and
        /// [`LedgerError::ZeroHistoryDepth`] if the configured history keeps
        /// no snapshots.
        pub fn with_config(
            accounts: AccountTable,
            config: LedgerConfig,
        ) -> Result<Self, LedgerError> {
            Self::with_clock(accounts, config, Arc::new(SystemClock))
        }

        /// Create a ledger with a custom configuration and clock
        ///
        /// # Errors
        ///
        /// Returns [`LedgerError::NoAccounts`] if `accounts` is empty and
        /// [`LedgerError::ZeroHistoryDepth`] if the configured history keeps
        /// no snapshots.
        pub fn with_clock(
            accounts: AccountTable,
            config: LedgerConfig,
            clock: Arc<dyn Clock>,
        ) -> Result<Self, LedgerError> {
            let state = LedgerState::with_max_history_depth(accounts, config.max_history_depth)?;

            tracing::debug!(
                accounts = state.accounts().len(),
                max_history_depth = ?config.max_history_depth,
                "Ledger created"
            );

            Ok(Self {
                state: Arc::new(RwLock::new(state)),
                reducer: LedgerReducer::new(),
                environment: LedgerEnvironment::new(clock),
                config,
            })
        }

        /// Configuration this ledger was built with
        #[must_use]
        pub const fn config(&self) -> &LedgerConfig {
            &self.config
        }

        /// Apply an operation under the guard
        ///
        /// Waits for exclusive access, runs the reducer and releases the guard
        /// before returning, whatever the result.
        ///
        /// # Errors
        ///
        /// Returns the [`LedgerError`] the reducer rejected the operation with.
        #[tracing::instrument(skip(self, operation), fields(kind = %operation.kind()), name = "ledger_send")]
        pub async fn send(&self, operation: Operation) -> Result<Outcome, LedgerError> {
            let kind = operation.kind();

            let (result, history_depth, evicted, elapsed) = {
                let mut state = self.state.write().await;
                tracing::trace!("Acquired write lock on ledger state");

                let evicted_before = state.history().evicted();
                let start = Instant::now();
                let result = self.reducer.reduce(&mut *state, operation, &self.environment);
                let elapsed = start.elapsed();

                (
                    result,
                    state.history_depth(),
                    state.history().evicted() - evicted_before,
                    elapsed,
                )
            };

            if evicted > 0 {
                tracing::debug!(
                    max_history_depth = ?self.config.max_history_depth,
                    "History at capacity, dropped oldest snapshot"
                );
            }

            if let Ok(outcome) = &result {
                tracing::debug!(
                    changes = outcome.changes.len(),
                    history_depth,
                    "Operation applied"
                );
            }

            if self.config.metrics_enabled {
                LedgerMetrics::record_operation(
                    kind,
                    result.is_ok(),
                    history_depth,
                    evicted,
                    elapsed,
                );
            }

            result
        }

        /// Add `amount` to `account`
        ///
        /// # Errors
        ///
        /// [`LedgerError::UnknownAccount`] or [`LedgerError::BalanceOverflow`].
        pub async fn deposit(
            &self,
            account: impl Into<AccountId>,
            amount: i64,
        ) -> Result<Outcome, LedgerError> {
            self.send(Operation::deposit(account, amount)).await
        }

        /// Subtract `amount` from `account`
        ///
        /// # Errors
        ///
        /// [`LedgerError::UnknownAccount`], [`LedgerError::InsufficientFunds`]
        /// or [`LedgerError::BalanceOverflow`].
        pub async fn withdraw(
            &self,
            account: impl Into<AccountId>,
            amount: i64,
        ) -> Result<Outcome, LedgerError> {
            self.send(Operation::withdraw(account, amount)).await
        }

        /// Move `amount` from `from` to `to`
        ///
        /// # Errors
        ///
        /// [`LedgerError::UnknownAccount`] (sender checked first),
        /// [`LedgerError::InsufficientFunds`] or [`LedgerError::BalanceOverflow`].
        pub async fn transfer(
            &self,
            from: impl Into<AccountId>,
            to: impl Into<AccountId>,
            amount: i64,
        ) -> Result<Outcome, LedgerError> {
            self.send(Operation::transfer(from, to, amount)).await
        }

        /// Restore the table captured by the most recent snapshot
        ///
        /// # Errors
        ///
        /// [`LedgerError::EmptyHistory`] if there is nothing to restore.
        pub async fn rollback(&self) -> Result<Outcome, LedgerError> {
            self.send(Operation::Rollback).await
        }

        /// Read current state via a closure
        ///
        /// Access state through a closure to ensure the lock is released promptly:
        ///
        /// ```ignore
        /// let depth = ledger.state(|s| s.history_depth()).await;
        /// ```
        pub async fn state<F, T>(&self, f: F) -> T
        where
            F: FnOnce(&LedgerState) -> T,
        {
            let state = self.state.read().await;
            f(&*state)
        }

        /// Balance of one account
        pub async fn balance(&self, account: &AccountId) -> Option<Amount> {
            self.state(|s| s.balance(account)).await
        }

        /// Consistent copy of every balance
        pub async fn balances(&self) -> AccountTable {
            self.state(|s| s.accounts().clone()).await
        }

        /// Sum of every balance
        pub async fn total(&self) -> i128 {
            self.state(|s| s.accounts().total()).await
        }

        /// Number of snapshots available to roll back
        pub async fn history_depth(&self) -> usize {
            self.state(LedgerState::history_depth).await
        }

        /// Summaries of the retained snapshots, oldest first
        pub async fn history(&self) -> Vec<SnapshotInfo> {
            self.state(LedgerState::history_infos).await
        }
    }

    impl Clone for Ledger {
        fn clone(&self) -> Self {
            Self {
                state: Arc::clone(&self.state),
                reducer: self.reducer,
                environment: self.environment.clone(),
                config: self.config.clone(),
            }
        }
    }

    impl std::fmt::Debug for Ledger {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("Ledger")
                .field("config", &self.config)
                .finish_non_exhaustive()
        }
    }
}

// Re-export for convenience
pub use store::Ledger;
