//! Workload settings for the demo, read from `DEMO_*` environment variables.

use anyhow::{Context, bail};

/// Number of tasks spawned per operation kind
pub const WORKERS_VAR: &str = "DEMO_WORKERS";
/// Amount each deposit task adds
pub const DEPOSIT_AMOUNT_VAR: &str = "DEMO_DEPOSIT_AMOUNT";
/// Amount each withdraw task takes
pub const WITHDRAW_AMOUNT_VAR: &str = "DEMO_WITHDRAW_AMOUNT";
/// Amount each transfer task moves
pub const TRANSFER_AMOUNT_VAR: &str = "DEMO_TRANSFER_AMOUNT";
/// Amount of the final withdrawal, meant to overdraw
pub const OVERDRAFT_AMOUNT_VAR: &str = "DEMO_OVERDRAFT_AMOUNT";

/// Demo workload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DemoConfig {
    /// Tasks spawned per operation kind
    pub workers: usize,
    /// Amount per deposit
    pub deposit_amount: i64,
    /// Amount per withdrawal
    pub withdraw_amount: i64,
    /// Amount per transfer
    pub transfer_amount: i64,
    /// Amount of the closing overdraft attempt
    pub overdraft_amount: i64,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            deposit_amount: 200,
            withdraw_amount: 100,
            transfer_amount: 75,
            overdraft_amount: 10_000,
        }
    }
}

impl DemoConfig {
    /// Load from the process environment
    ///
    /// # Errors
    ///
    /// Returns error if a variable is set but does not parse, or if there are
    /// no workers.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load through an arbitrary variable lookup
    ///
    /// # Errors
    ///
    /// Returns error if a variable is set but does not parse, or if there are
    /// no workers.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let config = Self {
            workers: parse_or(&lookup, WORKERS_VAR, defaults.workers)?,
            deposit_amount: parse_or(&lookup, DEPOSIT_AMOUNT_VAR, defaults.deposit_amount)?,
            withdraw_amount: parse_or(&lookup, WITHDRAW_AMOUNT_VAR, defaults.withdraw_amount)?,
            transfer_amount: parse_or(&lookup, TRANSFER_AMOUNT_VAR, defaults.transfer_amount)?,
            overdraft_amount: parse_or(&lookup, OVERDRAFT_AMOUNT_VAR, defaults.overdraft_amount)?,
        };

        if config.workers == 0 {
            bail!("{WORKERS_VAR} must be at least 1");
        }

        Ok(config)
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> anyhow::Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("Failed to parse {key}={raw:?}")),
        None => Ok(default),
    }
}
