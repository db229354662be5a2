//! Concurrent Ledger Demo
//!
//! Drives one [`Ledger`] from many tasks at once: random deposits, withdrawals
//! and transfers race for the guard, then the demo rolls back once and tries
//! an oversized withdrawal.
//!
//! # Running the Example
//!
//! ```bash
//! RUST_LOG=debug DEMO_WORKERS=8 cargo run -p concurrent-ledger
//! ```
//!
//! `LEDGER_MAX_HISTORY_DEPTH` and `LEDGER_METRICS_ENABLED` configure the ledger
//! itself.

use anyhow::Context;
use ledger_core::AccountTable;
use ledger_runtime::metrics::PrometheusExporter;
use ledger_runtime::{Ledger, LedgerConfig};
use rand::Rng;
use tokio::task::JoinSet;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;

use config::DemoConfig;

const ACCOUNTS: [(&str, i64); 3] = [("acc1", 1000), ("acc2", 500), ("acc3", 300)];

fn random_account(rng: &mut impl Rng) -> &'static str {
    ACCOUNTS[rng.gen_range(0..ACCOUNTS.len())].0
}

fn initial_accounts() -> AccountTable {
    ACCOUNTS.into_iter().collect()
}

/// Spawn one deposit, withdraw and transfer task per worker
///
/// Accounts are drawn up front because the thread-local RNG cannot cross
/// into spawned tasks.
fn spawn_workload(ledger: &Ledger, config: &DemoConfig) -> JoinSet<()> {
    let mut rng = rand::thread_rng();
    let mut tasks = JoinSet::new();

    for worker in 0..config.workers {
        let account = random_account(&mut rng);
        let amount = config.deposit_amount;
        let handle = ledger.clone();
        tasks.spawn(async move {
            match handle.deposit(account, amount).await {
                Ok(_) => tracing::info!(worker, account, amount, "Deposited"),
                Err(error) => tracing::warn!(worker, %error, "Deposit failed"),
            }
        });

        let account = random_account(&mut rng);
        let amount = config.withdraw_amount;
        let handle = ledger.clone();
        tasks.spawn(async move {
            match handle.withdraw(account, amount).await {
                Ok(_) => tracing::info!(worker, account, amount, "Withdrew"),
                Err(error) => tracing::warn!(worker, %error, "Withdrawal failed"),
            }
        });

        let from = random_account(&mut rng);
        let to = random_account(&mut rng);
        if from == to {
            tracing::debug!(worker, account = from, "Skipping transfer to the same account");
            continue;
        }
        let amount = config.transfer_amount;
        let handle = ledger.clone();
        tasks.spawn(async move {
            match handle.transfer(from, to, amount).await {
                Ok(_) => tracing::info!(worker, from, to, amount, "Transferred"),
                Err(error) => tracing::warn!(worker, %error, "Transfer failed"),
            }
        });
    }

    tasks
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Initialize tracing subscriber
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 2. Load configuration
    let demo = DemoConfig::from_env()?;
    let ledger_config = LedgerConfig::from_env().context("Invalid ledger configuration")?;
    tracing::info!(?demo, ?ledger_config, "Starting concurrent ledger demo");

    // 3. Install Prometheus recorder
    let mut exporter = PrometheusExporter::new();
    if ledger_config.metrics_enabled {
        exporter.install()?;
    }

    // 4. Create ledger
    let ledger = Ledger::with_config(initial_accounts(), ledger_config)?;
    tracing::info!(accounts = %ledger.balances().await, "Initial balances");

    // 5. Run the concurrent workload
    let mut tasks = spawn_workload(&ledger, &demo);
    while let Some(joined) = tasks.join_next().await {
        joined.context("Worker task panicked")?;
    }
    tracing::info!(
        accounts = %ledger.balances().await,
        history_depth = ledger.history_depth().await,
        "Workload finished"
    );

    // 6. Undo the most recent operation
    match ledger.rollback().await {
        Ok(outcome) => tracing::info!(
            restored = outcome.changes.len(),
            history_depth = outcome.history_depth,
            "Rolled back last operation"
        ),
        Err(error) => tracing::warn!(%error, "Rollback failed"),
    }

    // 7. Try to overdraw a random account
    let account = random_account(&mut rand::thread_rng());
    match ledger.withdraw(account, demo.overdraft_amount).await {
        Ok(_) => tracing::info!(account, amount = demo.overdraft_amount, "Overdraft accepted"),
        Err(error) => tracing::info!(%error, "Overdraft rejected as expected"),
    }

    // 8. Report
    let balances = ledger.balances().await;
    println!("Final balances:");
    println!("{}", serde_json::to_string_pretty(&balances)?);
    println!("Total: {}", balances.total());

    let history = ledger.history().await;
    println!("\nHistory ({} snapshots):", history.len());
    for info in &history {
        println!("  #{} {} at {}", info.index, info.cause, info.taken_at);
    }

    if let Some(rendered) = exporter.render() {
        println!("\nMetrics:\n{rendered}");
    }

    Ok(())
}
