//! Prometheus metrics for observability and monitoring.
//!
//! Every [`crate::Ledger`] operation records, unless disabled in its config:
//! - `ledger_operations_total{kind}`: operations attempted
//! - `ledger_operations_rejected_total{kind}`: operations the reducer rejected
//! - `ledger_history_depth`: snapshots available to roll back
//! - `ledger_history_evicted_total`: snapshots dropped by a bounded history
//! - `ledger_reducer_duration_seconds`: time spent holding the guard in the reducer
//!
//! The facade is a no-op until a recorder is installed. [`PrometheusExporter`]
//! installs one and renders the text exposition format.
//!
//! # Example
//!
//! ```rust,no_run
//! use ledger_runtime::metrics::PrometheusExporter;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut exporter = PrometheusExporter::new();
//! exporter.install()?;
//!
//! // ... run ledger operations ...
//!
//! if let Some(text) = exporter.render() {
//!     println!("{text}");
//! }
//! # Ok(())
//! # }
//! ```

use ledger_core::OperationKind;
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;
use thiserror::Error;

/// Errors from metrics operations.
#[derive(Error, Debug)]
pub enum MetricsError {
    /// Failed to build metrics exporter
    #[error("Failed to build metrics exporter: {0}")]
    Build(String),
    /// Failed to install metrics exporter
    #[error("Failed to install metrics exporter: {0}")]
    Install(String),
}

/// Prometheus recorder wrapper.
#[derive(Default)]
pub struct PrometheusExporter {
    handle: Option<PrometheusHandle>,
}

impl PrometheusExporter {
    /// Create an exporter that has not been installed yet.
    #[must_use]
    pub const fn new() -> Self {
        Self { handle: None }
    }

    /// Register metric descriptions and install the global recorder.
    ///
    /// # Errors
    ///
    /// Returns error if the exporter cannot be built or installed.
    ///
    /// # Note
    ///
    /// Only one global recorder can exist per process. If one is already
    /// installed (e.g., by another test), this logs a warning, returns `Ok` and
    /// leaves [`PrometheusExporter::render`] returning `None`.
    pub fn install(&mut self) -> Result<(), MetricsError> {
        register_metrics();

        let builder = PrometheusBuilder::new()
            .set_buckets_for_metric(
                Matcher::Suffix("duration_seconds".to_string()),
                &[
                    0.000_001, 0.000_005, 0.000_01, 0.000_05, 0.000_1, 0.000_5, 0.001, 0.005,
                    0.01,
                ],
            )
            .map_err(|e| MetricsError::Build(e.to_string()))?;

        match builder.install_recorder() {
            Ok(handle) => {
                self.handle = Some(handle);
                tracing::info!("Prometheus metrics recorder installed");
                Ok(())
            }
            Err(e) => {
                let err_msg = e.to_string();
                if err_msg.contains("already initialized") {
                    tracing::warn!("Metrics recorder already initialized, skipping re-initialization");
                    Ok(())
                } else {
                    Err(MetricsError::Install(err_msg))
                }
            }
        }
    }

    /// Get the metrics handle for rendering.
    #[must_use]
    pub const fn handle(&self) -> Option<&PrometheusHandle> {
        self.handle.as_ref()
    }

    /// Render current metrics in Prometheus format.
    ///
    /// Returns `None` if this exporter's recorder was not installed.
    #[must_use]
    pub fn render(&self) -> Option<String> {
        self.handle.as_ref().map(PrometheusHandle::render)
    }
}

/// Register all metric descriptions.
fn register_metrics() {
    describe_counter!(
        "ledger_operations_total",
        "Total number of ledger operations attempted"
    );
    describe_counter!(
        "ledger_operations_rejected_total",
        "Total number of ledger operations rejected by validation"
    );
    describe_gauge!(
        "ledger_history_depth",
        "Number of snapshots currently available to roll back"
    );
    describe_counter!(
        "ledger_history_evicted_total",
        "Total number of snapshots dropped because the history was full"
    );
    describe_histogram!(
        "ledger_reducer_duration_seconds",
        "Time spent in the reducer while holding the ledger guard"
    );
}

/// Ledger metrics recorder.
pub struct LedgerMetrics;

impl LedgerMetrics {
    /// Record one operation.
    pub fn record_operation(
        kind: OperationKind,
        applied: bool,
        history_depth: usize,
        evicted: u64,
        duration: Duration,
    ) {
        counter!("ledger_operations_total", "kind" => kind.as_str()).increment(1);
        if !applied {
            counter!("ledger_operations_rejected_total", "kind" => kind.as_str()).increment(1);
        }
        if evicted > 0 {
            counter!("ledger_history_evicted_total").increment(evicted);
        }
        // Note: Precision loss acceptable for metrics (depth < 2^52)
        #[allow(clippy::cast_precision_loss)]
        gauge!("ledger_history_depth").set(history_depth as f64);
        histogram!("ledger_reducer_duration_seconds").record(duration.as_secs_f64());
    }
}
