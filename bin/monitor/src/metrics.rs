//! Prometheus metrics for the monitor.
//!
//! All metrics are aggregated in the [`Metrics`] struct for easy tracking and management.

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use std::time::Duration;

/// Aggregated metrics for the monitor.
///
/// Metric descriptions are registered with the global registry on creation.
#[derive(Debug, Clone)]
pub struct Metrics {
    _private: (),
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    /// Create a new metrics instance and register all metric descriptions.
    pub fn new() -> Self {
        Self::register_descriptions();
        Self { _private: () }
    }

    fn register_descriptions() {
        // Tick metrics
        describe_counter!("monitor_ticks_total", "Total number of scheduler ticks run");
        describe_counter!(
            "monitor_ticks_failure_total",
            "Total number of ticks in which at least one withdrawal failed"
        );
        describe_histogram!(
            "monitor_tick_duration_seconds",
            "Duration of each scheduler tick in seconds"
        );

        // Withdrawal status gauges (point-in-time, re-read each tick)
        describe_gauge!(
            "monitor_withdrawals_ready_count",
            "Tracked withdrawals waiting to be proven"
        );
        describe_gauge!(
            "monitor_withdrawals_proven_count",
            "Tracked withdrawals inside the challenge period"
        );
        describe_gauge!(
            "monitor_withdrawals_finalized_count",
            "Tracked withdrawals fully finalized"
        );

        // Submission counters
        describe_counter!(
            "monitor_prove_submitted_total",
            "proveWithdrawalTransaction submissions that landed with status 1"
        );
        describe_counter!(
            "monitor_finalize_submitted_total",
            "finalizeWithdrawalTransaction submissions that landed with status 1"
        );
    }

    /// Record a completed tick.
    pub fn record_tick(&self, errors: usize, duration: Duration) {
        counter!("monitor_ticks_total").increment(1);
        histogram!("monitor_tick_duration_seconds").record(duration.as_secs_f64());

        if errors > 0 {
            counter!("monitor_ticks_failure_total").increment(1);
        }
    }

    /// Set the per-status withdrawal counts observed this tick.
    pub fn set_withdrawal_statuses(&self, ready: usize, proven: usize, finalized: usize) {
        gauge!("monitor_withdrawals_ready_count").set(ready as f64);
        gauge!("monitor_withdrawals_proven_count").set(proven as f64);
        gauge!("monitor_withdrawals_finalized_count").set(finalized as f64);
    }

    /// Record a successful prove submission.
    pub fn record_prove_submitted(&self) {
        counter!("monitor_prove_submitted_total").increment(1);
    }

    /// Record a successful finalize submission.
    pub fn record_finalize_submitted(&self) {
        counter!("monitor_finalize_submitted_total").increment(1);
    }
}

/// Install the Prometheus metrics exporter and start the HTTP server.
///
/// Returns an error if the server fails to bind to the specified port.
pub fn install_prometheus_exporter(port: u16) -> eyre::Result<()> {
    use metrics_exporter_prometheus::PrometheusBuilder;
    use std::net::SocketAddr;

    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| eyre::eyre!("Failed to install Prometheus exporter: {}", e))?;

    Ok(())
}
