//! Prometheus metrics for the balance watcher.
//!
//! All metrics are aggregated in the [`Metrics`] struct for easy tracking and management.

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use std::time::Duration;

/// Aggregated metrics for the watcher.
///
/// Metrics are registered with the global metrics registry on creation.
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

    /// Register metric descriptions with the global registry.
    fn register_descriptions() {
        // Cycle metrics
        describe_counter!(
            "watcher_cycles_total",
            "Total number of polling cycles executed"
        );
        describe_counter!(
            "watcher_cycles_failure_total",
            "Total number of polling cycles with at least one failed query"
        );
        describe_histogram!(
            "watcher_cycle_duration_seconds",
            "Duration of each polling cycle in seconds"
        );

        // Connection metrics
        describe_counter!(
            "watcher_connection_attempts_total",
            "Node connection attempts by outcome"
        );
        describe_gauge!(
            "watcher_node_connected",
            "1 when balances are read from the node, 0 when from the block explorer"
        );

        // Query metrics
        describe_counter!(
            "watcher_queries_total",
            "Balance queries by data source"
        );
        describe_counter!(
            "watcher_query_failures_total",
            "Failed balance queries by asset"
        );

        // Balance metrics (gauges - current values)
        describe_gauge!(
            "watcher_balance",
            "Current balance by asset and account, in whole units"
        );
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Cycle metrics
    // ─────────────────────────────────────────────────────────────────────────────

    /// Record a completed cycle.
    pub fn record_cycle(&self, success: bool, duration: Duration) {
        counter!("watcher_cycles_total").increment(1);
        histogram!("watcher_cycle_duration_seconds").record(duration.as_secs_f64());

        if !success {
            counter!("watcher_cycles_failure_total").increment(1);
        }
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Connection metrics
    // ─────────────────────────────────────────────────────────────────────────────

    /// Record a node connection attempt.
    pub fn record_connection_attempt(&self, outcome: &str) {
        counter!("watcher_connection_attempts_total", "outcome" => outcome.to_string())
            .increment(1);
    }

    pub fn set_node_connected(&self, connected: bool) {
        gauge!("watcher_node_connected").set(if connected { 1.0 } else { 0.0 });
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Query metrics
    // ─────────────────────────────────────────────────────────────────────────────

    pub fn record_query(&self, source: &str) {
        counter!("watcher_queries_total", "source" => source.to_string()).increment(1);
    }

    pub fn record_query_failure(&self, asset: &str) {
        counter!("watcher_query_failures_total", "asset" => asset.to_string()).increment(1);
    }

    /// Set the current balance of an account.
    pub fn set_balance(&self, asset: &str, account: &str, balance: f64) {
        gauge!(
            "watcher_balance",
            "asset" => asset.to_string(),
            "account" => account.to_string()
        )
        .set(balance);
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
