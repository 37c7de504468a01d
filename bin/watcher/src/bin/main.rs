//! Balance watcher.
//!
//! Polls native and token balances of the configured accounts, reading from a
//! local node when one is reachable on the expected network and from the
//! block explorer otherwise.

use clap::Parser;
use std::time::{Duration, Instant};
use tokio::time;
use tracing::{info, warn};
use watcher::{
    build_client, config::Config, metrics::install_prometheus_exporter, metrics::Metrics,
    poll_balances,
};

#[derive(Parser)]
#[command(name = "balance-watcher")]
#[command(about = "Watch account balances through a local node or a block explorer")]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Block explorer API key
    #[arg(short = 'k', long, env = "ETHERSCAN_API_KEY")]
    api_key: Option<String>,

    /// Run a single polling cycle and exit
    #[arg(long)]
    once: bool,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    if cli.json_logs {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    info!("Starting balance watcher");

    let mut config = Config::from_file(&cli.config)?;
    if cli.api_key.is_some() {
        config.explorer_api_key = cli.api_key;
    }

    let network = config.network_config();
    info!("Loaded config:");
    info!("  Network: {:?}", network.network_type);
    info!("  Node: {}", config.node_url);
    info!("  Explorer: {}", network.explorer_url);
    info!("  Accounts: {}", config.accounts.len());
    info!("  Tokens: {}", config.tokens.len());

    if let Some(port) = config.metrics_port {
        install_prometheus_exporter(port)?;
        info!("Prometheus exporter listening on port {}", port);
    }
    let metrics = Metrics::new();

    let mut client = build_client(&config).await?;
    if client.is_connected() {
        info!("Reading balances from node at {}", client.endpoint());
    } else {
        warn!("No usable node at {}, reading balances from block explorer", client.endpoint());
    }

    let queries = config.queries();
    let mut interval = time::interval(Duration::from_secs(config.interval_secs.max(1)));
    // construction already made the start-up attempt, if any
    let mut reconnect = false;

    loop {
        tokio::select! {
            _ = interval.tick() => {}
            _ = tokio::signal::ctrl_c() => {
                info!("Shutting down");
                break;
            }
        }

        let started = Instant::now();
        let report = poll_balances(&mut client, &queries, &metrics, reconnect).await;
        reconnect = config.reconnect_each_cycle;
        metrics.record_cycle(report.is_success(), started.elapsed());

        info!(
            from_node = report.from_node,
            failures = report.failures,
            "Polling cycle complete"
        );

        if cli.once {
            if !report.is_success() {
                eyre::bail!("{} balance queries failed", report.failures);
            }
            break;
        }
    }

    Ok(())
}
