pub mod config;
pub mod metrics;

use crate::{config::Config, metrics::Metrics};
use alloy_primitives::Address;
use balance::{BalanceMap, BalanceQuery, ChainBalanceClient, ConnectStatus};
use client::{Endpoint, Etherscan, ExplorerApi, NodeConnector, RpcConnector};
use bigdecimal::ToPrimitive;
use tracing::{error, info, warn};

/// Balance client over a JSON-RPC node and Etherscan.
pub type WatcherClient = ChainBalanceClient<RpcConnector, Etherscan>;

/// Label used for the native currency in logs and metrics.
pub const NATIVE_ASSET: &str = "ETH";

/// Build the balance client described by `config`.
pub async fn build_client(config: &Config) -> eyre::Result<WatcherClient> {
    let network = config.network_config();
    let endpoint = Endpoint::parse(&config.node_url)?;
    let explorer = Etherscan::new(
        network.explorer_url.to_string(),
        config.explorer_api_key.clone(),
    );

    let client = ChainBalanceClient::with_options(
        RpcConnector,
        explorer,
        network,
        endpoint,
        config.connect_on_start,
        config.client_options(),
    )
    .await;

    Ok(client)
}

/// Outcome of one polling cycle.
#[derive(Debug, Default)]
pub struct CycleReport {
    /// Whether the node answered this cycle's queries
    pub from_node: bool,
    /// Balances per asset label, in query order
    pub balances: Vec<(String, BalanceMap)>,
    pub failures: usize,
}

impl CycleReport {
    pub const fn is_success(&self) -> bool {
        self.failures == 0
    }
}

/// Run every query once.
///
/// With `reconnect` set, a disconnected client gets one reconnection attempt
/// first; otherwise the node is left alone and a disconnected client answers
/// from the block explorer. Failed queries are logged and counted; the
/// remaining queries still run.
pub async fn poll_balances<C, E>(
    client: &mut ChainBalanceClient<C, E>,
    queries: &[BalanceQuery],
    metrics: &Metrics,
    reconnect: bool,
) -> CycleReport
where
    C: NodeConnector,
    E: ExplorerApi,
{
    if reconnect && !client.is_connected() {
        match client.reconnect().await {
            Ok(status) => {
                if status == ConnectStatus::Connected {
                    info!(endpoint = %client.endpoint(), "Node connection restored");
                }
                metrics.record_connection_attempt("connected");
            }
            Err(failure) => {
                warn!("Node unavailable, using block explorer: {}", failure);
                metrics.record_connection_attempt("failed");
            }
        }
    }

    let from_node = client.is_connected();
    metrics.set_node_connected(from_node);
    let source = if from_node { "node" } else { "explorer" };

    let mut report = CycleReport {
        from_node,
        ..Default::default()
    };

    for query in queries {
        let (asset, accounts) = match query {
            BalanceQuery::Native { accounts } => (NATIVE_ASSET.to_string(), accounts),
            BalanceQuery::Token { token, accounts } => (token.symbol.clone(), accounts),
        };

        metrics.record_query(source);
        match client.query(query).await {
            Ok(balances) => {
                record_balances(metrics, &asset, accounts, &balances);
                report.balances.push((asset, balances));
            }
            Err(e) => {
                error!(asset = %asset, "Failed to query balances: {}", e);
                metrics.record_query_failure(&asset);
                report.failures += 1;
            }
        }
    }

    report
}

fn record_balances(metrics: &Metrics, asset: &str, accounts: &[Address], balances: &BalanceMap) {
    for account in accounts {
        // absent accounts hold zero
        let amount = balances.get(account);
        info!(asset, %account, %amount, "Balance");
        metrics.set_balance(asset, &account.to_string(), amount.to_f64().unwrap_or_default());
    }
}
