use alloy_primitives::Address;
use balance::{BalanceQuery, ClientOptions, OversizedBatch, TokenDescriptor};
use config::{NetworkConfig, NetworkConfigBuilder, NetworkType};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level watcher configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Network the node must belong to
    #[serde(default = "default_network")]
    pub network: NetworkType,

    /// Node RPC endpoint url
    #[serde(default = "default_node_url")]
    pub node_url: String,

    /// Try the node when starting
    #[serde(default = "default_true")]
    pub connect_on_start: bool,

    /// Try the node again at the start of every later cycle while disconnected
    #[serde(default = "default_true")]
    pub reconnect_each_cycle: bool,

    /// Check the node's genesis block before trusting it
    #[serde(default = "default_true")]
    pub verify_network: bool,

    /// Block explorer API url, defaults to the network's explorer
    #[serde(default)]
    pub explorer_url: Option<String>,

    #[serde(default)]
    pub explorer_api_key: Option<String>,

    /// Token interface file replacing the embedded ERC20 definition
    #[serde(default)]
    pub token_abi_path: Option<PathBuf>,

    #[serde(default)]
    pub reject_oversized_batches: bool,

    /// Accounts to watch
    pub accounts: Vec<Address>,

    /// Tokens to watch for every account
    #[serde(default)]
    pub tokens: Vec<TokenDescriptor>,

    /// Seconds between polling cycles
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    /// Port for the Prometheus exporter; disabled when unset
    #[serde(default)]
    pub metrics_port: Option<u16>,
}

const fn default_network() -> NetworkType {
    NetworkType::Mainnet
}

fn default_node_url() -> String {
    "http://localhost:8545".to_string()
}

const fn default_true() -> bool {
    true
}

const fn default_interval_secs() -> u64 {
    60
}

impl Config {
    pub fn from_file(path: impl AsRef<Path>) -> eyre::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;

        Ok(config)
    }

    /// Network parameters with the configured overrides applied.
    pub fn network_config(&self) -> NetworkConfig {
        let builder = match self.network {
            NetworkType::Mainnet => NetworkConfigBuilder::mainnet(),
            NetworkType::Testnet => NetworkConfigBuilder::testnet(),
        };

        match &self.explorer_url {
            Some(url) => builder.explorer_url(url.clone()).build(),
            None => builder.build(),
        }
    }

    pub fn client_options(&self) -> ClientOptions {
        ClientOptions {
            verify_network: self.verify_network,
            oversized_batch: if self.reject_oversized_batches {
                OversizedBatch::Reject
            } else {
                OversizedBatch::Chunk
            },
            token_abi_path: self.token_abi_path.clone(),
            ..Default::default()
        }
    }

    /// One native query for all accounts, then one query per token.
    pub fn queries(&self) -> Vec<BalanceQuery> {
        let mut queries = vec![BalanceQuery::Native {
            accounts: self.accounts.clone(),
        }];
        queries.extend(self.tokens.iter().map(|token| BalanceQuery::Token {
            token: token.clone(),
            accounts: self.accounts.clone(),
        }));
        queries
    }
}
