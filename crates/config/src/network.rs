//! Network configuration for balance queries.
//!
//! Provides the chain identity and block explorer parameters for the
//! supported networks (mainnet, testnet).

use alloy_primitives::{b256, B256};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

/// Network type (mainnet or testnet).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkType {
    Mainnet,
    Testnet,
}

/// Chain identity and explorer parameters for one network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Network type (mainnet or testnet)
    pub network_type: NetworkType,
    /// Chain ID
    pub chain_id: u64,
    /// Hash of block 0, used to verify a node serves this network
    pub genesis_hash: B256,
    /// Block explorer API base url
    pub explorer_url: Cow<'static, str>,
    /// Decimals of the native currency (wei -> ETH)
    pub native_decimals: u8,
    /// Maximum number of addresses the explorer accepts in one multi-balance request
    pub batch_limit: usize,
}

impl NetworkConfig {
    /// Ethereum mainnet configuration.
    pub const fn mainnet() -> Self {
        Self {
            network_type: NetworkType::Mainnet,
            chain_id: 1,
            // https://etherscan.io/block/0
            genesis_hash: b256!("0xd4e56740f876aef8c010b86a40d5f56745a118d0906a34e69aec8c0db1cb8fa3"),
            explorer_url: Cow::Borrowed("https://api.etherscan.io/api"),
            native_decimals: 18,
            batch_limit: 20,
        }
    }

    /// Ethereum Sepolia testnet configuration.
    pub const fn sepolia() -> Self {
        Self {
            network_type: NetworkType::Testnet,
            chain_id: 11155111,
            // https://sepolia.etherscan.io/block/0
            genesis_hash: b256!("0x25a5cc106eea7138acab33231d7160d69cb777ee0c2c553fcddf5138993e6dd9"),
            explorer_url: Cow::Borrowed("https://api-sepolia.etherscan.io/api"),
            native_decimals: 18,
            batch_limit: 20,
        }
    }

    /// Create configuration from network type.
    pub const fn from_network_type(network_type: NetworkType) -> Self {
        match network_type {
            NetworkType::Mainnet => Self::mainnet(),
            NetworkType::Testnet => Self::sepolia(),
        }
    }
}

/// Builder for custom network configurations.
#[derive(Debug, Clone)]
pub struct NetworkConfigBuilder {
    config: NetworkConfig,
}

impl NetworkConfigBuilder {
    /// Start with mainnet defaults.
    pub const fn mainnet() -> Self {
        Self {
            config: NetworkConfig::mainnet(),
        }
    }

    /// Start with testnet defaults.
    pub const fn testnet() -> Self {
        Self {
            config: NetworkConfig::sepolia(),
        }
    }

    /// Override the expected genesis hash (private networks, forks).
    pub fn genesis_hash(mut self, hash: B256) -> Self {
        self.config.genesis_hash = hash;
        self
    }

    /// Override the block explorer API url.
    pub fn explorer_url(mut self, url: impl Into<String>) -> Self {
        self.config.explorer_url = Cow::Owned(url.into());
        self
    }

    /// Override the multi-balance batch limit.
    pub fn batch_limit(mut self, limit: usize) -> Self {
        self.config.batch_limit = limit;
        self
    }

    /// Build the network configuration.
    pub fn build(self) -> NetworkConfig {
        self.config
    }
}
