//! Data-source collaborators for balance queries.
//!
//! Two structurally different sources are exposed here:
//! - a stateful node connection ([`NodeConnector`], [`NodeTransport`]) backed by
//!   an alloy HTTP provider
//! - a stateless block explorer API ([`ExplorerApi`]) backed by Etherscan
//!
//! Both are traits so that the balance client can be driven by in-memory
//! implementations in tests.

pub mod etherscan;
pub mod explorer;
pub mod node;

use alloy_provider::RootProvider;
use reqwest::Url;
use std::{fmt, str::FromStr};
use thiserror::Error;

pub use etherscan::Etherscan;
pub use explorer::{AccountBalance, ApiEnvelope, ExplorerApi, Status};
pub use node::{BlockHeader, NodeConnector, NodeTransport, RpcConnector, RpcNode, TokenContract};

#[derive(Error, Debug)]
pub enum ClientError {
    /// Error parsing or validating URLs
    #[error("Invalid RPC URL: {0}")]
    InvalidUrl(String),

    /// Error connecting to the RPC endpoint
    #[error("Connection error: {0}")]
    Connection(String),

    /// JSON-RPC request failed
    #[error("RPC error: {0}")]
    Rpc(String),

    /// Contract call failed
    #[error("Contract error: {0}")]
    Contract(#[from] alloy_contract::Error),

    /// Contract call returned something other than the expected value
    #[error("Unexpected contract output: {0}")]
    UnexpectedOutput(String),

    /// HTTP request to the block explorer failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Explorer response could not be decoded
    #[error("Decode error: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Address of a node the client may connect to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint(Url);

impl Endpoint {
    /// Parse an endpoint from a url string.
    pub fn parse(url: &str) -> Result<Self, ClientError> {
        url.parse()
            .map(Self)
            .map_err(|e| ClientError::InvalidUrl(format!("{}", e)))
    }

    /// Endpoint of a node listening on localhost.
    pub fn localhost(port: u16) -> Result<Self, ClientError> {
        Self::parse(&format!("http://localhost:{port}"))
    }

    pub const fn url(&self) -> &Url {
        &self.0
    }
}

impl FromStr for Endpoint {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Convenience function to create an ethereum rpc provider for an endpoint.
pub fn create_provider(endpoint: &Endpoint) -> RootProvider {
    RootProvider::new_http(endpoint.url().clone())
}
