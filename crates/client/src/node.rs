//! Node connection collaborator.
//!
//! A [`NodeConnector`] opens a [`NodeTransport`] for an [`Endpoint`]. The
//! transport answers liveness checks, block lookups and native balance
//! queries, and builds [`TokenContract`] handles from a token address plus the
//! interface loaded on connection.

use crate::{create_provider, ClientError, Endpoint};
use alloy_contract::ContractInstance;
use alloy_dyn_abi::DynSolValue;
use alloy_primitives::{Address, B256, U256};
use alloy_provider::{Provider, RootProvider};
use alloy_rpc_types_eth::BlockNumberOrTag;
use binding::{TokenRegistry, BALANCE_OF};
use std::future::Future;
use tracing::debug;

/// The parts of a block the balance client cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockHeader {
    pub number: u64,
    /// Content hash identifying the block
    pub hash: B256,
    pub parent_hash: B256,
    pub timestamp: u64,
}

/// Opens node connections.
pub trait NodeConnector: Send + Sync {
    type Node: NodeTransport;

    /// Open a transport to `endpoint`.
    ///
    /// Opening may succeed without any network traffic; use
    /// [`NodeTransport::is_live`] to find out whether the node answers.
    fn connect(
        &self,
        endpoint: &Endpoint,
    ) -> impl Future<Output = Result<Self::Node, ClientError>> + Send;
}

/// An open connection to a node.
pub trait NodeTransport: Send + Sync {
    type Contract: TokenContract;

    /// Probe whether the node answers requests.
    fn is_live(&self) -> impl Future<Output = bool> + Send;

    /// Fetch a block by number.
    fn block_by_number(
        &self,
        number: u64,
    ) -> impl Future<Output = Result<Option<BlockHeader>, ClientError>> + Send;

    /// Native balance of `account` in the chain's smallest unit.
    fn native_balance(
        &self,
        account: Address,
    ) -> impl Future<Output = Result<U256, ClientError>> + Send;

    /// Build a handle for the token contract at `address`.
    fn token_contract(&self, address: Address, registry: &TokenRegistry) -> Self::Contract;
}

/// Handle to a deployed token contract.
pub trait TokenContract: Send + Sync {
    /// Raw token balance of `account`, not scaled by decimals.
    fn balance_of(&self, account: Address)
        -> impl Future<Output = Result<U256, ClientError>> + Send;
}

/// Connector producing HTTP JSON-RPC connections.
#[derive(Debug, Clone, Copy, Default)]
pub struct RpcConnector;

impl NodeConnector for RpcConnector {
    type Node = RpcNode<RootProvider>;

    async fn connect(&self, endpoint: &Endpoint) -> Result<Self::Node, ClientError> {
        debug!(%endpoint, "Opening node connection");
        Ok(RpcNode::new(create_provider(endpoint)))
    }
}

/// Node connection over an alloy provider.
#[derive(Debug, Clone)]
pub struct RpcNode<P> {
    provider: P,
}

impl<P> RpcNode<P>
where
    P: Provider + Clone,
{
    pub const fn new(provider: P) -> Self {
        Self { provider }
    }
}

impl<P> NodeTransport for RpcNode<P>
where
    P: Provider + Clone,
{
    type Contract = RpcTokenContract<P>;

    async fn is_live(&self) -> bool {
        match self.provider.get_chain_id().await {
            Ok(chain_id) => {
                debug!(chain_id, "Node is live");
                true
            }
            Err(e) => {
                debug!("Node liveness check failed: {}", e);
                false
            }
        }
    }

    async fn block_by_number(&self, number: u64) -> Result<Option<BlockHeader>, ClientError> {
        let block = self
            .provider
            .get_block_by_number(BlockNumberOrTag::Number(number))
            .await
            .map_err(|e| ClientError::Rpc(format!("{}", e)))?;

        Ok(block.map(|block| BlockHeader {
            number: block.header.inner.number,
            hash: block.header.hash,
            parent_hash: block.header.inner.parent_hash,
            timestamp: block.header.inner.timestamp,
        }))
    }

    async fn native_balance(&self, account: Address) -> Result<U256, ClientError> {
        self.provider
            .get_balance(account)
            .await
            .map_err(|e| ClientError::Rpc(format!("{}", e)))
    }

    fn token_contract(&self, address: Address, registry: &TokenRegistry) -> Self::Contract {
        RpcTokenContract {
            instance: ContractInstance::new(
                address,
                self.provider.clone(),
                registry.interface().clone(),
            ),
        }
    }
}

/// Token contract called through the dynamic ABI interface.
#[derive(Clone)]
pub struct RpcTokenContract<P> {
    instance: ContractInstance<P>,
}

impl<P> TokenContract for RpcTokenContract<P>
where
    P: Provider + Clone,
{
    async fn balance_of(&self, account: Address) -> Result<U256, ClientError> {
        let outputs = self
            .instance
            .function(BALANCE_OF, &[DynSolValue::Address(account)])?
            .call()
            .await?;

        match outputs.first().and_then(DynSolValue::as_uint) {
            Some((amount, _)) => Ok(amount),
            None => Err(ClientError::UnexpectedOutput(format!(
                "{BALANCE_OF} returned {outputs:?}"
            ))),
        }
    }
}
