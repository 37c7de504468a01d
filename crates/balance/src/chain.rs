//! Connection state machine and dual-source balance queries.
//!
//! The client is either connected to a verified node or disconnected. Every
//! query picks its data source from that state: the node connection when
//! connected, the block explorer otherwise. Connection failures never surface
//! from queries; they only decide which path the next query takes.

use crate::{
    amount::{normalize, parse_raw},
    BalanceAmount, BalanceError, BalanceMap, BalanceQuery, ConnectionFailure, TokenDescriptor,
};
use alloy_primitives::Address;
use binding::{InterfaceError, TokenRegistry};
use client::{
    AccountBalance, ApiEnvelope, BlockHeader, Endpoint, ExplorerApi, NodeConnector,
    NodeTransport, TokenContract,
};
use config::NetworkConfig;
use std::{mem, path::PathBuf, slice::Chunks};
use tracing::{debug, info, info_span, warn, Instrument, Span};

/// What to do with a multi-balance request larger than the explorer's batch limit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OversizedBatch {
    /// Split into several requests of at most the limit each
    #[default]
    Chunk,
    /// Fail with [`BalanceError::UnsupportedScale`]
    Reject,
}

/// Tunables of a [`ChainBalanceClient`].
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Verify the genesis hash on construction, `set_endpoint` and `reconnect`
    pub verify_network: bool,
    /// Handling of native multi-balance requests above the explorer batch limit
    pub oversized_batch: OversizedBatch,
    /// Token interface to load instead of the embedded ERC20 definition
    pub token_abi_path: Option<PathBuf>,
    /// Span every client event is recorded in, so callers can attach their
    /// own fields or route the client's logs
    pub span: Span,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            verify_network: true,
            oversized_batch: OversizedBatch::default(),
            token_abi_path: None,
            span: info_span!("chain_balance"),
        }
    }
}

/// Successful outcome of a connection attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectStatus {
    /// A new verified connection was established
    Connected,
    /// The client was already connected to the requested endpoint
    AlreadyConnected,
}

impl ConnectStatus {
    /// Human readable outcome; empty for a fresh connection.
    pub const fn message(&self) -> &'static str {
        match self {
            Self::Connected => "",
            Self::AlreadyConnected => "already connected",
        }
    }
}

struct Connection<N> {
    endpoint: Endpoint,
    node: N,
    tokens: TokenRegistry,
}

enum ConnectionState<N> {
    Disconnected,
    Connected(Connection<N>),
}

/// Balance client preferring a node connection and falling back to a block explorer.
///
/// Not synchronized: wrap it in a mutex to share it between tasks. Connection
/// changes take `&mut self`, so they cannot overlap with queries on the same
/// instance.
pub struct ChainBalanceClient<C: NodeConnector, E> {
    connector: C,
    explorer: E,
    network: NetworkConfig,
    options: ClientOptions,
    /// Endpoint `reconnect` targets; only replaced by a successful `set_endpoint`
    endpoint: Endpoint,
    state: ConnectionState<C::Node>,
}

impl<C, E> ChainBalanceClient<C, E>
where
    C: NodeConnector,
    E: ExplorerApi,
{
    /// Create a client, optionally connecting to `endpoint` right away.
    ///
    /// Never fails: if the node cannot be used the client answers from the
    /// block explorer.
    pub async fn new(
        connector: C,
        explorer: E,
        network: NetworkConfig,
        endpoint: Endpoint,
        attempt_connect: bool,
    ) -> Self {
        Self::with_options(
            connector,
            explorer,
            network,
            endpoint,
            attempt_connect,
            ClientOptions::default(),
        )
        .await
    }

    /// Like [`ChainBalanceClient::new`], with explicit [`ClientOptions`].
    ///
    /// The connection attempt on construction verifies the network when
    /// `options.verify_network` is set.
    pub async fn with_options(
        connector: C,
        explorer: E,
        network: NetworkConfig,
        endpoint: Endpoint,
        attempt_connect: bool,
        options: ClientOptions,
    ) -> Self {
        let mut client = Self {
            connector,
            explorer,
            network,
            options,
            endpoint,
            state: ConnectionState::Disconnected,
        };

        if attempt_connect {
            let _ = client.reconnect().await;
        }

        client
    }

    /// Whether queries are currently answered by the node.
    pub const fn is_connected(&self) -> bool {
        matches!(self.state, ConnectionState::Connected(_))
    }

    /// The endpoint `reconnect` targets.
    pub const fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// The endpoint of the live connection, if any.
    pub const fn connected_endpoint(&self) -> Option<&Endpoint> {
        match &self.state {
            ConnectionState::Connected(connection) => Some(&connection.endpoint),
            ConnectionState::Disconnected => None,
        }
    }

    /// Network the node is verified against.
    pub const fn network(&self) -> &NetworkConfig {
        &self.network
    }

    /// Connect to `endpoint`, replacing any existing connection.
    ///
    /// When `verify_network` is set the node's genesis block must match the
    /// configured network. On failure the client is left disconnected and
    /// queries go to the block explorer.
    pub async fn attempt_connect(
        &mut self,
        endpoint: Endpoint,
        verify_network: bool,
    ) -> Result<ConnectStatus, ConnectionFailure> {
        let span = self.options.span.clone();
        self.connect(endpoint, verify_network).instrument(span).await
    }

    /// Connect to `endpoint` and make it the current endpoint if that succeeds.
    ///
    /// On failure the previous endpoint stays current, although its
    /// connection has been released.
    pub async fn set_endpoint(
        &mut self,
        endpoint: Endpoint,
    ) -> Result<ConnectStatus, ConnectionFailure> {
        let result = self
            .attempt_connect(endpoint.clone(), self.options.verify_network)
            .await;
        if result.is_ok() {
            self.endpoint = endpoint;
        }
        result
    }

    /// Connect to the current endpoint.
    pub async fn reconnect(&mut self) -> Result<ConnectStatus, ConnectionFailure> {
        self.attempt_connect(self.endpoint.clone(), self.options.verify_network)
            .await
    }

    /// Drop the node connection; queries go to the block explorer afterwards.
    pub fn disconnect(&mut self) {
        if let ConnectionState::Connected(connection) =
            mem::replace(&mut self.state, ConnectionState::Disconnected)
        {
            self.options.span.in_scope(|| {
                info!(endpoint = %connection.endpoint, "Disconnected from node");
            });
        }
    }

    /// Native balance of `account`.
    pub async fn get_balance(&self, account: Address) -> Result<BalanceAmount, BalanceError> {
        self.native_balance(account)
            .instrument(self.options.span.clone())
            .await
    }

    /// Native balances of `accounts`; zero balances are omitted.
    pub async fn get_multi_balance(&self, accounts: &[Address]) -> Result<BalanceMap, BalanceError> {
        self.native_balances(accounts)
            .instrument(self.options.span.clone())
            .await
    }

    /// Token balances of `accounts`; zero balances are omitted.
    ///
    /// A failure for any single account fails the whole call.
    pub async fn get_multi_token_balance(
        &self,
        token: &TokenDescriptor,
        accounts: &[Address],
    ) -> Result<BalanceMap, BalanceError> {
        self.token_balances(token, accounts)
            .instrument(self.options.span.clone())
            .await
    }

    /// Token balance of a single account.
    pub async fn get_token_balance(
        &self,
        token: &TokenDescriptor,
        account: Address,
    ) -> Result<BalanceAmount, BalanceError> {
        let balances = self.get_multi_token_balance(token, &[account]).await?;
        Ok(balances.get(&account))
    }

    /// Block `number` from the node; always `None` while disconnected.
    pub async fn get_block_by_number(
        &self,
        number: u64,
    ) -> Result<Option<BlockHeader>, BalanceError> {
        match &self.state {
            ConnectionState::Connected(connection) => {
                Ok(connection.node.block_by_number(number).await?)
            }
            ConnectionState::Disconnected => Ok(None),
        }
    }

    /// Run a balance query.
    pub async fn query(&self, query: &BalanceQuery) -> Result<BalanceMap, BalanceError> {
        match query {
            BalanceQuery::Native { accounts } => self.get_multi_balance(accounts).await,
            BalanceQuery::Token { token, accounts } => {
                self.get_multi_token_balance(token, accounts).await
            }
        }
    }

    async fn connect(
        &mut self,
        endpoint: Endpoint,
        verify_network: bool,
    ) -> Result<ConnectStatus, ConnectionFailure> {
        if let ConnectionState::Connected(connection) = &self.state {
            if connection.endpoint == endpoint {
                debug!(%endpoint, "Already connected");
                return Ok(ConnectStatus::AlreadyConnected);
            }
        }

        // Release the previous connection before opening a new one.
        if let ConnectionState::Connected(previous) =
            mem::replace(&mut self.state, ConnectionState::Disconnected)
        {
            debug!(endpoint = %previous.endpoint, "Releasing node connection");
        }

        let node = match self.connector.connect(&endpoint).await {
            Ok(node) => node,
            Err(e) => {
                warn!(%endpoint, "Could not connect to node, using block explorer only: {}", e);
                return Err(ConnectionFailure::unreachable(&endpoint));
            }
        };

        if !node.is_live().await {
            warn!(%endpoint, "Node is not answering, using block explorer only");
            return Err(ConnectionFailure::unreachable(&endpoint));
        }

        let tokens = self.load_token_registry().map_err(|e| {
            warn!(%endpoint, "Failed to load token interface: {}", e);
            ConnectionFailure::token_interface(&endpoint, e)
        })?;

        if verify_network {
            self.verify_network(&endpoint, &node).await?;
        }

        info!(%endpoint, "Connected to node");
        self.state = ConnectionState::Connected(Connection {
            endpoint,
            node,
            tokens,
        });

        Ok(ConnectStatus::Connected)
    }

    fn load_token_registry(&self) -> Result<TokenRegistry, InterfaceError> {
        match &self.options.token_abi_path {
            Some(path) => TokenRegistry::from_file(path),
            None => TokenRegistry::embedded(),
        }
    }

    /// Check that the node's genesis block is the configured network's.
    async fn verify_network(
        &self,
        endpoint: &Endpoint,
        node: &C::Node,
    ) -> Result<(), ConnectionFailure> {
        let expected = self.network.genesis_hash;

        let genesis = node.block_by_number(0).await.map_err(|e| {
            warn!(%endpoint, "Failed to fetch genesis block: {}", e);
            ConnectionFailure::unreachable(endpoint)
        })?;

        match genesis {
            Some(block) if block.hash == expected => Ok(()),
            other => {
                let actual = other.map(|block| block.hash);
                warn!(
                    %endpoint,
                    %expected,
                    actual = ?actual,
                    "Node is not on the expected network, using block explorer only"
                );
                Err(ConnectionFailure::wrong_network(endpoint, expected, actual))
            }
        }
    }

    async fn native_balance(&self, account: Address) -> Result<BalanceAmount, BalanceError> {
        let raw = match &self.state {
            ConnectionState::Connected(connection) => {
                debug!(%account, "Querying native balance from node");
                connection.node.native_balance(account).await?
            }
            ConnectionState::Disconnected => {
                debug!(%account, "Querying native balance from block explorer");
                let envelope = self.explorer.native_balance(account).await?;
                let raw: String = checked(envelope, || {
                    format!("native balance of {account}")
                })?
                .decode()?;
                parse_raw(&raw)?
            }
        };

        Ok(normalize(raw, self.network.native_decimals))
    }

    async fn native_balances(&self, accounts: &[Address]) -> Result<BalanceMap, BalanceError> {
        let decimals = self.network.native_decimals;
        let mut balances = BalanceMap::new();

        match &self.state {
            ConnectionState::Connected(connection) => {
                debug!(count = accounts.len(), "Querying native balances from node");
                for &account in accounts {
                    let raw = connection.node.native_balance(account).await?;
                    balances.insert_nonzero(account, normalize(raw, decimals));
                }
            }
            ConnectionState::Disconnected => {
                for batch in self.batches(accounts)? {
                    debug!(count = batch.len(), "Querying native balances from block explorer");
                    let envelope = self.explorer.native_balances(batch).await?;
                    let entries: Vec<AccountBalance> = checked(envelope, || {
                        format!("native balances of {} accounts", batch.len())
                    })?
                    .decode()?;

                    for entry in entries {
                        let amount = normalize(parse_raw(&entry.balance)?, decimals);
                        balances.insert_nonzero(entry.account, amount);
                    }
                }
            }
        }

        Ok(balances)
    }

    async fn token_balances(
        &self,
        token: &TokenDescriptor,
        accounts: &[Address],
    ) -> Result<BalanceMap, BalanceError> {
        let mut balances = BalanceMap::new();

        match &self.state {
            ConnectionState::Connected(connection) => {
                debug!(
                    token = %token.symbol,
                    count = accounts.len(),
                    "Querying token balances from node"
                );
                let contract = connection
                    .node
                    .token_contract(token.address, &connection.tokens);
                for &account in accounts {
                    let raw = contract.balance_of(account).await?;
                    balances.insert_nonzero(account, normalize(raw, token.decimals));
                }
            }
            ConnectionState::Disconnected => {
                for &account in accounts {
                    debug!(token = %token.symbol, %account, "Querying token balance from block explorer");
                    let envelope = self.explorer.token_balance(token.address, account).await?;
                    let raw: String = checked(envelope, || {
                        format!("{} token balance of {account}", token.symbol)
                    })?
                    .decode()?;
                    balances.insert_nonzero(account, normalize(parse_raw(&raw)?, token.decimals));
                }
            }
        }

        Ok(balances)
    }

    /// Split `accounts` into explorer sized batches.
    fn batches<'a>(&self, accounts: &'a [Address]) -> Result<Chunks<'a, Address>, BalanceError> {
        let limit = self.network.batch_limit.max(1);
        if accounts.len() > limit && self.options.oversized_batch == OversizedBatch::Reject {
            return Err(BalanceError::UnsupportedScale {
                requested: accounts.len(),
                limit,
            });
        }

        Ok(accounts.chunks(limit))
    }
}

/// Turn a failed explorer status into [`BalanceError::RemoteQuery`].
fn checked(
    envelope: ApiEnvelope,
    what: impl FnOnce() -> String,
) -> Result<ApiEnvelope, BalanceError> {
    if envelope.is_success() {
        return Ok(envelope);
    }

    let message = format!("block explorer failed to return {}: {}", what(), envelope.reason());
    warn!("{}", message);
    Err(BalanceError::RemoteQuery { message })
}
