//! In-memory node and explorer collaborators shared across integration tests.
#![allow(dead_code)] // not every test file uses every helper

use alloy_primitives::{Address, B256, U256};
use balance::ChainBalanceClient;
use binding::TokenRegistry;
use client::{
    ApiEnvelope, BlockHeader, ClientError, Endpoint, ExplorerApi, NodeConnector, NodeTransport,
    TokenContract,
};
use config::NetworkConfig;
use serde_json::json;
use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
};

/// Call counters shared between a test and its collaborators.
#[derive(Debug, Default)]
pub struct Calls {
    pub connects: AtomicUsize,
    pub liveness_checks: AtomicUsize,
    pub genesis_lookups: AtomicUsize,
    pub node_native: AtomicUsize,
    pub node_token: AtomicUsize,
    pub api_native: AtomicUsize,
    pub api_multi: AtomicUsize,
    pub api_token: AtomicUsize,
    /// Account count of every multi-balance request
    pub api_batches: Mutex<Vec<usize>>,
    pub open_nodes: AtomicUsize,
    pub max_open_nodes: AtomicUsize,
}

impl Calls {
    pub fn get(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }

    pub fn batches(&self) -> Vec<usize> {
        self.api_batches.lock().unwrap().clone()
    }
}

/// Behaviour of one node reachable through the mock connector.
#[derive(Debug, Clone)]
pub struct NodeScript {
    pub live: bool,
    pub genesis: B256,
    pub native: HashMap<Address, U256>,
    /// Raw balances keyed by (token, account)
    pub tokens: HashMap<(Address, Address), U256>,
}

impl NodeScript {
    /// A live node on the given network with no balances.
    pub fn on(network: &NetworkConfig) -> Self {
        Self {
            live: true,
            genesis: network.genesis_hash,
            native: HashMap::new(),
            tokens: HashMap::new(),
        }
    }

    pub fn with_native(mut self, account: Address, raw: U256) -> Self {
        self.native.insert(account, raw);
        self
    }

    pub fn with_token(mut self, token: Address, account: Address, raw: U256) -> Self {
        self.tokens.insert((token, account), raw);
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct MockConnector {
    nodes: HashMap<Endpoint, NodeScript>,
    calls: Arc<Calls>,
}

impl MockConnector {
    pub fn new(calls: Arc<Calls>) -> Self {
        Self {
            nodes: HashMap::new(),
            calls,
        }
    }

    pub fn with_node(mut self, endpoint: Endpoint, script: NodeScript) -> Self {
        self.nodes.insert(endpoint, script);
        self
    }
}

impl NodeConnector for MockConnector {
    type Node = MockNode;

    async fn connect(&self, endpoint: &Endpoint) -> Result<Self::Node, ClientError> {
        self.calls.connects.fetch_add(1, Ordering::SeqCst);

        let Some(script) = self.nodes.get(endpoint) else {
            return Err(ClientError::Connection(format!("connection refused: {endpoint}")));
        };

        let open = self.calls.open_nodes.fetch_add(1, Ordering::SeqCst) + 1;
        self.calls.max_open_nodes.fetch_max(open, Ordering::SeqCst);

        Ok(MockNode {
            script: script.clone(),
            calls: self.calls.clone(),
        })
    }
}

#[derive(Debug)]
pub struct MockNode {
    script: NodeScript,
    calls: Arc<Calls>,
}

impl Drop for MockNode {
    fn drop(&mut self) {
        self.calls.open_nodes.fetch_sub(1, Ordering::SeqCst);
    }
}

impl NodeTransport for MockNode {
    type Contract = MockToken;

    async fn is_live(&self) -> bool {
        self.calls.liveness_checks.fetch_add(1, Ordering::SeqCst);
        self.script.live
    }

    async fn block_by_number(&self, number: u64) -> Result<Option<BlockHeader>, ClientError> {
        if number == 0 {
            self.calls.genesis_lookups.fetch_add(1, Ordering::SeqCst);
            return Ok(Some(BlockHeader {
                number: 0,
                hash: self.script.genesis,
                parent_hash: B256::ZERO,
                timestamp: 0,
            }));
        }

        Ok(Some(BlockHeader {
            number,
            hash: B256::with_last_byte(number as u8),
            parent_hash: B256::with_last_byte(number.saturating_sub(1) as u8),
            timestamp: 1_438_269_973 + number * 12,
        }))
    }

    async fn native_balance(&self, account: Address) -> Result<U256, ClientError> {
        self.calls.node_native.fetch_add(1, Ordering::SeqCst);
        Ok(self.script.native.get(&account).copied().unwrap_or_default())
    }

    fn token_contract(&self, address: Address, _registry: &TokenRegistry) -> Self::Contract {
        MockToken {
            address,
            balances: self.script.tokens.clone(),
            calls: self.calls.clone(),
        }
    }
}

#[derive(Debug)]
pub struct MockToken {
    address: Address,
    balances: HashMap<(Address, Address), U256>,
    calls: Arc<Calls>,
}

impl TokenContract for MockToken {
    async fn balance_of(&self, account: Address) -> Result<U256, ClientError> {
        self.calls.node_token.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .balances
            .get(&(self.address, account))
            .copied()
            .unwrap_or_default())
    }
}

/// Explorer answering from fixed raw balances.
#[derive(Debug, Clone, Default)]
pub struct MockExplorer {
    native: HashMap<Address, String>,
    tokens: HashMap<(Address, Address), String>,
    /// Token balance lookups for these accounts report a failed status
    failing_accounts: Vec<Address>,
    failing: bool,
    calls: Arc<Calls>,
}

impl MockExplorer {
    pub fn new(calls: Arc<Calls>) -> Self {
        Self {
            calls,
            ..Default::default()
        }
    }

    pub fn with_native(mut self, account: Address, raw: &str) -> Self {
        self.native.insert(account, raw.to_string());
        self
    }

    pub fn with_token(mut self, token: Address, account: Address, raw: &str) -> Self {
        self.tokens.insert((token, account), raw.to_string());
        self
    }

    /// Every request reports `status: 0`.
    pub fn failing(mut self) -> Self {
        self.failing = true;
        self
    }

    pub fn failing_for(mut self, account: Address) -> Self {
        self.failing_accounts.push(account);
        self
    }

    fn raw_native(&self, account: &Address) -> String {
        self.native
            .get(account)
            .cloned()
            .unwrap_or_else(|| "0".to_string())
    }
}

impl ExplorerApi for MockExplorer {
    async fn native_balance(&self, account: Address) -> Result<ApiEnvelope, ClientError> {
        self.calls.api_native.fetch_add(1, Ordering::SeqCst);
        if self.failing {
            return Ok(ApiEnvelope::failed("Max rate limit reached"));
        }
        Ok(ApiEnvelope::ok(self.raw_native(&account)))
    }

    async fn native_balances(&self, accounts: &[Address]) -> Result<ApiEnvelope, ClientError> {
        self.calls.api_multi.fetch_add(1, Ordering::SeqCst);
        self.calls.api_batches.lock().unwrap().push(accounts.len());
        if self.failing {
            return Ok(ApiEnvelope::failed("Max rate limit reached"));
        }

        let entries: Vec<_> = accounts
            .iter()
            .map(|account| json!({ "account": account, "balance": self.raw_native(account) }))
            .collect();
        Ok(ApiEnvelope::ok(entries))
    }

    async fn token_balance(
        &self,
        contract: Address,
        account: Address,
    ) -> Result<ApiEnvelope, ClientError> {
        self.calls.api_token.fetch_add(1, Ordering::SeqCst);
        if self.failing || self.failing_accounts.contains(&account) {
            return Ok(ApiEnvelope::failed("Invalid address format"));
        }

        let raw = self
            .tokens
            .get(&(contract, account))
            .cloned()
            .unwrap_or_else(|| "0".to_string());
        Ok(ApiEnvelope::ok(raw))
    }
}

pub type TestClient = ChainBalanceClient<MockConnector, MockExplorer>;

pub fn local_node() -> Endpoint {
    Endpoint::localhost(8545).unwrap()
}

pub fn other_node() -> Endpoint {
    Endpoint::localhost(8546).unwrap()
}

/// An account with a recognisable address derived from `n`.
pub fn account(n: u8) -> Address {
    Address::repeat_byte(n)
}
