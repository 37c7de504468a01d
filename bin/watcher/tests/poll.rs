//! Polling cycle tests against an in-memory block explorer and no node.

use alloy_primitives::{address, Address, U256};
use balance::{BalanceAmount, BalanceQuery, ChainBalanceClient, TokenDescriptor};
use binding::TokenRegistry;
use client::{
    ApiEnvelope, BlockHeader, ClientError, Endpoint, ExplorerApi, NodeConnector, NodeTransport,
    TokenContract,
};
use config::NetworkConfig;
use serde_json::json;
use std::{
    str::FromStr,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};
use watcher::{metrics::Metrics, poll_balances, NATIVE_ASSET};

const HOLDER: Address = address!("de0B295669a9FD93d5F28D9Ec85E40f4cb697BAe");
const USDC: Address = address!("a0b86991c6218b36c1d19d4a2e9eb0ce3606eb48");

/// Connector for a machine without a node; counts connection attempts.
struct NoNode {
    attempts: Arc<AtomicUsize>,
}

struct Unreachable;

impl NodeConnector for NoNode {
    type Node = Unreachable;

    async fn connect(&self, endpoint: &Endpoint) -> Result<Self::Node, ClientError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(ClientError::Connection(format!("connection refused: {endpoint}")))
    }
}

impl NodeTransport for Unreachable {
    type Contract = Self;

    async fn is_live(&self) -> bool {
        false
    }

    async fn block_by_number(&self, _number: u64) -> Result<Option<BlockHeader>, ClientError> {
        unreachable!("no node is ever opened")
    }

    async fn native_balance(&self, _account: Address) -> Result<U256, ClientError> {
        unreachable!("no node is ever opened")
    }

    fn token_contract(&self, _address: Address, _registry: &TokenRegistry) -> Self::Contract {
        Self
    }
}

impl TokenContract for Unreachable {
    async fn balance_of(&self, _account: Address) -> Result<U256, ClientError> {
        unreachable!("no node is ever opened")
    }
}

/// Explorer holding 3 ETH for `HOLDER` and failing token lookups when asked to.
struct Explorer {
    fail_tokens: bool,
}

impl ExplorerApi for Explorer {
    async fn native_balance(&self, _account: Address) -> Result<ApiEnvelope, ClientError> {
        Ok(ApiEnvelope::ok("3000000000000000000"))
    }

    async fn native_balances(&self, accounts: &[Address]) -> Result<ApiEnvelope, ClientError> {
        let entries: Vec<_> = accounts
            .iter()
            .map(|account| {
                let balance = if *account == HOLDER { "3000000000000000000" } else { "0" };
                json!({ "account": account, "balance": balance })
            })
            .collect();
        Ok(ApiEnvelope::ok(entries))
    }

    async fn token_balance(
        &self,
        _contract: Address,
        account: Address,
    ) -> Result<ApiEnvelope, ClientError> {
        if self.fail_tokens {
            return Ok(ApiEnvelope::failed("Max rate limit reached"));
        }
        let raw = if account == HOLDER { "1234567" } else { "0" };
        Ok(ApiEnvelope::ok(raw))
    }
}

fn queries() -> Vec<BalanceQuery> {
    let accounts = vec![HOLDER, Address::repeat_byte(7)];
    vec![
        BalanceQuery::Native {
            accounts: accounts.clone(),
        },
        BalanceQuery::Token {
            token: TokenDescriptor::new("USDC", USDC, 6),
            accounts,
        },
    ]
}

fn dec(value: &str) -> BalanceAmount {
    BalanceAmount::from_str(value).unwrap()
}

async fn client(
    fail_tokens: bool,
    connect_on_start: bool,
) -> (ChainBalanceClient<NoNode, Explorer>, Arc<AtomicUsize>) {
    let attempts = Arc::new(AtomicUsize::new(0));
    let client = ChainBalanceClient::new(
        NoNode {
            attempts: attempts.clone(),
        },
        Explorer { fail_tokens },
        NetworkConfig::mainnet(),
        Endpoint::localhost(8545).unwrap(),
        connect_on_start,
    )
    .await;
    (client, attempts)
}

#[tokio::test]
async fn test_poll_falls_back_to_explorer() {
    let (mut client, _) = client(false, false).await;

    let report = poll_balances(&mut client, &queries(), &Metrics::new(), true).await;

    assert!(report.is_success());
    assert!(!report.from_node);
    assert_eq!(report.balances.len(), 2);

    let (asset, native) = &report.balances[0];
    assert_eq!(asset, NATIVE_ASSET);
    assert_eq!(native.get(&HOLDER), dec("3"));
    assert!(!native.contains(&Address::repeat_byte(7)));

    let (asset, usdc) = &report.balances[1];
    assert_eq!(asset, "USDC");
    assert_eq!(usdc.get(&HOLDER), dec("1.234567"));
}

#[tokio::test]
async fn test_poll_counts_failed_queries() {
    let (mut client, _) = client(true, false).await;

    let report = poll_balances(&mut client, &queries(), &Metrics::new(), true).await;

    assert!(!report.is_success());
    assert_eq!(report.failures, 1);
    assert_eq!(report.balances.len(), 1);
}

#[tokio::test]
async fn test_first_cycle_leaves_node_alone_without_connect_on_start() {
    let (mut client, attempts) = client(false, false).await;
    assert_eq!(attempts.load(Ordering::SeqCst), 0);

    let report = poll_balances(&mut client, &queries(), &Metrics::new(), false).await;

    assert!(report.is_success());
    assert!(!report.from_node);
    assert_eq!(attempts.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_reconnect_attempted_once_per_cycle() {
    let (mut client, attempts) = client(false, true).await;
    assert_eq!(attempts.load(Ordering::SeqCst), 1);

    poll_balances(&mut client, &queries(), &Metrics::new(), true).await;
    assert_eq!(attempts.load(Ordering::SeqCst), 2);

    poll_balances(&mut client, &queries(), &Metrics::new(), false).await;
    assert_eq!(attempts.load(Ordering::SeqCst), 2);
}
