//! Balance queries for blockchain accounts with node/explorer fallback.
//!
//! This crate provides [`ChainBalanceClient`], which answers native and token
//! balance queries from a connected node when one is available and verified,
//! and from a block explorer API otherwise. Callers see the same contract
//! regardless of which source answered.

pub mod amount;
pub mod chain;
pub mod error;

pub use chain::{ChainBalanceClient, ClientOptions, ConnectStatus, OversizedBatch};
pub use error::{BalanceError, ConnectionFailure, FailureKind};

use alloy_primitives::Address;
use bigdecimal::{BigDecimal, Zero};
use serde::{Deserialize, Serialize};
use std::collections::{hash_map, HashMap};

/// Balance in whole units of an asset, with arbitrary precision.
pub type BalanceAmount = BigDecimal;

/// A fungible token the caller wants balances for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenDescriptor {
    pub symbol: String,
    /// Token contract address
    pub address: Address,
    pub decimals: u8,
}

impl TokenDescriptor {
    pub fn new(symbol: impl Into<String>, address: Address, decimals: u8) -> Self {
        Self {
            symbol: symbol.into(),
            address,
            decimals,
        }
    }
}

/// Balances keyed by account.
///
/// Zero balances are never stored: an account that is absent has a zero
/// balance, and [`BalanceMap::get`] reads both cases the same way. Use
/// [`BalanceMap::contains`] only to ask whether a non-zero balance was seen.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BalanceMap(HashMap<Address, BalanceAmount>);

impl BalanceMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `amount` for `account` unless it is zero.
    ///
    /// Returns whether the amount was stored.
    pub fn insert_nonzero(&mut self, account: Address, amount: BalanceAmount) -> bool {
        if amount.is_zero() {
            return false;
        }
        self.0.insert(account, amount);
        true
    }

    /// Balance of `account`, zero when absent.
    pub fn get(&self, account: &Address) -> BalanceAmount {
        self.0.get(account).cloned().unwrap_or_else(BalanceAmount::zero)
    }

    pub fn contains(&self, account: &Address) -> bool {
        self.0.contains_key(account)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> hash_map::Iter<'_, Address, BalanceAmount> {
        self.0.iter()
    }

    /// Sum of all balances.
    pub fn total(&self) -> BalanceAmount {
        self.0.values().sum()
    }
}

impl FromIterator<(Address, BalanceAmount)> for BalanceMap {
    fn from_iter<I: IntoIterator<Item = (Address, BalanceAmount)>>(iter: I) -> Self {
        let mut balances = Self::new();
        for (account, amount) in iter {
            balances.insert_nonzero(account, amount);
        }
        balances
    }
}

impl IntoIterator for BalanceMap {
    type Item = (Address, BalanceAmount);
    type IntoIter = hash_map::IntoIter<Address, BalanceAmount>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a BalanceMap {
    type Item = (&'a Address, &'a BalanceAmount);
    type IntoIter = hash_map::Iter<'a, Address, BalanceAmount>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Type of balance query to perform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BalanceQuery {
    /// Native currency balances of a set of accounts
    Native {
        accounts: Vec<Address>,
    },
    /// Token balances of a set of accounts
    Token {
        token: TokenDescriptor,
        accounts: Vec<Address>,
    },
}
