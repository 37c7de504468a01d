use alloy_primitives::B256;
use client::{ClientError, Endpoint};
use thiserror::Error;

/// Failure of a balance query.
#[derive(Error, Debug)]
pub enum BalanceError {
    /// The block explorer reported a failed status
    #[error("Remote query failed: {message}")]
    RemoteQuery { message: String },

    /// More accounts than the explorer accepts in one request
    #[error("Batch of {requested} accounts exceeds the explorer limit of {limit}")]
    UnsupportedScale { requested: usize, limit: usize },

    /// A raw amount could not be parsed
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// Transport level failure of the node or explorer
    #[error(transparent)]
    Client(#[from] ClientError),
}

/// Why a connection attempt left the client disconnected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The node could not be reached
    Unreachable,
    /// The token interface could not be loaded
    TokenInterface,
    /// The node serves a different network
    WrongNetwork {
        expected: B256,
        actual: Option<B256>,
    },
}

/// A failed connection attempt.
///
/// Returned as a value, never raised from balance queries: the client keeps
/// working against the block explorer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ConnectionFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl ConnectionFailure {
    pub fn unreachable(endpoint: &Endpoint) -> Self {
        Self {
            kind: FailureKind::Unreachable,
            message: format!("failed to connect at {endpoint}"),
        }
    }

    pub fn token_interface(endpoint: &Endpoint, reason: impl std::fmt::Display) -> Self {
        Self {
            kind: FailureKind::TokenInterface,
            message: format!("connected to {endpoint} but token interface is unavailable: {reason}"),
        }
    }

    pub fn wrong_network(endpoint: &Endpoint, expected: B256, actual: Option<B256>) -> Self {
        Self {
            kind: FailureKind::WrongNetwork { expected, actual },
            message: format!("connected to {endpoint} but wrong network"),
        }
    }
}
