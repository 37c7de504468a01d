//! ERC20 token interface resource.

use alloy_contract::Interface;
use alloy_json_abi::JsonAbi;
use std::path::Path;
use thiserror::Error;

/// Standard ERC20 token interface, shipped with the crate.
pub const ERC20_ABI: &str = include_str!("../abi/erc20.json");

/// Name of the balance accessor every token interface must expose.
pub const BALANCE_OF: &str = "balanceOf";

#[derive(Error, Debug)]
pub enum InterfaceError {
    /// The interface file could not be read
    #[error("Failed to read token interface: {0}")]
    Io(#[from] std::io::Error),

    /// The interface is not a valid JSON ABI
    #[error("Invalid token interface: {0}")]
    Parse(#[from] serde_json::Error),

    /// The interface does not expose `balanceOf`
    #[error("Token interface has no `{0}` function")]
    MissingFunction(&'static str),
}

/// Parsed token interface used to build contract handles on a node connection.
///
/// Loaded once per successful connection and handed to the node transport
/// as-is; the client never inspects it beyond checking that the balance
/// accessor exists.
#[derive(Debug, Clone)]
pub struct TokenRegistry {
    interface: Interface,
}

impl TokenRegistry {
    /// Load the embedded ERC20 interface.
    pub fn embedded() -> Result<Self, InterfaceError> {
        Self::from_json(ERC20_ABI)
    }

    /// Load an interface definition from a JSON ABI file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, InterfaceError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    /// Parse an interface definition from a JSON ABI string.
    pub fn from_json(json: &str) -> Result<Self, InterfaceError> {
        let abi: JsonAbi = serde_json::from_str(json)?;
        if abi.function(BALANCE_OF).is_none() {
            return Err(InterfaceError::MissingFunction(BALANCE_OF));
        }

        Ok(Self {
            interface: Interface::new(abi),
        })
    }

    /// The underlying contract interface.
    pub const fn interface(&self) -> &Interface {
        &self.interface
    }
}
