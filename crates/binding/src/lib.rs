//! Contract interface definitions used by the balance client.
//!
//! The token interface is kept as a JSON ABI resource rather than generated
//! bindings so that it can be swapped for a file on disk at runtime:
//! - ERC20 tokens (`balanceOf` is the only call the client relies on)

pub mod token;

pub use token::{InterfaceError, TokenRegistry, BALANCE_OF, ERC20_ABI};
