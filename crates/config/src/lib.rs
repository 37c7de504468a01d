//! Configuration types for the balance client.
//!
//! This crate provides:
//! - Network configurations (mainnet, testnet)
//! - The genesis hash each network is verified against
//! - Block explorer endpoints and limits

pub mod network;

pub use network::{NetworkConfig, NetworkConfigBuilder, NetworkType};
