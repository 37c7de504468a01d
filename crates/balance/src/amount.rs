//! Conversion of raw on-chain integers into human readable amounts.
//!
//! Raw amounts are exact integers in the asset's smallest unit. They are
//! scaled by `10^decimals` without going through floating point, so every
//! `U256` and every decimal count maps to an exact amount.

use crate::{BalanceAmount, BalanceError};
use alloy_primitives::U256;
use bigdecimal::num_bigint::{BigInt, Sign};

/// Scale `raw` down by `10^decimals`.
pub fn normalize(raw: U256, decimals: u8) -> BalanceAmount {
    let digits = BigInt::from_bytes_be(Sign::Plus, &raw.to_be_bytes::<32>());
    BalanceAmount::new(digits, i64::from(decimals)).normalized()
}

/// Parse a raw amount reported as a decimal string.
pub fn parse_raw(raw: &str) -> Result<U256, BalanceError> {
    U256::from_str_radix(raw.trim(), 10).map_err(|_| BalanceError::InvalidAmount(raw.to_string()))
}
