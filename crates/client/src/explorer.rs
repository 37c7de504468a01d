//! Block explorer API collaborator.
//!
//! Every explorer response carries a `status` flag next to its payload. The
//! flag is surfaced unchanged in [`ApiEnvelope`]; deciding what a failed status
//! means is left to the caller.

use crate::ClientError;
use alloy_primitives::Address;
use serde::{de::DeserializeOwned, Deserialize, Deserializer};
use serde_json::Value;
use std::future::Future;

/// Stateless balance API of a block explorer.
pub trait ExplorerApi: Send + Sync {
    /// Native balance of a single account.
    fn native_balance(
        &self,
        account: Address,
    ) -> impl Future<Output = Result<ApiEnvelope, ClientError>> + Send;

    /// Native balances of several accounts in one request.
    ///
    /// The result payload is a list of [`AccountBalance`] entries.
    fn native_balances(
        &self,
        accounts: &[Address],
    ) -> impl Future<Output = Result<ApiEnvelope, ClientError>> + Send;

    /// Token balance of a single account for the token contract at `contract`.
    fn token_balance(
        &self,
        contract: Address,
        account: Address,
    ) -> impl Future<Output = Result<ApiEnvelope, ClientError>> + Send;
}

/// Explorer status flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Success,
    Failure,
}

impl<'de> Deserialize<'de> for Status {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        // Etherscan sends "1"/"0", some compatible explorers send numbers.
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(i64),
            Text(String),
        }

        let status = match Raw::deserialize(deserializer)? {
            Raw::Number(1) => Self::Success,
            Raw::Text(text) if text == "1" => Self::Success,
            _ => Self::Failure,
        };
        Ok(status)
    }
}

/// Raw explorer response.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiEnvelope {
    pub status: Status,
    #[serde(default)]
    pub message: String,
    /// Operation specific payload; an error description when `status` is a failure
    #[serde(default)]
    pub result: Value,
}

impl ApiEnvelope {
    /// Successful response carrying `result`.
    pub fn ok(result: impl Into<Value>) -> Self {
        Self {
            status: Status::Success,
            message: "OK".to_string(),
            result: result.into(),
        }
    }

    /// Failed response with an explorer message.
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            status: Status::Failure,
            message: "NOTOK".to_string(),
            result: Value::String(message.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == Status::Success
    }

    /// Human readable failure reason.
    pub fn reason(&self) -> String {
        match &self.result {
            Value::String(detail) if !detail.is_empty() => format!("{}: {}", self.message, detail),
            _ => self.message.clone(),
        }
    }

    /// Decode the payload.
    pub fn decode<T: DeserializeOwned>(self) -> Result<T, ClientError> {
        Ok(serde_json::from_value(self.result)?)
    }
}

/// One entry of a multi-account balance response.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AccountBalance {
    pub account: Address,
    /// Balance in the smallest unit, as a decimal string
    pub balance: String,
}
