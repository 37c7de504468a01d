//! Etherscan-compatible block explorer client.
//!
//! Only the `account` module is used:
//! - `balance` for a single account
//! - `balancemulti` for a comma separated list of accounts
//! - `tokenbalance` for a token contract and a single account

use crate::{ApiEnvelope, ClientError, ExplorerApi};
use alloy_primitives::Address;
use tracing::debug;

/// Block explorer client speaking the Etherscan API.
#[derive(Debug, Clone)]
pub struct Etherscan {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl Etherscan {
    /// Creates a new explorer client.
    ///
    /// # Arguments
    /// * `base_url` - The API url (e.g., "https://api.etherscan.io/api")
    /// * `api_key` - Optional API key; anonymous requests are heavily rate limited
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url, api_key)
    }

    /// Creates a new explorer client with a custom HTTP client.
    pub fn with_client(
        client: reqwest::Client,
        base_url: impl Into<String>,
        api_key: Option<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            api_key,
        }
    }

    /// Returns the API url.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn account_query(
        &self,
        action: &str,
        params: &[(&str, String)],
    ) -> Result<ApiEnvelope, ClientError> {
        debug!(action, "Querying block explorer");

        let mut request = self
            .client
            .get(&self.base_url)
            .query(&[("module", "account"), ("action", action)])
            .query(params);
        if let Some(api_key) = &self.api_key {
            request = request.query(&[("apikey", api_key)]);
        }

        let response = request.send().await?.error_for_status()?;
        let envelope: ApiEnvelope = response.json().await?;

        Ok(envelope)
    }
}

impl ExplorerApi for Etherscan {
    async fn native_balance(&self, account: Address) -> Result<ApiEnvelope, ClientError> {
        self.account_query(
            "balance",
            &[("address", account.to_string()), ("tag", "latest".to_string())],
        )
        .await
    }

    async fn native_balances(&self, accounts: &[Address]) -> Result<ApiEnvelope, ClientError> {
        let addresses = accounts
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",");

        self.account_query(
            "balancemulti",
            &[("address", addresses), ("tag", "latest".to_string())],
        )
        .await
    }

    async fn token_balance(
        &self,
        contract: Address,
        account: Address,
    ) -> Result<ApiEnvelope, ClientError> {
        self.account_query(
            "tokenbalance",
            &[
                ("contractaddress", contract.to_string()),
                ("address", account.to_string()),
                ("tag", "latest".to_string()),
            ],
        )
        .await
    }
}
