//! Registry binding over an HTTP chain gateway.
//!
//! Endpoints, relative to `{endpoint}/contracts/{address}`:
//!
//! - `POST /tx` with a [`Transaction`] body returns `{"tx_hash": ...}`, or a
//!   revert body if the call fails simulation
//! - `GET /tx/{hash}` returns the [`TxStatus`]
//! - `GET /records/{identity}`, `/records/{identity}/count`,
//!   `/records/{identity}/submissions?offset=&limit=`
//! - `GET /owners/{address}/records`
//! - `GET /aliases/{alias}`
//!
//! Writes are never reported as durable until the receipt has the
//! configured number of confirmations.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tether_core::{Address, Identity};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::contract::validate_alias;
use crate::error::{ContractError, RegistryError, Result};
use crate::registry::Registry;
use crate::types::{RegistryRecord, SubmissionRecord, Transaction, TxReceipt};

/// Configuration for [`RpcRegistry`].
#[derive(Debug, Clone)]
pub struct RpcRegistryConfig {
    /// Gateway base URL.
    pub endpoint: String,
    /// Deployed contract address.
    pub contract_address: String,
    pub timeout: Duration,
    /// Blocks on top of the inclusion block before a write counts as durable.
    pub confirmations: u64,
    pub poll_interval: Duration,
    /// Give up waiting for confirmations after this long.
    pub confirmation_timeout: Duration,
    /// Attempts per read, including the first.
    pub max_attempts: u32,
    pub backoff_base: Duration,
}

impl Default for RpcRegistryConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:8545".to_string(),
            contract_address: String::new(),
            timeout: Duration::from_secs(30),
            confirmations: 1,
            poll_interval: Duration::from_secs(2),
            confirmation_timeout: Duration::from_secs(120),
            max_attempts: 3,
            backoff_base: Duration::from_millis(250),
        }
    }
}

/// Response to a transaction submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitResponse {
    pub tx_hash: String,
}

/// Lifecycle state of a submitted transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TxState {
    Pending,
    Mined,
    Reverted,
}

/// Response to a transaction status query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TxStatus {
    pub state: TxState,
    #[serde(default)]
    pub confirmations: u64,
    #[serde(default)]
    pub receipt: Option<TxReceipt>,
    #[serde(default)]
    pub revert: Option<ContractError>,
}

/// Body of a gateway error response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayError {
    #[serde(default)]
    pub revert: Option<ContractError>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AliasResponse {
    identity: Identity,
}

#[derive(Debug, Deserialize)]
struct CountResponse {
    count: u64,
}

/// Registry reached through an HTTP gateway.
#[derive(Debug, Clone)]
pub struct RpcRegistry {
    client: Client,
    config: RpcRegistryConfig,
}

impl RpcRegistry {
    pub fn new(config: RpcRegistryConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| RegistryError::Network(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &RpcRegistryConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/contracts/{}/{}",
            self.config.endpoint.trim_end_matches('/'),
            self.config.contract_address,
            path
        )
    }

    /// GET with retries. `Ok(None)` on 404.
    async fn get_json<T>(&self, path: &str) -> Result<Option<T>>
    where
        T: DeserializeOwned,
    {
        let url = self.url(path);
        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            let error = match self.client.get(&url).send().await {
                Ok(response) if response.status() == StatusCode::NOT_FOUND => return Ok(None),
                Ok(response) => match Self::map_response(response).await {
                    Ok(value) => return Ok(Some(value)),
                    Err(e) => e,
                },
                Err(e) => RegistryError::from(e),
            };

            if !error.is_retryable() || attempt >= max_attempts {
                return Err(error);
            }

            let delay = self.config.backoff_base * 2u32.saturating_pow(attempt - 1);
            warn!(
                url = %url,
                attempt,
                error = %error,
                delay_ms = delay.as_millis() as u64,
                "registry read failed, retrying"
            );
            tokio::time::sleep(delay).await;
        }
    }

    async fn map_response<T>(response: Response) -> Result<T>
    where
        T: DeserializeOwned,
    {
        if !response.status().is_success() {
            return Err(Self::map_api_error(response).await);
        }
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn map_api_error(response: Response) -> RegistryError {
        let status = response.status().as_u16();
        let bytes = response.bytes().await.unwrap_or_default();
        if let Ok(body) = serde_json::from_slice::<GatewayError>(&bytes) {
            if let Some(revert) = body.revert {
                return RegistryError::Reverted(revert);
            }
            if let Some(message) = body.message {
                return RegistryError::Http { status, message };
            }
        }
        RegistryError::Http {
            status,
            message: String::from_utf8_lossy(&bytes).to_string(),
        }
    }

    /// Poll until `tx_hash` reaches the configured confirmations.
    async fn wait_for_receipt(&self, tx_hash: &str) -> Result<TxReceipt> {
        let started = Instant::now();
        let deadline = started + self.config.confirmation_timeout;
        let path = format!("tx/{}", tx_hash);

        loop {
            let status = match self.get_json::<TxStatus>(&path).await {
                Ok(status) => status,
                Err(e) if e.is_retryable() => {
                    debug!(tx_hash, error = %e, "receipt poll failed");
                    None
                }
                Err(e) => return Err(e),
            };

            if let Some(status) = status {
                match status.state {
                    TxState::Reverted => {
                        return Err(match status.revert {
                            Some(revert) => RegistryError::Reverted(revert),
                            None => RegistryError::Http {
                                status: 200,
                                message: format!("transaction {} reverted", tx_hash),
                            },
                        });
                    }
                    TxState::Mined if status.confirmations >= self.config.confirmations => {
                        if let Some(receipt) = status.receipt {
                            return Ok(receipt);
                        }
                    }
                    _ => {}
                }
            }

            if Instant::now() >= deadline {
                return Err(RegistryError::ConfirmationTimeout {
                    tx_hash: tx_hash.to_string(),
                    waited_ms: started.elapsed().as_millis() as u64,
                });
            }
            tokio::time::sleep(self.config.poll_interval).await;
        }
    }
}

#[async_trait]
impl Registry for RpcRegistry {
    async fn submit(&self, tx: Transaction) -> Result<TxReceipt> {
        // Not retried: a lost response may still have been accepted.
        let response = self.client.post(self.url("tx")).json(&tx).send().await?;
        let submitted: SubmitResponse = Self::map_response(response).await?;
        debug!(
            call = tx.call.name(),
            tx_hash = %submitted.tx_hash,
            "registry transaction sent"
        );

        let receipt = self.wait_for_receipt(&submitted.tx_hash).await?;
        info!(
            call = tx.call.name(),
            identity = %tx.call.identity(),
            block = receipt.block_number,
            "registry transaction confirmed"
        );
        Ok(receipt)
    }

    async fn get_record(&self, identity: &Identity) -> Result<Option<RegistryRecord>> {
        self.get_json(&format!("records/{}", identity.to_hex()))
            .await
    }

    async fn resolve_alias(&self, alias_or_identity: &str) -> Result<Identity> {
        if let Ok(identity) = Identity::from_hex(alias_or_identity) {
            if self.get_record(&identity).await?.is_some() {
                return Ok(identity);
            }
        }
        let unknown = || -> RegistryError {
            ContractError::UnknownAlias {
                alias: alias_or_identity.to_string(),
            }
            .into()
        };
        // Anything that fails alias syntax can never be registered, and must
        // not reach the URL path.
        if validate_alias(alias_or_identity).is_err() {
            return Err(unknown());
        }
        self.get_json::<AliasResponse>(&format!("aliases/{}", alias_or_identity))
            .await?
            .map(|r| r.identity)
            .ok_or_else(unknown)
    }

    async fn get_record_count(&self, identity: &Identity) -> Result<u64> {
        self.get_json::<CountResponse>(&format!("records/{}/count", identity.to_hex()))
            .await?
            .map(|r| r.count)
            .ok_or_else(|| ContractError::UnknownIdentity { identity: *identity }.into())
    }

    async fn list_owned(&self, owner: &Address) -> Result<Vec<RegistryRecord>> {
        Ok(self
            .get_json(&format!("owners/{}/records", owner.to_hex()))
            .await?
            .unwrap_or_default())
    }

    async fn get_submissions(
        &self,
        identity: &Identity,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<SubmissionRecord>> {
        self.get_json(&format!(
            "records/{}/submissions?offset={}&limit={}",
            identity.to_hex(),
            offset,
            limit
        ))
        .await?
        .ok_or_else(|| ContractError::UnknownIdentity { identity: *identity }.into())
    }
}
