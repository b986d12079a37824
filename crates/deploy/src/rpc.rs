//! JSON-RPC access to an Ethereum node.

use std::future::Future;
use std::time::Duration;

use alloy_core::primitives::{Address, B256, Bytes, U64, U128};
use anyhow::Context;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use url::Url;

use crate::tx::SignedTransaction;

/// Default timeout for a single RPC request.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Create an HTTP client configured for JSON-RPC requests.
pub fn create_client() -> Result<reqwest::Client, anyhow::Error> {
    reqwest::Client::builder()
        .timeout(DEFAULT_TIMEOUT)
        .build()
        .context("Failed to create HTTP client")
}

/// Make a JSON-RPC call and deserialize the result.
pub async fn json_rpc_call<T: DeserializeOwned>(
    client: &reqwest::Client,
    url: &str,
    method: &str,
    params: Vec<Value>,
) -> Result<T, anyhow::Error> {
    let response = client
        .post(url)
        .json(&serde_json::json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": 1
        }))
        .send()
        .await
        .with_context(|| format!("Failed to send {} request", method))?;

    let result: Value = response
        .json()
        .await
        .with_context(|| format!("Failed to parse {} response", method))?;

    if let Some(error) = result.get("error") {
        anyhow::bail!(
            "RPC error: {}",
            error
                .get("message")
                .and_then(|m| m.as_str())
                .unwrap_or("unknown")
        );
    }

    let result_value = result
        .get("result")
        .context("No result in response")?
        .clone();

    serde_json::from_value(result_value)
        .with_context(|| format!("Failed to deserialize {} result", method))
}

/// Poll `check` every `interval` until it yields a value or `timeout` elapses.
///
/// Returns `Ok(None)` on timeout. An error from `check` ends polling immediately.
pub async fn poll_until<T, F, Fut>(
    timeout: Duration,
    interval: Duration,
    mut check: F,
) -> Result<Option<T>, anyhow::Error>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>, anyhow::Error>>,
{
    let start = tokio::time::Instant::now();

    loop {
        if let Some(value) = check().await? {
            return Ok(Some(value));
        }
        if start.elapsed() >= timeout {
            return Ok(None);
        }
        tracing::trace!(elapsed = ?start.elapsed(), "Still waiting...");
        tokio::time::sleep(interval).await;
    }
}

/// Parameters for `eth_estimateGas`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallRequest {
    pub from: Address,
    /// `None` for contract creation.
    pub to: Option<Address>,
    pub input: Bytes,
}

/// The parts of a transaction receipt the deployer looks at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionReceipt {
    pub transaction_hash: B256,
    pub success: bool,
    pub contract_address: Option<Address>,
    pub block_number: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcReceipt {
    transaction_hash: B256,
    status: Option<U64>,
    contract_address: Option<Address>,
    block_number: Option<U64>,
}

impl From<RpcReceipt> for TransactionReceipt {
    fn from(receipt: RpcReceipt) -> Self {
        Self {
            transaction_hash: receipt.transaction_hash,
            // Pre-byzantium receipts carry no status; treat them as successful.
            success: receipt.status.is_none_or(|s| s == U64::from(1)),
            contract_address: receipt.contract_address,
            block_number: receipt.block_number.map(|n| n.to::<u64>()),
        }
    }
}

/// The node operations a deployment needs.
pub trait Provider: Send + Sync {
    fn chain_id(&self) -> impl Future<Output = anyhow::Result<u64>> + Send;

    /// Pending transaction count of `address`, i.e. its next nonce.
    fn transaction_count(&self, address: Address)
    -> impl Future<Output = anyhow::Result<u64>> + Send;

    fn gas_price(&self) -> impl Future<Output = anyhow::Result<u128>> + Send;

    fn estimate_gas(&self, call: &CallRequest)
    -> impl Future<Output = anyhow::Result<u64>> + Send;

    /// Broadcast a signed transaction, returning its hash.
    fn send_transaction(
        &self,
        tx: &SignedTransaction,
    ) -> impl Future<Output = anyhow::Result<B256>> + Send;

    /// The receipt of a mined transaction, `None` while pending.
    fn transaction_receipt(
        &self,
        hash: B256,
    ) -> impl Future<Output = anyhow::Result<Option<TransactionReceipt>>> + Send;
}

/// [`Provider`] over HTTP JSON-RPC.
#[derive(Debug, Clone)]
pub struct HttpProvider {
    client: reqwest::Client,
    url: Url,
}

impl HttpProvider {
    pub fn new(url: Url) -> anyhow::Result<Self> {
        Ok(Self {
            client: create_client()?,
            url,
        })
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, params: Vec<Value>) -> anyhow::Result<T> {
        json_rpc_call(&self.client, self.url.as_str(), method, params).await
    }
}

impl Provider for HttpProvider {
    async fn chain_id(&self) -> anyhow::Result<u64> {
        let id: U64 = self.call("eth_chainId", vec![]).await?;
        Ok(id.to())
    }

    async fn transaction_count(&self, address: Address) -> anyhow::Result<u64> {
        let count: U64 = self
            .call(
                "eth_getTransactionCount",
                vec![serde_json::json!(address), serde_json::json!("pending")],
            )
            .await?;
        Ok(count.to())
    }

    async fn gas_price(&self) -> anyhow::Result<u128> {
        let price: U128 = self.call("eth_gasPrice", vec![]).await?;
        Ok(price.to())
    }

    async fn estimate_gas(&self, call: &CallRequest) -> anyhow::Result<u64> {
        let mut params = serde_json::json!({
            "from": call.from,
            "data": call.input,
        });
        if let Some(to) = call.to {
            params["to"] = serde_json::json!(to);
        }
        let gas: U64 = self.call("eth_estimateGas", vec![params]).await?;
        Ok(gas.to())
    }

    async fn send_transaction(&self, tx: &SignedTransaction) -> anyhow::Result<B256> {
        self.call("eth_sendRawTransaction", vec![serde_json::json!(tx.raw)])
            .await
    }

    async fn transaction_receipt(&self, hash: B256) -> anyhow::Result<Option<TransactionReceipt>> {
        let receipt: Option<RpcReceipt> = self
            .call("eth_getTransactionReceipt", vec![serde_json::json!(hash)])
            .await?;
        Ok(receipt.map(Into::into))
    }
}
