//! Chain-data source for external transfer history.
//!
//! The concrete implementation talks to Alchemy's `alchemy_getAssetTransfers`
//! JSON-RPC method; the trait exists so the probe and scheduler can be driven
//! by a scripted source in tests.

use crate::config::ValidatorConfig;
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::DateTime;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, instrument};

/// One external transfer as reported by the chain-data service.
#[derive(Debug, Clone, PartialEq)]
pub struct Transfer {
    /// Transaction hash
    pub hash: String,
    /// Sending address
    pub from: String,
    /// Receiving address; absent for contract creations
    pub to: Option<String>,
    /// Transferred value in the chain's native unit
    pub value: Option<f64>,
    /// Block number
    pub block: u64,
    /// Unix timestamp (seconds) of the containing block
    pub timestamp: i64,
}

/// One page of a chronologically ascending transfer history.
#[derive(Debug, Clone, Default)]
pub struct TransferPage {
    pub transfers: Vec<Transfer>,
    /// Continuation key; `None` means the history is exhausted
    pub page_key: Option<String>,
}

/// A service that can list external transfers into an address, oldest first.
#[async_trait]
pub trait TransferSource: Send + Sync {
    /// Fetch one page of incoming external transfers for `address`.
    ///
    /// Pages are ascending by block; pass the previous page's key to
    /// continue. Errors are treated as transient by the caller.
    async fn incoming_transfers(
        &self,
        address: &str,
        page_key: Option<&str>,
    ) -> Result<TransferPage>;
}

/// Transfers per page requested from the service.
const PAGE_SIZE: &str = "0x19";

/// Alchemy asset-transfers client.
pub struct AlchemyTransfers {
    http_client: Client,
    endpoint: String,
}

impl AlchemyTransfers {
    /// Build a client for the configured network.
    pub fn new(config: &ValidatorConfig) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            http_client,
            endpoint: config.endpoint_url(),
        })
    }
}

#[async_trait]
impl TransferSource for AlchemyTransfers {
    #[instrument(skip(self, page_key), fields(address = %address))]
    async fn incoming_transfers(
        &self,
        address: &str,
        page_key: Option<&str>,
    ) -> Result<TransferPage> {
        let mut params = json!({
            "toAddress": address,
            "category": ["external"],
            "order": "asc",
            "maxCount": PAGE_SIZE,
            "withMetadata": true,
        });
        if let Some(key) = page_key {
            params["pageKey"] = json!(key);
        }

        let payload = json!({
            "id": 1,
            "jsonrpc": "2.0",
            "method": "alchemy_getAssetTransfers",
            "params": [params],
        });

        let response = self
            .http_client
            .post(&self.endpoint)
            .json(&payload)
            .send()
            .await
            .context("transfer request failed")?;

        if !response.status().is_success() {
            return Err(anyhow!("transfer request returned {}", response.status()));
        }

        let body: RpcResponse = response
            .json()
            .await
            .context("failed to parse transfer response")?;

        if let Some(err) = body.error {
            return Err(anyhow!("service error {}: {}", err.code, err.message));
        }

        let result = body
            .result
            .ok_or_else(|| anyhow!("transfer response carried neither result nor error"))?;

        let mut transfers = Vec::with_capacity(result.transfers.len());
        for wire in result.transfers {
            transfers.push(wire.into_transfer()?);
        }

        debug!(
            "Fetched {} transfers for {} (more: {})",
            transfers.len(),
            address,
            result.page_key.is_some()
        );

        Ok(TransferPage {
            transfers,
            page_key: result.page_key,
        })
    }
}

// --- Wire format ---

#[derive(Debug, Deserialize)]
struct RpcResponse {
    result: Option<TransfersResult>,
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TransfersResult {
    transfers: Vec<WireTransfer>,
    page_key: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireTransfer {
    hash: String,
    from: String,
    to: Option<String>,
    value: Option<f64>,
    block_num: String,
    metadata: WireMetadata,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireMetadata {
    block_timestamp: String,
}

impl WireTransfer {
    fn into_transfer(self) -> Result<Transfer> {
        let block = parse_hex_quantity(&self.block_num)
            .with_context(|| format!("bad block number {:?}", self.block_num))?;

        let timestamp = DateTime::parse_from_rfc3339(&self.metadata.block_timestamp)
            .with_context(|| format!("bad block timestamp {:?}", self.metadata.block_timestamp))?
            .timestamp();

        Ok(Transfer {
            hash: self.hash,
            from: self.from,
            to: self.to,
            value: self.value,
            block,
            timestamp,
        })
    }
}

/// Parse a `0x`-prefixed or plain-decimal quantity.
fn parse_hex_quantity(raw: &str) -> Result<u64> {
    if let Some(hex) = raw.strip_prefix("0x") {
        u64::from_str_radix(hex, 16).map_err(Into::into)
    } else {
        raw.parse::<u64>().map_err(Into::into)
    }
}
