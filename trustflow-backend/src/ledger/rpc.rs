//! Plain JSON-RPC client for an EVM node.
//!
//! Only the handful of methods the intent pipeline needs: chain id, balance,
//! gas price, gas estimation, pending nonce and raw transaction broadcast.

use ethers::types::{Address, Bytes, H256, U256};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::error::LedgerError;

/// geth / anvil error code for `execution reverted`
const REVERT_ERROR_CODE: i64 = 3;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// JSON-RPC request structure
#[derive(Debug, Serialize)]
struct JsonRpcRequest {
    jsonrpc: &'static str,
    method: String,
    params: Value,
    id: u64,
}

/// JSON-RPC response structure
#[derive(Debug, Deserialize)]
struct JsonRpcResponse {
    result: Option<Value>,
    error: Option<JsonRpcError>,
}

/// JSON-RPC error
#[derive(Debug, Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
    #[serde(default)]
    data: Option<Value>,
}

/// Why a single call failed, before it is mapped to a `LedgerError`
#[derive(Debug)]
enum CallError {
    Transport(String),
    Node { code: i64, message: String },
}

impl CallError {
    fn is_revert(&self) -> bool {
        match self {
            CallError::Node { code, message } => {
                *code == REVERT_ERROR_CODE || message.to_lowercase().contains("revert")
            }
            CallError::Transport(_) => false,
        }
    }

    fn message(self) -> String {
        match self {
            CallError::Transport(msg) => msg,
            CallError::Node { code, message } => format!("RPC error {}: {}", code, message),
        }
    }
}

impl From<CallError> for LedgerError {
    fn from(err: CallError) -> Self {
        LedgerError::Rpc(err.message())
    }
}

/// Parse a `0x`-prefixed hex quantity
pub(crate) fn parse_quantity(value: &Value, what: &str) -> Result<U256, LedgerError> {
    let hex_str = value
        .as_str()
        .ok_or_else(|| LedgerError::Rpc(format!("Invalid {} response: {}", what, value)))?;

    U256::from_str_radix(hex_str.trim_start_matches("0x"), 16)
        .map_err(|e| LedgerError::Rpc(format!("Failed to parse {}: {}", what, e)))
}

pub struct EvmRpc {
    http: reqwest::Client,
    url: String,
    next_id: AtomicU64,
}

impl EvmRpc {
    pub fn new(url: &str) -> Result<Self, String> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| format!("Failed to build HTTP client: {}", e))?;

        Ok(Self {
            http,
            url: url.to_string(),
            next_id: AtomicU64::new(1),
        })
    }

    async fn rpc_call(&self, method: &str, params: Value) -> Result<Value, CallError> {
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            method: method.to_string(),
            params,
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
        };

        log::debug!("[evm_rpc] {} to {} with params: {:?}", method, self.url, request.params);

        let response = self
            .http
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(|e| CallError::Transport(format!("Request to {} failed: {}", self.url, e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| CallError::Transport(format!("Failed to read response: {}", e)))?;

        if !status.is_success() {
            return Err(CallError::Transport(format!(
                "RPC error ({}) from {}: {}",
                status,
                self.url,
                if body.is_empty() { "empty response" } else { &body }
            )));
        }

        let rpc_response: JsonRpcResponse = serde_json::from_str(&body).map_err(|e| {
            CallError::Transport(format!("Failed to parse RPC response: {} - body: {}", e, body))
        })?;

        if let Some(error) = rpc_response.error {
            let message = match error.data {
                Some(Value::String(data)) if !data.is_empty() => format!("{} ({})", error.message, data),
                _ => error.message,
            };
            return Err(CallError::Node { code: error.code, message });
        }

        rpc_response
            .result
            .ok_or_else(|| CallError::Transport("RPC returned null result".to_string()))
    }

    pub async fn chain_id(&self) -> Result<u64, LedgerError> {
        let result = self.rpc_call("eth_chainId", json!([])).await?;
        let chain_id = parse_quantity(&result, "chainId")?;
        if chain_id.bits() > 64 {
            return Err(LedgerError::Rpc(format!("Chain id out of range: {}", chain_id)));
        }
        Ok(chain_id.as_u64())
    }

    /// Balance of an address in wei
    pub async fn get_balance(&self, address: Address) -> Result<U256, LedgerError> {
        let params = json!([format!("{:?}", address), "latest"]);
        let result = self.rpc_call("eth_getBalance", params).await?;
        parse_quantity(&result, "balance")
    }

    pub async fn gas_price(&self) -> Result<U256, LedgerError> {
        let result = self.rpc_call("eth_gasPrice", json!([])).await?;
        parse_quantity(&result, "gasPrice")
    }

    /// Estimate gas for a transaction; a node-side revert maps to `LedgerError::Reverted`
    pub async fn estimate_gas(
        &self,
        from: Address,
        to: Address,
        value: U256,
        data: Option<&Bytes>,
    ) -> Result<U256, LedgerError> {
        let mut call = json!({
            "from": format!("{:?}", from),
            "to": format!("{:?}", to),
            "value": format!("0x{:x}", value),
        });
        if let Some(data) = data {
            call["data"] = json!(format!("0x{}", hex::encode(data)));
        }

        match self.rpc_call("eth_estimateGas", json!([call])).await {
            Ok(result) => parse_quantity(&result, "estimateGas"),
            Err(e) if e.is_revert() => Err(LedgerError::Reverted(e.message())),
            Err(e) => Err(e.into()),
        }
    }

    /// Pending transaction count, used as the next nonce
    pub async fn get_transaction_count(&self, address: Address) -> Result<U256, LedgerError> {
        let params = json!([format!("{:?}", address), "pending"]);
        let result = self.rpc_call("eth_getTransactionCount", params).await?;
        parse_quantity(&result, "transactionCount")
    }

    /// Send a raw signed transaction
    pub async fn send_raw_transaction(&self, signed_tx: &[u8]) -> Result<H256, LedgerError> {
        let params = json!([format!("0x{}", hex::encode(signed_tx))]);

        let result = self
            .rpc_call("eth_sendRawTransaction", params)
            .await
            .map_err(|e| LedgerError::Broadcast(e.message()))?;

        let hash_hex = result
            .as_str()
            .ok_or_else(|| LedgerError::Broadcast("Invalid sendRawTransaction response".to_string()))?;

        hash_hex
            .parse()
            .map_err(|e| LedgerError::Broadcast(format!("Failed to parse tx hash: {}", e)))
    }
}
