//! Worker-side provider that tunnels JSON-RPC through the bridge

use std::sync::atomic::{AtomicU64, Ordering};

use alloy_json_abi::JsonAbi;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use crate::domain::bridge::{PROVIDER_SEND, SET_CONTRACT};
use crate::domain::sdk::{SdkError, SdkResult};
use crate::infrastructure::ethereum::{JsonRpcBody, JsonRpcRequest, JsonRpcResponse};
use crate::infrastructure::runtime::Bridge;

/// JSON-RPC provider whose transport is the UI side
///
/// Every request becomes a `provider.send` call; the worker-side call stays
/// pending until the UI's provider has answered.
#[derive(Debug)]
pub struct ExternalRpcProvider {
    bridge: Bridge,
    next_id: AtomicU64,
}

impl ExternalRpcProvider {
    pub fn new(bridge: Bridge) -> Self {
        Self {
            bridge,
            next_id: AtomicU64::new(1),
        }
    }

    /// Send a raw body; the UI answers with one response per request
    pub async fn send(&self, body: JsonRpcBody) -> SdkResult<Vec<JsonRpcResponse>> {
        let params = serde_json::to_value(&body).map_err(|e| SdkError::InvalidInput(e.to_string()))?;
        let reply = self.bridge.request_value(PROVIDER_SEND, params)?;
        let value = reply.await?;
        serde_json::from_value(value).map_err(|e| SdkError::Decode(format!("provider response: {e}")))
    }

    /// Single request, decoding `result` into `T`
    pub async fn request<T: DeserializeOwned>(&self, method: &str, params: Value) -> SdkResult<T> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = JsonRpcBody::Single(JsonRpcRequest::new(id, method, params));
        let response = self
            .send(body)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| SdkError::Decode(format!("empty response to {method}")))?;

        let result = response.into_result().map_err(|err| SdkError::Rpc {
            code: err.code,
            message: err.message,
        })?;
        serde_json::from_value(result).map_err(|e| SdkError::Decode(format!("{method}: {e}")))
    }

    /// Ask the UI side to materialize handles for `address`
    pub fn register_contract(&self, address: &str, abi: &JsonAbi) -> SdkResult<()> {
        self.bridge
            .notify(SET_CONTRACT, json!({ "address": address, "abi": abi }))?;
        Ok(())
    }
}
