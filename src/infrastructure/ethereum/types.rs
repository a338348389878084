//! JSON-RPC payload types and hex helpers shared by both sides

use std::fmt;

use alloy::primitives::{Address, U256};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Generic server error code used when a failure carries no code of its own
pub const INTERNAL_ERROR: i64 = -32603;

/// A single JSON-RPC request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    #[serde(default = "default_version")]
    pub jsonrpc: String,
    #[serde(default)]
    pub id: Value,
    pub method: String,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub params: Value,
}

impl JsonRpcRequest {
    pub fn new(id: u64, method: impl Into<String>, params: Value) -> Self {
        Self {
            jsonrpc: default_version(),
            id: Value::from(id),
            method: method.into(),
            params,
        }
    }
}

/// Body of a `provider.send`: one request or a batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JsonRpcBody {
    Batch(Vec<JsonRpcRequest>),
    Single(JsonRpcRequest),
}

impl JsonRpcBody {
    pub fn requests(&self) -> &[JsonRpcRequest] {
        match self {
            JsonRpcBody::Batch(requests) => requests,
            JsonRpcBody::Single(request) => std::slice::from_ref(request),
        }
    }
}

/// Error object of a failed JSON-RPC response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcError {
    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            code: INTERNAL_ERROR,
            message: message.into(),
            data: None,
        }
    }
}

impl fmt::Display for JsonRpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rpc error {}: {}", self.code, self.message)
    }
}

impl std::error::Error for JsonRpcError {}

/// One JSON-RPC response; exactly one of `result` / `error` is set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    #[serde(default = "default_version")]
    pub jsonrpc: String,
    #[serde(default)]
    pub id: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: default_version(),
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(id: Value, error: JsonRpcError) -> Self {
        Self {
            jsonrpc: default_version(),
            id,
            result: None,
            error: Some(error),
        }
    }

    /// The result, or the error as a `JsonRpcError`
    pub fn into_result(self) -> Result<Value, JsonRpcError> {
        match (self.result, self.error) {
            (_, Some(error)) => Err(error),
            (Some(result), None) => Ok(result),
            (None, None) => Ok(Value::Null),
        }
    }
}

fn default_version() -> String {
    "2.0".to_string()
}

/// Parse hex string to u64
pub fn parse_hex_u64(s: &str) -> Result<u64> {
    let s = s.strip_prefix("0x").unwrap_or(s);
    if s.is_empty() {
        return Ok(0);
    }
    u64::from_str_radix(s, 16).context("Failed to parse hex u64")
}

/// Parse hex string to U256
pub fn parse_hex_u256(s: &str) -> Result<U256> {
    let s = s.strip_prefix("0x").unwrap_or(s);
    if s.is_empty() || s == "0" {
        return Ok(U256::ZERO);
    }
    U256::from_str_radix(s, 16).context("Failed to parse hex U256")
}

/// Parse a hex address string to Address
pub fn parse_address(s: &str) -> Option<Address> {
    let s = s.trim();
    let normalized = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")).unwrap_or(s);
    if normalized.len() != 40 {
        return None;
    }
    let bytes = hex::decode(normalized).ok()?;
    Some(Address::from_slice(&bytes))
}

/// Lower-case `0x` form used as registry and cache key
pub fn normalize_address(address: &str) -> String {
    let trimmed = address.trim();
    let payload = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    format!("0x{}", payload.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_body_accepts_single_and_batch() {
        let single: JsonRpcBody =
            serde_json::from_value(json!({"jsonrpc": "2.0", "id": 1, "method": "eth_chainId"})).unwrap();
        assert_eq!(single.requests().len(), 1);
        assert_eq!(single.requests()[0].params, Value::Null);

        let batch: JsonRpcBody = serde_json::from_value(json!([
            {"jsonrpc": "2.0", "id": 1, "method": "eth_chainId"},
            {"jsonrpc": "2.0", "id": 2, "method": "eth_blockNumber", "params": []}
        ]))
        .unwrap();
        assert_eq!(batch.requests().len(), 2);
        assert_eq!(batch.requests()[1].method, "eth_blockNumber");
    }

    #[test]
    fn test_response_into_result() {
        let ok = JsonRpcResponse::success(json!(1), json!("0x1"));
        assert_eq!(ok.into_result().unwrap(), json!("0x1"));

        let failed: JsonRpcResponse = serde_json::from_value(json!({
            "jsonrpc": "2.0", "id": 2, "error": {"code": -32000, "message": "execution reverted"}
        }))
        .unwrap();
        let err = failed.into_result().unwrap_err();
        assert_eq!(err.code, -32000);
        assert_eq!(err.to_string(), "rpc error -32000: execution reverted");
    }

    #[test]
    fn test_hex_helpers() {
        assert_eq!(parse_hex_u64("0x19").unwrap(), 25);
        assert_eq!(parse_hex_u64("0x").unwrap(), 0);
        assert_eq!(parse_hex_u256("0x3e8").unwrap(), U256::from(1000u64));
        assert!(parse_address("0x1234").is_none());
        assert!(parse_address("0x6B175474E89094C44Da98b954EedeAC495271d0F").is_some());
        assert_eq!(normalize_address(" 0XAbC "), "0xabc");
    }
}
