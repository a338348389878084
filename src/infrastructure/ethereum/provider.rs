//! Node access for the UI side
//!
//! The UI side is the only place a network provider lives. Besides typed
//! helpers it answers raw JSON-RPC payloads, which is what the worker's
//! `provider.send` calls carry.

use std::borrow::Cow;
use std::path::PathBuf;

use alloy::network::Ethereum;
use alloy::primitives::{Address, Bytes};
use alloy::providers::{
    fillers::{BlobGasFiller, ChainIdFiller, FillProvider, GasFiller, JoinFill, NonceFiller},
    Identity, Provider, ProviderBuilder, RootProvider,
};
use alloy::transports::{RpcError, TransportError};
use anyhow::{Context, Result};
use serde_json::{json, Value};

use crate::infrastructure::ethereum::types::{
    parse_hex_u64, JsonRpcBody, JsonRpcError, JsonRpcResponse,
};

/// Where to reach the node
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderConfig {
    Http(String),
    WebSocket(String),
    /// Unix only
    #[cfg(unix)]
    Ipc(PathBuf),
}

impl ProviderConfig {
    /// URL or socket path
    pub fn display(&self) -> String {
        match self {
            ProviderConfig::Http(url) => url.clone(),
            ProviderConfig::WebSocket(url) => url.clone(),
            #[cfg(unix)]
            ProviderConfig::Ipc(path) => path.display().to_string(),
        }
    }
}

/// JSON-RPC access to a node
///
/// Only [`request`](EthereumProvider::request) and
/// [`endpoint_name`](EthereumProvider::endpoint_name) are required; the
/// rest is expressed in terms of raw requests.
#[async_trait::async_trait]
pub trait EthereumProvider: Send + Sync + 'static {
    /// Raw JSON-RPC request; node errors keep their code
    async fn request(&self, method: &str, params: Value) -> Result<Value, JsonRpcError>;

    fn endpoint_name(&self) -> String;

    async fn block_number(&self) -> Result<u64> {
        let result = self.request("eth_blockNumber", json!([])).await?;
        parse_hex_u64(result.as_str().unwrap_or_default())
    }

    /// `web3_clientVersion`, used to tell anvil/geth/reth apart
    async fn client_version(&self) -> Result<String> {
        let result = self.request("web3_clientVersion", json!([])).await?;
        Ok(result.as_str().unwrap_or_default().to_string())
    }

    /// Unlocked accounts; dev nodes expose their signers here
    async fn accounts(&self) -> Result<Vec<Address>> {
        let result = self.request("eth_accounts", json!([])).await?;
        serde_json::from_value(result).context("Invalid eth_accounts response")
    }

    /// Execute a call (eth_call) against the latest block
    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes> {
        let result = self
            .request("eth_call", json!([{ "to": to, "data": data }, "latest"]))
            .await?;
        serde_json::from_value(result).context("Invalid eth_call response")
    }

    /// Answer a `provider.send` body, one response per request in order
    ///
    /// Failures are reported per request so a batch never fails as a whole.
    async fn send(&self, body: JsonRpcBody) -> Vec<JsonRpcResponse> {
        let mut responses = Vec::with_capacity(body.requests().len());
        for request in body.requests() {
            let response = match self.request(&request.method, request.params.clone()).await {
                Ok(result) => JsonRpcResponse::success(request.id.clone(), result),
                Err(error) => JsonRpcResponse::failure(request.id.clone(), error),
            };
            responses.push(response);
        }
        responses
    }
}

type FilledProvider = FillProvider<
    JoinFill<
        Identity,
        JoinFill<GasFiller, JoinFill<BlobGasFiller, JoinFill<NonceFiller, ChainIdFiller>>>,
    >,
    RootProvider,
    Ethereum,
>;

/// Alloy provider over any of the supported transports
///
/// Every transport yields the same filled provider type, so one struct
/// covers HTTP, WebSocket and IPC.
pub struct AlloyProvider {
    inner: FilledProvider,
    endpoint: String,
}

/// Connect to `config`; HTTP connects lazily, WebSocket and IPC dial now
pub async fn create_provider(config: ProviderConfig) -> Result<Box<dyn EthereumProvider>> {
    let endpoint = config.display();
    let inner = match config {
        ProviderConfig::Http(url) => {
            let url = url.parse().with_context(|| format!("bad HTTP endpoint {url}"))?;
            ProviderBuilder::new().connect_http(url)
        }
        ProviderConfig::WebSocket(url) => ProviderBuilder::new()
            .connect(&url)
            .await
            .with_context(|| format!("WebSocket connect to {url}"))?,
        #[cfg(unix)]
        ProviderConfig::Ipc(path) => {
            let ipc = alloy::providers::IpcConnect::new(path.to_string_lossy().into_owned());
            ProviderBuilder::new()
                .connect_ipc(ipc)
                .await
                .with_context(|| format!("IPC connect to {}", path.display()))?
        }
    };
    tracing::debug!(%endpoint, "provider created");
    Ok(Box::new(AlloyProvider { inner, endpoint }))
}

#[async_trait::async_trait]
impl EthereumProvider for AlloyProvider {
    async fn request(&self, method: &str, params: Value) -> Result<Value, JsonRpcError> {
        // Nodes reject `null` params; send an empty list instead
        let params = if params.is_null() { json!([]) } else { params };
        let method: Cow<'static, str> = Cow::Owned(method.to_string());
        self.inner
            .raw_request::<_, Value>(method, params)
            .await
            .map_err(transport_error)
    }

    fn endpoint_name(&self) -> String {
        self.endpoint.clone()
    }

    async fn block_number(&self) -> Result<u64> {
        Ok(self.inner.get_block_number().await?)
    }

    async fn client_version(&self) -> Result<String> {
        Ok(self.inner.get_client_version().await?)
    }

    async fn accounts(&self) -> Result<Vec<Address>> {
        Ok(self.inner.get_accounts().await?)
    }
}

/// Keep the node's error code; transport failures become internal errors
fn transport_error(err: TransportError) -> JsonRpcError {
    match err {
        RpcError::ErrorResp(payload) => JsonRpcError {
            code: payload.code,
            message: payload.message.to_string(),
            data: payload
                .data
                .and_then(|raw| serde_json::from_str(raw.get()).ok()),
        },
        other => JsonRpcError::internal(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::ethereum::types::JsonRpcRequest;
    use std::collections::HashMap;

    /// Answers from a fixed method table; anything else is "method not found"
    struct TableProvider(HashMap<&'static str, Value>);

    #[async_trait::async_trait]
    impl EthereumProvider for TableProvider {
        async fn request(&self, method: &str, _params: Value) -> Result<Value, JsonRpcError> {
            self.0.get(method).cloned().ok_or_else(|| JsonRpcError {
                code: -32601,
                message: format!("method {method} not found"),
                data: None,
            })
        }

        fn endpoint_name(&self) -> String {
            "table".to_string()
        }
    }

    fn table() -> TableProvider {
        TableProvider(HashMap::from([
            ("eth_blockNumber", json!("0x10")),
            ("eth_accounts", json!(["0x1234567890123456789012345678901234567890"])),
            ("eth_call", json!("0x0001")),
        ]))
    }

    #[tokio::test]
    async fn test_default_methods_use_raw_requests() {
        let provider = table();
        assert_eq!(provider.block_number().await.unwrap(), 16);
        assert_eq!(provider.accounts().await.unwrap().len(), 1);
        let out = provider.call(Address::ZERO, Bytes::new()).await.unwrap();
        assert_eq!(out.as_ref(), &[0x00, 0x01]);
        assert!(provider.client_version().await.is_err());
    }

    #[tokio::test]
    async fn test_send_answers_batches_in_order() {
        let provider = table();
        let body = JsonRpcBody::Batch(vec![
            JsonRpcRequest::new(7, "eth_blockNumber", json!([])),
            JsonRpcRequest::new(8, "eth_mining", json!([])),
        ]);

        let responses = provider.send(body).await;
        assert_eq!(responses.len(), 2);
        assert_eq!(responses[0].id, json!(7));
        assert_eq!(responses[0].result, Some(json!("0x10")));
        assert_eq!(responses[1].id, json!(8));
        assert_eq!(responses[1].error.as_ref().map(|e| e.code), Some(-32601));
    }

    #[test]
    fn test_provider_config_display() {
        let http = ProviderConfig::Http("http://localhost:8545".into());
        assert_eq!(http.display(), "http://localhost:8545");
        let ws = ProviderConfig::WebSocket("ws://localhost:8546".into());
        assert_eq!(ws.display(), "ws://localhost:8546");
    }
}
