//! Ethereum infrastructure - Alloy provider and JSON-RPC payloads

mod provider;
mod types;

pub use provider::{create_provider, AlloyProvider, EthereumProvider, ProviderConfig};
pub use types::{
    normalize_address, parse_address, parse_hex_u256, parse_hex_u64, JsonRpcBody, JsonRpcError,
    JsonRpcRequest, JsonRpcResponse, INTERNAL_ERROR,
};
