//! Contract registry - address to direct and batched handles

use std::collections::HashMap;
use std::sync::Arc;

use alloy::primitives::Address;
use alloy_dyn_abi::DynSolValue;
use alloy_json_abi::JsonAbi;
use anyhow::{Context, Result};
use serde_json::Value;

use crate::infrastructure::abi::codec;
use crate::infrastructure::contracts::MulticallContract;
use crate::infrastructure::ethereum::{parse_address, EthereumProvider};

/// Direct handle: encodes a call, runs it through `eth_call` and decodes
#[derive(Debug, Clone)]
pub struct Contract {
    address: Address,
    abi: JsonAbi,
}

impl Contract {
    pub fn new(address: Address, abi: JsonAbi) -> Self {
        Self { address, abi }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn abi(&self) -> &JsonAbi {
        &self.abi
    }

    /// Read-only call, one decoded value per output
    pub async fn read(
        &self,
        provider: &dyn EthereumProvider,
        name: &str,
        args: &[DynSolValue],
    ) -> Result<Vec<DynSolValue>> {
        let function = codec::function(&self.abi, name)?;
        let data = codec::encode_call(function, args)?;
        let output = provider
            .call(self.address, data.into())
            .await
            .with_context(|| format!("eth_call {}.{name}", self.address))?;
        codec::decode_output(function, &output)
    }
}

/// Both handles for one registered address
#[derive(Debug, Clone)]
pub struct ContractHandles {
    pub contract: Contract,
    pub multicall: MulticallContract,
}

/// Contracts the worker has announced through `setContract`
///
/// Entries live for the whole session; registering an address again
/// replaces its handles.
#[derive(Debug, Default)]
pub struct ContractRegistry {
    contracts: HashMap<Address, Arc<ContractHandles>>,
}

impl ContractRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build handles from an address string and a JSON ABI
    pub fn register(&mut self, address: &str, abi: &Value) -> Result<Arc<ContractHandles>> {
        let address = parse_address(address).with_context(|| format!("Invalid contract address '{address}'"))?;
        let abi: JsonAbi = serde_json::from_value(abi.clone()).context("Invalid contract ABI")?;

        let handles = Arc::new(ContractHandles {
            contract: Contract::new(address, abi.clone()),
            multicall: MulticallContract::new(address, abi),
        });
        if self.contracts.insert(address, Arc::clone(&handles)).is_some() {
            tracing::debug!(%address, "contract handles replaced");
        }
        Ok(handles)
    }

    pub fn get(&self, address: &Address) -> Option<Arc<ContractHandles>> {
        self.contracts.get(address).cloned()
    }

    /// Lookup by address string in any case
    pub fn get_str(&self, address: &str) -> Option<Arc<ContractHandles>> {
        parse_address(address).and_then(|address| self.get(&address))
    }

    pub fn len(&self) -> usize {
        self.contracts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contracts.is_empty()
    }
}
