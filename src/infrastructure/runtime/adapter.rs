//! UI side of the bridge
//!
//! [`CurveApiAdapter`] owns the network provider and the contract registry.
//! It turns typed method calls into worker requests, answers the worker's
//! `provider.send` calls with the real provider and materializes contract
//! handles on `setContract`.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde_json::{json, Map, Value};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

use crate::domain::bridge::{Argument, BridgeError, CallId, FactoryMethod, Message, Operation};
use crate::domain::sdk::{
    Balances, BasePool, CoinData, FactoryKind, FeeData, InitOptions, NetworkConstants,
    PoolSummary, VolumeStats,
};
use crate::infrastructure::abi::codec;
use crate::infrastructure::contracts::{aggregate, ContractHandles, ContractRegistry};
use crate::infrastructure::ethereum::{EthereumProvider, JsonRpcBody};
use crate::infrastructure::runtime::bridge::Bridge;
use crate::infrastructure::runtime::port::{Inbox, Port};

/// Typed client for the worker's SDK
pub struct CurveApiAdapter {
    bridge: Bridge,
    provider: Arc<dyn EthereumProvider>,
    contracts: Arc<RwLock<ContractRegistry>>,
    constants: RwLock<Option<NetworkConstants>>,
    listener: JoinHandle<()>,
}

impl CurveApiAdapter {
    /// Attach to a worker's channels and start the UI message loop
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(
        port: Port,
        inbox: Inbox,
        provider: Arc<dyn EthereumProvider>,
        call_timeout: Option<Duration>,
    ) -> Self {
        let bridge = Bridge::new("ui", port, call_timeout);
        let contracts = Arc::new(RwLock::new(ContractRegistry::new()));
        let listener = tokio::spawn(run_ui(
            bridge.clone(),
            Arc::clone(&provider),
            Arc::clone(&contracts),
            inbox,
        ));

        Self {
            bridge,
            provider,
            contracts,
            constants: RwLock::new(None),
            listener,
        }
    }

    pub fn bridge(&self) -> &Bridge {
        &self.bridge
    }

    pub fn provider(&self) -> &Arc<dyn EthereumProvider> {
        &self.provider
    }

    /// Constants from the last successful `init`
    pub async fn constants(&self) -> Option<NetworkConstants> {
        self.constants.read().await.clone()
    }

    /// Handles registered by the worker for `address`
    pub async fn contract(&self, address: &str) -> Option<Arc<ContractHandles>> {
        self.contracts.read().await.get_str(address)
    }

    pub async fn contracts_len(&self) -> usize {
        self.contracts.read().await.len()
    }

    /// Call a view function on a contract the worker registered
    ///
    /// `args` are parsed against the function's input types.
    pub async fn read_contract(&self, address: &str, function: &str, args: &[&str]) -> Result<Vec<Value>> {
        let handles = self
            .contract(address)
            .await
            .with_context(|| format!("contract {address} is not registered"))?;
        let abi_function = codec::function(handles.contract.abi(), function)?;
        let values = codec::coerce_args(abi_function, args)?;
        let output = handles
            .contract
            .read(self.provider.as_ref(), function, &values)
            .await?;
        Ok(output.iter().map(codec::to_json).collect())
    }

    /// Call an argument-less view function on several registered contracts
    /// in one Multicall3 round trip; failed calls come back as `None`
    pub async fn read_batch(&self, addresses: &[String], function: &str) -> Result<Vec<Option<Vec<Value>>>> {
        let mut calls = Vec::with_capacity(addresses.len());
        for address in addresses {
            let handles = self
                .contract(address)
                .await
                .with_context(|| format!("contract {address} is not registered"))?;
            calls.push(handles.multicall.call(function, &[])?);
        }

        let results = aggregate(self.provider.as_ref(), &calls).await?;
        Ok(results
            .into_iter()
            .zip(addresses)
            .map(|(result, address)| match result {
                Ok(values) => Some(values.iter().map(codec::to_json).collect()),
                Err(err) => {
                    tracing::debug!(%address, function, error = %err, "batched read failed");
                    None
                }
            })
            .collect())
    }

    /// Raw `totalSupply` per coin, `null` where the read failed
    ///
    /// Batches through Multicall3 and falls back to one call per coin when
    /// the chain has no Multicall3.
    pub async fn total_supply(&self, coins: Vec<String>) -> Result<Map<String, Value>> {
        // getCoinsData makes the worker announce each token with setContract
        self.get_coins_data(coins.clone()).await?;

        let supplies = match self.read_batch(&coins, "totalSupply").await {
            Ok(results) => results
                .into_iter()
                .map(|values| values.and_then(|v| v.into_iter().next()))
                .collect::<Vec<_>>(),
            Err(err) => {
                tracing::debug!(error = %err, "batched read failed, reading one by one");
                let mut supplies = Vec::with_capacity(coins.len());
                for coin in &coins {
                    let supply = match self.read_contract(coin, "totalSupply", &[]).await {
                        Ok(values) => values.into_iter().next(),
                        Err(err) => {
                            tracing::warn!(%coin, error = %err, "totalSupply failed");
                            None
                        }
                    };
                    supplies.push(supply);
                }
                supplies
            }
        };

        Ok(coins
            .into_iter()
            .zip(supplies)
            .map(|(coin, supply)| (coin, supply.unwrap_or(Value::Null)))
            .collect())
    }

    pub fn factory(&self, kind: FactoryKind) -> FactoryAdapter<'_> {
        FactoryAdapter { adapter: self, kind }
    }

    /// Send `op` to the worker and return the raw resolve payload
    pub async fn run(&self, op: Operation) -> std::result::Result<Value, BridgeError> {
        let args = op.arguments().into_iter().map(Argument::Data).collect();
        self.bridge.call(op.name(), args).await
    }

    async fn run_as<T: DeserializeOwned>(&self, op: Operation) -> std::result::Result<T, BridgeError> {
        let operation = op.name();
        let value = self.run(op).await?;
        serde_json::from_value(value).map_err(|e| BridgeError::UnexpectedResult {
            operation,
            reason: e.to_string(),
        })
    }

    pub async fn init(&self, options: InitOptions) -> std::result::Result<NetworkConstants, BridgeError> {
        let constants: NetworkConstants = self.run_as(Operation::Init { options }).await?;
        tracing::info!(chain_id = constants.chain_id, network = %constants.network_name, "worker initialized");
        *self.constants.write().await = Some(constants.clone());
        Ok(constants)
    }

    pub async fn has_deposit_and_stake(&self) -> std::result::Result<bool, BridgeError> {
        self.run_as(Operation::HasDepositAndStake).await
    }

    pub async fn has_router(&self) -> std::result::Result<bool, BridgeError> {
        self.run_as(Operation::HasRouter).await
    }

    pub async fn get_pool_list(&self) -> std::result::Result<Vec<String>, BridgeError> {
        self.run_as(Operation::GetPoolList).await
    }

    pub async fn get_volume(&self, network: Option<String>) -> std::result::Result<VolumeStats, BridgeError> {
        self.run_as(Operation::GetVolume { network }).await
    }

    pub async fn get_tvl(&self, network: Option<String>) -> std::result::Result<f64, BridgeError> {
        self.run_as(Operation::GetTvl { network }).await
    }

    pub async fn get_base_pools(&self) -> std::result::Result<Vec<BasePool>, BridgeError> {
        self.run_as(Operation::GetBasePools).await
    }

    pub async fn get_pool(&self, pool_id: &str) -> std::result::Result<PoolSummary, BridgeError> {
        self.run_as(Operation::GetPool {
            pool_id: pool_id.to_string(),
        })
        .await
    }

    pub async fn get_usd_rate(&self, coin: &str) -> std::result::Result<f64, BridgeError> {
        self.run_as(Operation::GetUsdRate {
            coin: coin.to_string(),
        })
        .await
    }

    pub async fn get_gas_price_from_l1(&self) -> std::result::Result<f64, BridgeError> {
        self.run_as(Operation::GetGasPriceFromL1).await
    }

    pub async fn get_gas_price_from_l2(&self) -> std::result::Result<f64, BridgeError> {
        self.run_as(Operation::GetGasPriceFromL2).await
    }

    /// Formatted balances; no addresses means the worker's signer
    pub async fn get_balances(
        &self,
        coins: Vec<String>,
        addresses: Vec<String>,
    ) -> std::result::Result<Balances, BridgeError> {
        self.run_as(Operation::GetBalances { coins, addresses }).await
    }

    pub async fn get_allowance(
        &self,
        coins: Vec<String>,
        address: &str,
        spender: &str,
    ) -> std::result::Result<Vec<String>, BridgeError> {
        self.run_as(Operation::GetAllowance {
            coins,
            address: address.to_string(),
            spender: spender.to_string(),
        })
        .await
    }

    pub async fn has_allowance(
        &self,
        coins: Vec<String>,
        amounts: Vec<String>,
        address: &str,
        spender: &str,
    ) -> std::result::Result<bool, BridgeError> {
        self.run_as(Operation::HasAllowance {
            coins,
            amounts,
            address: address.to_string(),
            spender: spender.to_string(),
        })
        .await
    }

    pub async fn ensure_allowance(
        &self,
        coins: Vec<String>,
        amounts: Vec<String>,
        spender: &str,
        is_max: bool,
    ) -> std::result::Result<Vec<String>, BridgeError> {
        self.run_as(Operation::EnsureAllowance {
            coins,
            amounts,
            spender: spender.to_string(),
            is_max,
        })
        .await
    }

    pub async fn get_coins_data(&self, coins: Vec<String>) -> std::result::Result<Vec<CoinData>, BridgeError> {
        self.run_as(Operation::GetCoinsData { coins }).await
    }

    pub async fn set_custom_fee_data(&self, fee_data: FeeData) -> std::result::Result<(), BridgeError> {
        self.run(Operation::SetCustomFeeData { fee_data }).await?;
        Ok(())
    }
}

// The loop holds a port into the worker, so the worker only exits once it stops
impl Drop for CurveApiAdapter {
    fn drop(&mut self) {
        self.listener.abort();
    }
}

/// `factory` operations bound to one pool factory
#[derive(Clone, Copy)]
pub struct FactoryAdapter<'a> {
    adapter: &'a CurveApiAdapter,
    kind: FactoryKind,
}

impl FactoryAdapter<'_> {
    pub fn kind(&self) -> FactoryKind {
        self.kind
    }

    pub async fn fetch_pools(&self, force: bool) -> std::result::Result<(), BridgeError> {
        self.adapter
            .run(Operation::Factory {
                factory: self.kind,
                method: FactoryMethod::FetchPools { force },
            })
            .await?;
        Ok(())
    }

    pub async fn fetch_new_pools(&self) -> std::result::Result<Vec<String>, BridgeError> {
        self.adapter
            .run_as(Operation::Factory {
                factory: self.kind,
                method: FactoryMethod::FetchNewPools,
            })
            .await
    }
}

/// UI message loop; runs until the worker's side of the channel closes
async fn run_ui(
    bridge: Bridge,
    provider: Arc<dyn EthereumProvider>,
    contracts: Arc<RwLock<ContractRegistry>>,
    mut inbox: Inbox,
) {
    while let Some(envelope) = inbox.recv().await {
        tracing::debug!(kind = %envelope.kind, id = %envelope.id, "ui received");
        let message = match Message::try_from(envelope) {
            Ok(message) => message,
            Err(err) => {
                tracing::warn!(error = %err, "ui ignoring message");
                continue;
            }
        };

        match message {
            Message::Resolve { id, value } => {
                bridge.settle(&id, Ok(value));
            }
            Message::Reject { id, error } => {
                bridge.settle(&id, Err(error));
            }
            Message::ProviderSend { id, payload } => {
                forward_to_provider(&bridge, &provider, id, payload);
            }
            Message::SetContract { address, abi } => {
                match contracts.write().await.register(&address, &abi) {
                    Ok(_) => tracing::debug!(%address, "contract registered"),
                    Err(err) => tracing::warn!(%address, error = %err, "invalid setContract"),
                }
            }
            Message::Request { id, kind, .. } => {
                tracing::warn!(%kind, id = %id, "ui ignoring request");
            }
        }
    }

    tracing::info!(pending = bridge.pending_calls(), "worker channel closed");
    bridge.disconnect();
}

/// Answer a `provider.send` with the provider's response array
fn forward_to_provider(bridge: &Bridge, provider: &Arc<dyn EthereumProvider>, id: CallId, payload: Value) {
    let body: JsonRpcBody = match serde_json::from_value(payload) {
        Ok(body) => body,
        Err(err) => {
            tracing::warn!(id = %id, error = %err, "malformed provider.send payload");
            if let Err(err) = bridge.respond(id, Err(json!(format!("invalid JSON-RPC payload: {err}")))) {
                tracing::warn!(error = %err, "could not deliver rejection");
            }
            return;
        }
    };

    let bridge = bridge.clone();
    let provider = Arc::clone(provider);
    tokio::spawn(async move {
        tracing::debug!(id = %id, requests = body.requests().len(), "provider.send");
        let responses = provider.send(body).await;
        let outcome = serde_json::to_value(&responses).map_err(|e| json!(e.to_string()));
        if let Err(err) = bridge.respond(id, outcome) {
            tracing::warn!(error = %err, "could not deliver provider response");
        }
    });
}
