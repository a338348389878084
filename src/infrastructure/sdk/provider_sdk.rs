//! SDK subset served entirely over the tunnelled provider
//!
//! Covers token reads (balances, allowances, metadata), approvals, gas
//! prices and network constants. Pool-registry operations keep the trait's
//! `Unsupported` defaults.

use std::collections::{BTreeMap, HashMap, HashSet};

use alloy::primitives::{Address, U256};
use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::RwLock;

use crate::domain::sdk::{
    Balances, CoinData, CurveSdk, FeeData, InitOptions, NetworkConstants, SdkError, SdkResult,
};
use crate::infrastructure::ethereum::{normalize_address, parse_address, parse_hex_u256, parse_hex_u64};
use crate::infrastructure::sdk::erc20::{self, Erc20};
use crate::infrastructure::sdk::networks::{self, OP_GAS_PRICE_ORACLE};
use crate::infrastructure::sdk::ExternalRpcProvider;

/// `l1BaseFee()` on the OP-stack gas price oracle
const L1_BASE_FEE_SELECTOR: [u8; 4] = [0x51, 0x9b, 0x4b, 0xd3];
const GWEI: f64 = 1e9;

#[derive(Debug, Default)]
struct SdkState {
    network: Option<NetworkConstants>,
    signer: Option<Address>,
    fee_data: FeeData,
    /// Token contracts already announced to the UI side
    registered: HashSet<Address>,
    decimals: HashMap<Address, u8>,
}

pub struct ProviderSdk {
    rpc: ExternalRpcProvider,
    erc20: Erc20,
    state: RwLock<SdkState>,
}

impl ProviderSdk {
    pub fn new(rpc: ExternalRpcProvider) -> SdkResult<Self> {
        Ok(Self {
            rpc,
            erc20: Erc20::load()?,
            state: RwLock::new(SdkState::default()),
        })
    }

    /// Current fee settings
    pub async fn fee_data(&self) -> FeeData {
        self.state.read().await.fee_data.clone()
    }

    async fn network(&self) -> SdkResult<NetworkConstants> {
        self.state
            .read()
            .await
            .network
            .clone()
            .ok_or(SdkError::NotInitialized)
    }

    /// Announce the token to the UI once, then hand back its address
    async fn token(&self, coin: &str) -> SdkResult<Address> {
        let address = address_arg(coin)?;
        let mut state = self.state.write().await;
        if state.registered.insert(address) {
            self.rpc
                .register_contract(&normalize_address(coin), self.erc20.abi())?;
        }
        Ok(address)
    }

    async fn eth_call(&self, to: Address, data: Vec<u8>) -> SdkResult<Vec<u8>> {
        let hex_data: String = self
            .rpc
            .request(
                "eth_call",
                json!([{ "to": to, "data": format!("0x{}", hex::encode(data)) }, "latest"]),
            )
            .await?;
        hex::decode(hex_data.trim_start_matches("0x")).map_err(|e| SdkError::Decode(e.to_string()))
    }

    async fn decimals(&self, coin: &str) -> SdkResult<u8> {
        if networks::is_native_token(coin) {
            return Ok(18);
        }
        let token = self.token(coin).await?;
        if let Some(decimals) = self.state.read().await.decimals.get(&token) {
            return Ok(*decimals);
        }
        let raw = erc20::decode_uint(&self.eth_call(token, self.erc20.decimals()?).await?)?;
        let decimals = u8::try_from(raw).map_err(|_| SdkError::Decode(format!("decimals out of range: {raw}")))?;
        self.state.write().await.decimals.insert(token, decimals);
        Ok(decimals)
    }

    async fn balance(&self, coin: &str, owner: Address) -> SdkResult<U256> {
        if networks::is_native_token(coin) {
            let hex_balance: String = self
                .rpc
                .request("eth_getBalance", json!([owner, "latest"]))
                .await?;
            return parse_hex_u256(&hex_balance).map_err(|e| SdkError::Decode(e.to_string()));
        }
        let token = self.token(coin).await?;
        erc20::decode_uint(&self.eth_call(token, self.erc20.balance_of(owner)?).await?)
    }

    async fn raw_allowance(&self, coin: &str, owner: Address, spender: Address) -> SdkResult<U256> {
        if networks::is_native_token(coin) {
            return Ok(U256::MAX);
        }
        let token = self.token(coin).await?;
        erc20::decode_uint(&self.eth_call(token, self.erc20.allowance(owner, spender)?).await?)
    }

    async fn gas_price_wei(&self) -> SdkResult<U256> {
        let hex_price: String = self.rpc.request("eth_gasPrice", json!([])).await?;
        parse_hex_u256(&hex_price).map_err(|e| SdkError::Decode(e.to_string()))
    }

    /// Transaction fee fields from the configured fee data (gwei -> wei)
    async fn fee_fields(&self) -> serde_json::Map<String, Value> {
        let fees = self.fee_data().await;
        let mut fields = serde_json::Map::new();
        let to_wei = |gwei: f64| format!("0x{:x}", (gwei * GWEI) as u128);
        if let (Some(max_fee), Some(priority)) = (fees.max_fee_per_gas, fees.max_priority_fee_per_gas) {
            fields.insert("maxFeePerGas".into(), json!(to_wei(max_fee)));
            fields.insert("maxPriorityFeePerGas".into(), json!(to_wei(priority)));
        } else if let Some(gas_price) = fees.gas_price {
            fields.insert("gasPrice".into(), json!(to_wei(gas_price)));
        }
        fields
    }
}

#[async_trait]
impl CurveSdk for ProviderSdk {
    async fn init(&self, options: InitOptions) -> SdkResult<NetworkConstants> {
        let chain_id = match options.chain_id {
            Some(chain_id) => chain_id,
            None => {
                let hex_id: String = self.rpc.request("eth_chainId", json!([])).await?;
                parse_hex_u64(&hex_id).map_err(|e| SdkError::Decode(e.to_string()))?
            }
        };

        let accounts: Vec<String> = self.rpc.request("eth_accounts", json!([])).await.unwrap_or_default();
        let signer = accounts.first().and_then(|a| parse_address(a));

        let constants = networks::constants_for(chain_id, signer.map(|s| s.to_checksum(None)))
            .ok_or(SdkError::UnsupportedNetwork(chain_id))?;

        let mut state = self.state.write().await;
        state.network = Some(constants.clone());
        state.signer = signer;
        state.fee_data = options.fee_data();
        tracing::info!(chain_id, network = %constants.network_name, signer = ?signer, "sdk initialized");
        Ok(constants)
    }

    async fn has_deposit_and_stake(&self) -> SdkResult<bool> {
        self.network().await?;
        Ok(false)
    }

    async fn has_router(&self) -> SdkResult<bool> {
        self.network().await?;
        Ok(true)
    }

    async fn get_gas_price_from_l1(&self) -> SdkResult<f64> {
        let network = self.network().await?;
        if !networks::is_op_stack(network.chain_id) {
            return Err(SdkError::Unsupported("getGasPriceFromL1"));
        }
        let oracle = address_arg(OP_GAS_PRICE_ORACLE)?;
        let fee = erc20::decode_uint(&self.eth_call(oracle, L1_BASE_FEE_SELECTOR.to_vec()).await?)?;
        Ok(wei_to_gwei(fee))
    }

    async fn get_gas_price_from_l2(&self) -> SdkResult<f64> {
        self.network().await?;
        Ok(wei_to_gwei(self.gas_price_wei().await?))
    }

    async fn get_balances(&self, coins: Vec<String>, addresses: Vec<String>) -> SdkResult<Balances> {
        self.network().await?;
        let addresses = if addresses.is_empty() {
            let signer = self.state.read().await.signer.ok_or(SdkError::NoSigner("getBalances"))?;
            vec![signer.to_checksum(None)]
        } else {
            addresses
        };

        let mut by_address = BTreeMap::new();
        for address in &addresses {
            let owner = address_arg(address)?;
            let mut formatted = Vec::with_capacity(coins.len());
            for coin in &coins {
                let decimals = self.decimals(coin).await?;
                let raw = self.balance(coin, owner).await?;
                formatted.push(erc20::format_token_balance(raw, decimals)?);
            }
            by_address.insert(address.clone(), formatted);
        }

        if addresses.len() == 1 {
            Ok(Balances::Single(by_address.into_values().next().unwrap_or_default()))
        } else {
            Ok(Balances::ByAddress(by_address))
        }
    }

    async fn get_allowance(&self, coins: Vec<String>, address: String, spender: String) -> SdkResult<Vec<String>> {
        self.network().await?;
        let owner = address_arg(&address)?;
        let spender = address_arg(&spender)?;

        let mut allowances = Vec::with_capacity(coins.len());
        for coin in &coins {
            let raw = self.raw_allowance(coin, owner, spender).await?;
            if raw == U256::MAX {
                allowances.push(raw.to_string());
            } else {
                allowances.push(erc20::format_token_balance(raw, self.decimals(coin).await?)?);
            }
        }
        Ok(allowances)
    }

    async fn has_allowance(
        &self,
        coins: Vec<String>,
        amounts: Vec<String>,
        address: String,
        spender: String,
    ) -> SdkResult<bool> {
        self.network().await?;
        let owner = address_arg(&address)?;
        let spender = address_arg(&spender)?;

        for (coin, amount) in coins.iter().zip(&amounts) {
            let needed = erc20::parse_token_amount(amount, self.decimals(coin).await?)?;
            if self.raw_allowance(coin, owner, spender).await? < needed {
                return Ok(false);
            }
        }
        Ok(true)
    }

    async fn ensure_allowance(
        &self,
        coins: Vec<String>,
        amounts: Vec<String>,
        spender: String,
        is_max: bool,
    ) -> SdkResult<Vec<String>> {
        self.network().await?;
        let signer = self
            .state
            .read()
            .await
            .signer
            .ok_or(SdkError::NoSigner("ensureAllowance"))?;
        let spender = address_arg(&spender)?;

        let mut tx_hashes = Vec::new();
        for (coin, amount) in coins.iter().zip(&amounts) {
            if networks::is_native_token(coin) {
                continue;
            }
            let needed = erc20::parse_token_amount(amount, self.decimals(coin).await?)?;
            if self.raw_allowance(coin, signer, spender).await? >= needed {
                continue;
            }

            let token = self.token(coin).await?;
            let approve_amount = if is_max { U256::MAX } else { needed };
            let mut tx = self.fee_fields().await;
            tx.insert("from".into(), json!(signer));
            tx.insert("to".into(), json!(token));
            tx.insert(
                "data".into(),
                json!(format!("0x{}", hex::encode(self.erc20.approve(spender, approve_amount)?))),
            );

            let hash: String = self
                .rpc
                .request("eth_sendTransaction", Value::Array(vec![Value::Object(tx)]))
                .await?;
            tracing::info!(%coin, %hash, "approval sent");
            tx_hashes.push(hash);
        }
        Ok(tx_hashes)
    }

    async fn get_coins_data(&self, coins: Vec<String>) -> SdkResult<Vec<CoinData>> {
        let network = self.network().await?;
        let mut data = Vec::with_capacity(coins.len());
        for coin in &coins {
            if networks::is_native_token(coin) {
                data.push(CoinData {
                    name: network.native_token.symbol.clone(),
                    symbol: network.native_token.symbol.clone(),
                    decimals: 18,
                });
                continue;
            }
            let token = self.token(coin).await?;
            let name = erc20::decode_text(&self.eth_call(token, self.erc20.name()?).await?)?;
            let symbol = erc20::decode_text(&self.eth_call(token, self.erc20.symbol()?).await?)?;
            let decimals = self.decimals(coin).await?;
            data.push(CoinData { name, symbol, decimals });
        }
        Ok(data)
    }

    async fn set_custom_fee_data(&self, fee_data: FeeData) -> SdkResult<()> {
        self.state.write().await.fee_data.merge(fee_data);
        Ok(())
    }
}

fn address_arg(value: &str) -> SdkResult<Address> {
    parse_address(value).ok_or_else(|| SdkError::InvalidInput(format!("invalid address '{value}'")))
}

fn wei_to_gwei(wei: U256) -> f64 {
    let wei: f64 = wei.to_string().parse().unwrap_or(0.0);
    wei / GWEI
}
