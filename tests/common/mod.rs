//! Scripted SDK and provider shared by the integration tests

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use alloy::primitives::U256;
use alloy_dyn_abi::{DynSolType, DynSolValue};
use async_trait::async_trait;
use serde_json::{json, Value};

use curve_bridge::domain::sdk::{
    Balances, CurveSdk, InitOptions, NativeToken, NetworkConstants, SdkError, SdkResult,
};
use curve_bridge::infrastructure::contracts::MULTICALL3_ADDRESS;
use curve_bridge::infrastructure::ethereum::{EthereumProvider, JsonRpcError};

pub const USDC: &str = "0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48";
pub const DAI: &str = "0x6b175474e89094c44da98b954eedeac495271d0f";
pub const NATIVE: &str = "0xEeeeeEeeeEeEeeEeEeEeeEEEeeeeEeeeeeeeEEeE";
pub const SIGNER: &str = "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266";
pub const SPENDER: &str = "0x99a58482bd75cbab83b27ec03ca68ff489b5788f";

/// SDK with canned answers; `hasRouter` is deliberately slow
pub struct ScriptedSdk;

#[async_trait]
impl CurveSdk for ScriptedSdk {
    async fn init(&self, options: InitOptions) -> SdkResult<NetworkConstants> {
        Ok(NetworkConstants {
            chain_id: options.chain_id.unwrap_or(1),
            network_name: "ethereum".to_string(),
            native_token: NativeToken {
                symbol: "ETH".to_string(),
                wrapped_symbol: "WETH".to_string(),
                address: NATIVE.to_lowercase(),
                wrapped_address: "0xc02aaa39b223fe8d0a0e5c4f27ead9083c756cc2".to_string(),
            },
            zero_address: "0x0000000000000000000000000000000000000000".to_string(),
            signer_address: None,
        })
    }

    async fn has_router(&self) -> SdkResult<bool> {
        tokio::time::sleep(Duration::from_millis(200)).await;
        Ok(true)
    }

    async fn get_pool_list(&self) -> SdkResult<Vec<String>> {
        Ok(vec!["3pool".to_string(), "steth".to_string()])
    }

    async fn get_balances(&self, coins: Vec<String>, _addresses: Vec<String>) -> SdkResult<Balances> {
        Ok(Balances::Single(coins.iter().map(|_| "1000".to_string()).collect()))
    }

    async fn get_usd_rate(&self, coin: String) -> SdkResult<f64> {
        Err(SdkError::InvalidInput(format!("no rate for {coin}")))
    }
}

/// Node double: answers ERC-20 reads from fixed balances and records traffic
pub struct ScriptedProvider {
    pub chain_id: u64,
    pub allowance: U256,
    /// Whether Multicall3 is deployed
    pub multicall: bool,
    pub calls: Mutex<Vec<(String, Value)>>,
}

impl ScriptedProvider {
    pub fn new(chain_id: u64) -> Arc<Self> {
        Arc::new(Self {
            chain_id,
            allowance: U256::ZERO,
            multicall: true,
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn without_multicall(chain_id: u64) -> Arc<Self> {
        Arc::new(Self {
            chain_id,
            allowance: U256::ZERO,
            multicall: false,
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn with_allowance(chain_id: u64, allowance: U256) -> Arc<Self> {
        Arc::new(Self {
            chain_id,
            allowance,
            multicall: true,
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn methods(&self) -> Vec<String> {
        self.calls.lock().unwrap().iter().map(|(m, _)| m.clone()).collect()
    }

    pub fn params_of(&self, method: &str) -> Vec<Value> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(m, _)| m == method)
            .map(|(_, p)| p.clone())
            .collect()
    }

    fn eth_call(&self, params: &Value) -> Result<Value, JsonRpcError> {
        let to = params[0]["to"].as_str().unwrap_or_default().to_lowercase();
        let data = params[0]["data"].as_str().unwrap_or_default();
        if self.multicall && to == MULTICALL3_ADDRESS.to_string().to_lowercase() {
            return Ok(json!(self.aggregate3(data)));
        }
        Ok(json!(self.token_call(&to, data)?))
    }

    /// Answer `aggregate3` by running each inner call; reverts become `(false, 0x)`
    fn aggregate3(&self, data: &str) -> String {
        let input = hex::decode(data.trim_start_matches("0x")).unwrap();
        let ty: DynSolType = "((address,bool,bytes)[])".parse().unwrap();
        let DynSolValue::Tuple(mut params) = ty.abi_decode_params(&input[4..]).unwrap() else {
            panic!("aggregate3 input is not a tuple");
        };
        let Some(DynSolValue::Array(calls)) = params.pop() else {
            panic!("aggregate3 input is not an array");
        };

        let results = calls
            .into_iter()
            .map(|call| {
                let DynSolValue::Tuple(fields) = call else {
                    panic!("aggregate3 entry is not a tuple");
                };
                let (DynSolValue::Address(target), DynSolValue::Bytes(call_data)) = (&fields[0], &fields[2]) else {
                    panic!("unexpected aggregate3 entry");
                };
                let to = target.to_string().to_lowercase();
                match self.token_call(&to, &format!("0x{}", hex::encode(call_data))) {
                    Ok(word) => DynSolValue::Tuple(vec![
                        DynSolValue::Bool(true),
                        DynSolValue::Bytes(hex::decode(word.trim_start_matches("0x")).unwrap()),
                    ]),
                    Err(_) => DynSolValue::Tuple(vec![DynSolValue::Bool(false), DynSolValue::Bytes(Vec::new())]),
                }
            })
            .collect();

        let encoded = DynSolValue::Tuple(vec![DynSolValue::Array(results)]).abi_encode_params();
        format!("0x{}", hex::encode(encoded))
    }

    fn token_call(&self, to: &str, data: &str) -> Result<String, JsonRpcError> {
        let selector = data.get(2..10).unwrap_or_default();

        let decimals = if to == USDC { 6u64 } else { 18 };
        let result = match selector {
            "313ce567" => word(U256::from(decimals)),
            // balanceOf: 1.5 tokens
            "70a08231" => word(U256::from(15u64) * U256::from(10u64).pow(U256::from(decimals - 1))),
            "dd62ed3e" => word(self.allowance),
            // totalSupply: one million tokens
            "18160ddd" => word(U256::from(1_000_000u64) * U256::from(10u64).pow(U256::from(decimals))),
            "95d89b41" => abi_string(if to == USDC { "USDC" } else { "DAI" }),
            "06fdde03" => abi_string(if to == USDC { "USD Coin" } else { "Dai Stablecoin" }),
            _ => {
                return Err(JsonRpcError {
                    code: 3,
                    message: "execution reverted".to_string(),
                    data: None,
                })
            }
        };
        Ok(result)
    }
}

#[async_trait]
impl EthereumProvider for ScriptedProvider {
    async fn request(&self, method: &str, params: Value) -> Result<Value, JsonRpcError> {
        self.calls.lock().unwrap().push((method.to_string(), params.clone()));
        match method {
            "eth_chainId" => Ok(json!(format!("0x{:x}", self.chain_id))),
            "eth_accounts" => Ok(json!([SIGNER])),
            "eth_gasPrice" => Ok(json!("0x77359400")),
            "eth_getBalance" => Ok(json!("0xde0b6b3a7640000")),
            "eth_sendTransaction" => Ok(json!(format!("0x{}", "ab".repeat(32)))),
            "eth_call" => self.eth_call(&params),
            other => Err(JsonRpcError {
                code: -32601,
                message: format!("the method {other} does not exist"),
                data: None,
            }),
        }
    }

    fn endpoint_name(&self) -> String {
        "scripted".to_string()
    }
}

fn word(value: U256) -> String {
    format!("0x{}", hex::encode(value.to_be_bytes::<32>()))
}

fn abi_string(text: &str) -> String {
    let mut out = Vec::new();
    out.extend(U256::from(32u64).to_be_bytes::<32>());
    out.extend(U256::from(text.len()).to_be_bytes::<32>());
    let mut padded = text.as_bytes().to_vec();
    padded.resize(text.len().div_ceil(32) * 32, 0);
    out.extend(padded);
    format!("0x{}", hex::encode(out))
}
