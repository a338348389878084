//! Closed set of operations the worker executes
//!
//! A request envelope's `type` and `params` are parsed into an [`Operation`]
//! once, on receipt; execution then dispatches on the enum instead of
//! looking methods up by name.

use serde_json::{json, Value};

use super::OperationError;
use crate::domain::sdk::{CurveSdk, FactoryKind, FeeData, InitOptions, SdkError};

/// Method invoked on a pool factory through the `factory` operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FactoryMethod {
    FetchPools { force: bool },
    FetchNewPools,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    Init { options: InitOptions },
    Factory { factory: FactoryKind, method: FactoryMethod },
    HasDepositAndStake,
    HasRouter,
    GetPoolList,
    GetVolume { network: Option<String> },
    GetTvl { network: Option<String> },
    GetBasePools,
    GetPool { pool_id: String },
    GetUsdRate { coin: String },
    GetGasPriceFromL1,
    GetGasPriceFromL2,
    GetBalances { coins: Vec<String>, addresses: Vec<String> },
    GetAllowance { coins: Vec<String>, address: String, spender: String },
    HasAllowance { coins: Vec<String>, amounts: Vec<String>, address: String, spender: String },
    EnsureAllowance { coins: Vec<String>, amounts: Vec<String>, spender: String, is_max: bool },
    GetCoinsData { coins: Vec<String> },
    SetCustomFeeData { fee_data: FeeData },
}

impl Operation {
    /// Wire name carried in the envelope's `type`
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Init { .. } => "init",
            Operation::Factory { .. } => "factory",
            Operation::HasDepositAndStake => "hasDepositAndStake",
            Operation::HasRouter => "hasRouter",
            Operation::GetPoolList => "getPoolList",
            Operation::GetVolume { .. } => "getVolume",
            Operation::GetTvl { .. } => "getTVL",
            Operation::GetBasePools => "getBasePools",
            Operation::GetPool { .. } => "getPool",
            Operation::GetUsdRate { .. } => "getUsdRate",
            Operation::GetGasPriceFromL1 => "getGasPriceFromL1",
            Operation::GetGasPriceFromL2 => "getGasPriceFromL2",
            Operation::GetBalances { .. } => "getBalances",
            Operation::GetAllowance { .. } => "getAllowance",
            Operation::HasAllowance { .. } => "hasAllowance",
            Operation::EnsureAllowance { .. } => "ensureAllowance",
            Operation::GetCoinsData { .. } => "getCoinsData",
            Operation::SetCustomFeeData { .. } => "setCustomFeeData",
        }
    }

    /// Positional arguments sent as the envelope's `params`
    pub fn arguments(&self) -> Vec<Value> {
        match self {
            Operation::Init { options } => vec![json!({ "options": options })],
            Operation::Factory { factory, method } => match method {
                FactoryMethod::FetchPools { force } => {
                    vec![json!(factory.as_str()), json!("fetchPools"), json!(force)]
                }
                FactoryMethod::FetchNewPools => vec![json!(factory.as_str()), json!("fetchNewPools")],
            },
            Operation::HasDepositAndStake
            | Operation::HasRouter
            | Operation::GetPoolList
            | Operation::GetBasePools
            | Operation::GetGasPriceFromL1
            | Operation::GetGasPriceFromL2 => Vec::new(),
            Operation::GetVolume { network } | Operation::GetTvl { network } => {
                network.iter().map(|n| json!(n)).collect()
            }
            Operation::GetPool { pool_id } => vec![json!(pool_id)],
            Operation::GetUsdRate { coin } => vec![json!(coin)],
            Operation::GetBalances { coins, addresses } => {
                let mut args = vec![json!(coins)];
                args.extend(addresses.iter().map(|a| json!(a)));
                args
            }
            Operation::GetAllowance { coins, address, spender } => {
                vec![json!(coins), json!(address), json!(spender)]
            }
            Operation::HasAllowance { coins, amounts, address, spender } => {
                vec![json!(coins), json!(amounts), json!(address), json!(spender)]
            }
            Operation::EnsureAllowance { coins, amounts, spender, is_max } => {
                vec![json!(coins), json!(amounts), json!(spender), json!(is_max)]
            }
            Operation::GetCoinsData { coins } => coins.iter().map(|c| json!(c)).collect(),
            Operation::SetCustomFeeData { fee_data } => vec![json!(fee_data)],
        }
    }

    /// Parse a request envelope's `type` and `params`
    pub fn parse(kind: &str, params: Value) -> Result<Self, OperationError> {
        let args = Args::new(kind, params);

        let op = match kind {
            "init" => Operation::Init {
                options: args.init_options()?,
            },
            "factory" => {
                let factory = args
                    .string(0)?
                    .parse::<FactoryKind>()
                    .map_err(|reason| args.invalid(reason))?;
                let method = match args.string(1)?.as_str() {
                    "fetchPools" => FactoryMethod::FetchPools {
                        force: args.opt_bool(2)?.unwrap_or(false),
                    },
                    "fetchNewPools" => FactoryMethod::FetchNewPools,
                    other => return Err(args.invalid(format!("unknown factory method {other}"))),
                };
                Operation::Factory { factory, method }
            }
            "hasDepositAndStake" => Operation::HasDepositAndStake,
            "hasRouter" => Operation::HasRouter,
            "getPoolList" => Operation::GetPoolList,
            "getVolume" => Operation::GetVolume {
                network: args.opt_string(0)?,
            },
            "getTVL" => Operation::GetTvl {
                network: args.opt_string(0)?,
            },
            "getBasePools" => Operation::GetBasePools,
            "getPool" => Operation::GetPool {
                pool_id: args.string(0)?,
            },
            "getUsdRate" => Operation::GetUsdRate { coin: args.string(0)? },
            "getGasPriceFromL1" => Operation::GetGasPriceFromL1,
            "getGasPriceFromL2" => Operation::GetGasPriceFromL2,
            "getBalances" => {
                let coins = args.strings(0)?;
                let addresses = args.flattened_strings(1)?;
                Operation::GetBalances { coins, addresses }
            }
            "getAllowance" => Operation::GetAllowance {
                coins: args.strings(0)?,
                address: args.string(1)?,
                spender: args.string(2)?,
            },
            "hasAllowance" => Operation::HasAllowance {
                coins: args.strings(0)?,
                amounts: args.strings(1)?,
                address: args.string(2)?,
                spender: args.string(3)?,
            },
            "ensureAllowance" => Operation::EnsureAllowance {
                coins: args.strings(0)?,
                amounts: args.strings(1)?,
                spender: args.string(2)?,
                is_max: args.opt_bool(3)?.unwrap_or(false),
            },
            "getCoinsData" => Operation::GetCoinsData {
                coins: args.flattened_strings(0)?,
            },
            "setCustomFeeData" => {
                let raw = args.values.first().cloned().unwrap_or(Value::Null);
                let fee_data = serde_json::from_value(raw).map_err(|e| args.invalid(e.to_string()))?;
                Operation::SetCustomFeeData { fee_data }
            }
            other => return Err(OperationError::UnknownMethod(other.to_string())),
        };

        if let Operation::HasAllowance { coins, amounts, .. } | Operation::EnsureAllowance { coins, amounts, .. } = &op
        {
            if coins.len() != amounts.len() {
                return Err(args.invalid(format!(
                    "{} coins but {} amounts",
                    coins.len(),
                    amounts.len()
                )));
            }
        }

        Ok(op)
    }

    /// Run the operation against `sdk` and serialize its result
    pub async fn execute(self, sdk: &dyn CurveSdk) -> Result<Value, SdkError> {
        fn encode<T: serde::Serialize>(value: T) -> Result<Value, SdkError> {
            serde_json::to_value(value).map_err(|e| SdkError::Decode(e.to_string()))
        }

        match self {
            Operation::Init { options } => encode(sdk.init(options).await?),
            Operation::Factory { factory, method } => match method {
                FactoryMethod::FetchPools { force } => encode(sdk.fetch_pools(factory, force).await?),
                FactoryMethod::FetchNewPools => encode(sdk.fetch_new_pools(factory).await?),
            },
            Operation::HasDepositAndStake => encode(sdk.has_deposit_and_stake().await?),
            Operation::HasRouter => encode(sdk.has_router().await?),
            Operation::GetPoolList => encode(sdk.get_pool_list().await?),
            Operation::GetVolume { network } => encode(sdk.get_volume(network).await?),
            Operation::GetTvl { network } => encode(sdk.get_tvl(network).await?),
            Operation::GetBasePools => encode(sdk.get_base_pools().await?),
            Operation::GetPool { pool_id } => encode(sdk.get_pool(pool_id).await?),
            Operation::GetUsdRate { coin } => encode(sdk.get_usd_rate(coin).await?),
            Operation::GetGasPriceFromL1 => encode(sdk.get_gas_price_from_l1().await?),
            Operation::GetGasPriceFromL2 => encode(sdk.get_gas_price_from_l2().await?),
            Operation::GetBalances { coins, addresses } => {
                encode(sdk.get_balances(coins, addresses).await?)
            }
            Operation::GetAllowance { coins, address, spender } => {
                encode(sdk.get_allowance(coins, address, spender).await?)
            }
            Operation::HasAllowance { coins, amounts, address, spender } => {
                encode(sdk.has_allowance(coins, amounts, address, spender).await?)
            }
            Operation::EnsureAllowance { coins, amounts, spender, is_max } => {
                encode(sdk.ensure_allowance(coins, amounts, spender, is_max).await?)
            }
            Operation::GetCoinsData { coins } => encode(sdk.get_coins_data(coins).await?),
            Operation::SetCustomFeeData { fee_data } => encode(sdk.set_custom_fee_data(fee_data).await?),
        }
    }
}

/// Positional argument reader for one request
struct Args<'a> {
    method: &'a str,
    values: Vec<Value>,
}

impl<'a> Args<'a> {
    fn new(method: &'a str, params: Value) -> Self {
        let values = match params {
            Value::Array(values) => values,
            Value::Null => Vec::new(),
            other => vec![other],
        };
        Self { method, values }
    }

    fn invalid(&self, reason: impl Into<String>) -> OperationError {
        OperationError::InvalidParams {
            method: self.method.to_string(),
            reason: reason.into(),
        }
    }

    fn string(&self, index: usize) -> Result<String, OperationError> {
        self.opt_string(index)?
            .ok_or_else(|| self.invalid(format!("missing argument {index}")))
    }

    fn opt_string(&self, index: usize) -> Result<Option<String>, OperationError> {
        match self.values.get(index) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => scalar_string(value)
                .map(Some)
                .ok_or_else(|| self.invalid(format!("argument {index} must be a string"))),
        }
    }

    fn opt_bool(&self, index: usize) -> Result<Option<bool>, OperationError> {
        match self.values.get(index) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Bool(flag)) => Ok(Some(*flag)),
            Some(_) => Err(self.invalid(format!("argument {index} must be a boolean"))),
        }
    }

    fn strings(&self, index: usize) -> Result<Vec<String>, OperationError> {
        match self.values.get(index) {
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| {
                    scalar_string(item)
                        .ok_or_else(|| self.invalid(format!("argument {index} must hold strings")))
                })
                .collect(),
            _ => Err(self.invalid(format!("argument {index} must be an array"))),
        }
    }

    /// Variadic tail: each remaining argument is a string or an array of them
    fn flattened_strings(&self, from: usize) -> Result<Vec<String>, OperationError> {
        let mut out = Vec::new();
        for (offset, value) in self.values.iter().enumerate().skip(from) {
            match value {
                Value::Array(_) => out.extend(self.strings(offset)?),
                other => out.push(
                    scalar_string(other)
                        .ok_or_else(|| self.invalid(format!("argument {offset} must be a string")))?,
                ),
            }
        }
        Ok(out)
    }

    fn init_options(&self) -> Result<InitOptions, OperationError> {
        let Some(first) = self.values.first() else {
            return Ok(InitOptions::default());
        };
        let raw = first.get("options").cloned().unwrap_or_else(|| first.clone());
        if raw.is_null() {
            return Ok(InitOptions::default());
        }
        serde_json::from_value(raw).map_err(|e| self.invalid(e.to_string()))
    }
}

fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reparse(op: &Operation) -> Operation {
        Operation::parse(op.name(), Value::Array(op.arguments())).unwrap()
    }

    #[test]
    fn test_parse_get_balances_with_variadic_addresses() {
        let op = Operation::parse(
            "getBalances",
            json!([["0xToken", "0xOther"], "0xAddr", ["0xB", "0xC"]]),
        )
        .unwrap();
        assert_eq!(
            op,
            Operation::GetBalances {
                coins: vec!["0xToken".into(), "0xOther".into()],
                addresses: vec!["0xAddr".into(), "0xB".into(), "0xC".into()],
            }
        );
    }

    #[test]
    fn test_parse_unknown_method() {
        let err = Operation::parse("getSecretKey", json!([])).unwrap_err();
        assert_eq!(err, OperationError::UnknownMethod("getSecretKey".into()));
        assert_eq!(err.to_string(), "Unknown method getSecretKey");
    }

    #[test]
    fn test_parse_factory_call() {
        let op = Operation::parse("factory", json!(["crvUSDFactory", "fetchPools", true])).unwrap();
        assert_eq!(
            op,
            Operation::Factory {
                factory: FactoryKind::CrvUsdFactory,
                method: FactoryMethod::FetchPools { force: true },
            }
        );

        let err = Operation::parse("factory", json!(["factory", "dropPools"])).unwrap_err();
        assert!(matches!(err, OperationError::InvalidParams { .. }));
    }

    #[test]
    fn test_parse_init_accepts_wrapped_and_bare_options() {
        let wrapped = Operation::parse("init", json!([{"options": {"chainId": 10}}])).unwrap();
        let bare = Operation::parse("init", json!({"chainId": 10})).unwrap();
        assert_eq!(wrapped, bare);

        let empty = Operation::parse("init", Value::Null).unwrap();
        assert_eq!(empty, Operation::Init { options: InitOptions::default() });
    }

    #[test]
    fn test_amounts_accept_numbers() {
        let op = Operation::parse(
            "hasAllowance",
            json!([["0xA", "0xB"], [1.5, "2"], "0xOwner", "0xSpender"]),
        )
        .unwrap();
        match op {
            Operation::HasAllowance { amounts, .. } => assert_eq!(amounts, vec!["1.5", "2"]),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_mismatched_amounts_are_rejected() {
        let err = Operation::parse("ensureAllowance", json!([["0xA", "0xB"], ["1"], "0xSpender"])).unwrap_err();
        assert!(err.to_string().contains("2 coins but 1 amounts"));
    }

    #[test]
    fn test_missing_argument_is_invalid() {
        let err = Operation::parse("getPool", json!([])).unwrap_err();
        assert_eq!(
            err,
            OperationError::InvalidParams {
                method: "getPool".into(),
                reason: "missing argument 0".into()
            }
        );
    }

    #[test]
    fn test_arguments_parse_back_to_same_operation() {
        let ops = vec![
            Operation::Init {
                options: InitOptions {
                    chain_id: Some(1),
                    ..Default::default()
                },
            },
            Operation::Factory {
                factory: FactoryKind::StableNgFactory,
                method: FactoryMethod::FetchNewPools,
            },
            Operation::GetTvl { network: None },
            Operation::GetAllowance {
                coins: vec!["0xA".into()],
                address: "0xOwner".into(),
                spender: "0xSpender".into(),
            },
            Operation::SetCustomFeeData {
                fee_data: FeeData {
                    gas_price: Some(20.0),
                    ..Default::default()
                },
            },
        ];
        for op in ops {
            assert_eq!(reparse(&op), op);
        }
    }
}
