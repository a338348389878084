//! Data types carried by SDK operations

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Options accepted by `init`; gas values are in gwei
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas_price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_fee_per_gas: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_priority_fee_per_gas: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<u64>,
}

impl InitOptions {
    pub fn fee_data(&self) -> FeeData {
        FeeData {
            gas_price: self.gas_price,
            max_fee_per_gas: self.max_fee_per_gas,
            max_priority_fee_per_gas: self.max_priority_fee_per_gas,
        }
    }
}

/// Custom fee data in gwei
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas_price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_fee_per_gas: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_priority_fee_per_gas: Option<f64>,
}

impl FeeData {
    /// Overlay the fields set in `other`
    pub fn merge(&mut self, other: FeeData) {
        if other.gas_price.is_some() {
            self.gas_price = other.gas_price;
        }
        if other.max_fee_per_gas.is_some() {
            self.max_fee_per_gas = other.max_fee_per_gas;
        }
        if other.max_priority_fee_per_gas.is_some() {
            self.max_priority_fee_per_gas = other.max_priority_fee_per_gas;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NativeToken {
    pub symbol: String,
    pub wrapped_symbol: String,
    pub address: String,
    pub wrapped_address: String,
}

/// Constants returned by `init`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct NetworkConstants {
    pub chain_id: u64,
    pub network_name: String,
    pub native_token: NativeToken,
    pub zero_address: String,
    #[serde(default)]
    pub signer_address: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoinData {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
}

/// `getBalances` result: flat for one address, keyed by address otherwise
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Balances {
    Single(Vec<String>),
    ByAddress(BTreeMap<String, Vec<String>>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeStats {
    pub total_volume: f64,
    pub crypto_volume: f64,
    pub crypto_share: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasePool {
    pub id: String,
    pub name: String,
    pub pool: String,
    pub token: String,
    pub coins: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolSummary {
    pub id: String,
    pub name: String,
    pub address: String,
    pub lp_token: String,
    pub coins: Vec<String>,
    pub decimals: Vec<u8>,
}

/// Pool factories exposed through the `factory` operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FactoryKind {
    #[serde(rename = "factory")]
    Factory,
    #[serde(rename = "cryptoFactory")]
    CryptoFactory,
    #[serde(rename = "twocryptoFactory")]
    TwocryptoFactory,
    #[serde(rename = "crvUSDFactory")]
    CrvUsdFactory,
    #[serde(rename = "tricryptoFactory")]
    TricryptoFactory,
    #[serde(rename = "stableNgFactory")]
    StableNgFactory,
}

impl FactoryKind {
    pub const ALL: [FactoryKind; 6] = [
        FactoryKind::Factory,
        FactoryKind::CryptoFactory,
        FactoryKind::TwocryptoFactory,
        FactoryKind::CrvUsdFactory,
        FactoryKind::TricryptoFactory,
        FactoryKind::StableNgFactory,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FactoryKind::Factory => "factory",
            FactoryKind::CryptoFactory => "cryptoFactory",
            FactoryKind::TwocryptoFactory => "twocryptoFactory",
            FactoryKind::CrvUsdFactory => "crvUSDFactory",
            FactoryKind::TricryptoFactory => "tricryptoFactory",
            FactoryKind::StableNgFactory => "stableNgFactory",
        }
    }
}

impl fmt::Display for FactoryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FactoryKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("unknown factory {s}"))
    }
}
