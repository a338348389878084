//! DeFi SDK contract as seen by the worker
//!
//! The worker executes bridged operations against a [`CurveSdk`]. The trait
//! abstracts over the actual SDK; every method defaults to
//! [`SdkError::Unsupported`] so an implementation only overrides what it
//! can serve.

mod types;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::bridge::BridgeError;

pub use types::{
    Balances, BasePool, CoinData, FactoryKind, FeeData, InitOptions, NativeToken,
    NetworkConstants, PoolSummary, VolumeStats,
};

/// Errors raised by an SDK implementation
#[derive(Error, Debug)]
pub enum SdkError {
    #[error("{0} is not supported by this SDK")]
    Unsupported(&'static str),

    #[error("SDK is not initialized; call init first")]
    NotInitialized,

    #[error("unsupported network (chain id {0})")]
    UnsupportedNetwork(u64),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("rpc error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("decode error: {0}")]
    Decode(String),

    #[error("no signer available for {0}")]
    NoSigner(&'static str),

    #[error(transparent)]
    Bridge(#[from] BridgeError),
}

pub type SdkResult<T> = Result<T, SdkError>;

#[async_trait]
pub trait CurveSdk: Send + Sync + 'static {
    /// Connect to the network and return its constants
    async fn init(&self, options: InitOptions) -> SdkResult<NetworkConstants>;

    async fn fetch_pools(&self, _factory: FactoryKind, _force: bool) -> SdkResult<()> {
        Err(SdkError::Unsupported("fetchPools"))
    }

    async fn fetch_new_pools(&self, _factory: FactoryKind) -> SdkResult<Vec<String>> {
        Err(SdkError::Unsupported("fetchNewPools"))
    }

    async fn has_deposit_and_stake(&self) -> SdkResult<bool> {
        Err(SdkError::Unsupported("hasDepositAndStake"))
    }

    async fn has_router(&self) -> SdkResult<bool> {
        Err(SdkError::Unsupported("hasRouter"))
    }

    async fn get_pool_list(&self) -> SdkResult<Vec<String>> {
        Err(SdkError::Unsupported("getPoolList"))
    }

    async fn get_volume(&self, _network: Option<String>) -> SdkResult<VolumeStats> {
        Err(SdkError::Unsupported("getVolume"))
    }

    async fn get_tvl(&self, _network: Option<String>) -> SdkResult<f64> {
        Err(SdkError::Unsupported("getTVL"))
    }

    async fn get_base_pools(&self) -> SdkResult<Vec<BasePool>> {
        Err(SdkError::Unsupported("getBasePools"))
    }

    async fn get_pool(&self, _pool_id: String) -> SdkResult<PoolSummary> {
        Err(SdkError::Unsupported("getPool"))
    }

    async fn get_usd_rate(&self, _coin: String) -> SdkResult<f64> {
        Err(SdkError::Unsupported("getUsdRate"))
    }

    async fn get_gas_price_from_l1(&self) -> SdkResult<f64> {
        Err(SdkError::Unsupported("getGasPriceFromL1"))
    }

    async fn get_gas_price_from_l2(&self) -> SdkResult<f64> {
        Err(SdkError::Unsupported("getGasPriceFromL2"))
    }

    async fn get_balances(&self, _coins: Vec<String>, _addresses: Vec<String>) -> SdkResult<Balances> {
        Err(SdkError::Unsupported("getBalances"))
    }

    async fn get_allowance(
        &self,
        _coins: Vec<String>,
        _address: String,
        _spender: String,
    ) -> SdkResult<Vec<String>> {
        Err(SdkError::Unsupported("getAllowance"))
    }

    async fn has_allowance(
        &self,
        _coins: Vec<String>,
        _amounts: Vec<String>,
        _address: String,
        _spender: String,
    ) -> SdkResult<bool> {
        Err(SdkError::Unsupported("hasAllowance"))
    }

    /// Approve where needed; returns the approval transaction hashes
    async fn ensure_allowance(
        &self,
        _coins: Vec<String>,
        _amounts: Vec<String>,
        _spender: String,
        _is_max: bool,
    ) -> SdkResult<Vec<String>> {
        Err(SdkError::Unsupported("ensureAllowance"))
    }

    async fn get_coins_data(&self, _coins: Vec<String>) -> SdkResult<Vec<CoinData>> {
        Err(SdkError::Unsupported("getCoinsData"))
    }

    async fn set_custom_fee_data(&self, _fee_data: FeeData) -> SdkResult<()> {
        Err(SdkError::Unsupported("setCustomFeeData"))
    }
}
