use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::domain::sdk::{FeeData, InitOptions};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EndpointConfig {
    pub name: Option<String>,
    pub rpc: Option<String>,
    pub ws: Option<String>,
    pub ipc: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BridgeSettings {
    /// Fail calls with no completion after this long; unset waits forever
    pub call_timeout_ms: Option<u64>,
}

/// Gas settings in gwei
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FeeSettings {
    pub gas_price: Option<f64>,
    pub max_fee_per_gas: Option<f64>,
    pub max_priority_fee_per_gas: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub endpoints: Vec<EndpointConfig>,

    #[serde(default)]
    pub bridge: BridgeSettings,

    #[serde(default)]
    pub fees: FeeSettings,

    /// Overrides the chain id reported by the node (forks, dev chains)
    pub chain_id: Option<u64>,

    /// tracing filter used when RUST_LOG is unset
    pub log_filter: Option<String>,
}

impl BridgeSettings {
    pub fn call_timeout(&self) -> Option<Duration> {
        self.call_timeout_ms.filter(|ms| *ms > 0).map(Duration::from_millis)
    }
}

impl From<&FeeSettings> for FeeData {
    fn from(fees: &FeeSettings) -> Self {
        FeeData {
            gas_price: fees.gas_price,
            max_fee_per_gas: fees.max_fee_per_gas,
            max_priority_fee_per_gas: fees.max_priority_fee_per_gas,
        }
    }
}

impl Config {
    /// Options sent with the worker's `init`
    pub fn init_options(&self) -> InitOptions {
        InitOptions {
            gas_price: self.fees.gas_price,
            max_fee_per_gas: self.fees.max_fee_per_gas,
            max_priority_fee_per_gas: self.fees.max_priority_fee_per_gas,
            chain_id: self.chain_id,
        }
    }
}

pub fn load() -> Result<Config> {
    let Some(path) = config_path() else {
        return Ok(Config::default());
    };
    load_from(&path)
}

/// Read `path`; a missing file yields the defaults, an invalid one an error
pub fn load_from(path: &Path) -> Result<Config> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(_) => return Ok(Config::default()),
    };
    toml::from_str::<Config>(&content).with_context(|| format!("invalid config {}", path.display()))
}

pub fn config_path() -> Option<PathBuf> {
    if let Some(path) = std::env::var_os("CURVE_BRIDGE_CONFIG").map(PathBuf::from) {
        return Some(path);
    }
    if let Some(xdg) = std::env::var_os("XDG_CONFIG_HOME").map(PathBuf::from) {
        return Some(xdg.join("curve-bridge").join("config.toml"));
    }
    if let Some(home) = std::env::var_os("HOME").map(PathBuf::from) {
        return Some(home.join(".config").join("curve-bridge").join("config.toml"));
    }

    directories::ProjectDirs::from("io", "curve", "curve-bridge")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}
