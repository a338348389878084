//! Worker-side SDK implementation over the tunnelled provider

pub mod erc20;
mod external_provider;
pub mod networks;
mod provider_sdk;

pub use erc20::{Erc20, ERC20_ABI_JSON};
pub use external_provider::ExternalRpcProvider;
pub use provider_sdk::ProviderSdk;
