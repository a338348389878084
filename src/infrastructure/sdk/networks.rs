//! Known networks and their native tokens

use crate::domain::sdk::{NativeToken, NetworkConstants};

/// Placeholder address for the chain's native coin
pub const NATIVE_TOKEN_ADDRESS: &str = "0xeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeee";
pub const ZERO_ADDRESS: &str = "0x0000000000000000000000000000000000000000";
/// OP-stack GasPriceOracle predeploy
pub const OP_GAS_PRICE_ORACLE: &str = "0x420000000000000000000000000000000000000f";

struct NetworkInfo {
    chain_id: u64,
    name: &'static str,
    symbol: &'static str,
    wrapped_symbol: &'static str,
    wrapped_address: &'static str,
    op_stack: bool,
}

const NETWORKS: &[NetworkInfo] = &[
    NetworkInfo {
        chain_id: 1,
        name: "ethereum",
        symbol: "ETH",
        wrapped_symbol: "WETH",
        wrapped_address: "0xc02aaa39b223fe8d0a0e5c4f27ead9083c756cc2",
        op_stack: false,
    },
    NetworkInfo {
        chain_id: 10,
        name: "optimism",
        symbol: "ETH",
        wrapped_symbol: "WETH",
        wrapped_address: "0x4200000000000000000000000000000000000006",
        op_stack: true,
    },
    NetworkInfo {
        chain_id: 100,
        name: "xdai",
        symbol: "XDAI",
        wrapped_symbol: "WXDAI",
        wrapped_address: "0xe91d153e0b41518a2ce8dd3d7944fa863463a97d",
        op_stack: false,
    },
    NetworkInfo {
        chain_id: 137,
        name: "polygon",
        symbol: "MATIC",
        wrapped_symbol: "WMATIC",
        wrapped_address: "0x0d500b1d8e8ef31e21c99d1db9a6444d3adf1270",
        op_stack: false,
    },
    NetworkInfo {
        chain_id: 250,
        name: "fantom",
        symbol: "FTM",
        wrapped_symbol: "WFTM",
        wrapped_address: "0x21be370d5312f44cb42ce377bc9b8a0cef1a4c83",
        op_stack: false,
    },
    NetworkInfo {
        chain_id: 8453,
        name: "base",
        symbol: "ETH",
        wrapped_symbol: "WETH",
        wrapped_address: "0x4200000000000000000000000000000000000006",
        op_stack: true,
    },
    NetworkInfo {
        chain_id: 42161,
        name: "arbitrum",
        symbol: "ETH",
        wrapped_symbol: "WETH",
        wrapped_address: "0x82af49447d8a07e3bd95bd0d56f35241523fbab1",
        op_stack: false,
    },
    NetworkInfo {
        chain_id: 43114,
        name: "avalanche",
        symbol: "AVAX",
        wrapped_symbol: "WAVAX",
        wrapped_address: "0xb31f66aa3c1e785363f0875a1b74e27b85fd66c7",
        op_stack: false,
    },
];

fn lookup(chain_id: u64) -> Option<&'static NetworkInfo> {
    NETWORKS.iter().find(|n| n.chain_id == chain_id)
}

/// Constants for `chain_id`, or `None` for an unknown network
pub fn constants_for(chain_id: u64, signer_address: Option<String>) -> Option<NetworkConstants> {
    let info = lookup(chain_id)?;
    Some(NetworkConstants {
        chain_id,
        network_name: info.name.to_string(),
        native_token: NativeToken {
            symbol: info.symbol.to_string(),
            wrapped_symbol: info.wrapped_symbol.to_string(),
            address: NATIVE_TOKEN_ADDRESS.to_string(),
            wrapped_address: info.wrapped_address.to_string(),
        },
        zero_address: ZERO_ADDRESS.to_string(),
        signer_address,
    })
}

/// Whether the chain posts data to L1 through the OP-stack gas oracle
pub fn is_op_stack(chain_id: u64) -> bool {
    lookup(chain_id).is_some_and(|n| n.op_stack)
}

pub fn is_native_token(address: &str) -> bool {
    address.trim().eq_ignore_ascii_case(NATIVE_TOKEN_ADDRESS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_network_constants() {
        let constants = constants_for(42161, None).unwrap();
        assert_eq!(constants.network_name, "arbitrum");
        assert_eq!(constants.native_token.symbol, "ETH");
        assert_eq!(constants.zero_address, ZERO_ADDRESS);
        assert!(constants_for(31337, None).is_none());
    }

    #[test]
    fn test_op_stack_detection() {
        assert!(is_op_stack(10));
        assert!(is_op_stack(8453));
        assert!(!is_op_stack(1));
        assert!(!is_op_stack(999_999));
    }

    #[test]
    fn test_native_token_marker_is_case_insensitive() {
        assert!(is_native_token("0xEeeeeEeeeEeEeeEeEeEeeEEEeeeeEeeeeeeeEEeE"));
        assert!(!is_native_token(ZERO_ADDRESS));
    }
}
