//! ERC-20 ABI and amount formatting

use alloy::primitives::{Address, U256};
use alloy_dyn_abi::{DynSolType, DynSolValue};
use alloy_json_abi::JsonAbi;

use crate::domain::sdk::{SdkError, SdkResult};
use crate::infrastructure::abi::codec;

/// Minimal ERC-20 ABI sent with `setContract` and used for encoding
pub const ERC20_ABI_JSON: &str = r#"[
  {"type":"function","name":"name","stateMutability":"view","inputs":[],"outputs":[{"name":"","type":"string"}]},
  {"type":"function","name":"symbol","stateMutability":"view","inputs":[],"outputs":[{"name":"","type":"string"}]},
  {"type":"function","name":"decimals","stateMutability":"view","inputs":[],"outputs":[{"name":"","type":"uint8"}]},
  {"type":"function","name":"totalSupply","stateMutability":"view","inputs":[],"outputs":[{"name":"","type":"uint256"}]},
  {"type":"function","name":"balanceOf","stateMutability":"view","inputs":[{"name":"account","type":"address"}],"outputs":[{"name":"","type":"uint256"}]},
  {"type":"function","name":"allowance","stateMutability":"view","inputs":[{"name":"owner","type":"address"},{"name":"spender","type":"address"}],"outputs":[{"name":"","type":"uint256"}]},
  {"type":"function","name":"approve","stateMutability":"nonpayable","inputs":[{"name":"spender","type":"address"},{"name":"amount","type":"uint256"}],"outputs":[{"name":"","type":"bool"}]},
  {"type":"function","name":"transfer","stateMutability":"nonpayable","inputs":[{"name":"to","type":"address"},{"name":"amount","type":"uint256"}],"outputs":[{"name":"","type":"bool"}]}
]"#;

/// Parsed ERC-20 ABI with typed call builders
#[derive(Debug, Clone)]
pub struct Erc20 {
    abi: JsonAbi,
}

impl Erc20 {
    pub fn load() -> SdkResult<Self> {
        let abi = serde_json::from_str(ERC20_ABI_JSON)
            .map_err(|e| SdkError::Decode(format!("ERC-20 ABI: {e}")))?;
        Ok(Self { abi })
    }

    pub fn abi(&self) -> &JsonAbi {
        &self.abi
    }

    pub fn balance_of(&self, owner: Address) -> SdkResult<Vec<u8>> {
        self.encode("balanceOf", &[DynSolValue::Address(owner)])
    }

    pub fn allowance(&self, owner: Address, spender: Address) -> SdkResult<Vec<u8>> {
        self.encode(
            "allowance",
            &[DynSolValue::Address(owner), DynSolValue::Address(spender)],
        )
    }

    pub fn approve(&self, spender: Address, amount: U256) -> SdkResult<Vec<u8>> {
        self.encode(
            "approve",
            &[DynSolValue::Address(spender), DynSolValue::Uint(amount, 256)],
        )
    }

    pub fn decimals(&self) -> SdkResult<Vec<u8>> {
        self.encode("decimals", &[])
    }

    pub fn name(&self) -> SdkResult<Vec<u8>> {
        self.encode("name", &[])
    }

    pub fn symbol(&self) -> SdkResult<Vec<u8>> {
        self.encode("symbol", &[])
    }

    fn encode(&self, name: &str, args: &[DynSolValue]) -> SdkResult<Vec<u8>> {
        let function = codec::function(&self.abi, name).map_err(|e| SdkError::Decode(e.to_string()))?;
        codec::encode_call(function, args).map_err(|e| SdkError::InvalidInput(e.to_string()))
    }
}

/// First 32-byte word as U256
pub fn decode_uint(data: &[u8]) -> SdkResult<U256> {
    if data.len() < 32 {
        return Err(SdkError::Decode(format!(
            "expected 32 bytes of return data, got {}",
            data.len()
        )));
    }
    Ok(U256::from_be_slice(&data[..32]))
}

/// `string` return value, falling back to a NUL-padded `bytes32`
pub fn decode_text(data: &[u8]) -> SdkResult<String> {
    if let Ok(DynSolValue::String(text)) = DynSolType::String.abi_decode(data) {
        return Ok(text);
    }
    if data.len() == 32 {
        let trimmed: Vec<u8> = data.iter().copied().take_while(|b| *b != 0).collect();
        return String::from_utf8(trimmed).map_err(|e| SdkError::Decode(e.to_string()));
    }
    Err(SdkError::Decode("expected string or bytes32 return data".to_string()))
}

/// Format token balance with decimals
///
/// Fails when `10^decimals` does not fit in 256 bits.
pub fn format_token_balance(value: U256, decimals: u8) -> SdkResult<String> {
    if decimals == 0 {
        return Ok(value.to_string());
    }

    let divisor = U256::from(10u64)
        .checked_pow(U256::from(decimals))
        .ok_or_else(|| SdkError::Decode(format!("token reports {decimals} decimals")))?;
    let whole = value / divisor;
    let frac = value % divisor;

    let frac_str = format!("{:0>width$}", frac, width = decimals as usize);
    let trimmed = frac_str.trim_end_matches('0');
    if trimmed.is_empty() {
        Ok(whole.to_string())
    } else {
        Ok(format!("{whole}.{trimmed}"))
    }
}

/// Parse a human decimal amount ("1.5") into base units
pub fn parse_token_amount(amount: &str, decimals: u8) -> SdkResult<U256> {
    let amount = amount.trim();
    let invalid = || SdkError::InvalidInput(format!("invalid amount '{amount}'"));

    let (whole, frac) = match amount.split_once('.') {
        Some((whole, frac)) => (whole, frac),
        None => (amount, ""),
    };
    if whole.is_empty() && frac.is_empty() {
        return Err(invalid());
    }
    if !whole.chars().all(|c| c.is_ascii_digit()) || !frac.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid());
    }
    if frac.len() > decimals as usize {
        return Err(SdkError::InvalidInput(format!(
            "amount '{amount}' has more than {decimals} decimals"
        )));
    }

    let digits = format!("{whole}{frac:0<width$}", width = decimals as usize);
    let digits = digits.trim_start_matches('0');
    if digits.is_empty() {
        return Ok(U256::ZERO);
    }
    U256::from_str_radix(digits, 10).map_err(|_| invalid())
}
