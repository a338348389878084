//! Call encoding and return decoding using alloy-dyn-abi

use alloy_dyn_abi::{DynSolType, DynSolValue};
use alloy_json_abi::{Function, JsonAbi, Param};
use anyhow::{bail, Context, Result};
use serde_json::{json, Value};

/// Look up a function by name (first overload wins)
pub fn function<'a>(abi: &'a JsonAbi, name: &str) -> Result<&'a Function> {
    abi.function(name)
        .and_then(|overloads| overloads.first())
        .with_context(|| format!("function '{name}' not found in ABI"))
}

/// Selector followed by the ABI-encoded arguments
pub fn encode_call(function: &Function, args: &[DynSolValue]) -> Result<Vec<u8>> {
    if args.len() != function.inputs.len() {
        bail!(
            "{} expects {} arguments, got {}",
            function.name,
            function.inputs.len(),
            args.len()
        );
    }
    let mut data = function.selector().to_vec();
    if !args.is_empty() {
        data.extend(DynSolValue::Tuple(args.to_vec()).abi_encode_params());
    }
    Ok(data)
}

/// Parse textual arguments against the function's input types
pub fn coerce_args(function: &Function, raw: &[&str]) -> Result<Vec<DynSolValue>> {
    if raw.len() != function.inputs.len() {
        bail!(
            "{} expects {} arguments, got {}",
            function.name,
            function.inputs.len(),
            raw.len()
        );
    }
    function
        .inputs
        .iter()
        .zip(raw)
        .map(|(param, text)| {
            param_type(param)?
                .coerce_str(text)
                .with_context(|| format!("Failed to parse '{text}' as {}", param.ty))
        })
        .collect()
}

/// Decode return data into one value per output
pub fn decode_output(function: &Function, data: &[u8]) -> Result<Vec<DynSolValue>> {
    let types = output_types(function)?;
    decode_with(&types, data)
}

pub fn output_types(function: &Function) -> Result<Vec<DynSolType>> {
    function.outputs.iter().map(param_type).collect()
}

pub fn decode_with(types: &[DynSolType], data: &[u8]) -> Result<Vec<DynSolValue>> {
    if types.is_empty() {
        return Ok(Vec::new());
    }
    let decoded = DynSolType::Tuple(types.to_vec())
        .abi_decode_params(data)
        .context("Failed to decode return data")?;
    Ok(match decoded {
        DynSolValue::Tuple(values) => values,
        other => vec![other],
    })
}

fn param_type(param: &Param) -> Result<DynSolType> {
    let ty = param.selector_type();
    ty.parse::<DynSolType>()
        .with_context(|| format!("Failed to parse type '{}' for param '{}'", ty, param.name))
}

/// Convert a decoded value to JSON; integers become decimal strings
pub fn to_json(value: &DynSolValue) -> Value {
    match value {
        DynSolValue::Bool(b) => json!(b),
        DynSolValue::Int(i, _) => json!(i.to_string()),
        DynSolValue::Uint(u, _) => json!(u.to_string()),
        DynSolValue::FixedBytes(word, size) => {
            json!(format!("0x{}", hex::encode(&word.as_slice()[..(*size).min(32)])))
        }
        DynSolValue::Address(addr) => json!(addr.to_checksum(None)),
        DynSolValue::Function(func) => json!(format!("0x{}", hex::encode(func.as_slice()))),
        DynSolValue::Bytes(bytes) => json!(format!("0x{}", hex::encode(bytes))),
        DynSolValue::String(s) => json!(s),
        DynSolValue::Array(items) | DynSolValue::FixedArray(items) | DynSolValue::Tuple(items) => {
            Value::Array(items.iter().map(to_json).collect())
        }
    }
}
