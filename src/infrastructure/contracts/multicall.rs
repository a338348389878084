//! Batched reads through Multicall3 `aggregate3`

use alloy::primitives::{address, Address, Bytes};
use alloy_dyn_abi::{DynSolType, DynSolValue};
use alloy_json_abi::JsonAbi;
use anyhow::{bail, Context, Result};

use crate::infrastructure::abi::codec;
use crate::infrastructure::ethereum::EthereumProvider;

/// Multicall3, deployed at the same address on every supported chain
pub const MULTICALL3_ADDRESS: Address = address!("cA11bde05977b3631167028862bE2a173976CA11");

/// `aggregate3((address,bool,bytes)[])`
const AGGREGATE3_SELECTOR: [u8; 4] = [0x82, 0xad, 0x56, 0xcb];

/// Batched handle: builds calls to be aggregated instead of running them
#[derive(Debug, Clone)]
pub struct MulticallContract {
    address: Address,
    abi: JsonAbi,
}

/// One call queued for [`aggregate`]
#[derive(Debug, Clone)]
pub struct BatchedCall {
    pub target: Address,
    pub call_data: Bytes,
    pub outputs: Vec<DynSolType>,
}

impl MulticallContract {
    pub fn new(address: Address, abi: JsonAbi) -> Self {
        Self { address, abi }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn call(&self, name: &str, args: &[DynSolValue]) -> Result<BatchedCall> {
        let function = codec::function(&self.abi, name)?;
        Ok(BatchedCall {
            target: self.address,
            call_data: codec::encode_call(function, args)?.into(),
            outputs: codec::output_types(function)?,
        })
    }
}

/// Run `calls` in one `eth_call`
///
/// Individual failures do not abort the batch: a reverted call yields an
/// `Err` in its slot.
pub async fn aggregate(
    provider: &dyn EthereumProvider,
    calls: &[BatchedCall],
) -> Result<Vec<Result<Vec<DynSolValue>>>> {
    if calls.is_empty() {
        return Ok(Vec::new());
    }

    let output = provider
        .call(MULTICALL3_ADDRESS, encode_aggregate3(calls).into())
        .await
        .context("Multicall3 aggregate3 failed")?;
    let results = decode_aggregate3(&output)?;
    if results.len() != calls.len() {
        bail!("aggregate3 returned {} results for {} calls", results.len(), calls.len());
    }

    Ok(calls
        .iter()
        .zip(results)
        .map(|(call, (success, data))| {
            if !success {
                bail!("call to {} reverted", call.target);
            }
            codec::decode_with(&call.outputs, &data)
        })
        .collect())
}

fn encode_aggregate3(calls: &[BatchedCall]) -> Vec<u8> {
    let entries = calls
        .iter()
        .map(|call| {
            DynSolValue::Tuple(vec![
                DynSolValue::Address(call.target),
                DynSolValue::Bool(true),
                DynSolValue::Bytes(call.call_data.to_vec()),
            ])
        })
        .collect();

    let mut data = AGGREGATE3_SELECTOR.to_vec();
    data.extend(DynSolValue::Tuple(vec![DynSolValue::Array(entries)]).abi_encode_params());
    data
}

fn decode_aggregate3(data: &[u8]) -> Result<Vec<(bool, Vec<u8>)>> {
    let ty: DynSolType = "(bool,bytes)[]".parse().context("aggregate3 result type")?;
    let decoded = codec::decode_with(&[ty], data)?;

    let Some(DynSolValue::Array(entries)) = decoded.into_iter().next() else {
        bail!("unexpected aggregate3 return data");
    };
    entries
        .into_iter()
        .map(|entry| match entry {
            DynSolValue::Tuple(fields) => match fields.as_slice() {
                [DynSolValue::Bool(success), DynSolValue::Bytes(data)] => Ok((*success, data.clone())),
                _ => bail!("unexpected aggregate3 entry"),
            },
            _ => bail!("unexpected aggregate3 entry"),
        })
        .collect()
}
