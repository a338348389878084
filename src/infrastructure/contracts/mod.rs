//! UI-side contract handles, registered on request from the worker

mod multicall;
mod registry;

pub use multicall::{aggregate, BatchedCall, MulticallContract, MULTICALL3_ADDRESS};
pub use registry::{Contract, ContractHandles, ContractRegistry};
