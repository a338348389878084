//! Infrastructure layer - External service integrations
//!
//! This layer contains:
//! - Alloy-based Ethereum provider implementations
//! - ABI encoding and decoding using alloy-dyn-abi
//! - Contract handles registered on behalf of the worker
//! - The request bridge, worker thread and UI adapter
//! - The worker-side SDK served over the tunnelled provider

pub mod abi;
pub mod contracts;
pub mod ethereum;
pub mod runtime;
pub mod sdk;

pub use runtime::{CurveApiAdapter, WorkerHandle};
