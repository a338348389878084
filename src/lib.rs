//! curve-bridge - correlates SDK calls between a UI side and a worker side
//!
//! The worker runs the SDK on its own thread and tunnels every JSON-RPC
//! request back to the UI side, which owns the only network provider.

pub mod config;
pub mod domain;
pub mod infrastructure;
