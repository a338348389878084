//! Domain layer - bridge protocol and SDK contracts
//!
//! Nothing in here knows about threads, channels or alloy transports.

pub mod bridge;
pub mod sdk;
