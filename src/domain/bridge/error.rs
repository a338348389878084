//! Bridge error types

use std::time::Duration;

use serde_json::Value;
use thiserror::Error;

use super::CallId;

/// Failures surfaced to the caller of a bridged operation
#[derive(Error, Debug)]
pub enum BridgeError {
    /// Argument cannot cross the boundary (deferred value or callable)
    #[error("argument {index} is a {kind}; promises and functions are not allowed in worker requests")]
    NotTransportable { index: usize, kind: &'static str },

    #[error("failed to encode envelope: {0}")]
    Encode(#[from] serde_json::Error),

    /// The other side completed the call with `reject`
    #[error("remote call rejected: {0}")]
    Rejected(Value),

    #[error("bridge disconnected")]
    Disconnected,

    #[error("call {id} timed out after {after:?}")]
    Timeout { id: CallId, after: Duration },

    /// A resolve payload that does not have the operation's result shape
    #[error("unexpected result for {operation}: {reason}")]
    UnexpectedResult { operation: &'static str, reason: String },
}

impl BridgeError {
    /// Rejection payload, if the remote side rejected the call
    pub fn rejection(&self) -> Option<&Value> {
        match self {
            BridgeError::Rejected(value) => Some(value),
            _ => None,
        }
    }
}

/// An envelope that does not fit any message shape
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EnvelopeError {
    #[error("envelope {id} has an empty type")]
    MissingKind { id: CallId },

    #[error("invalid params for {kind}: {reason}")]
    InvalidParams { kind: String, reason: String },
}

/// A request whose type or params do not map onto a known operation
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OperationError {
    #[error("Unknown method {0}")]
    UnknownMethod(String),

    #[error("invalid params for {method}: {reason}")]
    InvalidParams { method: String, reason: String },
}
