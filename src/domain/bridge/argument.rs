//! Call arguments and the transportability check

use std::fmt;
use std::sync::Arc;

use futures::future::BoxFuture;
use serde::Serialize;
use serde_json::Value;

use super::BridgeError;

/// Callback that only exists on the calling side
pub type Callback = Arc<dyn Fn(Value) + Send + Sync>;

/// An argument handed to [`crate::infrastructure::runtime::Bridge::request`]
///
/// Only `Data` survives serialization across the boundary. The other
/// variants exist so callers holding a closure or an unresolved future get a
/// descriptive error instead of a silent drop.
pub enum Argument {
    Data(Value),
    Callable(Callback),
    Deferred(BoxFuture<'static, Value>),
}

impl Argument {
    /// Serialize `value` into a data argument
    pub fn data<T: Serialize>(value: T) -> Result<Self, BridgeError> {
        Ok(Self::Data(serde_json::to_value(value)?))
    }

    fn kind(&self) -> &'static str {
        match self {
            Argument::Data(_) => "value",
            Argument::Callable(_) => "function",
            Argument::Deferred(_) => "promise",
        }
    }
}

impl From<Value> for Argument {
    fn from(value: Value) -> Self {
        Self::Data(value)
    }
}

impl fmt::Debug for Argument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Argument::Data(value) => f.debug_tuple("Data").field(value).finish(),
            other => f.write_str(other.kind()),
        }
    }
}

/// Check every argument and return the transportable payloads in order
pub fn into_transportable(args: Vec<Argument>) -> Result<Vec<Value>, BridgeError> {
    args.into_iter()
        .enumerate()
        .map(|(index, arg)| match arg {
            Argument::Data(value) => Ok(value),
            other => Err(BridgeError::NotTransportable {
                index,
                kind: other.kind(),
            }),
        })
        .collect()
}
