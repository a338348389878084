//! Message envelope exchanged across the bridge boundary

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::EnvelopeError;

/// Completion kind: the call succeeded, `params` is the result
pub const RESOLVE: &str = "resolve";
/// Completion kind: the call failed, `params` is the error value
pub const REJECT: &str = "reject";
/// Worker -> UI: forward a JSON-RPC payload to the UI-held provider
pub const PROVIDER_SEND: &str = "provider.send";
/// Worker -> UI: materialize contract handles for `{address, abi}`
pub const SET_CONTRACT: &str = "setContract";

/// Correlation identifier linking a request to its completion
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CallId(String);

impl CallId {
    /// Generate a fresh random (v4) identifier
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for CallId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for CallId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Wire shape: `{ "type": string, "id": string, "params": any }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub kind: String,
    pub id: CallId,
    #[serde(default)]
    pub params: Value,
}

impl Envelope {
    pub fn new(kind: impl Into<String>, id: CallId, params: Value) -> Self {
        Self {
            kind: kind.into(),
            id,
            params,
        }
    }

    /// Completion envelope for `outcome`, echoing `id`
    pub fn completion(id: CallId, outcome: Result<Value, Value>) -> Self {
        match outcome {
            Ok(value) => Self::new(RESOLVE, id, value),
            Err(error) => Self::new(REJECT, id, error),
        }
    }

    pub fn is_completion(&self) -> bool {
        self.kind == RESOLVE || self.kind == REJECT
    }
}

/// Typed view of an incoming envelope
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Resolve { id: CallId, value: Value },
    Reject { id: CallId, error: Value },
    ProviderSend { id: CallId, payload: Value },
    SetContract { address: String, abi: Value },
    /// Anything else names an operation on the receiving side
    Request { id: CallId, kind: String, params: Value },
}

impl TryFrom<Envelope> for Message {
    type Error = EnvelopeError;

    fn try_from(envelope: Envelope) -> Result<Self, Self::Error> {
        let Envelope { kind, id, params } = envelope;
        if kind.is_empty() {
            return Err(EnvelopeError::MissingKind { id });
        }

        let message = match kind.as_str() {
            RESOLVE => Message::Resolve { id, value: params },
            REJECT => Message::Reject { id, error: params },
            PROVIDER_SEND => Message::ProviderSend {
                id,
                payload: params,
            },
            SET_CONTRACT => {
                let address = params
                    .get("address")
                    .and_then(Value::as_str)
                    .ok_or_else(|| EnvelopeError::InvalidParams {
                        kind: kind.clone(),
                        reason: "missing string field `address`".to_string(),
                    })?
                    .to_string();
                let abi = params.get("abi").cloned().unwrap_or(Value::Null);
                if abi.is_null() {
                    return Err(EnvelopeError::InvalidParams {
                        kind,
                        reason: "missing field `abi`".to_string(),
                    });
                }
                Message::SetContract { address, abi }
            }
            _ => Message::Request { id, kind, params },
        };

        Ok(message)
    }
}
