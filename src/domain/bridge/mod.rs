//! Bridge domain models: envelopes, arguments, operations and errors
//!
//! These types are independent of the transport and of the threads that
//! run either side of the bridge.

mod argument;
mod envelope;
mod error;
mod operation;

pub use argument::{into_transportable, Argument, Callback};
pub use envelope::{
    CallId, Envelope, Message, PROVIDER_SEND, REJECT, RESOLVE, SET_CONTRACT,
};
pub use error::{BridgeError, EnvelopeError, OperationError};
pub use operation::{FactoryMethod, Operation};
