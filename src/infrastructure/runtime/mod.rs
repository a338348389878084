//! Runtime infrastructure - the request bridge and the two sides using it

mod adapter;
mod bridge;
mod pending;
pub mod port;
mod worker;

pub use adapter::{CurveApiAdapter, FactoryAdapter};
pub use bridge::{Bridge, Reply};
pub use pending::{Completion, PendingCalls};
pub use port::{Inbox, Port};
pub use worker::{run_worker, WorkerChannels, WorkerHandle};
