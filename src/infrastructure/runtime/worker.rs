//! Worker side - runs the SDK on its own thread and tokio runtime
//!
//! The worker never holds a network provider. Its SDK is handed an
//! [`ExternalRpcProvider`] that tunnels every JSON-RPC request back to the UI
//! side through the bridge.

use std::sync::mpsc as std_mpsc;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::{Context, Result};
use serde_json::Value;

use crate::domain::bridge::{CallId, Message, Operation, OperationError, PROVIDER_SEND, SET_CONTRACT};
use crate::domain::sdk::{CurveSdk, SdkResult};
use crate::infrastructure::runtime::bridge::Bridge;
use crate::infrastructure::runtime::port::{self, Inbox, Port};
use crate::infrastructure::sdk::ExternalRpcProvider;

/// Handle to a spawned worker thread
///
/// The worker stops once every [`Port`] into it has been dropped.
#[derive(Debug)]
pub struct WorkerHandle {
    thread: JoinHandle<()>,
}

/// UI-facing ends of a freshly spawned worker
#[derive(Debug)]
pub struct WorkerChannels {
    /// Posts envelopes to the worker
    pub port: Port,
    /// Envelopes coming back from the worker
    pub inbox: Inbox,
}

impl WorkerHandle {
    /// Spawn a worker thread with its own single-threaded Tokio runtime
    ///
    /// `make_sdk` runs on the worker thread and receives the tunnelled
    /// provider the SDK must use for all network access. Returns once the
    /// SDK is built, or with its construction error.
    pub fn spawn<F>(make_sdk: F, call_timeout: Option<Duration>) -> Result<(Self, WorkerChannels)>
    where
        F: FnOnce(ExternalRpcProvider) -> SdkResult<Arc<dyn CurveSdk>> + Send + 'static,
    {
        let (to_worker, worker_inbox) = port::channel();
        let (to_ui, ui_inbox) = port::channel();
        let (ready_tx, ready_rx) = std_mpsc::channel::<Result<()>>();

        let thread = thread::Builder::new()
            .name("curve-worker".to_string())
            .spawn(move || {
                let rt = match tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                {
                    Ok(rt) => rt,
                    Err(err) => {
                        let _ = ready_tx.send(Err(anyhow::Error::new(err).context("Failed to create worker runtime")));
                        return;
                    }
                };
                rt.block_on(async move {
                    let bridge = Bridge::new("worker", to_ui, call_timeout);
                    let sdk = match make_sdk(ExternalRpcProvider::new(bridge.clone())) {
                        Ok(sdk) => sdk,
                        Err(err) => {
                            let _ = ready_tx.send(Err(anyhow::Error::new(err).context("Failed to build SDK")));
                            return;
                        }
                    };
                    let _ = ready_tx.send(Ok(()));
                    run_worker(bridge, sdk, worker_inbox).await;
                });
            })
            .context("Failed to spawn worker thread")?;

        ready_rx
            .recv()
            .map_err(|_| anyhow::anyhow!("worker thread exited during startup"))??;

        Ok((
            Self { thread },
            WorkerChannels {
                port: to_worker,
                inbox: ui_inbox,
            },
        ))
    }

    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    /// Wait for the worker thread to exit
    pub fn join(self) -> Result<()> {
        self.thread
            .join()
            .map_err(|_| anyhow::anyhow!("worker thread panicked"))
    }
}

/// Run the worker message loop until the inbox closes
pub async fn run_worker(bridge: Bridge, sdk: Arc<dyn CurveSdk>, mut inbox: Inbox) {
    tracing::info!("worker started");

    while let Some(envelope) = inbox.recv().await {
        tracing::debug!(kind = %envelope.kind, id = %envelope.id, "worker received");
        let (id, kind, is_completion) = (envelope.id.clone(), envelope.kind.clone(), envelope.is_completion());
        let message = match Message::try_from(envelope) {
            Ok(message) => message,
            Err(err) if is_completion => {
                tracing::warn!(error = %err, "worker ignoring message");
                continue;
            }
            Err(err) => {
                tracing::warn!(error = %err, "worker rejecting malformed request");
                reject_unknown(&bridge, id, &kind);
                continue;
            }
        };

        match message {
            Message::Resolve { id, value } => {
                bridge.settle(&id, Ok(value));
            }
            Message::Reject { id, error } => {
                bridge.settle(&id, Err(error));
            }
            Message::Request { id, kind, params } => dispatch(&bridge, &sdk, id, &kind, params),
            Message::ProviderSend { id, .. } => {
                // The worker owns no provider to forward to
                dispatch(&bridge, &sdk, id, PROVIDER_SEND, Value::Null)
            }
            Message::SetContract { address, .. } => {
                tracing::warn!(%address, "worker has no contract registry");
                reject_unknown(&bridge, id, SET_CONTRACT);
            }
        }
    }

    tracing::info!(pending = bridge.pending_calls(), "worker inbox closed, stopping");
    bridge.disconnect();
}

/// Answer a request the worker has no operation for
fn reject_unknown(bridge: &Bridge, id: CallId, kind: &str) {
    let error = OperationError::UnknownMethod(kind.to_string()).to_string();
    if let Err(err) = bridge.respond(id, Err(Value::String(error))) {
        tracing::warn!(error = %err, "could not deliver rejection");
    }
}

/// Parse and execute one request; the completion is posted when it finishes
fn dispatch(bridge: &Bridge, sdk: &Arc<dyn CurveSdk>, id: CallId, kind: &str, params: Value) {
    let op = match Operation::parse(kind, params) {
        Ok(op) => op,
        Err(err) => {
            tracing::warn!(kind, id = %id, error = %err, "rejecting request");
            if let Err(err) = bridge.respond(id, Err(Value::String(err.to_string()))) {
                tracing::warn!(error = %err, "could not deliver rejection");
            }
            return;
        }
    };

    let bridge = bridge.clone();
    let sdk = Arc::clone(sdk);
    tokio::spawn(async move {
        let name = op.name();
        let outcome = op.execute(sdk.as_ref()).await.map_err(|err| {
            tracing::debug!(op = name, id = %id, error = %err, "operation failed");
            Value::String(err.to_string())
        });
        if let Err(err) = bridge.respond(id, outcome) {
            tracing::warn!(op = name, error = %err, "could not deliver completion");
        }
    });
}
