//! Request bridge - correlates calls across the UI/worker boundary
//!
//! Each side owns one [`Bridge`]. Issuing a call records a pending entry
//! under a fresh correlation id and posts a request envelope; the matching
//! `resolve`/`reject` envelope coming back settles that entry. Completions
//! may arrive in any order: the id lookup is the only ordering mechanism.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use serde_json::Value;
use tokio::sync::oneshot;
use tokio::time::Sleep;

use crate::domain::bridge::{into_transportable, Argument, BridgeError, CallId, Envelope};
use crate::infrastructure::runtime::pending::{Completion, PendingCalls};
use crate::infrastructure::runtime::port::Port;

/// One side's view of the bridge
#[derive(Debug, Clone)]
pub struct Bridge {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    side: &'static str,
    port: Port,
    pending: PendingCalls,
    call_timeout: Option<Duration>,
}

impl Bridge {
    /// Create a bridge posting through `port`
    ///
    /// `side` only labels log lines. Without `call_timeout` a call whose
    /// completion never arrives stays pending until its [`Reply`] is dropped.
    pub fn new(side: &'static str, port: Port, call_timeout: Option<Duration>) -> Self {
        Self {
            inner: Arc::new(Inner {
                side,
                port,
                pending: PendingCalls::new(),
                call_timeout,
            }),
        }
    }

    pub fn side(&self) -> &'static str {
        self.inner.side
    }

    /// Issue `kind` with positional `args`
    ///
    /// Fails before anything is posted if an argument cannot cross the
    /// boundary.
    pub fn request(&self, kind: &str, args: Vec<Argument>) -> Result<Reply, BridgeError> {
        let values = into_transportable(args)?;
        self.request_value(kind, Value::Array(values))
    }

    /// Issue `kind` with a single, already-serialized payload
    pub fn request_value(&self, kind: &str, params: Value) -> Result<Reply, BridgeError> {
        let (id, rx) = self.inner.pending.open();
        let envelope = Envelope::new(kind, id.clone(), params);
        if let Err(err) = self.inner.port.post(&envelope) {
            self.inner.pending.cancel(&id);
            return Err(err);
        }
        tracing::debug!(side = self.inner.side, kind, id = %id, "request");

        Ok(Reply {
            id,
            rx,
            bridge: Arc::clone(&self.inner),
            timeout: self.inner.call_timeout,
            deadline: None,
            done: false,
        })
    }

    /// Issue `kind` and wait for its completion
    pub async fn call(&self, kind: &str, args: Vec<Argument>) -> Result<Value, BridgeError> {
        self.request(kind, args)?.await
    }

    /// Post an envelope that expects no completion
    pub fn notify(&self, kind: &str, params: Value) -> Result<(), BridgeError> {
        let envelope = Envelope::new(kind, CallId::generate(), params);
        tracing::debug!(side = self.inner.side, kind, id = %envelope.id, "notify");
        self.inner.port.post(&envelope)
    }

    /// Send the completion for a call the other side issued
    pub fn respond(&self, id: CallId, outcome: Completion) -> Result<(), BridgeError> {
        let envelope = Envelope::completion(id, outcome);
        tracing::debug!(side = self.inner.side, kind = %envelope.kind, id = %envelope.id, "respond");
        self.inner.port.post(&envelope)
    }

    /// Deliver an incoming completion to its pending call
    ///
    /// Unmatched ids are logged and dropped.
    pub fn settle(&self, id: &CallId, completion: Completion) -> bool {
        let resolved = completion.is_ok();
        if self.inner.pending.settle(id, completion) {
            tracing::debug!(side = self.inner.side, id = %id, resolved, "settled");
            true
        } else {
            tracing::warn!(side = self.inner.side, id = %id, "completion for unknown call, dropping");
            false
        }
    }

    /// Fail every pending call with [`BridgeError::Disconnected`]
    ///
    /// Used once the other side's channel has closed and no completion can
    /// arrive any more.
    pub fn disconnect(&self) {
        let dropped = self.inner.pending.clear();
        if dropped > 0 {
            tracing::warn!(side = self.inner.side, dropped, "other side gone, failing pending calls");
        }
    }

    /// Number of calls awaiting a completion
    pub fn pending_calls(&self) -> usize {
        self.inner.pending.len()
    }

    pub fn is_pending(&self, id: &CallId) -> bool {
        self.inner.pending.contains(id)
    }
}

/// Eventual result of a bridged call
///
/// Resolves with the `resolve` payload, or fails with
/// [`BridgeError::Rejected`] carrying the `reject` payload. Dropping an
/// unfinished reply releases its pending entry; a late completion is then
/// treated as unmatched.
#[derive(Debug)]
pub struct Reply {
    id: CallId,
    rx: oneshot::Receiver<Completion>,
    bridge: Arc<Inner>,
    timeout: Option<Duration>,
    deadline: Option<Pin<Box<Sleep>>>,
    done: bool,
}

impl Reply {
    pub fn id(&self) -> &CallId {
        &self.id
    }
}

impl Future for Reply {
    type Output = Result<Value, BridgeError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        if this.done {
            return Poll::Ready(Err(BridgeError::Disconnected));
        }

        if let Poll::Ready(received) = Pin::new(&mut this.rx).poll(cx) {
            this.done = true;
            return Poll::Ready(match received {
                Ok(Ok(value)) => Ok(value),
                Ok(Err(error)) => Err(BridgeError::Rejected(error)),
                Err(_) => Err(BridgeError::Disconnected),
            });
        }

        if let Some(after) = this.timeout {
            let deadline = this
                .deadline
                .get_or_insert_with(|| Box::pin(tokio::time::sleep(after)));
            if deadline.as_mut().poll(cx).is_ready() {
                this.done = true;
                this.bridge.pending.cancel(&this.id);
                tracing::warn!(side = this.bridge.side, id = %this.id, ?after, "call timed out");
                return Poll::Ready(Err(BridgeError::Timeout {
                    id: this.id.clone(),
                    after,
                }));
            }
        }

        Poll::Pending
    }
}

impl Drop for Reply {
    fn drop(&mut self) {
        if !self.done && self.bridge.pending.cancel(&self.id) {
            tracing::debug!(side = self.bridge.side, id = %self.id, "call abandoned");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::runtime::port::{channel, Inbox};
    use serde_json::json;
    use std::sync::Arc as StdArc;

    fn bridge() -> (Bridge, Inbox) {
        let (port, inbox) = channel();
        (Bridge::new("test", port, None), inbox)
    }

    #[tokio::test]
    async fn test_resolve_completes_call() {
        let (bridge, mut outbox) = bridge();
        let reply = bridge
            .request("getBalances", vec![json!(["0xToken"]).into(), json!("0xAddr").into()])
            .unwrap();

        let sent = outbox.try_recv().unwrap();
        assert_eq!(sent.kind, "getBalances");
        assert_eq!(sent.params, json!([["0xToken"], "0xAddr"]));
        assert_eq!(&sent.id, reply.id());

        assert!(bridge.settle(&sent.id, Ok(json!(["1000"]))));
        assert_eq!(reply.await.unwrap(), json!(["1000"]));
        assert_eq!(bridge.pending_calls(), 0);
    }

    #[tokio::test]
    async fn test_reject_carries_payload() {
        let (bridge, mut outbox) = bridge();
        let reply = bridge.request("getPool", vec![json!("nope").into()]).unwrap();
        let sent = outbox.try_recv().unwrap();

        bridge.settle(&sent.id, Err(json!({"message": "pool not found"})));
        let err = reply.await.unwrap_err();
        assert_eq!(err.rejection(), Some(&json!({"message": "pool not found"})));
    }

    #[tokio::test]
    async fn test_untransportable_argument_posts_nothing() {
        let (bridge, mut outbox) = bridge();
        let err = bridge
            .request("getPool", vec![Argument::Callable(StdArc::new(|_| {}))])
            .unwrap_err();
        assert!(matches!(err, BridgeError::NotTransportable { index: 0, .. }));
        assert!(outbox.try_recv().is_none());
        assert_eq!(bridge.pending_calls(), 0);
    }

    #[tokio::test]
    async fn test_timeout_releases_pending_entry() {
        let (port, mut outbox) = channel();
        let bridge = Bridge::new("test", port, Some(Duration::from_millis(20)));
        let reply = bridge.request("hasRouter", vec![]).unwrap();
        let sent = outbox.try_recv().unwrap();

        let err = reply.await.unwrap_err();
        assert!(matches!(err, BridgeError::Timeout { .. }));
        assert!(!bridge.is_pending(&sent.id));
        assert!(!bridge.settle(&sent.id, Ok(json!(true))));
    }

    #[tokio::test]
    async fn test_dropped_reply_abandons_call() {
        let (bridge, mut outbox) = bridge();
        let reply = bridge.request("hasRouter", vec![]).unwrap();
        let sent = outbox.try_recv().unwrap();
        drop(reply);
        assert_eq!(bridge.pending_calls(), 0);
        assert!(!bridge.settle(&sent.id, Ok(json!(true))));
    }

    #[tokio::test]
    async fn test_request_on_closed_port_fails_without_leaking() {
        let (bridge, outbox) = bridge();
        drop(outbox);
        let err = bridge.request("hasRouter", vec![]).unwrap_err();
        assert!(matches!(err, BridgeError::Disconnected));
        assert_eq!(bridge.pending_calls(), 0);
    }

    #[tokio::test]
    async fn test_disconnect_fails_pending_calls() {
        let (bridge, _outbox) = bridge();
        let reply = bridge.request("getPoolList", vec![]).unwrap();
        bridge.disconnect();
        assert!(matches!(reply.await.unwrap_err(), BridgeError::Disconnected));
        assert_eq!(bridge.pending_calls(), 0);
    }

    #[tokio::test]
    async fn test_respond_echoes_id() {
        let (bridge, mut outbox) = bridge();
        bridge.respond(CallId::from("abc"), Err(json!("boom"))).unwrap();
        let sent = outbox.try_recv().unwrap();
        assert_eq!(sent, Envelope::new("reject", CallId::from("abc"), json!("boom")));
    }
}
