//! Message port - the only channel between the two sides
//!
//! Envelopes cross as serialized JSON text, so nothing but plain data can
//! reach the other side.

use tokio::sync::mpsc::{self, error::TryRecvError, UnboundedReceiver, UnboundedSender};

use crate::domain::bridge::{BridgeError, Envelope};

/// Sending half: posts envelopes to the other side
#[derive(Debug, Clone)]
pub struct Port {
    tx: UnboundedSender<String>,
}

impl Port {
    pub fn post(&self, envelope: &Envelope) -> Result<(), BridgeError> {
        let text = serde_json::to_string(envelope)?;
        tracing::trace!(kind = %envelope.kind, id = %envelope.id, "post");
        self.tx.send(text).map_err(|_| BridgeError::Disconnected)
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Receiving half: yields decoded envelopes, skipping malformed text
#[derive(Debug)]
pub struct Inbox {
    rx: UnboundedReceiver<String>,
}

impl Inbox {
    /// Next well-formed envelope; `None` once every port is dropped
    pub async fn recv(&mut self) -> Option<Envelope> {
        loop {
            let text = self.rx.recv().await?;
            if let Some(envelope) = decode(&text) {
                return Some(envelope);
            }
        }
    }

    /// Non-blocking receive
    pub fn try_recv(&mut self) -> Option<Envelope> {
        loop {
            match self.rx.try_recv() {
                Ok(text) => {
                    if let Some(envelope) = decode(&text) {
                        return Some(envelope);
                    }
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => return None,
            }
        }
    }
}

fn decode(text: &str) -> Option<Envelope> {
    match serde_json::from_str::<Envelope>(text) {
        Ok(envelope) => Some(envelope),
        Err(err) => {
            tracing::warn!(error = %err, "dropping malformed message");
            None
        }
    }
}

/// One direction of the boundary
pub fn channel() -> (Port, Inbox) {
    let (tx, rx) = mpsc::unbounded_channel();
    (Port { tx }, Inbox { rx })
}

/// Raw text channel, for feeding hand-written messages into an inbox
pub fn raw_channel() -> (UnboundedSender<String>, Inbox) {
    let (tx, rx) = mpsc::unbounded_channel();
    (tx, Inbox { rx })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::bridge::CallId;
    use serde_json::json;

    #[tokio::test]
    async fn test_port_delivers_envelopes_in_order() {
        let (port, mut inbox) = channel();
        port.post(&Envelope::new("a", CallId::from("1"), json!([]))).unwrap();
        port.post(&Envelope::new("b", CallId::from("2"), json!([]))).unwrap();

        assert_eq!(inbox.recv().await.unwrap().kind, "a");
        assert_eq!(inbox.recv().await.unwrap().kind, "b");
        assert!(inbox.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_inbox_skips_malformed_text() {
        let (tx, mut inbox) = raw_channel();
        tx.send("not json".to_string()).unwrap();
        tx.send(r#"{"id":"no-type"}"#.to_string()).unwrap();
        tx.send(r#"{"type":"resolve","id":"x","params":1}"#.to_string()).unwrap();

        let envelope = inbox.recv().await.unwrap();
        assert_eq!(envelope.kind, "resolve");
        assert_eq!(envelope.params, json!(1));
    }

    #[tokio::test]
    async fn test_post_after_inbox_dropped_is_disconnected() {
        let (port, inbox) = channel();
        drop(inbox);
        assert!(port.is_closed());
        let err = port.post(&Envelope::new("a", CallId::from("1"), json!(null))).unwrap_err();
        assert!(matches!(err, BridgeError::Disconnected));
    }
}
