//! Pending call table keyed by correlation id

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde_json::Value;
use tokio::sync::oneshot;

use crate::domain::bridge::CallId;

/// Outcome delivered to a pending call: `Ok` for resolve, `Err` for reject
pub type Completion = Result<Value, Value>;

/// In-flight calls awaiting a completion envelope
///
/// Each entry is inserted once when a call is issued and removed exactly
/// once, by [`PendingCalls::settle`] or [`PendingCalls::cancel`].
#[derive(Debug, Default)]
pub struct PendingCalls {
    calls: Mutex<HashMap<CallId, oneshot::Sender<Completion>>>,
}

impl PendingCalls {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a call under a fresh id
    pub fn open(&self) -> (CallId, oneshot::Receiver<Completion>) {
        let (tx, rx) = oneshot::channel();
        let mut calls = self.lock();
        let mut id = CallId::generate();
        while calls.contains_key(&id) {
            id = CallId::generate();
        }
        calls.insert(id.clone(), tx);
        (id, rx)
    }

    /// Deliver `completion` to the call registered under `id`
    ///
    /// Returns `false` when no such call is pending. A caller that already
    /// dropped its receiver still counts as settled.
    pub fn settle(&self, id: &CallId, completion: Completion) -> bool {
        let Some(tx) = self.lock().remove(id) else {
            return false;
        };
        let _ = tx.send(completion);
        true
    }

    /// Forget a call without completing it
    pub fn cancel(&self, id: &CallId) -> bool {
        self.lock().remove(id).is_some()
    }

    /// Drop every pending call; their replies fail as disconnected
    pub fn clear(&self) -> usize {
        let mut calls = self.lock();
        let count = calls.len();
        calls.clear();
        count
    }

    pub fn contains(&self, id: &CallId) -> bool {
        self.lock().contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<CallId, oneshot::Sender<Completion>>> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_settle_delivers_once() {
        let pending = PendingCalls::new();
        let (id, rx) = pending.open();
        assert!(pending.contains(&id));

        assert!(pending.settle(&id, Ok(json!(42))));
        assert!(!pending.settle(&id, Ok(json!(43))));
        assert_eq!(rx.await.unwrap(), Ok(json!(42)));
        assert!(pending.is_empty());
    }

    #[test]
    fn test_unknown_id_is_not_settled() {
        let pending = PendingCalls::new();
        assert!(!pending.settle(&CallId::from("never-issued"), Err(json!("x"))));
    }

    #[tokio::test]
    async fn test_cancel_drops_sender() {
        let pending = PendingCalls::new();
        let (id, rx) = pending.open();
        assert!(pending.cancel(&id));
        assert!(rx.await.is_err());
        assert_eq!(pending.len(), 0);
    }

    #[test]
    fn test_open_ids_are_distinct() {
        let pending = PendingCalls::new();
        let (a, _ra) = pending.open();
        let (b, _rb) = pending.open();
        assert_ne!(a, b);
        assert_eq!(pending.len(), 2);
    }
}
