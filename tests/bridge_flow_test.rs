//! Request/response correlation across a real worker thread

mod common;

use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};

use curve_bridge::domain::bridge::{Argument, BridgeError, CallId, Envelope, Message, RESOLVE};
use curve_bridge::domain::sdk::{Balances, CurveSdk, InitOptions};
use curve_bridge::infrastructure::runtime::{port, run_worker, Bridge, CurveApiAdapter, WorkerHandle};

use common::{ScriptedProvider, ScriptedSdk, USDC};

fn spawn_scripted(timeout: Option<Duration>) -> (WorkerHandle, CurveApiAdapter) {
    let (worker, channels) =
        WorkerHandle::spawn(|_rpc| Ok(Arc::new(ScriptedSdk) as Arc<dyn CurveSdk>), timeout).unwrap();
    let adapter = CurveApiAdapter::new(channels.port, channels.inbox, ScriptedProvider::new(1), timeout);
    (worker, adapter)
}

#[tokio::test]
async fn test_get_balances_round_trip() {
    let (_worker, adapter) = spawn_scripted(None);

    let balances = adapter
        .get_balances(vec![USDC.to_string()], vec!["0xAddr".to_string()])
        .await
        .unwrap();

    assert_eq!(balances, Balances::Single(vec!["1000".to_string()]));
    assert_eq!(adapter.bridge().pending_calls(), 0);
}

#[tokio::test]
async fn test_init_returns_constants() {
    let (_worker, adapter) = spawn_scripted(None);

    let constants = adapter
        .init(InitOptions {
            chain_id: Some(10),
            ..Default::default()
        })
        .await
        .unwrap();

    assert_eq!(constants.chain_id, 10);
    assert_eq!(adapter.constants().await, Some(constants));
}

#[tokio::test]
async fn test_remote_failure_rejects_with_message() {
    let (_worker, adapter) = spawn_scripted(None);

    let err = adapter.get_usd_rate("0xToken").await.unwrap_err();
    assert_eq!(
        err.rejection(),
        Some(&json!("invalid input: no rate for 0xToken"))
    );

    let err = adapter.get_pool("3pool").await.unwrap_err();
    assert_eq!(err.rejection(), Some(&json!("getPool is not supported by this SDK")));
}

#[tokio::test]
async fn test_unknown_method_is_rejected() {
    let (_worker, adapter) = spawn_scripted(None);

    let err = adapter.bridge().call("launchRockets", vec![]).await.unwrap_err();
    assert_eq!(err.rejection(), Some(&json!("Unknown method launchRockets")));
}

#[tokio::test]
async fn test_reserved_and_empty_kinds_are_rejected() {
    let (_worker, adapter) = spawn_scripted(Some(Duration::from_secs(2)));

    let err = adapter
        .bridge()
        .call("setContract", vec![json!("0x01").into()])
        .await
        .unwrap_err();
    assert_eq!(err.rejection(), Some(&json!("Unknown method setContract")));

    // well-formed, but only the UI side keeps contracts
    let err = adapter
        .bridge()
        .request_value("setContract", json!({"address": USDC, "abi": []}))
        .unwrap()
        .await
        .unwrap_err();
    assert_eq!(err.rejection(), Some(&json!("Unknown method setContract")));

    let err = adapter.bridge().call("", vec![]).await.unwrap_err();
    assert_eq!(err.rejection(), Some(&json!("Unknown method ")));
    assert_eq!(adapter.bridge().pending_calls(), 0);
}

#[tokio::test]
async fn test_malformed_params_are_rejected() {
    let (_worker, adapter) = spawn_scripted(None);

    let err = adapter
        .bridge()
        .call("getPool", vec![json!({"not": "an id"}).into()])
        .await
        .unwrap_err();
    let message = err.rejection().and_then(Value::as_str).unwrap_or_default().to_string();
    assert!(message.starts_with("invalid params for getPool"), "{message}");
}

#[tokio::test]
async fn test_out_of_order_completions_reach_their_callers() {
    let (_worker, adapter) = spawn_scripted(None);

    // hasRouter sleeps on the worker, so getPoolList completes first
    let (router, pools) = tokio::join!(adapter.has_router(), adapter.get_pool_list());

    assert!(router.unwrap());
    assert_eq!(pools.unwrap(), vec!["3pool", "steth"]);
    assert_eq!(adapter.bridge().pending_calls(), 0);
}

#[tokio::test]
async fn test_untransportable_argument_fails_before_sending() {
    let (_worker, adapter) = spawn_scripted(None);

    let err = adapter
        .bridge()
        .request(
            "getPool",
            vec![
                json!("3pool").into(),
                Argument::Deferred(Box::pin(async { json!("later") })),
            ],
        )
        .unwrap_err();

    assert!(matches!(err, BridgeError::NotTransportable { index: 1, kind: "promise" }));
    assert_eq!(adapter.bridge().pending_calls(), 0);
}

#[tokio::test]
async fn test_call_timeout_surfaces_as_error() {
    let (_worker, adapter) = spawn_scripted(Some(Duration::from_millis(100)));

    let err = adapter.has_router().await.unwrap_err();
    assert!(matches!(err, BridgeError::Timeout { .. }));
    assert_eq!(adapter.bridge().pending_calls(), 0);

    // the late resolve is dropped as unmatched; fast calls still work
    assert_eq!(adapter.get_pool_list().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_worker_ignores_unmatched_completion() {
    let (to_worker, worker_inbox) = port::channel();
    let (to_ui, mut ui_inbox) = port::channel();
    let worker_bridge = Bridge::new("worker", to_ui, None);
    tokio::spawn(run_worker(worker_bridge, Arc::new(ScriptedSdk), worker_inbox));

    to_worker
        .post(&Envelope::new(RESOLVE, CallId::from("no-such-call"), json!(42)))
        .unwrap();
    to_worker
        .post(&Envelope::new("getPoolList", CallId::from("call-1"), json!([])))
        .unwrap();

    let reply = tokio::time::timeout(Duration::from_secs(1), ui_inbox.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        Message::try_from(reply).unwrap(),
        Message::Resolve {
            id: CallId::from("call-1"),
            value: json!(["3pool", "steth"]),
        }
    );
}

#[tokio::test]
async fn test_dropping_adapter_stops_worker() {
    let (worker, adapter) = spawn_scripted(None);
    assert!(adapter.has_router().await.unwrap());

    drop(adapter);
    for _ in 0..100 {
        if worker.is_finished() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(worker.is_finished());
    tokio::task::spawn_blocking(move || worker.join())
        .await
        .unwrap()
        .unwrap();
}
