//! Integration tests for correlated calls over the in-memory transport.

use std::time::Duration;

use iobus_rpc::{ClientError, RpcClient};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio::time::timeout;

mod common;
use common::{accept, expect_call, next_frame, push, reject, respond, start, wait_connected};

#[tokio::test]
async fn responses_resolve_calls_by_id_in_any_order() {
    let (client, mut listener) = start(RpcClient::builder());
    let mut peer = accept(&mut listener).await;
    wait_connected(&client).await;

    let first = tokio::spawn({
        let client = client.clone();
        async move { client.call_value("first", json!(1)).await }
    });
    let (first_id, _) = expect_call(&mut peer, "first").await;
    let second = tokio::spawn({
        let client = client.clone();
        async move { client.call_value("second", json!(2)).await }
    });
    let (second_id, _) = expect_call(&mut peer, "second").await;
    assert_ne!(first_id, second_id);

    respond(&peer, second_id, json!("two"));
    respond(&peer, first_id, json!("one"));

    assert_eq!(first.await.expect("task").expect("first call"), json!("one"));
    assert_eq!(second.await.expect("task").expect("second call"), json!("two"));
    client.shutdown().await;
}

#[tokio::test]
async fn unrouted_events_leave_pending_calls_alone() {
    let (client, mut listener) = start(RpcClient::builder());
    let mut peer = accept(&mut listener).await;
    wait_connected(&client).await;

    let call = tokio::spawn({
        let client = client.clone();
        async move { client.call_value("info", Value::Null).await }
    });
    let (id, _) = expect_call(&mut peer, "info").await;
    push(&peer, "state", json!({"nodes": []}));
    push(&peer, "firmware", json!([]));
    respond(&peer, id, json!({"version": 1}));

    assert_eq!(call.await.expect("task").expect("call"), json!({"version": 1}));
    client.shutdown().await;
}

#[tokio::test]
async fn error_frames_reject_with_the_remote_payload() {
    let (client, mut listener) = start(RpcClient::builder());
    let mut peer = accept(&mut listener).await;
    wait_connected(&client).await;

    let call = tokio::spawn({
        let client = client.clone();
        async move { client.call_value("flash", json!({"node": "ethmux"})).await }
    });
    let (id, params) = expect_call(&mut peer, "flash").await;
    assert_eq!(params, json!({"node": "ethmux"}));
    reject(&peer, id, json!({"code": 3, "message": "busy"}));

    match call.await.expect("task") {
        Err(ClientError::Remote(err)) => {
            assert_eq!(err.payload(), &json!({"code": 3, "message": "busy"}));
        }
        other => panic!("expected a remote error, got {other:?}"),
    }
    client.shutdown().await;
}

#[tokio::test]
async fn calls_while_disconnected_fail_without_sending() {
    let (client, listener) = start(RpcClient::builder());
    listener.set_accepting(false);

    let outcome = client.call_value("subscribe", json!("firmware")).await;

    assert!(matches!(outcome, Err(ClientError::InvalidState)));
    client.shutdown().await;
}

#[tokio::test]
async fn close_fails_every_pending_call() {
    let (client, mut listener) = start(RpcClient::builder());
    let mut peer = accept(&mut listener).await;
    wait_connected(&client).await;

    let pending: Vec<_> = ["a", "b"]
        .into_iter()
        .map(|method| {
            let client = client.clone();
            tokio::spawn(async move { client.call_value(method, Value::Null).await })
        })
        .collect();
    next_frame(&mut peer).await;
    next_frame(&mut peer).await;
    drop(peer);

    for call in pending {
        assert!(matches!(
            call.await.expect("task"),
            Err(ClientError::ConnectionLost)
        ));
    }
    client.shutdown().await;
}

#[tokio::test]
async fn only_the_first_response_completes_a_call() {
    let (client, mut listener) = start(RpcClient::builder());
    let mut peer = accept(&mut listener).await;
    wait_connected(&client).await;

    let call = tokio::spawn({
        let client = client.clone();
        async move { client.call_value("info", Value::Null).await }
    });
    let (id, _) = expect_call(&mut peer, "info").await;
    respond(&peer, id, json!("first"));
    respond(&peer, id, json!("second"));
    reject(&peer, id, json!("late"));
    assert_eq!(call.await.expect("task").expect("call"), json!("first"));

    // The client keeps serving calls after ignoring the duplicates.
    let next = tokio::spawn({
        let client = client.clone();
        async move { client.call_value("info", Value::Null).await }
    });
    let (next_id, _) = expect_call(&mut peer, "info").await;
    assert!(next_id > id);
    respond(&peer, next_id, json!(7));
    assert_eq!(next.await.expect("task").expect("call"), json!(7));
    client.shutdown().await;
}

#[derive(Debug, Serialize)]
struct PinRequest<'a> {
    node: &'a str,
    pin: &'a str,
    value: bool,
}

#[derive(Debug, Deserialize, PartialEq)]
struct PinState {
    pin: String,
    value: bool,
}

#[tokio::test]
async fn typed_calls_round_trip_through_json() {
    let (client, mut listener) = start(RpcClient::builder());
    let mut peer = accept(&mut listener).await;
    wait_connected(&client).await;

    let call = tokio::spawn({
        let client = client.clone();
        async move {
            client
                .call::<_, PinState>(
                    "set_pin",
                    PinRequest {
                        node: "ethmux",
                        pin: "OUT0",
                        value: true,
                    },
                )
                .await
        }
    });
    let (id, params) = expect_call(&mut peer, "set_pin").await;
    assert_eq!(params, json!({"node": "ethmux", "pin": "OUT0", "value": true}));
    respond(&peer, id, json!({"pin": "OUT0", "value": true}));

    assert_eq!(
        call.await.expect("task").expect("typed call"),
        PinState {
            pin: "OUT0".into(),
            value: true,
        }
    );

    let mismatch = tokio::spawn({
        let client = client.clone();
        async move { client.call::<_, PinState>("set_pin", ()).await }
    });
    let (id, params) = expect_call(&mut peer, "set_pin").await;
    assert_eq!(params, Value::Null);
    respond(&peer, id, json!("not a pin"));
    assert!(matches!(
        mismatch.await.expect("task"),
        Err(ClientError::Deserialize(_))
    ));
    client.shutdown().await;
}

#[tokio::test]
async fn shutdown_fails_pending_and_later_calls() {
    let (client, mut listener) = start(RpcClient::builder());
    let mut peer = accept(&mut listener).await;
    wait_connected(&client).await;

    let pending = tokio::spawn({
        let client = client.clone();
        async move { client.call_value("info", Value::Null).await }
    });
    expect_call(&mut peer, "info").await;

    client.shutdown().await;

    assert!(matches!(
        pending.await.expect("task"),
        Err(ClientError::ConnectionLost)
    ));
    assert!(matches!(
        client.call_value("info", Value::Null).await,
        Err(ClientError::InvalidState)
    ));
    assert!(!client.is_connected());
    // The connection is dropped from the server's point of view too.
    let closed = timeout(Duration::from_secs(5), peer.recv()).await;
    assert!(matches!(closed, Ok(None)));
    assert!(peer.try_recv().is_none());
}
