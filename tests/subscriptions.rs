//! Integration tests for topic subscriptions and event routing.

use std::time::Duration;

use iobus_rpc::{ClientError, RpcClient, SUBSCRIBE_METHOD};
use serde_json::{Value, json};
use tokio::{sync::mpsc, time::timeout};

mod common;
use common::{
    STEP,
    accept,
    ack_subscriptions,
    expect_call,
    push,
    respond,
    start,
    wait_connected,
    wait_disconnected,
};

fn forward(tx: mpsc::UnboundedSender<Value>) -> impl Fn(&Value) + Send + Sync + 'static {
    move |data: &Value| {
        let _ = tx.send(data.clone());
    }
}

/// Next payload a forwarding handler received.
async fn received(rx: &mut mpsc::UnboundedReceiver<Value>) -> Option<Value> {
    timeout(STEP, rx.recv()).await.expect("handler should receive an event")
}

#[tokio::test]
async fn builder_subscriptions_are_sent_on_first_open_in_order() {
    let (client, mut listener) = start(
        RpcClient::builder()
            .subscribe("state")
            .subscribe("isp_console")
            .subscribe("state")
            .subscribe("firmware"),
    );
    let mut peer = accept(&mut listener).await;

    ack_subscriptions(&mut peer, &["state", "isp_console", "firmware"]).await;

    wait_connected(&client).await;
    assert!(peer.try_recv().is_none());
    client.shutdown().await;
}

#[tokio::test]
async fn events_reach_the_handler_for_their_topic() {
    let (state_tx, mut state_rx) = mpsc::unbounded_channel();
    let (client, mut listener) = start(
        RpcClient::builder()
            .on_topic("state", forward(state_tx))
            .subscribe("state"),
    );
    let mut peer = accept(&mut listener).await;
    ack_subscriptions(&mut peer, &["state"]).await;

    push(&peer, "isp_console", json!(["ignored"]));
    push(&peer, "state", json!({"nodes": ["ethmux"]}));
    push(&peer, "state", json!({"nodes": []}));

    assert_eq!(received(&mut state_rx).await, Some(json!({"nodes": ["ethmux"]})));
    assert_eq!(received(&mut state_rx).await, Some(json!({"nodes": []})));
    client.shutdown().await;
}

#[tokio::test]
async fn handlers_can_be_registered_and_replaced_at_runtime() {
    let (client, mut listener) = start(RpcClient::builder());
    let mut peer = accept(&mut listener).await;
    wait_connected(&client).await;

    let (first_tx, mut first_rx) = mpsc::unbounded_channel();
    let (second_tx, mut second_rx) = mpsc::unbounded_channel();
    client
        .on("firmware", forward(first_tx))
        .await
        .expect("client running");
    client.subscribe("firmware").await.expect("client running");
    let (id, _) = expect_call(&mut peer, SUBSCRIBE_METHOD).await;
    respond(&peer, id, Value::Null);
    push(&peer, "firmware", json!(["a.bin"]));
    assert_eq!(received(&mut first_rx).await, Some(json!(["a.bin"])));

    client
        .on("firmware", forward(second_tx))
        .await
        .expect("client running");
    push(&peer, "firmware", json!(["b.bin"]));
    assert_eq!(received(&mut second_rx).await, Some(json!(["b.bin"])));
    assert!(first_rx.try_recv().is_err());
    client.shutdown().await;
}

#[tokio::test]
async fn a_replaced_handler_never_sees_later_events() {
    let (old_tx, mut old_rx) = mpsc::unbounded_channel();
    let (new_tx, mut new_rx) = mpsc::unbounded_channel();
    let (client, mut listener) = start(RpcClient::builder().on_topic("firmware", forward(old_tx)));
    let peer = accept(&mut listener).await;
    wait_connected(&client).await;

    client
        .on("firmware", forward(new_tx))
        .await
        .expect("client running");
    push(&peer, "firmware", json!(["b.bin"]));
    push(&peer, "firmware", json!(["c.bin"]));

    assert_eq!(received(&mut new_rx).await, Some(json!(["b.bin"])));
    assert_eq!(received(&mut new_rx).await, Some(json!(["c.bin"])));
    assert!(old_rx.try_recv().is_err());
    client.shutdown().await;
}

#[tokio::test]
async fn registrations_after_shutdown_are_refused() {
    let (client, mut listener) = start(RpcClient::builder());
    let _peer = accept(&mut listener).await;
    wait_connected(&client).await;
    client.shutdown().await;

    assert!(matches!(
        client.on("state", |_: &Value| {}).await,
        Err(ClientError::InvalidState)
    ));
    assert!(matches!(
        client.subscribe("state").await,
        Err(ClientError::InvalidState)
    ));
}

#[tokio::test]
async fn a_panicking_handler_does_not_stop_the_client() {
    fn exploding(_: &Value) { panic!("handler exploded") }

    let (tx, mut rx) = mpsc::unbounded_channel();
    let (client, mut listener) = start(
        RpcClient::builder()
            .on_topic("state", exploding)
            .on_topic("firmware", forward(tx)),
    );
    let peer = accept(&mut listener).await;
    wait_connected(&client).await;

    push(&peer, "state", json!({}));
    push(&peer, "firmware", json!(["fw.bin"]));

    assert_eq!(received(&mut rx).await, Some(json!(["fw.bin"])));
    assert!(client.is_connected());
    client.shutdown().await;
}

#[tokio::test]
async fn duplicate_subscribe_while_open_sends_nothing() {
    let (client, mut listener) = start(RpcClient::builder().subscribe("state"));
    let mut peer = accept(&mut listener).await;
    ack_subscriptions(&mut peer, &["state"]).await;
    wait_connected(&client).await;

    client.subscribe("state").await.expect("client running");
    // A later call proves the duplicate was processed and produced no frame.
    let call = tokio::spawn({
        let client = client.clone();
        async move { client.call_value("info", Value::Null).await }
    });
    let (id, _) = expect_call(&mut peer, "info").await;
    respond(&peer, id, Value::Null);
    call.await.expect("task").expect("call");
    client.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn every_topic_ever_requested_is_replayed_after_reconnect() {
    let (client, mut listener) = start(
        RpcClient::builder()
            .reconnect_delay(Duration::from_millis(1000))
            .subscribe("state"),
    );
    let mut peer = accept(&mut listener).await;
    ack_subscriptions(&mut peer, &["state"]).await;
    wait_connected(&client).await;

    // Sent at once while open.
    client.subscribe("firmware").await.expect("client running");
    ack_subscriptions(&mut peer, &["firmware"]).await;

    drop(peer);
    wait_disconnected(&client).await;

    // Deferred while closed.
    client.subscribe("isp_console").await.expect("client running");

    let mut peer = accept(&mut listener).await;
    ack_subscriptions(&mut peer, &["state", "firmware", "isp_console"]).await;
    wait_connected(&client).await;
    assert!(peer.try_recv().is_none());
    client.shutdown().await;
}
