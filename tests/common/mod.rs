//! Shared utilities for integration tests.
//!
//! Helpers drive the server side of the in-memory transport: accepting
//! connections, reading the client's calls and answering them.

// Items in this shared module may not be used by all test binaries that import it.
#![allow(
    dead_code,
    reason = "shared test utilities are not used by all test binaries"
)]

use std::time::Duration;

use iobus_rpc::{
    CallId,
    Frame,
    RpcClient,
    RpcClientBuilder,
    SUBSCRIBE_METHOD,
    transport::{ChannelListener, ChannelPeer, channel_transport},
};
use serde_json::Value;
use tokio::time::timeout;

/// Shared result type for tests that propagate setup failures.
pub type TestResult<T = ()> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Upper bound on any single wait. Generous because paused-clock tests
/// auto-advance through it instantly when nothing else can run.
pub const STEP: Duration = Duration::from_secs(30);

/// Start `builder` on a fresh in-memory transport.
pub fn start(builder: RpcClientBuilder) -> (RpcClient, ChannelListener) {
    let (connector, listener) = channel_transport();
    (builder.start_with(connector), listener)
}

/// Accept the next connection.
pub async fn accept(listener: &mut ChannelListener) -> ChannelPeer {
    timeout(STEP, listener.accept())
        .await
        .expect("timed out waiting for a connection")
        .expect("connector dropped")
}

/// Read the next frame the client sent.
pub async fn next_frame(peer: &mut ChannelPeer) -> Frame {
    timeout(STEP, peer.recv())
        .await
        .expect("timed out waiting for a frame")
        .expect("client closed the connection")
}

/// Read the next frame and assert it is a call to `method`.
pub async fn expect_call(peer: &mut ChannelPeer, method: &str) -> (CallId, Value) {
    match next_frame(peer).await {
        Frame::Call {
            id,
            method: sent,
            params,
        } if sent == method => (id, params),
        other => panic!("expected a call to {method}, got {other:?}"),
    }
}

/// Read one `subscribe` call per topic, in order, and acknowledge each.
/// Returns the ids the calls used.
pub async fn ack_subscriptions(peer: &mut ChannelPeer, topics: &[&str]) -> Vec<CallId> {
    let mut ids = Vec::with_capacity(topics.len());
    for topic in topics {
        let (id, params) = expect_call(peer, SUBSCRIBE_METHOD).await;
        assert_eq!(params, Value::from(*topic), "subscriptions replayed out of order");
        respond(peer, id, Value::Null);
        ids.push(id);
    }
    ids
}

/// Answer call `id` with `result`.
pub fn respond(peer: &ChannelPeer, id: CallId, result: Value) {
    peer.send(&Frame::Success { id, result })
        .expect("client should still be connected");
}

/// Reject call `id` with `error`.
pub fn reject(peer: &ChannelPeer, id: CallId, error: Value) {
    peer.send(&Frame::Failure { id, error })
        .expect("client should still be connected");
}

/// Push an event on `topic`.
pub fn push(peer: &ChannelPeer, topic: &str, data: Value) {
    peer.send(&Frame::event(topic, data))
        .expect("client should still be connected");
}

/// Wait until the client reports the connection as down.
pub async fn wait_disconnected(client: &RpcClient) {
    let mut connectivity = client.connectivity();
    timeout(STEP, connectivity.wait_for(|state| !state.connected))
        .await
        .expect("timed out waiting for the client to notice the close")
        .expect("client stopped");
}

/// Wait until the client reports the connection as up.
pub async fn wait_connected(client: &RpcClient) {
    timeout(STEP, client.wait_connected())
        .await
        .expect("timed out waiting for the client to connect")
        .expect("client stopped");
}
