//! Unit tests for the transport lifecycle.

use std::{sync::Arc, time::Duration};

use serde_json::json;
use tokio::time::timeout;

use super::*;
use crate::frame::CallId;

fn transport() -> (Transport, ChannelListener) {
    let (connector, listener) = channel_transport();
    (Transport::new(Arc::new(connector)), listener)
}

#[tokio::test]
async fn send_requires_an_open_link() {
    let (mut transport, _listener) = transport();
    assert_eq!(transport.state(), LinkState::Closed);

    let frame = Frame::call(CallId::new(1), "subscribe", json!("state"));
    assert!(matches!(
        transport.send(&frame).await,
        Err(ClientError::InvalidState)
    ));

    transport.connect();
    assert_eq!(transport.state(), LinkState::Connecting);
    assert!(matches!(
        transport.send(&frame).await,
        Err(ClientError::InvalidState)
    ));
}

#[tokio::test]
async fn open_frames_and_close_are_reported_in_order() {
    let (mut transport, mut listener) = transport();
    transport.connect();
    assert!(matches!(transport.next_event().await, TransportEvent::Open));
    assert_eq!(transport.state(), LinkState::Open);

    let peer = listener.accept().await.expect("peer for connection");
    peer.send(&Frame::event("state", json!({"nodes": []})))
        .expect("send event");
    peer.send_text("garbage").expect("send garbage");
    peer.send(&Frame::event("firmware", json!([])))
        .expect("send event");
    drop(peer);

    let TransportEvent::Frame(first) = transport.next_event().await else {
        panic!("expected the state event");
    };
    assert_eq!(first, Frame::event("state", json!({"nodes": []})));
    let TransportEvent::Frame(second) = transport.next_event().await else {
        panic!("expected the firmware event after the undecodable frame");
    };
    assert_eq!(second, Frame::event("firmware", json!([])));
    assert!(matches!(transport.next_event().await, TransportEvent::Close));
    assert_eq!(transport.state(), LinkState::Closed);

    assert!(
        timeout(Duration::from_millis(20), transport.next_event())
            .await
            .is_err(),
        "a closed link must not emit further events"
    );
}

#[tokio::test]
async fn refused_attempt_collapses_into_close() {
    let (mut transport, listener) = transport();
    listener.set_accepting(false);
    transport.connect();
    assert!(matches!(transport.next_event().await, TransportEvent::Close));
    assert_eq!(listener.attempts(), 1);
}

#[tokio::test]
async fn failed_send_reports_a_single_close() {
    let (mut transport, mut listener) = transport();
    transport.connect();
    assert!(matches!(transport.next_event().await, TransportEvent::Open));
    drop(listener.accept().await.expect("peer for connection"));

    let frame = Frame::call(CallId::new(1), "subscribe", json!("state"));
    assert!(matches!(
        transport.send(&frame).await,
        Err(ClientError::ConnectionLost)
    ));
    assert!(matches!(transport.next_event().await, TransportEvent::Close));
    assert!(
        timeout(Duration::from_millis(20), transport.next_event())
            .await
            .is_err()
    );
}

#[tokio::test]
async fn close_discards_the_link_silently() {
    let (mut transport, _listener) = transport();
    assert!(!transport.close());
    transport.connect();
    assert!(matches!(transport.next_event().await, TransportEvent::Open));
    assert!(transport.close());
    assert_eq!(transport.state(), LinkState::Closed);
}
