//! In-memory transport backed by unbounded channels.
//!
//! [`channel_transport`] returns a connected pair: the [`ChannelConnector`]
//! is handed to the client, and the [`ChannelListener`] plays the server,
//! accepting one [`ChannelPeer`] per connection attempt. Dropping a peer
//! closes that connection from the server side.

use std::sync::{
    Arc,
    atomic::{AtomicBool, AtomicU64, Ordering},
};

use async_trait::async_trait;
use futures::{
    FutureExt,
    SinkExt,
    StreamExt,
    channel::mpsc::{self, UnboundedReceiver, UnboundedSender},
};
use log::warn;

use super::{Connection, Connector};
use crate::{error::TransportError, frame::Frame};

#[derive(Debug)]
struct Shared {
    accepting: AtomicBool,
    attempts: AtomicU64,
}

/// Create an in-memory connector together with its listener.
///
/// # Examples
///
/// ```
/// use iobus_rpc::transport::channel_transport;
///
/// let (connector, listener) = channel_transport();
/// assert!(listener.is_accepting());
/// # drop(connector);
/// ```
#[must_use]
pub fn channel_transport() -> (ChannelConnector, ChannelListener) {
    let (peers_tx, peers_rx) = mpsc::unbounded();
    let shared = Arc::new(Shared {
        accepting: AtomicBool::new(true),
        attempts: AtomicU64::new(0),
    });
    (
        ChannelConnector {
            peers: peers_tx,
            shared: Arc::clone(&shared),
        },
        ChannelListener {
            peers: peers_rx,
            shared,
        },
    )
}

/// Client half of the in-memory transport.
#[derive(Clone, Debug)]
pub struct ChannelConnector {
    peers: UnboundedSender<ChannelPeer>,
    shared: Arc<Shared>,
}

#[async_trait]
impl Connector for ChannelConnector {
    async fn connect(&self) -> Result<Connection, TransportError> {
        self.shared.attempts.fetch_add(1, Ordering::SeqCst);
        if !self.shared.accepting.load(Ordering::SeqCst) {
            return Err(TransportError::Unavailable);
        }
        let (to_server, from_client) = mpsc::unbounded();
        let (to_client, from_server) = mpsc::unbounded();
        self.peers
            .unbounded_send(ChannelPeer {
                outbound: to_client,
                inbound: from_client,
            })
            .map_err(|_| TransportError::Unavailable)?;
        Ok(Connection::new(
            to_server.sink_map_err(|_| TransportError::Unavailable),
            from_server.map(Ok),
        ))
    }

    fn peer(&self) -> String { String::from("in-memory") }
}

/// Server half of the in-memory transport.
#[derive(Debug)]
pub struct ChannelListener {
    peers: UnboundedReceiver<ChannelPeer>,
    shared: Arc<Shared>,
}

impl ChannelListener {
    /// Wait for the next connection. Returns `None` once every connector has
    /// been dropped.
    pub async fn accept(&mut self) -> Option<ChannelPeer> { self.peers.next().await }

    /// Accept or refuse future connection attempts. Refused attempts fail
    /// with [`TransportError::Unavailable`].
    pub fn set_accepting(&self, accepting: bool) {
        self.shared.accepting.store(accepting, Ordering::SeqCst);
    }

    /// Whether connection attempts are currently accepted.
    #[must_use]
    pub fn is_accepting(&self) -> bool { self.shared.accepting.load(Ordering::SeqCst) }

    /// Number of connection attempts made so far, refused ones included.
    #[must_use]
    pub fn attempts(&self) -> u64 { self.shared.attempts.load(Ordering::SeqCst) }
}

/// Server-side endpoint of one in-memory connection.
#[derive(Debug)]
pub struct ChannelPeer {
    outbound: UnboundedSender<String>,
    inbound: UnboundedReceiver<String>,
}

impl ChannelPeer {
    /// Send a frame to the client.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Encode`] if the frame cannot be encoded and
    /// [`TransportError::Unavailable`] if the client side has gone away.
    pub fn send(&self, frame: &Frame) -> Result<(), TransportError> {
        self.send_text(frame.encode().map_err(TransportError::Encode)?)
    }

    /// Send raw text to the client, bypassing frame encoding.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Unavailable`] if the client side has gone
    /// away.
    pub fn send_text(&self, text: impl Into<String>) -> Result<(), TransportError> {
        self.outbound
            .unbounded_send(text.into())
            .map_err(|_| TransportError::Unavailable)
    }

    /// Receive the next frame from the client, skipping text that does not
    /// decode. Returns `None` once the client drops the connection.
    pub async fn recv(&mut self) -> Option<Frame> {
        while let Some(text) = self.inbound.next().await {
            match Frame::decode(&text) {
                Ok(frame) => return Some(frame),
                Err(err) => warn!("peer dropping undecodable frame: error={err}"),
            }
        }
        None
    }

    /// Return a frame that has already arrived, without waiting.
    pub fn try_recv(&mut self) -> Option<Frame> {
        while let Some(Some(text)) = self.inbound.next().now_or_never() {
            if let Ok(frame) = Frame::decode(&text) {
                return Some(frame);
            }
        }
        None
    }
}
