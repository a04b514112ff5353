//! Ownership of the single duplex connection.
//!
//! A [`Connector`] knows how to open one connection. The [`Transport`] wraps
//! it and tracks the lifetime of the current link, turning everything that
//! happens on it into a sequence of [`TransportEvent`]s: exactly one
//! [`TransportEvent::Open`] per successful connection, the decoded frames in
//! delivery order, and exactly one [`TransportEvent::Close`] ending that
//! connection. Failed connection attempts, clean closes and I/O errors all
//! collapse into the same `Close`.

mod channel;
mod websocket;

use std::{fmt, pin::Pin, sync::Arc};

use async_trait::async_trait;
use futures::{Sink, SinkExt, Stream, StreamExt, future::BoxFuture};
use log::{debug, warn};

pub use channel::{ChannelConnector, ChannelListener, ChannelPeer, channel_transport};
pub use websocket::WebSocketConnector;

use crate::{
    error::{ClientError, TransportError},
    frame::Frame,
};

/// Outbound half of a connection, carrying encoded frames.
pub type FrameSink = Pin<Box<dyn Sink<String, Error = TransportError> + Send>>;

/// Inbound half of a connection, yielding encoded frames.
pub type FrameStream = Pin<Box<dyn Stream<Item = Result<String, TransportError>> + Send>>;

/// An established duplex connection exchanging JSON text frames.
pub struct Connection {
    sink: FrameSink,
    stream: FrameStream,
}

impl Connection {
    /// Assemble a connection from its two halves.
    ///
    /// The stream ending, or yielding an error, terminates the connection.
    pub fn new<Si, St>(sink: Si, stream: St) -> Self
    where
        Si: Sink<String, Error = TransportError> + Send + 'static,
        St: Stream<Item = Result<String, TransportError>> + Send + 'static,
    {
        Self {
            sink: Box::pin(sink),
            stream: Box::pin(stream),
        }
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection").finish_non_exhaustive()
    }
}

/// Opens connections to the RPC peer.
///
/// Each call to [`connect`](Connector::connect) produces a brand new
/// [`Connection`]; connections are never reused across reconnects.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    /// Establish a new connection.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] if the peer cannot be reached.
    async fn connect(&self) -> Result<Connection, TransportError>;

    /// Human-readable description of the peer, used in logs and spans.
    fn peer(&self) -> String { String::from("unknown") }
}

/// Observable lifecycle of the current link.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LinkState {
    /// A connection attempt is in flight.
    Connecting,
    /// The connection is established and frames may be sent.
    Open,
    /// No connection exists.
    Closed,
}

/// Events emitted by [`Transport::next_event`].
#[derive(Debug)]
pub enum TransportEvent {
    /// A connection attempt succeeded.
    Open,
    /// A frame arrived on the open connection.
    Frame(Frame),
    /// The connection (or the attempt to establish it) ended.
    Close,
}

enum Link {
    Closed,
    Connecting(BoxFuture<'static, Result<Connection, TransportError>>),
    Open(Connection),
    /// A send failed; the next event reports the close.
    Failed,
}

/// Owner of the single duplex connection.
pub struct Transport {
    connector: Arc<dyn Connector>,
    link: Link,
}

impl fmt::Debug for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transport")
            .field("peer", &self.connector.peer())
            .field("state", &self.state())
            .finish()
    }
}

impl Transport {
    /// Create a transport with no connection.
    #[must_use]
    pub fn new(connector: Arc<dyn Connector>) -> Self {
        Self {
            connector,
            link: Link::Closed,
        }
    }

    /// Description of the peer this transport connects to.
    #[must_use]
    pub fn peer(&self) -> String { self.connector.peer() }

    /// Current link state.
    #[must_use]
    pub fn state(&self) -> LinkState {
        match self.link {
            Link::Connecting(_) => LinkState::Connecting,
            Link::Open(_) => LinkState::Open,
            Link::Closed | Link::Failed => LinkState::Closed,
        }
    }

    /// Begin a new connection attempt, discarding any existing link.
    ///
    /// The outcome is reported through [`next_event`](Self::next_event):
    /// `Open` on success, `Close` on failure.
    pub fn connect(&mut self) {
        let connector = Arc::clone(&self.connector);
        self.link = Link::Connecting(Box::pin(async move { connector.connect().await }));
    }

    /// Send a frame on the open connection.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidState`] if the link is not open,
    /// [`ClientError::Serialize`] if the frame cannot be encoded, and
    /// [`ClientError::ConnectionLost`] if the write fails. A failed write
    /// ends the connection; the close is reported by the next event.
    pub async fn send(&mut self, frame: &Frame) -> Result<(), ClientError> {
        let Link::Open(connection) = &mut self.link else {
            return Err(ClientError::InvalidState);
        };
        let text = frame.encode().map_err(ClientError::Serialize)?;
        if let Err(err) = connection.sink.send(text).await {
            warn!("send failed, closing connection: peer={}, error={err}", self.connector.peer());
            self.link = Link::Failed;
            return Err(ClientError::ConnectionLost);
        }
        Ok(())
    }

    /// Drop the current link without emitting a `Close` event.
    ///
    /// Returns `true` if a connection or attempt was discarded.
    pub fn close(&mut self) -> bool {
        !matches!(std::mem::replace(&mut self.link, Link::Closed), Link::Closed)
    }

    /// Await the next event on the current link.
    ///
    /// Never resolves while the link is closed. Undecodable frames are logged
    /// and skipped. This method is cancel safe: the connection attempt and
    /// the stream are owned by the transport, so dropping the returned future
    /// loses nothing.
    pub async fn next_event(&mut self) -> TransportEvent {
        loop {
            match &mut self.link {
                Link::Closed => return std::future::pending().await,
                Link::Failed => {
                    self.link = Link::Closed;
                    return TransportEvent::Close;
                }
                Link::Connecting(attempt) => match attempt.as_mut().await {
                    Ok(connection) => {
                        self.link = Link::Open(connection);
                        return TransportEvent::Open;
                    }
                    Err(err) => {
                        debug!(
                            "connection attempt failed: peer={}, error={err}",
                            self.connector.peer()
                        );
                        self.link = Link::Closed;
                        return TransportEvent::Close;
                    }
                },
                Link::Open(connection) => match connection.stream.next().await {
                    Some(Ok(text)) => match Frame::decode(&text) {
                        Ok(frame) => return TransportEvent::Frame(frame),
                        Err(err) => warn!("dropping undecodable frame: error={err}"),
                    },
                    Some(Err(err)) => {
                        debug!("connection failed: peer={}, error={err}", self.connector.peer());
                        self.link = Link::Closed;
                        return TransportEvent::Close;
                    }
                    None => {
                        debug!("connection closed: peer={}", self.connector.peer());
                        self.link = Link::Closed;
                        return TransportEvent::Close;
                    }
                },
            }
        }
    }
}

#[cfg(test)]
mod tests;
