//! WebSocket transport carrying JSON text frames.

use async_trait::async_trait;
use futures::{SinkExt, StreamExt, future};
use log::debug;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use url::Url;

use super::{Connection, Connector};
use crate::error::TransportError;

/// Connects to a `ws://` or `wss://` RPC endpoint.
///
/// Use [`crate::endpoint::rpc_url`] to derive the endpoint from a server
/// address.
#[derive(Clone, Debug)]
pub struct WebSocketConnector {
    url: Url,
}

impl WebSocketConnector {
    /// Create a connector for `url`.
    #[must_use]
    pub fn new(url: Url) -> Self { Self { url } }

    /// The endpoint this connector dials.
    #[must_use]
    pub fn url(&self) -> &Url { &self.url }
}

#[async_trait]
impl Connector for WebSocketConnector {
    async fn connect(&self) -> Result<Connection, TransportError> {
        let (ws, _response) = connect_async(self.url.as_str()).await?;
        debug!("websocket connected: url={}", self.url);
        let (sink, stream) = ws.split();

        let sink =
            sink.with(|text: String| future::ready(Ok::<_, TransportError>(Message::Text(text))));
        let stream = stream.filter_map(|message| future::ready(inbound_text(message)));
        Ok(Connection::new(sink, stream))
    }

    fn peer(&self) -> String { self.url.to_string() }
}

/// Map a WebSocket message to frame text.
///
/// Control frames yield nothing; a close frame ends the connection.
fn inbound_text(
    message: Result<Message, tokio_tungstenite::tungstenite::Error>,
) -> Option<Result<String, TransportError>> {
    match message {
        Ok(Message::Text(text)) => Some(Ok(text)),
        Ok(Message::Binary(bytes)) => match String::from_utf8(bytes) {
            Ok(text) => Some(Ok(text)),
            Err(_) => {
                debug!("ignoring non-UTF-8 binary frame");
                None
            }
        },
        Ok(Message::Close(_)) => Some(Err(TransportError::Closed)),
        Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_)) => None,
        Err(err) => Some(Err(err.into())),
    }
}
