//! Error types for RPC client operations.

use std::fmt;

use serde_json::Value;

/// Errors surfaced to callers of [`crate::RpcClient`].
///
/// Call-level errors are local to the caller that issued the call. Loss of
/// the connection is global and fails every pending call at once with
/// [`ClientError::ConnectionLost`].
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The call was attempted while the connection was not open, or after the
    /// client shut down. No frame was sent.
    #[error("client is not connected")]
    InvalidState,
    /// The connection closed before a response to the call arrived.
    #[error("connection lost before a response arrived")]
    ConnectionLost,
    /// The server answered the call with an `error` frame.
    #[error("remote error: {0}")]
    Remote(RemoteError),
    /// Failed to serialize the call parameters.
    #[error("failed to serialize call parameters")]
    Serialize(#[source] serde_json::Error),
    /// Failed to deserialize the call result into the requested type.
    #[error("failed to deserialize call result")]
    Deserialize(#[source] serde_json::Error),
}

/// The `error` payload of a failed call, kept verbatim.
///
/// String payloads display as-is; structured payloads display as compact
/// JSON.
///
/// ```
/// use iobus_rpc::RemoteError;
/// use serde_json::json;
///
/// assert_eq!(RemoteError::new(json!("unknown topic")).to_string(), "unknown topic");
/// assert_eq!(RemoteError::new(json!({"code": 2})).to_string(), r#"{"code":2}"#);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct RemoteError(Value);

impl RemoteError {
    /// Wrap a server-provided error payload.
    #[must_use]
    pub fn new(payload: Value) -> Self { Self(payload) }

    /// Borrow the raw payload.
    #[must_use]
    pub fn payload(&self) -> &Value { &self.0 }

    /// Consume the error and return the raw payload.
    #[must_use]
    pub fn into_payload(self) -> Value { self.0 }
}

impl fmt::Display for RemoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Value::String(message) => f.write_str(message),
            other => write!(f, "{other}"),
        }
    }
}

impl std::error::Error for RemoteError {}

/// Errors raised while establishing or using a transport.
///
/// Connection failures never reach callers directly: they are logged and
/// folded into the reconnect cycle. These errors surface only when an
/// endpoint is configured or a peer is driven directly.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// WebSocket handshake or I/O failure.
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
    /// The peer is not accepting connections or has gone away.
    #[error("peer unavailable")]
    Unavailable,
    /// The peer sent a close frame.
    #[error("connection closed by peer")]
    Closed,
    /// The endpoint could not be parsed.
    #[error("invalid endpoint url: {0}")]
    Url(#[from] url::ParseError),
    /// The endpoint parsed but cannot be used for the RPC connection.
    #[error("unsupported endpoint {url}: {reason}")]
    Endpoint {
        /// Endpoint as provided.
        url: String,
        /// Why the endpoint was rejected.
        reason: &'static str,
    },
    /// An outbound frame could not be encoded.
    #[error("failed to encode frame")]
    Encode(#[source] serde_json::Error),
}
