//! Wire frames exchanged over the RPC connection.
//!
//! Every message is a single JSON object carrying a `type` discriminator.
//! [`Frame`] decodes that object into one of four variants so that the rest
//! of the client can match on them exhaustively instead of inspecting
//! strings.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Correlation identifier pairing a `call` frame with its `result` or
/// `error` frame.
///
/// Identifiers are allocated sequentially by the client and are never reused
/// while a call is pending.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CallId(u64);

impl CallId {
    /// Create a [`CallId`] from its raw value.
    #[must_use]
    pub const fn new(id: u64) -> Self { Self(id) }

    /// Return the inner `u64` representation.
    #[must_use]
    pub const fn as_u64(self) -> u64 { self.0 }
}

impl From<u64> for CallId {
    fn from(value: u64) -> Self { Self(value) }
}

impl fmt::Display for CallId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

/// A single message on the RPC connection.
///
/// # Examples
///
/// ```
/// use iobus_rpc::frame::Frame;
/// use serde_json::json;
///
/// let frame = Frame::decode(r#"{"type":"event","topic":"state","data":{"nodes":[]}}"#)
///     .expect("valid event frame");
/// assert_eq!(
///     frame,
///     Frame::Event {
///         topic: "state".into(),
///         data: json!({"nodes": []}),
///     }
/// );
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Frame {
    /// Outgoing remote call.
    Call {
        id: CallId,
        method: String,
        #[serde(default)]
        params: Value,
    },
    /// Successful response to a call.
    #[serde(rename = "result")]
    Success {
        id: CallId,
        #[serde(default)]
        result: Value,
    },
    /// Failed response to a call. The payload is surfaced verbatim.
    #[serde(rename = "error")]
    Failure { id: CallId, error: Value },
    /// Unsolicited push on a topic.
    Event {
        topic: String,
        #[serde(default)]
        data: Value,
    },
}

impl Frame {
    /// Build a `call` frame.
    #[must_use]
    pub fn call(id: CallId, method: impl Into<String>, params: Value) -> Self {
        Self::Call {
            id,
            method: method.into(),
            params,
        }
    }

    /// Build an `event` frame.
    #[must_use]
    pub fn event(topic: impl Into<String>, data: Value) -> Self {
        Self::Event {
            topic: topic.into(),
            data,
        }
    }

    /// Return the correlation identifier carried by this frame, if any.
    #[must_use]
    pub fn correlation_id(&self) -> Option<CallId> {
        match self {
            Self::Call { id, .. } | Self::Success { id, .. } | Self::Failure { id, .. } => {
                Some(*id)
            }
            Self::Event { .. } => None,
        }
    }

    /// Wire name of the frame's `type` discriminator.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Call { .. } => "call",
            Self::Success { .. } => "result",
            Self::Failure { .. } => "error",
            Self::Event { .. } => "event",
        }
    }

    /// Encode the frame as JSON text.
    ///
    /// # Errors
    ///
    /// Returns an error if a payload value cannot be serialized.
    pub fn encode(&self) -> Result<String, serde_json::Error> { serde_json::to_string(self) }

    /// Decode a frame from JSON text.
    ///
    /// # Errors
    ///
    /// Returns an error if `text` is not a JSON object with a known `type`
    /// and the fields that type requires.
    pub fn decode(text: &str) -> Result<Self, serde_json::Error> { serde_json::from_str(text) }
}
