//! Metric helpers for `iobus-rpc`.
//!
//! This module defines metric names and simple helper functions
//! wrapping the [`metrics`](https://docs.rs/metrics) crate. Without the
//! `metrics` feature the helpers compile to nothing.

use serde_json::Value;

use crate::error::ClientError;

/// Name of the gauge reporting whether the client is connected (0 or 1).
pub const CONNECTED: &str = "iobus_rpc_connected";
/// Name of the counter tracking opened sessions.
pub const SESSIONS_TOTAL: &str = "iobus_rpc_sessions_total";
/// Name of the counter tracking completed calls.
pub const CALLS_TOTAL: &str = "iobus_rpc_calls_total";
/// Name of the counter tracking received events.
pub const EVENTS_TOTAL: &str = "iobus_rpc_events_total";

/// How a call completed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CallOutcome {
    /// A `result` frame arrived.
    Success,
    /// An `error` frame arrived.
    Remote,
    /// The connection closed first.
    Lost,
    /// The call was refused because the client was not connected.
    InvalidState,
    /// The call failed locally, e.g. while serialising.
    Other,
}

impl CallOutcome {
    /// Classify a call result.
    #[must_use]
    pub fn of(outcome: &Result<Value, ClientError>) -> Self {
        match outcome {
            Ok(_) => Self::Success,
            Err(ClientError::Remote(_)) => Self::Remote,
            Err(ClientError::ConnectionLost) => Self::Lost,
            Err(ClientError::InvalidState) => Self::InvalidState,
            Err(_) => Self::Other,
        }
    }

    /// Label value used on [`CALLS_TOTAL`].
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Remote => "remote_error",
            Self::Lost => "connection_lost",
            Self::InvalidState => "invalid_state",
            Self::Other => "other",
        }
    }
}

/// What happened to a received event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EventOutcome {
    /// A topic handler received it.
    Delivered,
    /// No handler was registered for its topic.
    Dropped,
    /// The topic's handler panicked while handling it.
    HandlerPanicked,
}

impl EventOutcome {
    /// Label value used on [`EVENTS_TOTAL`].
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Delivered => "delivered",
            Self::Dropped => "dropped",
            Self::HandlerPanicked => "handler_panicked",
        }
    }
}

/// Update the connected gauge.
pub fn set_connected(connected: bool) {
    #[cfg(feature = "metrics")]
    metrics::gauge!(CONNECTED).set(if connected { 1.0 } else { 0.0 });
    #[cfg(not(feature = "metrics"))]
    let _ = connected;
}

/// Record an opened session.
pub fn inc_sessions() {
    #[cfg(feature = "metrics")]
    metrics::counter!(SESSIONS_TOTAL).increment(1);
}

/// Record a completed call.
pub fn inc_calls(outcome: CallOutcome) {
    #[cfg(feature = "metrics")]
    metrics::counter!(CALLS_TOTAL, "outcome" => outcome.as_str()).increment(1);
    #[cfg(not(feature = "metrics"))]
    let _ = outcome;
}

/// Record a received event.
pub fn inc_events(outcome: EventOutcome) {
    #[cfg(feature = "metrics")]
    metrics::counter!(EVENTS_TOTAL, "outcome" => outcome.as_str()).increment(1);
    #[cfg(not(feature = "metrics"))]
    let _ = outcome;
}
