//! Readable text for panics raised by application callbacks.
//!
//! The client calls topic handlers and session hooks on its own task and
//! keeps running when one of them panics. The caught payload is turned into a
//! [`PanicMessage`] so the log line names what went wrong.

use std::{any::Any, fmt};

/// Caught panic payload of a topic handler or session hook.
///
/// Panics raised with `panic!("...")` carry a `&'static str` or a `String`;
/// any other payload is reported as opaque.
///
/// ```
/// use iobus_rpc::panic::format_panic;
///
/// let message = format_panic(Box::new("handler failed"));
/// assert_eq!(message.as_str(), Some("handler failed"));
/// assert_eq!(message.to_string(), "handler failed");
///
/// let opaque = format_panic(Box::new(42_u8));
/// assert_eq!(opaque.as_str(), None);
/// assert_eq!(opaque.to_string(), "non-string panic payload");
/// ```
#[derive(Debug)]
#[must_use]
pub struct PanicMessage(Box<dyn Any + Send>);

impl PanicMessage {
    /// Text of the panic, if it was raised with a string message.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        self.0
            .downcast_ref::<&'static str>()
            .copied()
            .or_else(|| self.0.downcast_ref::<String>().map(String::as_str))
    }
}

impl fmt::Display for PanicMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str().unwrap_or("non-string panic payload"))
    }
}

/// Wrap a payload returned by `catch_unwind` for logging.
pub fn format_panic(payload: Box<dyn Any + Send>) -> PanicMessage { PanicMessage(payload) }
