//! Demultiplexing of pushed events by topic.
//!
//! Delivery is best effort and at most once: an event for a topic without a
//! handler is dropped, and nothing is buffered for handlers registered later.

use std::{
    collections::HashMap,
    panic::{AssertUnwindSafe, catch_unwind},
    sync::Arc,
};

use log::{debug, warn};
use serde_json::Value;

use crate::{frame::Frame, metrics, panic::format_panic};

/// Callback invoked with the `data` of each event on its topic.
///
/// Handlers run synchronously on the client's event loop, in delivery
/// order. They must not block.
pub type TopicHandler = Arc<dyn Fn(&Value) + Send + Sync>;

/// Result of routing a single frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum RouteOutcome {
    /// The topic's handler ran to completion.
    Delivered,
    /// The topic's handler panicked; the panic was contained.
    HandlerPanicked,
    /// No handler is registered for the topic.
    Dropped,
    /// The frame is not an event.
    Ignored,
}

/// Mapping from topic name to its handler.
#[derive(Default)]
pub(crate) struct TopicRouter {
    handlers: HashMap<String, TopicHandler>,
}

impl TopicRouter {
    /// Register `handler` for `topic`, replacing any previous handler.
    ///
    /// Returns `true` if a handler was replaced.
    pub(crate) fn on(&mut self, topic: String, handler: TopicHandler) -> bool {
        self.handlers.insert(topic, handler).is_some()
    }

    /// Whether a handler is registered for `topic`.
    pub(crate) fn has_handler(&self, topic: &str) -> bool { self.handlers.contains_key(topic) }

    /// Deliver an `event` frame to its topic's handler.
    pub(crate) fn route(&self, frame: Frame) -> RouteOutcome {
        let (topic, data) = match frame {
            Frame::Event { topic, data } => (topic, data),
            other => {
                debug!(
                    "ignoring unsolicited frame: type={}, id={:?}",
                    other.kind(),
                    other.correlation_id()
                );
                return RouteOutcome::Ignored;
            }
        };
        let Some(handler) = self.handlers.get(&topic) else {
            debug!("dropping event without handler: topic={topic}");
            metrics::inc_events(metrics::EventOutcome::Dropped);
            return RouteOutcome::Dropped;
        };
        match catch_unwind(AssertUnwindSafe(|| handler(&data))) {
            Ok(()) => {
                metrics::inc_events(metrics::EventOutcome::Delivered);
                RouteOutcome::Delivered
            }
            Err(panic) => {
                warn!(
                    "topic handler panicked: topic={topic}, panic={}",
                    format_panic(panic)
                );
                metrics::inc_events(metrics::EventOutcome::HandlerPanicked);
                RouteOutcome::HandlerPanicked
            }
        }
    }
}
