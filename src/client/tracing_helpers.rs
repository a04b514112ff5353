//! Span and timing helpers for client operations.
//!
//! Span creation with a level chosen at runtime lives here so that the
//! client and actor code stays free of instrumentation plumbing.

use std::time::Instant;

use tracing::{Level, Span};

use super::tracing_config::TracingConfig;

/// Create a tracing span at a dynamically selected level.
///
/// Each branch calls the matching `tracing::<level>_span!` macro, so span
/// metadata stays static per branch while the branch is picked at runtime.
macro_rules! dynamic_span {
    ($level:expr, $name:expr $(, $($field:tt)*)?) => {
        match $level {
            Level::ERROR => tracing::error_span!($name $(, $($field)*)?),
            Level::WARN  => tracing::warn_span!($name $(, $($field)*)?),
            Level::INFO  => tracing::info_span!($name $(, $($field)*)?),
            Level::DEBUG => tracing::debug_span!($name $(, $($field)*)?),
            Level::TRACE => tracing::trace_span!($name $(, $($field)*)?),
        }
    };
}

/// Span covering one connection attempt.
///
/// `session` is recorded if the attempt opens.
pub(crate) fn connect_span(config: &TracingConfig, peer: &str) -> Span {
    dynamic_span!(
        config.connect_level,
        "rpc.connect",
        peer = peer,
        session = tracing::field::Empty
    )
}

/// Span covering one call from submission to completion.
///
/// The `result` field is recorded when the call completes.
pub(crate) fn call_span(config: &TracingConfig, method: &str) -> Span {
    dynamic_span!(
        config.call_level,
        "rpc.call",
        method = method,
        result = tracing::field::Empty
    )
}

/// Start a timer if timing is enabled.
pub(crate) fn start_timer(enabled: bool) -> Option<Instant> { enabled.then(Instant::now) }

/// Record elapsed time if a timer was started.
pub(crate) fn emit_timing_event(start: Option<Instant>) {
    if let Some(start) = start {
        let elapsed_us = start.elapsed().as_micros();
        tracing::debug!(elapsed_us = elapsed_us, "operation.timing");
    }
}
