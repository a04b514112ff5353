//! Correlation of outgoing calls with their responses.
//!
//! The [`CallDispatcher`] owns the table of pending calls for the current
//! connection. Identifiers come from a counter that lives for the whole
//! client, so an identifier is never reused even across reconnects.

use std::collections::HashMap;

use log::{debug, warn};
use serde_json::Value;
use tokio::sync::oneshot;

use crate::{
    error::{ClientError, RemoteError},
    frame::{CallId, Frame},
    metrics::{self, CallOutcome},
};

/// Reply channel handed to the dispatcher by a caller.
pub(crate) type CallReply = oneshot::Sender<Result<Value, ClientError>>;

/// What to do once a pending call completes.
#[derive(Debug)]
pub(crate) enum Continuation {
    /// An application caller awaits the outcome.
    Caller(CallReply),
    /// A `subscribe` issued by the client itself; nobody awaits it.
    Subscription { topic: String },
}

impl Continuation {
    /// Complete the continuation with `outcome`.
    pub(crate) fn complete(self, outcome: Result<Value, ClientError>) {
        metrics::inc_calls(CallOutcome::of(&outcome));
        match self {
            // The caller may have stopped waiting; nothing else to do then.
            Self::Caller(reply) => {
                let _ = reply.send(outcome);
            }
            Self::Subscription { topic } => match outcome {
                Ok(_) => debug!("subscription confirmed: topic={topic}"),
                Err(ClientError::ConnectionLost) => {
                    debug!("subscription interrupted by close: topic={topic}");
                }
                Err(err) => warn!("subscription failed: topic={topic}, error={err}"),
            },
        }
    }
}

/// A call awaiting its response.
#[derive(Debug)]
pub(crate) struct PendingCall {
    method: String,
    continuation: Continuation,
}

/// Pending-call table for the current connection.
#[derive(Debug)]
pub(crate) struct CallDispatcher {
    next_id: u64,
    pending: HashMap<CallId, PendingCall>,
}

impl Default for CallDispatcher {
    fn default() -> Self {
        Self {
            next_id: 1,
            pending: HashMap::new(),
        }
    }
}

impl CallDispatcher {
    /// Allocate the next correlation identifier.
    pub(crate) fn next_id(&mut self) -> CallId {
        let id = CallId::new(self.next_id);
        self.next_id += 1;
        id
    }

    /// Record a call that has been sent.
    pub(crate) fn insert(&mut self, id: CallId, method: String, continuation: Continuation) {
        let previous = self.pending.insert(
            id,
            PendingCall {
                method,
                continuation,
            },
        );
        debug_assert!(previous.is_none(), "call id {id} reused while pending");
    }

    /// Number of calls awaiting a response.
    #[cfg(test)]
    pub(crate) fn len(&self) -> usize { self.pending.len() }

    /// Resolve the pending call matching `frame`, if any.
    ///
    /// Returns the frame back when it does not complete a pending call so
    /// the caller can hand it to the topic router.
    pub(crate) fn handle_inbound(&mut self, frame: Frame) -> Option<Frame> {
        match frame {
            Frame::Success { id, result } => match self.pending.remove(&id) {
                Some(call) => {
                    debug!("call resolved: id={id}, method={}", call.method);
                    call.continuation.complete(Ok(result));
                    None
                }
                None => Some(Frame::Success { id, result }),
            },
            Frame::Failure { id, error } => match self.pending.remove(&id) {
                Some(call) => {
                    debug!("call rejected: id={id}, method={}", call.method);
                    call.continuation
                        .complete(Err(ClientError::Remote(RemoteError::new(error))));
                    None
                }
                None => Some(Frame::Failure { id, error }),
            },
            other @ (Frame::Call { .. } | Frame::Event { .. }) => Some(other),
        }
    }

    /// Fail every pending call with [`ClientError::ConnectionLost`] and clear
    /// the table. Returns the number of calls failed.
    pub(crate) fn fail_all(&mut self) -> usize {
        let lost = self.pending.len();
        for (id, call) in self.pending.drain() {
            debug!("call lost with connection: id={id}, method={}", call.method);
            call.continuation.complete(Err(ClientError::ConnectionLost));
        }
        lost
    }
}
