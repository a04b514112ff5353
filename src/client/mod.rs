//! Reconnecting RPC client.
//!
//! [`RpcClient`] is a cheap, cloneable handle. All state lives in a single
//! actor task spawned by [`RpcClientBuilder::start_with`]; handles talk to it
//! over a command channel and await its answer. Handlers and hooks run on the
//! actor, so they must spawn any work that awaits a handle.

use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use tokio::sync::{mpsc, oneshot, watch};
use tokio_util::{sync::CancellationToken, task::TaskTracker};
use tracing::Instrument;

mod actor;
mod builder;
mod tracing_config;
mod tracing_helpers;

use actor::Command;
pub use builder::RpcClientBuilder;
pub use tracing_config::TracingConfig;
use tracing_helpers::{call_span, emit_timing_event, start_timer};

use crate::{error::ClientError, router::TopicHandler, supervisor::ConnectivityState};

/// Method used to ask the server for a topic's events.
pub const SUBSCRIBE_METHOD: &str = "subscribe";

/// Handle to a running client.
///
/// # Examples
///
/// ```no_run
/// use iobus_rpc::RpcClient;
/// use serde_json::Value;
///
/// # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
/// let client = RpcClient::builder()
///     .on_topic("state", |data: &Value| println!("state: {data}"))
///     .subscribe("state")
///     .start("http://localhost:8000")?;
/// client.wait_connected().await?;
/// client.shutdown().await;
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct RpcClient {
    commands: mpsc::UnboundedSender<Command>,
    connectivity: watch::Receiver<ConnectivityState>,
    shutdown: CancellationToken,
    tracker: TaskTracker,
    tracing: TracingConfig,
}

impl RpcClient {
    /// Start configuring a client.
    #[must_use]
    pub fn builder() -> RpcClientBuilder { RpcClientBuilder::new() }

    /// Invoke `method` with raw JSON `params` and await the outcome.
    ///
    /// # Errors
    ///
    /// - [`ClientError::InvalidState`] if the client is not connected or has
    ///   shut down. Nothing is sent and the call is not retried.
    /// - [`ClientError::ConnectionLost`] if the connection closes first.
    /// - [`ClientError::Remote`] with the server's error payload.
    pub async fn call_value(
        &self,
        method: impl Into<String>,
        params: Value,
    ) -> Result<Value, ClientError> {
        let method = method.into();
        let span = call_span(&self.tracing, &method);
        let started = start_timer(self.tracing.call_timing);
        let (reply, response) = oneshot::channel();
        let outcome = async {
            self.commands
                .send(Command::Call {
                    method,
                    params,
                    reply,
                })
                .map_err(|_| ClientError::InvalidState)?;
            // A dropped reply means the actor stopped without answering.
            response.await.map_err(|_| ClientError::InvalidState)?
        }
        .instrument(span.clone())
        .await;
        span.record("result", if outcome.is_ok() { "ok" } else { "err" });
        span.in_scope(|| emit_timing_event(started));
        outcome
    }

    /// Invoke `method` with typed parameters and decode the typed result.
    ///
    /// # Errors
    ///
    /// As [`call_value`](Self::call_value), plus [`ClientError::Serialize`]
    /// and [`ClientError::Deserialize`] for JSON conversion failures.
    pub async fn call<P, R>(&self, method: &str, params: P) -> Result<R, ClientError>
    where
        P: Serialize,
        R: DeserializeOwned,
    {
        let params = serde_json::to_value(params).map_err(ClientError::Serialize)?;
        let result = self.call_value(method, params).await?;
        serde_json::from_value(result).map_err(ClientError::Deserialize)
    }

    /// Keep `topic` subscribed for the client's lifetime.
    ///
    /// The request is sent at once if connected and replayed after every
    /// reconnect. Subscribing twice to the same topic does nothing. Returns
    /// once the client has recorded the topic.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidState`] if the client has shut down.
    pub async fn subscribe(&self, topic: impl Into<String>) -> Result<(), ClientError> {
        let (applied, done) = oneshot::channel();
        self.commands
            .send(Command::Subscribe {
                topic: topic.into(),
                applied,
            })
            .map_err(|_| ClientError::InvalidState)?;
        done.await.map_err(|_| ClientError::InvalidState)
    }

    /// Register `handler` for events on `topic`, replacing any previous one.
    ///
    /// Every event handled after this returns goes to `handler`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidState`] if the client has shut down.
    pub async fn on<F>(&self, topic: impl Into<String>, handler: F) -> Result<(), ClientError>
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        let handler: TopicHandler = std::sync::Arc::new(handler);
        let (applied, done) = oneshot::channel();
        self.commands
            .send(Command::On {
                topic: topic.into(),
                handler,
                applied,
            })
            .map_err(|_| ClientError::InvalidState)?;
        done.await.map_err(|_| ClientError::InvalidState)
    }

    /// Receiver observing connectivity changes.
    #[must_use]
    pub fn connectivity(&self) -> watch::Receiver<ConnectivityState> { self.connectivity.clone() }

    /// Whether the connection is currently open.
    #[must_use]
    pub fn is_connected(&self) -> bool { self.connectivity.borrow().connected }

    /// Wait until the connection is open.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidState`] if the client shuts down first.
    pub async fn wait_connected(&self) -> Result<(), ClientError> {
        let mut connectivity = self.connectivity.clone();
        let shutdown = self.shutdown.clone();
        tokio::select! {
            ready = connectivity.wait_for(|state| state.connected) => {
                ready.map(|_| ()).map_err(|_| ClientError::InvalidState)
            }
            () = shutdown.cancelled() => Err(ClientError::InvalidState),
        }
    }

    /// Stop the client and wait for its task to finish.
    ///
    /// Pending calls fail with [`ClientError::ConnectionLost`]. Later calls
    /// on any handle fail with [`ClientError::InvalidState`].
    pub async fn shutdown(&self) {
        self.shutdown.cancel();
        self.tracker.close();
        self.tracker.wait().await;
    }
}
