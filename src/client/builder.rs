//! Builder for configuring and starting an [`RpcClient`].

use std::{sync::Arc, time::Duration};

use serde_json::Value;
use tokio::sync::mpsc;
use tokio_util::{sync::CancellationToken, task::TaskTracker};

use super::{
    RpcClient,
    TracingConfig,
    actor::{ActorParts, ClientActor},
};
use crate::{
    endpoint,
    error::TransportError,
    hooks::{SessionHooks, SessionInfo},
    router::TopicRouter,
    subscription::SubscriptionSet,
    supervisor::{ReconnectConfig, Supervisor},
    transport::{Connector, Transport, WebSocketConnector},
};

/// Configures handlers, subscriptions, hooks and timing before the client
/// connects.
///
/// Handlers and subscriptions registered here are in place before the first
/// connection attempt, so no early event is missed.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use iobus_rpc::{RpcClient, transport::channel_transport};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let (connector, _listener) = channel_transport();
/// let client = RpcClient::builder()
///     .reconnect_delay(Duration::from_millis(250))
///     .subscribe("state")
///     .start_with(connector);
/// client.shutdown().await;
/// # }
/// ```
#[derive(Default)]
pub struct RpcClientBuilder {
    reconnect: ReconnectConfig,
    router: TopicRouter,
    subscriptions: SubscriptionSet,
    hooks: SessionHooks,
    tracing: TracingConfig,
}

impl RpcClientBuilder {
    /// Create a builder with default settings.
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Set the fixed delay between a close and the next attempt.
    #[must_use]
    pub fn reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect = self.reconnect.with_delay(delay);
        self
    }

    /// Replace the whole reconnect configuration.
    #[must_use]
    pub fn reconnect_config(mut self, config: ReconnectConfig) -> Self {
        self.reconnect = config;
        self
    }

    /// Register `handler` for events on `topic`.
    #[must_use]
    pub fn on_topic<F>(mut self, topic: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        self.router.on(topic.into(), Arc::new(handler));
        self
    }

    /// Keep `topic` subscribed, starting with the first connection.
    #[must_use]
    pub fn subscribe(mut self, topic: impl Into<String>) -> Self {
        self.subscriptions.insert(topic);
        self
    }

    /// Run `hook` on every open, before subscriptions are replayed.
    #[must_use]
    pub fn on_session_start<F>(mut self, hook: F) -> Self
    where
        F: Fn(SessionInfo) + Send + Sync + 'static,
    {
        self.hooks.on_session_start.push(Arc::new(hook));
        self
    }

    /// Run `hook` after subscriptions are replayed on a reconnect.
    ///
    /// The first connection of the client does not trigger it.
    #[must_use]
    pub fn on_reconnected<F>(mut self, hook: F) -> Self
    where
        F: Fn(SessionInfo) + Send + Sync + 'static,
    {
        self.hooks.on_reconnected.push(Arc::new(hook));
        self
    }

    /// Run `hook` when an open session ends.
    #[must_use]
    pub fn on_disconnected<F>(mut self, hook: F) -> Self
    where
        F: Fn(SessionInfo) + Send + Sync + 'static,
    {
        self.hooks.on_disconnected.push(Arc::new(hook));
        self
    }

    /// Configure tracing spans and timing.
    #[must_use]
    pub fn tracing_config(mut self, config: TracingConfig) -> Self {
        self.tracing = config;
        self
    }

    /// Start a client talking to `server` over WebSocket.
    ///
    /// `server` may be an `http(s)` origin, from which the `ws(s)` RPC
    /// endpoint is derived, or a `ws(s)` URL used as is.
    ///
    /// Must be called within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] if `server` is not a usable URL.
    pub fn start(self, server: &str) -> Result<RpcClient, TransportError> {
        let url = endpoint::rpc_url(server)?;
        Ok(self.start_with(WebSocketConnector::new(url)))
    }

    /// Start a client using `connector` to open connections.
    ///
    /// The first connection attempt begins immediately. Must be called within
    /// a Tokio runtime.
    #[must_use]
    pub fn start_with<C: Connector>(self, connector: C) -> RpcClient {
        let (commands_tx, commands) = mpsc::unbounded_channel();
        let (supervisor, connectivity) = Supervisor::new(self.reconnect);
        let shutdown = CancellationToken::new();
        let tracker = TaskTracker::new();
        let actor = ClientActor::new(ActorParts {
            commands,
            shutdown: shutdown.clone(),
            transport: Transport::new(Arc::new(connector)),
            router: self.router,
            subscriptions: self.subscriptions,
            supervisor,
            hooks: self.hooks,
            tracing: self.tracing.clone(),
        });
        tracker.spawn(actor.run());
        RpcClient {
            commands: commands_tx,
            connectivity,
            shutdown,
            tracker,
            tracing: self.tracing,
        }
    }
}
