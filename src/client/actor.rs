//! The task that owns all client state.
//!
//! [`ClientActor`] reacts to one event at a time from a biased
//! `tokio::select!`: shutdown first, then transport events, then application
//! commands, then the reconnect timer. Transport events are preferred over
//! commands so that a `close` already delivered by the network is observed
//! before a new call is accepted on the dead link.

use std::time::Instant;

use log::{debug, info, warn};
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::Span;

use super::{
    SUBSCRIBE_METHOD,
    tracing_config::TracingConfig,
    tracing_helpers::{connect_span, emit_timing_event, start_timer},
};
use crate::{
    dispatcher::{CallDispatcher, CallReply, Continuation},
    error::ClientError,
    frame::Frame,
    hooks::SessionHooks,
    metrics,
    router::{TopicHandler, TopicRouter},
    subscription::SubscriptionSet,
    supervisor::{Supervisor, SupervisorState},
    transport::{LinkState, Transport, TransportEvent},
};

/// Requests sent from [`RpcClient`](super::RpcClient) handles to the actor.
pub(crate) enum Command {
    Call {
        method: String,
        params: Value,
        reply: CallReply,
    },
    Subscribe {
        topic: String,
        applied: oneshot::Sender<()>,
    },
    On {
        topic: String,
        handler: TopicHandler,
        applied: oneshot::Sender<()>,
    },
}

/// Events returned by [`ClientActor::next_event`].
enum Event {
    Shutdown,
    Transport(TransportEvent),
    Command(Command),
    RetryDue,
}

/// Span and timer of the connection attempt in flight.
struct Attempt {
    span: Span,
    started: Option<Instant>,
}

/// Single owner of the transport, pending calls, handlers, subscriptions and
/// reconnect state.
pub(crate) struct ClientActor {
    commands: mpsc::UnboundedReceiver<Command>,
    shutdown: CancellationToken,
    transport: Transport,
    dispatcher: CallDispatcher,
    router: TopicRouter,
    subscriptions: SubscriptionSet,
    supervisor: Supervisor,
    hooks: SessionHooks,
    tracing: TracingConfig,
    attempt: Option<Attempt>,
}

/// Everything the builder hands over to a new actor.
pub(crate) struct ActorParts {
    pub(crate) commands: mpsc::UnboundedReceiver<Command>,
    pub(crate) shutdown: CancellationToken,
    pub(crate) transport: Transport,
    pub(crate) router: TopicRouter,
    pub(crate) subscriptions: SubscriptionSet,
    pub(crate) supervisor: Supervisor,
    pub(crate) hooks: SessionHooks,
    pub(crate) tracing: TracingConfig,
}

impl ClientActor {
    pub(crate) fn new(parts: ActorParts) -> Self {
        Self {
            commands: parts.commands,
            shutdown: parts.shutdown,
            transport: parts.transport,
            dispatcher: CallDispatcher::default(),
            router: parts.router,
            subscriptions: parts.subscriptions,
            supervisor: parts.supervisor,
            hooks: parts.hooks,
            tracing: parts.tracing,
            attempt: None,
        }
    }

    /// Connect and process events until shutdown.
    pub(crate) async fn run(mut self) {
        if self.shutdown.is_cancelled() {
            info!("client stopped before start: peer={}", self.transport.peer());
            return;
        }
        self.begin_attempt();
        loop {
            match self.next_event().await {
                Event::Shutdown => break,
                Event::Transport(TransportEvent::Open) => self.handle_open().await,
                Event::Transport(TransportEvent::Frame(frame)) => self.handle_frame(frame),
                Event::Transport(TransportEvent::Close) => self.handle_close(),
                Event::Command(command) => self.handle_command(command).await,
                Event::RetryDue => self.begin_attempt(),
            }
        }
        self.stop();
    }

    async fn next_event(&mut self) -> Event {
        tokio::select! {
            biased;

            () = self.shutdown.cancelled() => Event::Shutdown,
            event = self.transport.next_event() => Event::Transport(event),
            command = self.commands.recv() => match command {
                Some(command) => Event::Command(command),
                // Every handle is gone; nobody can observe the client.
                None => Event::Shutdown,
            },
            () = self.supervisor.retry_due() => Event::RetryDue,
        }
    }

    fn begin_attempt(&mut self) {
        let peer = self.transport.peer();
        let span = connect_span(&self.tracing, &peer);
        span.in_scope(|| debug!("connecting: peer={peer}"));
        self.attempt = Some(Attempt {
            span,
            started: start_timer(self.tracing.connect_timing),
        });
        self.supervisor.on_attempt();
        self.transport.connect();
    }

    async fn handle_open(&mut self) {
        let info = self.supervisor.on_open();
        metrics::set_connected(true);
        metrics::inc_sessions();
        if let Some(attempt) = self.attempt.take() {
            attempt.span.record("session", info.session());
            attempt.span.in_scope(|| emit_timing_event(attempt.started));
        }
        info!("connected: peer={}, {info}", self.transport.peer());

        self.hooks.session_started(info);

        let topics: Vec<String> = self.subscriptions.iter().map(str::to_owned).collect();
        for topic in topics {
            if self.transport.state() != LinkState::Open {
                debug!("subscription replay stopped, link failed: topic={topic}");
                break;
            }
            self.send_subscribe(topic).await;
        }

        if info.is_reconnect() {
            self.hooks.reconnected(info);
        }
    }

    fn handle_frame(&mut self, frame: Frame) {
        if let Some(unmatched) = self.dispatcher.handle_inbound(frame) {
            self.router.route(unmatched);
        }
    }

    fn handle_close(&mut self) {
        let ended = if self.supervisor.state() == SupervisorState::Connected {
            self.supervisor.current_session()
        } else {
            None
        };
        if let Some(attempt) = self.attempt.take() {
            attempt
                .span
                .in_scope(|| debug!("connection attempt failed: peer={}", self.transport.peer()));
            attempt.span.in_scope(|| emit_timing_event(attempt.started));
        }
        let lost = self.dispatcher.fail_all();
        self.supervisor.on_close();
        metrics::set_connected(false);
        if let Some(info) = ended {
            info!(
                "disconnected: peer={}, {info}, calls_lost={lost}",
                self.transport.peer()
            );
            self.hooks.disconnected(info);
        }
    }

    async fn handle_command(&mut self, command: Command) {
        match command {
            Command::Call {
                method,
                params,
                reply,
            } => {
                self.issue_call(method, params, Continuation::Caller(reply))
                    .await;
            }
            Command::Subscribe { topic, applied } => {
                self.add_subscription(topic).await;
                // The caller may have given up waiting.
                let _ = applied.send(());
            }
            Command::On {
                topic,
                handler,
                applied,
            } => {
                if self.router.on(topic.clone(), handler) {
                    debug!("replaced topic handler: topic={topic}");
                }
                let _ = applied.send(());
            }
        }
    }

    async fn add_subscription(&mut self, topic: String) {
        if !self.subscriptions.insert(topic.clone()) {
            debug!("already subscribed: topic={topic}");
            return;
        }
        if !self.router.has_handler(&topic) {
            debug!("subscribed without a handler, events will be dropped: topic={topic}");
        }
        if self.transport.state() == LinkState::Open {
            self.send_subscribe(topic).await;
        }
    }

    async fn send_subscribe(&mut self, topic: String) {
        let params = Value::String(topic.clone());
        self.issue_call(
            SUBSCRIBE_METHOD.to_owned(),
            params,
            Continuation::Subscription { topic },
        )
        .await;
    }

    /// Send a call and record it as pending.
    ///
    /// Fails the continuation at once when the link is not open or the send
    /// fails. A call is registered only after its frame was written; the
    /// actor handles nothing else in between.
    async fn issue_call(&mut self, method: String, params: Value, continuation: Continuation) {
        if self.transport.state() != LinkState::Open {
            debug!("call refused while disconnected: method={method}");
            continuation.complete(Err(ClientError::InvalidState));
            return;
        }
        let id = self.dispatcher.next_id();
        match self.transport.send(&Frame::call(id, method.clone(), params)).await {
            Ok(()) => {
                debug!("call sent: id={id}, method={method}");
                self.dispatcher.insert(id, method, continuation);
            }
            Err(err) => {
                warn!("call not sent: id={id}, method={method}, error={err}");
                continuation.complete(Err(err));
            }
        }
    }

    fn stop(&mut self) {
        let peer = self.transport.peer();
        self.transport.close();
        let lost = self.dispatcher.fail_all();
        self.supervisor.on_shutdown();
        metrics::set_connected(false);
        info!("client stopped: peer={peer}, calls_lost={lost}");
        // Commands queued behind the shutdown are refused. Dropping an
        // unanswered acknowledgement reports `InvalidState` to its caller.
        self.commands.close();
        while let Ok(command) = self.commands.try_recv() {
            if let Command::Call { reply, .. } = command {
                Continuation::Caller(reply).complete(Err(ClientError::InvalidState));
            }
        }
    }
}
