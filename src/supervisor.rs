//! Reconnection policy and connectivity signalling.
//!
//! The [`Supervisor`] drives the cyclic `Disconnected → Connecting →
//! Connected → Disconnected` state machine. It publishes a
//! [`ConnectivityState`] on a `watch` channel so that a UI can show a
//! connected flag and an animated "reconnecting" indicator. Retries use a
//! fixed delay and never give up.

use std::time::Duration;

use tokio::{
    sync::watch,
    time::{Instant, sleep_until},
};

use crate::hooks::SessionInfo;

/// Delay between a close and the next connection attempt.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_millis(1000);

/// Number of distinct indicator frames; `retry_count` cycles through
/// `0..INDICATOR_FRAMES`.
pub const INDICATOR_FRAMES: u8 = 4;

/// Reconnection timing.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use iobus_rpc::ReconnectConfig;
///
/// let config = ReconnectConfig::default().with_delay(Duration::ZERO);
/// assert_eq!(config.delay(), Duration::from_millis(1));
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReconnectConfig {
    delay: Duration,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            delay: DEFAULT_RECONNECT_DELAY,
        }
    }
}

impl ReconnectConfig {
    /// Set the fixed delay before each reconnection attempt.
    ///
    /// The delay is clamped to at least one millisecond.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay.max(Duration::from_millis(1));
        self
    }

    /// The configured delay.
    #[must_use]
    pub const fn delay(&self) -> Duration { self.delay }
}

/// Connection health as shown to the user.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ConnectivityState {
    /// Whether the connection is currently open.
    pub connected: bool,
    /// Animation counter advanced on every close, wrapping within
    /// `0..INDICATOR_FRAMES`. It carries no retry semantics.
    pub retry_count: u8,
}

impl ConnectivityState {
    /// Render the reconnect indicator as a run of dots.
    ///
    /// ```
    /// use iobus_rpc::ConnectivityState;
    ///
    /// let state = ConnectivityState {
    ///     connected: false,
    ///     retry_count: 3,
    /// };
    /// assert_eq!(state.indicator(), "...");
    /// ```
    #[must_use]
    pub fn indicator(&self) -> String { ".".repeat(usize::from(self.retry_count)) }
}

/// Position in the reconnect cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SupervisorState {
    /// No connection; a retry may be scheduled.
    Disconnected,
    /// A connection attempt is in flight.
    Connecting,
    /// The connection is open.
    Connected,
}

/// Owner of the reconnect cycle and the published connectivity state.
#[derive(Debug)]
pub(crate) struct Supervisor {
    config: ReconnectConfig,
    state: SupervisorState,
    sessions: u64,
    connectivity: watch::Sender<ConnectivityState>,
    retry_at: Option<Instant>,
}

impl Supervisor {
    /// Create a supervisor and the receiver readers use to observe it.
    pub(crate) fn new(config: ReconnectConfig) -> (Self, watch::Receiver<ConnectivityState>) {
        let (connectivity, rx) = watch::channel(ConnectivityState::default());
        (
            Self {
                config,
                state: SupervisorState::Disconnected,
                sessions: 0,
                connectivity,
                retry_at: None,
            },
            rx,
        )
    }

    pub(crate) fn state(&self) -> SupervisorState { self.state }

    /// Info about the most recent session, if one was ever opened.
    pub(crate) fn current_session(&self) -> Option<SessionInfo> {
        (self.sessions > 0).then(|| SessionInfo::new(self.sessions))
    }

    /// A connection attempt starts.
    pub(crate) fn on_attempt(&mut self) {
        self.retry_at = None;
        self.state = SupervisorState::Connecting;
    }

    /// The transport opened. Returns the new session.
    pub(crate) fn on_open(&mut self) -> SessionInfo {
        self.state = SupervisorState::Connected;
        self.sessions += 1;
        self.connectivity.send_modify(|state| state.connected = true);
        SessionInfo::new(self.sessions)
    }

    /// The transport closed: schedule the next attempt and advance the
    /// indicator.
    pub(crate) fn on_close(&mut self) {
        self.state = SupervisorState::Disconnected;
        self.connectivity.send_modify(|state| {
            state.connected = false;
            state.retry_count = (state.retry_count + 1) % INDICATOR_FRAMES;
        });
        self.retry_at = Some(Instant::now() + self.config.delay());
    }

    /// The client is shutting down: cancel any retry and report
    /// disconnected.
    pub(crate) fn on_shutdown(&mut self) {
        self.state = SupervisorState::Disconnected;
        self.retry_at = None;
        self.connectivity.send_if_modified(|state| {
            let was_connected = state.connected;
            state.connected = false;
            was_connected
        });
    }

    /// Resolve when the scheduled retry is due. Never resolves if no retry
    /// is scheduled.
    pub(crate) async fn retry_due(&mut self) {
        match self.retry_at {
            Some(deadline) => sleep_until(deadline).await,
            None => std::future::pending().await,
        }
    }
}
