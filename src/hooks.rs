//! Session lifecycle hooks.
//!
//! Hooks let the application react to the connection's lifecycle without
//! polling. They run synchronously on the client's event loop, in
//! registration order, so they must not block. A hook that wants to issue
//! calls should spawn a task using a cloned [`crate::RpcClient`].

use std::{fmt, sync::Arc};

use log::warn;

use crate::panic::format_panic;

/// Identifies one open period of the connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SessionInfo {
    session: u64,
}

impl SessionInfo {
    pub(crate) fn new(session: u64) -> Self { Self { session } }

    /// 1-based count of successful connections, this one included.
    #[must_use]
    pub fn session(&self) -> u64 { self.session }

    /// Whether this session follows an earlier one, i.e. is a reconnect.
    #[must_use]
    pub fn is_reconnect(&self) -> bool { self.session > 1 }
}

impl fmt::Display for SessionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session {}", self.session)
    }
}

/// Callback invoked at a session boundary.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
///
/// use iobus_rpc::hooks::SessionHook;
///
/// let hook: SessionHook = Arc::new(|info| {
///     if info.is_reconnect() {
///         println!("reconnected ({info})");
///     }
/// });
/// # let _ = hook;
/// ```
pub type SessionHook = Arc<dyn Fn(SessionInfo) + Send + Sync>;

/// Hooks configured on the builder.
#[derive(Default)]
pub(crate) struct SessionHooks {
    /// Run on every open, before subscriptions are replayed. Used to reset
    /// state that belongs to the previous session.
    pub(crate) on_session_start: Vec<SessionHook>,
    /// Run after subscriptions are replayed, on every open but the first.
    pub(crate) on_reconnected: Vec<SessionHook>,
    /// Run when an open session ends.
    pub(crate) on_disconnected: Vec<SessionHook>,
}

impl SessionHooks {
    pub(crate) fn session_started(&self, info: SessionInfo) {
        run_all("session start", &self.on_session_start, info);
    }

    pub(crate) fn reconnected(&self, info: SessionInfo) {
        run_all("reconnected", &self.on_reconnected, info);
    }

    pub(crate) fn disconnected(&self, info: SessionInfo) {
        run_all("disconnected", &self.on_disconnected, info);
    }
}

fn run_all(stage: &str, hooks: &[SessionHook], info: SessionInfo) {
    for hook in hooks {
        if let Err(panic) =
            std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| hook(info)))
        {
            warn!(
                "{stage} hook panicked: {info}, panic={}",
                format_panic(panic)
            );
        }
    }
}
