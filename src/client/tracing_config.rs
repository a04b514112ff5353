//! Tracing configuration for RPC client operations.
//!
//! [`TracingConfig`] controls the level of the spans the client emits and
//! whether completed calls record their elapsed time.

use tracing::Level;

/// Controls tracing span levels and per-call timing.
///
/// By default, connection attempts emit spans at `INFO` level and calls
/// emit spans at `DEBUG` level. Per-call timing is disabled by default.
///
/// Spans are always created at the configured level. When no `tracing`
/// subscriber is installed, span creation is a no-op. When timing is
/// enabled, an additional event recording `elapsed_us` is emitted when the
/// operation completes.
///
/// # Examples
///
/// ```
/// use iobus_rpc::TracingConfig;
/// use tracing::Level;
///
/// let config = TracingConfig::default()
///     .with_call_level(Level::TRACE)
///     .with_call_timing(true);
/// let _ = config;
/// ```
#[derive(Clone, Debug)]
pub struct TracingConfig {
    pub(crate) connect_level: Level,
    pub(crate) call_level: Level,
    pub(crate) connect_timing: bool,
    pub(crate) call_timing: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            connect_level: Level::INFO,
            call_level: Level::DEBUG,
            connect_timing: false,
            call_timing: false,
        }
    }
}

impl TracingConfig {
    /// Set the tracing level for connection attempts.
    #[must_use]
    pub fn with_connect_level(mut self, level: Level) -> Self {
        self.connect_level = level;
        self
    }

    /// Enable or disable timing of connection attempts.
    ///
    /// When enabled, an event recording `elapsed_us` is emitted at `DEBUG`
    /// level once the attempt opens or fails.
    #[must_use]
    pub fn with_connect_timing(mut self, enabled: bool) -> Self {
        self.connect_timing = enabled;
        self
    }

    /// Set the tracing level for calls.
    #[must_use]
    pub fn with_call_level(mut self, level: Level) -> Self {
        self.call_level = level;
        self
    }

    /// Enable or disable per-call timing.
    #[must_use]
    pub fn with_call_timing(mut self, enabled: bool) -> Self {
        self.call_timing = enabled;
        self
    }

    /// Set every operation to the same tracing level.
    #[must_use]
    pub fn with_all_levels(self, level: Level) -> Self {
        self.with_connect_level(level).with_call_level(level)
    }

    /// Enable or disable timing for every operation.
    #[must_use]
    pub fn with_all_timing(self, enabled: bool) -> Self {
        self.with_connect_timing(enabled).with_call_timing(enabled)
    }
}
