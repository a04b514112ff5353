//! Latest-value view of a node server's pushed topics.
//!
//! [`NodeMonitor`] keeps the most recent payload of each well-known topic in
//! a `watch` channel. Payloads are opaque: the monitor never inspects them.
//! A new session clears every value, since state pushed by the previous
//! connection may be stale.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::watch;

use crate::client::RpcClientBuilder;

/// Names of the topics a node server publishes.
pub mod topics {
    /// Node, pin and LSS state.
    pub const STATE: &str = "state";
    /// Trailing window of the ISP console output.
    pub const ISP_CONSOLE: &str = "isp_console";
    /// Firmware files available on the server.
    pub const FIRMWARE: &str = "firmware";

    /// Every well-known topic, in subscription order.
    pub const ALL: [&str; 3] = [STATE, ISP_CONSOLE, FIRMWARE];
}

#[derive(Debug)]
struct Channels {
    state: watch::Sender<Option<Value>>,
    console: watch::Sender<Option<Value>>,
    firmware: watch::Sender<Option<Value>>,
}

impl Channels {
    fn for_topic(&self, topic: &str) -> Option<&watch::Sender<Option<Value>>> {
        match topic {
            topics::STATE => Some(&self.state),
            topics::ISP_CONSOLE => Some(&self.console),
            topics::FIRMWARE => Some(&self.firmware),
            _ => None,
        }
    }
}

/// Keeps the latest `state`, `isp_console` and `firmware` payloads.
///
/// # Examples
///
/// ```no_run
/// use iobus_rpc::{NodeMonitor, RpcClient};
///
/// # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
/// let monitor = NodeMonitor::new();
/// let client = monitor
///     .install(RpcClient::builder())
///     .start("http://localhost:8000")?;
/// let mut state = monitor.state();
/// state.changed().await?;
/// println!("{:?}", *state.borrow());
/// # client.shutdown().await;
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct NodeMonitor {
    channels: Arc<Channels>,
}

impl Default for NodeMonitor {
    fn default() -> Self { Self::new() }
}

impl NodeMonitor {
    /// Create a monitor with no values.
    #[must_use]
    pub fn new() -> Self {
        Self {
            channels: Arc::new(Channels {
                state: watch::Sender::new(None),
                console: watch::Sender::new(None),
                firmware: watch::Sender::new(None),
            }),
        }
    }

    /// Register handlers for every topic, subscribe to them, and clear the
    /// values whenever a session starts.
    #[must_use]
    pub fn install(&self, mut builder: RpcClientBuilder) -> RpcClientBuilder {
        for topic in topics::ALL {
            let monitor = self.clone();
            builder = builder
                .on_topic(topic, move |data: &Value| monitor.update(topic, data))
                .subscribe(topic);
        }
        let monitor = self.clone();
        builder.on_session_start(move |_| monitor.reset())
    }

    /// Latest `state` payload.
    #[must_use]
    pub fn state(&self) -> watch::Receiver<Option<Value>> { self.channels.state.subscribe() }

    /// Latest `isp_console` payload.
    #[must_use]
    pub fn console(&self) -> watch::Receiver<Option<Value>> { self.channels.console.subscribe() }

    /// Latest `firmware` payload.
    #[must_use]
    pub fn firmware(&self) -> watch::Receiver<Option<Value>> {
        self.channels.firmware.subscribe()
    }

    /// Store `data` as the latest payload of `topic`. Unknown topics are
    /// ignored.
    pub fn update(&self, topic: &str, data: &Value) {
        if let Some(channel) = self.channels.for_topic(topic) {
            channel.send_replace(Some(data.clone()));
        }
    }

    /// Clear every value.
    pub fn reset(&self) {
        for topic in topics::ALL {
            if let Some(channel) = self.channels.for_topic(topic) {
                channel.send_if_modified(|value| value.take().is_some());
            }
        }
    }
}
