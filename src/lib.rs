#![doc(html_root_url = "https://docs.rs/iobus-rpc/latest")]
//! Reconnecting, topic-multiplexed RPC client for IOBus node servers.
//!
//! A node server exposes a single duplex connection carrying JSON frames:
//! correlated request/response calls plus pushed events on named topics
//! (`state`, `isp_console`, `firmware`). [`RpcClient`] keeps that connection
//! alive, replays topic subscriptions after every reconnect and routes
//! events to per-topic handlers. Connection health is published as a
//! [`ConnectivityState`].
//!
//! ```no_run
//! use iobus_rpc::RpcClient;
//! use serde_json::Value;
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let client = RpcClient::builder()
//!     .on_topic("firmware", |files: &Value| println!("firmware: {files}"))
//!     .subscribe("firmware")
//!     .start("http://localhost:8080")?;
//! let nodes: Value = client.call("info", ()).await?;
//! println!("{nodes}");
//! client.shutdown().await;
//! # Ok(())
//! # }
//! ```

pub mod client;
mod dispatcher;
pub mod endpoint;
pub mod error;
pub mod frame;
pub mod hooks;
pub mod metrics;
pub mod monitor;
pub mod panic;
mod router;
pub mod subscription;
pub mod supervisor;
pub mod transport;

pub use client::{RpcClient, RpcClientBuilder, SUBSCRIBE_METHOD, TracingConfig};
pub use error::{ClientError, RemoteError, TransportError};
pub use frame::{CallId, Frame};
pub use hooks::SessionInfo;
pub use metrics::{CALLS_TOTAL, CONNECTED, EVENTS_TOTAL, SESSIONS_TOTAL};
pub use monitor::NodeMonitor;
pub use router::TopicHandler;
pub use subscription::SubscriptionSet;
pub use supervisor::{ConnectivityState, ReconnectConfig, SupervisorState};
pub use transport::{Connection, Connector};
