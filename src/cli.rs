//! Command line interface for the `iobus-rpc` binary.
//!
//! Shared with the build script, which renders the man page from it, so it
//! must not depend on the library crate.

use std::net::SocketAddr;

use clap::Parser;

/// Command line arguments for the `iobus-rpc` binary.
#[derive(Debug, Parser)]
#[command(
    name = "iobus-rpc",
    version,
    about = "Follow the pushed topics of an IOBus node server"
)]
pub struct Cli {
    /// Server origin (`http(s)://host:port`) or RPC WebSocket URL.
    #[arg(short, long, env = "IOBUS_SERVER", default_value = "http://localhost:8080")]
    pub server: String,

    /// Topic to follow. May be repeated; defaults to every well-known topic.
    #[arg(short, long = "topic", value_name = "TOPIC")]
    pub topics: Vec<String>,

    /// Delay before each reconnection attempt, in milliseconds.
    #[arg(long, value_name = "MS", default_value_t = 1000)]
    pub reconnect_delay_ms: u64,

    /// Address to serve Prometheus metrics on.
    #[arg(long, value_name = "ADDR")]
    pub metrics_addr: Option<SocketAddr>,
}
