//! `iobus-rpc`: follow the pushed topics of an IOBus node server.
//!
//! Every event is printed on stdout as one JSON line
//! `{"topic": ..., "data": ...}`. Connectivity changes are logged.

mod cli;

use std::time::Duration;

use clap::Parser;
use iobus_rpc::{RpcClient, monitor::topics};
use log::{info, warn};
use serde_json::{Value, json};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Applications embedding the library should install their own subscriber.
    tracing_subscriber::fmt::init();

    let cli = cli::Cli::parse();
    install_metrics(&cli)?;

    let topics = if cli.topics.is_empty() {
        topics::ALL.iter().map(|&topic| topic.to_owned()).collect()
    } else {
        cli.topics.clone()
    };

    let mut builder =
        RpcClient::builder().reconnect_delay(Duration::from_millis(cli.reconnect_delay_ms));
    for topic in topics {
        let name = topic.clone();
        builder = builder
            .on_topic(topic.clone(), move |data: &Value| {
                println!("{}", json!({ "topic": name, "data": data }));
            })
            .subscribe(topic);
    }
    let client = builder
        .on_reconnected(|info| info!("resubscribed after reconnect: {info}"))
        .start(&cli.server)?;

    let mut connectivity = client.connectivity();
    loop {
        tokio::select! {
            changed = connectivity.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = *connectivity.borrow_and_update();
                if state.connected {
                    info!("connected to {}", cli.server);
                } else {
                    warn!("disconnected, reconnecting{}", state.indicator());
                }
            }
            signal = tokio::signal::ctrl_c() => {
                signal?;
                break;
            }
        }
    }

    client.shutdown().await;
    Ok(())
}

#[cfg(feature = "metrics")]
fn install_metrics(cli: &cli::Cli) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(addr) = cli.metrics_addr {
        metrics_exporter_prometheus::PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()?;
        info!("serving metrics on {addr}");
    }
    Ok(())
}

#[cfg(not(feature = "metrics"))]
fn install_metrics(cli: &cli::Cli) -> Result<(), Box<dyn std::error::Error>> {
    if cli.metrics_addr.is_some() {
        warn!("built without the metrics feature; --metrics-addr ignored");
    }
    Ok(())
}
