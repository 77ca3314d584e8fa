//! Headless frame viewer.
//!
//! Streams frames from a WebSocket endpoint and keeps the latest one in an
//! image file. Status changes are printed; `connect`, `disconnect`, `status`
//! and `quit` are read from stdin.
//!
//!   framefeed-viewer --endpoint ws://127.0.0.1:8010/ws/annotated --output out/frame.png
//!
//! The session waits for the output directory to exist before connecting.

mod commands;
mod host;

use anyhow::Context;
use clap::Parser;
use framefeed_client::{FeedConfig, Session, WsTransport};
use framefeed_core::Endpoint;
use host::{Controls, FileHost};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "framefeed-viewer", about = "Stream frames from a WebSocket into an image file")]
struct Args {
    /// TOML config file; flags below override it
    #[arg(long, env = "FRAMEFEED_CONFIG")]
    config: Option<PathBuf>,

    /// Frame source, e.g. ws://127.0.0.1:8010/ws/annotated
    #[arg(long, env = "FRAMEFEED_ENDPOINT")]
    endpoint: Option<Endpoint>,

    /// Where the displayed frame is written (PNG)
    #[arg(long, short, env = "FRAMEFEED_OUTPUT", default_value = "frame.png")]
    output: PathBuf,

    /// Width frames are scaled to
    #[arg(long, default_value_t = 640)]
    width: u32,

    /// Height frames are scaled to
    #[arg(long, default_value_t = 480)]
    height: u32,

    /// Wait for a `connect` command instead of connecting on discovery
    #[arg(long, env = "FRAMEFEED_NO_AUTO_CONNECT")]
    no_auto_connect: bool,

    /// Keep-alive interval in milliseconds
    #[arg(long, env = "FRAMEFEED_KEEPALIVE_MS")]
    keepalive_ms: Option<u64>,
}

impl Args {
    fn feed_config(&self) -> anyhow::Result<FeedConfig> {
        let mut config = match &self.config {
            Some(path) => FeedConfig::load(path)?,
            None => FeedConfig::default(),
        };
        if let Some(endpoint) = &self.endpoint {
            config.endpoint = endpoint.clone();
        }
        if let Some(ms) = self.keepalive_ms {
            config.keepalive_interval_ms = ms;
        }
        if self.no_auto_connect {
            config.auto_connect = false;
        }
        config.validate().context("invalid command-line overrides")?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("framefeed=info".parse()?))
        .init();

    let args = Args::parse();
    let config = args.feed_config()?;

    tracing::info!(
        "Streaming {} into {}",
        config.endpoint,
        args.output.display()
    );

    let controls = Controls::default();
    let host = FileHost::new(args.output.clone(), (args.width, args.height), controls.clone());
    let session = Session::start(config, host, WsTransport);
    let handle = session.handle();
    let lines = commands::spawn_stdin_reader().context("failed to start stdin reader")?;

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result?;
            tracing::info!("Interrupted");
        }
        result = commands::run(handle, controls, lines) => result?,
    }

    session.shutdown().await;
    Ok(())
}
