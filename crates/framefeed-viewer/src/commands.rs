//! Line-oriented control on stdin.
//!
//! Stdin is read on a plain thread that forwards lines over a channel. A
//! read blocked there never holds up runtime shutdown; the thread dies with
//! the process.

use crate::host::Controls;
use framefeed_client::SessionHandle;
use std::io::BufRead;
use std::str::FromStr;
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Connect,
    Disconnect,
    Status,
    Quit,
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
#[error("unknown command {0:?} (expected connect, disconnect, status or quit)")]
pub struct UnknownCommand(String);

impl FromStr for Command {
    type Err = UnknownCommand;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "connect" | "c" => Ok(Self::Connect),
            "disconnect" | "d" => Ok(Self::Disconnect),
            "status" | "s" => Ok(Self::Status),
            "quit" | "q" | "exit" => Ok(Self::Quit),
            other => Err(UnknownCommand(other.to_string())),
        }
    }
}

/// Forward stdin lines until EOF or a read error.
pub fn spawn_stdin_reader() -> std::io::Result<mpsc::UnboundedReceiver<String>> {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::Builder::new()
        .name("stdin".into())
        .spawn(move || {
            for line in std::io::stdin().lock().lines() {
                match line {
                    Ok(line) => {
                        if tx.send(line).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        tracing::warn!("Failed to read stdin: {}", e);
                        break;
                    }
                }
            }
        })?;
    Ok(rx)
}

/// Execute commands from `lines` until `quit`. If the input ends first,
/// never returns.
pub async fn run(
    handle: SessionHandle,
    controls: Controls,
    mut lines: mpsc::UnboundedReceiver<String>,
) -> anyhow::Result<()> {
    while let Some(line) = lines.recv().await {
        if line.trim().is_empty() {
            continue;
        }
        let command = match line.parse::<Command>() {
            Ok(command) => command,
            Err(e) => {
                println!("{e}");
                continue;
            }
        };

        match command {
            Command::Connect if !controls.connect_enabled() => {
                println!("connect is not available right now");
            }
            Command::Connect => handle.connect(),
            Command::Disconnect if !controls.disconnect_enabled() => {
                println!("disconnect is not available right now");
            }
            Command::Disconnect => handle.disconnect(),
            Command::Status => match handle.snapshot().await {
                Some(snap) => println!(
                    "{} (connection {}), {} frames drawn, {} decode failures, {} keep-alives",
                    snap.status.map_or("not connected", |view| view.text),
                    snap.generation
                        .map_or_else(|| "none".to_string(), |g| g.to_string()),
                    snap.frames_drawn,
                    snap.decode_failures,
                    snap.pings_sent,
                ),
                None => println!("session stopped"),
            },
            Command::Quit => return Ok(()),
        }
    }

    tracing::debug!("Input closed, waiting for Ctrl-C");
    std::future::pending().await
}
