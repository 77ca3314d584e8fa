//! Core types for framefeed.
//!
//! This crate provides the I/O-free primitives: the connection lifecycle
//! state, the stream endpoint, and the status projection hosts render.

mod endpoint;
mod status;

pub use endpoint::{Endpoint, EndpointParseError};
pub use status::{Indicator, StatusView};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Text message sent periodically to keep an open transport alive.
pub const KEEPALIVE_TOKEN: &str = "ping";

/// Connection lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// Handle created, transport not yet ready.
    Idle,
    /// Transport ready; frames and keep-alives flow.
    Open,
    /// Terminated, or never connected.
    Closed,
    /// Transport reported a fault. Advisory: cleanup still follows a close.
    Errored,
}

impl ConnectionState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Open => "open",
            Self::Closed => "closed",
            Self::Errored => "errored",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
