//! Transport abstraction.
//!
//! A [`Transport`] opens links; each link reports back through the
//! [`EventSink`] it was opened with. Sinks are tagged with the generation of
//! the connection handle that owns the link, so events from a replaced
//! connection can be recognised and ignored.

use crate::session::Event;
use framefeed_core::Endpoint;
use tokio::sync::mpsc;

/// What a link reports about itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// Handshake completed.
    Opened,
    /// One binary message.
    Frame(Vec<u8>),
    /// Something went wrong. Not terminal by itself.
    Fault(String),
    /// The link is gone. Reported exactly once.
    Closed,
}

/// Where a link posts its events.
#[derive(Debug, Clone)]
pub struct EventSink {
    generation: u64,
    queue: mpsc::UnboundedSender<Event>,
}

impl EventSink {
    pub(crate) fn new(generation: u64, queue: mpsc::UnboundedSender<Event>) -> Self {
        Self { generation, queue }
    }

    /// Generation of the connection handle this sink belongs to.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn opened(&self) {
        self.post(TransportEvent::Opened);
    }

    pub fn frame(&self, payload: Vec<u8>) {
        self.post(TransportEvent::Frame(payload));
    }

    pub fn fault(&self, reason: impl Into<String>) {
        self.post(TransportEvent::Fault(reason.into()));
    }

    pub fn closed(&self) {
        self.post(TransportEvent::Closed);
    }

    fn post(&self, event: TransportEvent) {
        // The session is gone; nobody is listening anymore.
        let _ = self.queue.send(Event::Transport {
            generation: self.generation,
            event,
        });
    }
}

/// Opens links to an endpoint.
pub trait Transport: Send + Sync + 'static {
    /// Start connecting and return immediately. Progress, frames and the
    /// final close are reported through `events`.
    fn open(&self, endpoint: &Endpoint, events: EventSink) -> Box<dyn Link>;
}

/// The session's handle on one open (or opening) link.
pub trait Link: Send {
    /// Whether the link is currently open. Turns false as soon as a close
    /// has been requested.
    fn is_open(&self) -> bool;

    /// Queue a text message.
    fn send_text(&self, text: &str) -> Result<(), TransportError>;

    /// Request termination. The link reports [`TransportEvent::Closed`] when
    /// done. Calling this more than once is harmless.
    fn close(&self);
}

/// Transport-level failures.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("transport is not open")]
    NotOpen,
    #[error("websocket handshake with {endpoint} failed: {source}")]
    Connect {
        endpoint: String,
        #[source]
        source: tokio_tungstenite::tungstenite::Error,
    },
    #[error("websocket error: {0}")]
    Socket(#[from] tokio_tungstenite::tungstenite::Error),
}
