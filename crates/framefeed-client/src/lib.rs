//! Streaming frame client.
//!
//! Attaches to a single WebSocket frame source and renders each binary
//! message as an image on a host-provided surface:
//! - The host is polled until its render target exists, then one automatic
//!   connect follows after a short settle delay
//! - A connection is kept alive with a periodic text token while open
//! - Frames are decoded off the session task; only the newest finished
//!   decode is ever drawn
//!
//! ```no_run
//! # use framefeed_client::{FeedConfig, Host, Session, WsTransport};
//! # async fn run(host: impl Host) {
//! let session = Session::start(FeedConfig::default(), host, WsTransport);
//! let control = session.handle();
//! control.disconnect();
//! control.connect();
//! session.shutdown().await;
//! # }
//! ```

mod config;
mod host;
mod readiness;
mod render;
mod session;
mod status;
mod transport;
mod ws;

pub use config::{ConfigError, FeedConfig};
pub use host::{Discovery, Host, StatusWidgets, Surface};
pub use readiness::{wait_for_target, ReadinessError};
pub use render::{
    decode_frame, DecodeJob, FrameError, FrameImage, LatestFrame, RenderStats, Renderer,
};
pub use session::{Session, SessionHandle, SessionSnapshot};
pub use status::StatusPublisher;
pub use transport::{EventSink, Link, Transport, TransportError, TransportEvent};
pub use ws::WsTransport;

pub use framefeed_core::{ConnectionState, Endpoint, Indicator, StatusView};
