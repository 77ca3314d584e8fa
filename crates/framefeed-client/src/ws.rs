//! WebSocket transport.
//!
//! One task per link owns the socket and selects over inbound messages,
//! queued outbound text and the close request.

use crate::transport::{EventSink, Link, Transport, TransportError};
use framefeed_core::Endpoint;
use futures_util::{SinkExt, StreamExt};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;

/// How long to wait for the peer to acknowledge our close frame.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(2);

/// [`Transport`] backed by `tokio-tungstenite`.
///
/// Links must be opened from within a Tokio runtime.
#[derive(Debug, Clone, Default)]
pub struct WsTransport;

impl Transport for WsTransport {
    fn open(&self, endpoint: &Endpoint, events: EventSink) -> Box<dyn Link> {
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let open = Arc::new(AtomicBool::new(false));
        let cancel = CancellationToken::new();

        tokio::spawn(run_link(
            endpoint.to_string(),
            events,
            outbound_rx,
            open.clone(),
            cancel.clone(),
        ));

        Box::new(WsLink {
            outbound: outbound_tx,
            open,
            cancel,
        })
    }
}

struct WsLink {
    outbound: mpsc::UnboundedSender<String>,
    open: Arc<AtomicBool>,
    cancel: CancellationToken,
}

impl Link for WsLink {
    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst) && !self.cancel.is_cancelled()
    }

    fn send_text(&self, text: &str) -> Result<(), TransportError> {
        if !self.is_open() {
            return Err(TransportError::NotOpen);
        }
        self.outbound
            .send(text.to_string())
            .map_err(|_| TransportError::NotOpen)
    }

    fn close(&self) {
        self.cancel.cancel();
    }
}

impl Drop for WsLink {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn run_link(
    url: String,
    events: EventSink,
    mut outbound: mpsc::UnboundedReceiver<String>,
    open: Arc<AtomicBool>,
    cancel: CancellationToken,
) {
    let ws = tokio::select! {
        result = tokio_tungstenite::connect_async(url.as_str()) => match result {
            Ok((ws, _response)) => ws,
            Err(source) => {
                let err = TransportError::Connect { endpoint: url, source };
                events.fault(err.to_string());
                events.closed();
                return;
            }
        },
        () = cancel.cancelled() => {
            tracing::debug!(generation = events.generation(), "Connect cancelled");
            events.closed();
            return;
        }
    };

    open.store(true, Ordering::SeqCst);
    events.opened();

    let (mut sink, mut stream) = ws.split();

    loop {
        tokio::select! {
            msg = stream.next() => {
                match msg {
                    Some(Ok(Message::Binary(data))) => events.frame(data.to_vec()),
                    Some(Ok(Message::Text(text))) => {
                        tracing::debug!("Ignoring text message: {}", text.as_str());
                    }
                    Some(Ok(Message::Close(frame))) => {
                        tracing::debug!("Peer closed: {:?}", frame);
                        break;
                    }
                    // Ping/pong are answered by tungstenite itself.
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        events.fault(TransportError::from(e).to_string());
                        break;
                    }
                    None => break,
                }
            }

            Some(text) = outbound.recv() => {
                if let Err(e) = sink.send(Message::Text(text.into())).await {
                    events.fault(TransportError::from(e).to_string());
                    break;
                }
            }

            () = cancel.cancelled() => {
                open.store(false, Ordering::SeqCst);
                if sink.send(Message::Close(None)).await.is_ok() {
                    // Wait for the peer's close frame so the shutdown is clean.
                    let _ = tokio::time::timeout(CLOSE_TIMEOUT, async {
                        while let Some(Ok(msg)) = stream.next().await {
                            if msg.is_close() {
                                break;
                            }
                        }
                    })
                    .await;
                }
                break;
            }
        }
    }

    open.store(false, Ordering::SeqCst);
    events.closed();
}
