mod common;

use common::{png_frame, wait_for, Canvas, ScriptedHost, Widgets};
use framefeed_client::{ConnectionState, Endpoint, FeedConfig, Session, WsTransport};
use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;

fn fast_config(endpoint: Endpoint) -> FeedConfig {
    FeedConfig {
        endpoint,
        poll_interval_ms: 10,
        settle_delay_ms: 10,
        keepalive_interval_ms: 50,
        ..FeedConfig::default()
    }
}

async fn wait_for_text(widgets: &Widgets, text: &str) {
    timeout(Duration::from_secs(5), async {
        while !widgets.get().history.iter().any(|t| t == text) {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap_or_else(|_| panic!("status never showed {text:?}"));
}

#[tokio::test]
async fn streams_frames_and_keeps_alive() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (text_tx, mut text_rx) = mpsc::unbounded_channel();

    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        let (mut sink, mut stream) = ws.split();
        sink.send(Message::Binary(png_frame(4, 4, [0, 128, 255]).into()))
            .await
            .unwrap();
        while let Some(Ok(msg)) = stream.next().await {
            match msg {
                Message::Text(text) => {
                    let _ = text_tx.send(text.as_str().to_string());
                }
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    let canvas = Canvas::new(4, 4);
    let host = ScriptedHost::ready(canvas.clone(), Widgets::default());
    let endpoint = Endpoint::ws(addr.to_string(), "/ws/annotated");
    let session = Session::start(fast_config(endpoint), host, WsTransport);
    let handle = session.handle();

    let snap = wait_for(&handle, |s| s.frames_drawn == 1).await;
    assert_eq!(snap.state, ConnectionState::Open);
    assert_eq!(canvas.draws()[0].get_pixel(1, 1).0, [0, 128, 255, 255]);

    let token = timeout(Duration::from_secs(5), text_rx.recv())
        .await
        .expect("no keep-alive received")
        .unwrap();
    assert_eq!(token, "ping");

    handle.disconnect();
    let snap = wait_for(&handle, |s| s.state == ConnectionState::Closed).await;
    assert_eq!(snap.generation, None);

    timeout(Duration::from_secs(5), server)
        .await
        .expect("server did not finish")
        .unwrap();
    session.shutdown().await;
}

#[tokio::test]
async fn server_close_is_reported() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        ws.close(None).await.unwrap();
        while let Some(Ok(_)) = ws.next().await {}
    });

    let widgets = Widgets::default();
    let host = ScriptedHost::ready(Canvas::new(4, 4), widgets.clone());
    let endpoint = Endpoint::ws(addr.to_string(), "/ws/annotated");
    let session = Session::start(fast_config(endpoint), host, WsTransport);
    let handle = session.handle();

    wait_for_text(&widgets, "disconnected").await;
    assert_eq!(widgets.get().history, ["connecting", "connected", "disconnected"]);
    let snap = handle.snapshot().await.unwrap();
    assert_eq!(snap.state, ConnectionState::Closed);
    assert_eq!(snap.generation, None);
}

#[tokio::test]
async fn unreachable_server_errors_then_closes() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let widgets = Widgets::default();
    let host = ScriptedHost::ready(Canvas::new(4, 4), widgets.clone());
    let endpoint = Endpoint::ws(addr.to_string(), "/ws/annotated");
    let session = Session::start(fast_config(endpoint), host, WsTransport);
    let handle = session.handle();

    wait_for_text(&widgets, "disconnected").await;
    let history = widgets.get().history;
    assert_eq!(history, ["connecting", "connection error", "disconnected"]);
    assert_eq!(handle.state(), ConnectionState::Closed);
}
