//! Scripted host and transport doubles shared by the integration tests.

#![allow(dead_code)]

use framefeed_client::{
    Endpoint, EventSink, FeedConfig, FrameImage, Host, Indicator, Link, SessionHandle,
    SessionSnapshot, StatusWidgets, Surface, Transport, TransportError,
};
use image::{ImageFormat, Rgb, RgbImage};
use std::io::Cursor;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// What the status widgets currently show, plus every text ever set.
#[derive(Debug, Default, Clone)]
pub struct WidgetState {
    pub indicator: Option<Indicator>,
    pub text: String,
    pub connect_enabled: bool,
    pub disconnect_enabled: bool,
    pub history: Vec<String>,
}

#[derive(Clone, Default)]
pub struct Widgets(pub Arc<Mutex<WidgetState>>);

impl Widgets {
    pub fn get(&self) -> WidgetState {
        self.0.lock().unwrap().clone()
    }
}

impl StatusWidgets for Widgets {
    fn set_indicator(&mut self, indicator: Indicator) {
        self.0.lock().unwrap().indicator = Some(indicator);
    }

    fn set_text(&mut self, text: &str) {
        let mut state = self.0.lock().unwrap();
        state.text = text.to_string();
        state.history.push(text.to_string());
    }

    fn set_connect_enabled(&mut self, enabled: bool) {
        self.0.lock().unwrap().connect_enabled = enabled;
    }

    fn set_disconnect_enabled(&mut self, enabled: bool) {
        self.0.lock().unwrap().disconnect_enabled = enabled;
    }
}

/// Surface recording the dimensions and first pixel of every drawn frame.
#[derive(Clone)]
pub struct Canvas {
    pub size: (u32, u32),
    pub draws: Arc<Mutex<Vec<FrameImage>>>,
}

impl Canvas {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            size: (width, height),
            draws: Arc::default(),
        }
    }

    pub fn draws(&self) -> Vec<FrameImage> {
        self.draws.lock().unwrap().clone()
    }
}

impl Surface for Canvas {
    fn size(&self) -> (u32, u32) {
        self.size
    }

    fn draw(&mut self, frame: &FrameImage) {
        self.draws.lock().unwrap().push(frame.clone());
    }
}

/// Host whose render target appears after a number of failed probes.
pub struct ScriptedHost {
    pub misses: usize,
    pub canvas: Canvas,
    pub widgets: Option<Widgets>,
}

impl ScriptedHost {
    pub fn ready(canvas: Canvas, widgets: Widgets) -> Self {
        Self {
            misses: 0,
            canvas,
            widgets: Some(widgets),
        }
    }

    pub fn never() -> Self {
        Self {
            misses: usize::MAX,
            canvas: Canvas::new(1, 1),
            widgets: None,
        }
    }
}

impl Host for ScriptedHost {
    fn find_render_target(&mut self) -> Option<Box<dyn Surface>> {
        if self.misses > 0 {
            self.misses -= 1;
            return None;
        }
        Some(Box::new(self.canvas.clone()))
    }

    fn find_status_widgets(&mut self) -> Option<Box<dyn StatusWidgets>> {
        self.widgets
            .clone()
            .map(|w| Box::new(w) as Box<dyn StatusWidgets>)
    }
}

/// One link opened through [`MockTransport`].
#[derive(Clone)]
pub struct MockConn {
    pub sink: EventSink,
    pub open: Arc<AtomicBool>,
    pub close_requested: Arc<AtomicBool>,
    pub sent: Arc<Mutex<Vec<String>>>,
}

impl MockConn {
    /// Report the handshake as done.
    pub fn open(&self) {
        self.open.store(true, Ordering::SeqCst);
        self.sink.opened();
    }

    /// Report the link as gone.
    pub fn close(&self) {
        self.open.store(false, Ordering::SeqCst);
        self.sink.closed();
    }

    pub fn close_requested(&self) -> bool {
        self.close_requested.load(Ordering::SeqCst)
    }

    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }
}

struct MockLink(MockConn);

impl Link for MockLink {
    fn is_open(&self) -> bool {
        self.0.open.load(Ordering::SeqCst) && !self.0.close_requested()
    }

    fn send_text(&self, text: &str) -> Result<(), TransportError> {
        if !self.is_open() {
            return Err(TransportError::NotOpen);
        }
        self.0.sent.lock().unwrap().push(text.to_string());
        Ok(())
    }

    fn close(&self) {
        self.0.close_requested.store(true, Ordering::SeqCst);
    }
}

/// Transport that records every link and lets the test drive its events.
#[derive(Clone, Default)]
pub struct MockTransport {
    pub conns: Arc<Mutex<Vec<MockConn>>>,
}

impl MockTransport {
    pub fn conns(&self) -> Vec<MockConn> {
        self.conns.lock().unwrap().clone()
    }

    pub fn conn(&self, index: usize) -> MockConn {
        self.conns()[index].clone()
    }
}

impl Transport for MockTransport {
    fn open(&self, _endpoint: &Endpoint, events: EventSink) -> Box<dyn Link> {
        let conn = MockConn {
            sink: events,
            open: Arc::default(),
            close_requested: Arc::default(),
            sent: Arc::default(),
        };
        self.conns.lock().unwrap().push(conn.clone());
        Box::new(MockLink(conn))
    }
}

/// Config with auto-connect off and no readiness timeout.
pub fn manual_config() -> FeedConfig {
    FeedConfig {
        auto_connect: false,
        readiness_timeout_ms: 0,
        ..FeedConfig::default()
    }
}

pub fn png_frame(width: u32, height: u32, color: [u8; 3]) -> Vec<u8> {
    encode(width, height, color, ImageFormat::Png)
}

pub fn jpeg_frame(width: u32, height: u32, color: [u8; 3]) -> Vec<u8> {
    encode(width, height, color, ImageFormat::Jpeg)
}

fn encode(width: u32, height: u32, color: [u8; 3], format: ImageFormat) -> Vec<u8> {
    let img = RgbImage::from_pixel(width, height, Rgb(color));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, format).unwrap();
    out.into_inner()
}

/// Poll the session until `check` holds, failing after 5s.
pub async fn wait_for(
    handle: &SessionHandle,
    check: impl Fn(&SessionSnapshot) -> bool,
) -> SessionSnapshot {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let snap = handle.snapshot().await.expect("session stopped");
            if check(&snap) {
                return snap;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not reached within 5s")
}
