//! The streaming session.
//!
//! A session owns one render target and at most one connection handle. All
//! of its state lives in a single actor task; the readiness poller, link
//! tasks, keep-alive timers and decode workers only ever post [`Event`]s to
//! the actor's queue, which processes them one at a time.
//!
//! Each connection handle gets a fresh generation number. Events carry the
//! generation they were produced for, and anything addressed to a handle
//! that has since been torn down is dropped on arrival. This is what makes
//! keep-alive ticks and close events from a replaced connection harmless.

use crate::config::FeedConfig;
use crate::host::{Discovery, Host};
use crate::readiness::{self, ReadinessError};
use crate::render::{decode_frame, DecodeJob, FrameError, Renderer};
use crate::status::StatusPublisher;
use crate::transport::{EventSink, Link, Transport, TransportEvent};
use framefeed_core::{ConnectionState, StatusView, KEEPALIVE_TOKEN};
use image::RgbaImage;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{Interval, MissedTickBehavior};
use tokio_util::sync::{CancellationToken, DropGuard};

/// Messages processed by the session actor.
#[derive(Debug)]
pub(crate) enum Event {
    Connect { auto: bool },
    Disconnect,
    Ready(Discovery),
    ReadinessFailed(ReadinessError),
    Transport { generation: u64, event: TransportEvent },
    KeepAlive { generation: u64 },
    FaultGraceExpired { generation: u64 },
    Decoded {
        version: u64,
        result: Result<RgbaImage, FrameError>,
    },
    Snapshot(oneshot::Sender<SessionSnapshot>),
    Shutdown(oneshot::Sender<()>),
}

/// Point-in-time view of a session, for hosts and tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    /// Last published state.
    pub state: ConnectionState,
    /// Generation of the live connection handle, if there is one.
    pub generation: Option<u64>,
    pub target_discovered: bool,
    pub frames_drawn: u64,
    pub decode_failures: u64,
    pub stale_frames: u64,
    pub decodes_started: u64,
    /// Version of the frame on display.
    pub displayed_frame: Option<u64>,
    pub pings_sent: u64,
    /// Last view handed to the status widgets, whether or not the host has any.
    pub status: Option<StatusView>,
}

/// A running session. Dropping it stops the session and closes its link.
pub struct Session {
    handle: SessionHandle,
    actor: JoinHandle<()>,
    poller: JoinHandle<()>,
}

impl Session {
    /// Start probing `host` and, once its render target exists, stream from
    /// `config.endpoint` through `transport`.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start<H, T>(config: FeedConfig, mut host: H, transport: T) -> Self
    where
        H: Host,
        T: Transport,
    {
        let (queue, rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(ConnectionState::Closed);

        let poller = tokio::spawn({
            let queue = queue.clone();
            let interval = config.poll_interval();
            let timeout = config.readiness_timeout();
            async move {
                let event = match readiness::wait_for_target(&mut host, interval, timeout).await {
                    Ok(discovery) => Event::Ready(discovery),
                    Err(e) => Event::ReadinessFailed(e),
                };
                let _ = queue.send(event);
            }
        });

        let actor = SessionActor {
            config,
            transport: Box::new(transport),
            queue: queue.clone(),
            state_tx,
            renderer: None,
            status: StatusPublisher::default(),
            handle: None,
            next_generation: 0,
            attempted: false,
            pings_sent: 0,
        };
        let actor = tokio::spawn(actor.run(rx));

        Self {
            handle: SessionHandle {
                queue,
                state: state_rx,
            },
            actor,
            poller,
        }
    }

    /// A cloneable handle for issuing commands.
    pub fn handle(&self) -> SessionHandle {
        self.handle.clone()
    }

    /// Close the connection, if any, and stop the session.
    pub async fn shutdown(self) {
        let (ack_tx, ack_rx) = oneshot::channel();
        if self.handle.queue.send(Event::Shutdown(ack_tx)).is_ok() {
            let _ = ack_rx.await;
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.poller.abort();
        self.actor.abort();
    }
}

/// The imperative API exposed to the host.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    queue: mpsc::UnboundedSender<Event>,
    state: watch::Receiver<ConnectionState>,
}

impl SessionHandle {
    /// Replace any existing connection with a new one.
    ///
    /// Ignored (with a warning) until the render target has been found.
    pub fn connect(&self) {
        self.send(Event::Connect { auto: false });
    }

    /// Ask the current connection to close. No-op without one.
    pub fn disconnect(&self) {
        self.send(Event::Disconnect);
    }

    /// Last published connection state.
    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Receiver notified on every published state change.
    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.state.clone()
    }

    /// Query the session. Resolves after every event queued before the call
    /// has been processed. `None` once the session has stopped.
    pub async fn snapshot(&self) -> Option<SessionSnapshot> {
        let (tx, rx) = oneshot::channel();
        self.queue.send(Event::Snapshot(tx)).ok()?;
        rx.await.ok()
    }

    fn send(&self, event: Event) {
        if self.queue.send(event).is_err() {
            tracing::debug!("Session stopped, command ignored");
        }
    }
}

/// The live connection.
struct ConnectionHandle {
    generation: u64,
    /// Structural state: `Idle` until the transport opens, then `Open`.
    state: ConnectionState,
    link: Box<dyn Link>,
    /// Cancels the keep-alive timer when dropped.
    _keepalive: Option<DropGuard>,
    /// Cancels the fault grace timer when dropped.
    fault_guard: Option<DropGuard>,
}

struct SessionActor {
    config: FeedConfig,
    transport: Box<dyn Transport>,
    queue: mpsc::UnboundedSender<Event>,
    state_tx: watch::Sender<ConnectionState>,
    renderer: Option<Renderer>,
    status: StatusPublisher,
    handle: Option<ConnectionHandle>,
    next_generation: u64,
    attempted: bool,
    pings_sent: u64,
}

impl SessionActor {
    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<Event>) {
        while let Some(event) = rx.recv().await {
            match event {
                Event::Connect { auto } => self.connect(auto),
                Event::Disconnect => self.disconnect(),
                Event::Ready(discovery) => self.on_ready(discovery),
                Event::ReadinessFailed(e) => {
                    tracing::warn!("{}; no connection will be attempted", e);
                }
                Event::Transport { generation, event } => self.on_transport(generation, event),
                Event::KeepAlive { generation } => self.on_keepalive(generation),
                Event::FaultGraceExpired { generation } => self.on_fault_grace_expired(generation),
                Event::Decoded { version, result } => {
                    let next = self
                        .renderer
                        .as_mut()
                        .and_then(|renderer| renderer.complete(version, result));
                    if let Some(job) = next {
                        self.spawn_decode(job);
                    }
                }
                Event::Snapshot(reply) => {
                    let _ = reply.send(self.snapshot());
                }
                Event::Shutdown(ack) => {
                    if let Some(handle) = self.handle.take() {
                        tracing::info!(generation = handle.generation, "Closing connection on shutdown");
                        handle.link.close();
                    }
                    let _ = ack.send(());
                    break;
                }
            }
        }
    }

    fn on_ready(&mut self, discovery: Discovery) {
        let Discovery { surface, widgets } = discovery;
        self.renderer = Some(Renderer::new(surface));
        if let Some(widgets) = widgets {
            self.status.attach(widgets);
        }

        if self.config.auto_connect && !self.attempted {
            let queue = self.queue.clone();
            let delay = self.config.settle_delay();
            tracing::debug!("Auto-connect in {:?}", delay);
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                let _ = queue.send(Event::Connect { auto: true });
            });
        }
    }

    fn connect(&mut self, auto: bool) {
        if auto && self.attempted {
            tracing::debug!("Connection already attempted, skipping auto-connect");
            return;
        }
        if self.renderer.is_none() {
            tracing::warn!("Render target not found yet, cannot connect");
            return;
        }
        self.attempted = true;

        if let Some(previous) = self.handle.take() {
            tracing::info!(
                generation = previous.generation,
                "Releasing existing connection before reconnecting"
            );
            previous.link.close();
        }

        self.next_generation += 1;
        let generation = self.next_generation;
        tracing::info!(generation, "Connecting to {}", self.config.endpoint);

        let sink = EventSink::new(generation, self.queue.clone());
        let link = self.transport.open(&self.config.endpoint, sink);
        self.handle = Some(ConnectionHandle {
            generation,
            state: ConnectionState::Idle,
            link,
            _keepalive: None,
            fault_guard: None,
        });
        self.publish(ConnectionState::Idle);
    }

    fn disconnect(&mut self) {
        match &self.handle {
            Some(handle) => {
                tracing::info!(generation = handle.generation, "Disconnect requested");
                handle.link.close();
            }
            None => tracing::debug!("Disconnect requested without a connection"),
        }
    }

    fn on_transport(&mut self, generation: u64, event: TransportEvent) {
        if self.current(generation).is_none() {
            tracing::trace!(generation, "Ignoring event from replaced connection");
            return;
        }

        match event {
            TransportEvent::Opened => {
                let keepalive = spawn_keepalive(
                    self.config.keepalive_interval(),
                    self.queue.clone(),
                    generation,
                );
                if let Some(handle) = self.current_mut(generation) {
                    handle.state = ConnectionState::Open;
                    handle._keepalive = Some(keepalive);
                }
                tracing::info!(generation, "Connected");
                self.publish(ConnectionState::Open);
            }
            TransportEvent::Closed => self.close_current("transport closed"),
            TransportEvent::Fault(reason) => {
                tracing::warn!(generation, "Transport fault: {}", reason);
                if let Some(grace) = self.config.fault_grace() {
                    let queue = self.queue.clone();
                    if let Some(handle) = self.current_mut(generation) {
                        handle
                            .fault_guard
                            .get_or_insert_with(|| spawn_fault_timer(grace, queue, generation));
                    }
                }
                self.publish(ConnectionState::Errored);
            }
            TransportEvent::Frame(payload) => self.render(payload),
        }
    }

    fn on_keepalive(&mut self, generation: u64) {
        let Some(handle) = self.current(generation) else {
            tracing::trace!(generation, "Stale keep-alive tick");
            return;
        };
        if handle.state != ConnectionState::Open || !handle.link.is_open() {
            tracing::trace!(generation, "Transport not open, skipping keep-alive");
            return;
        }
        match handle.link.send_text(KEEPALIVE_TOKEN) {
            Ok(()) => {
                self.pings_sent += 1;
                tracing::debug!(generation, "Keep-alive sent");
            }
            Err(e) => tracing::debug!(generation, "Keep-alive not sent: {}", e),
        }
    }

    fn on_fault_grace_expired(&mut self, generation: u64) {
        let Some(handle) = self.current(generation) else {
            return;
        };
        tracing::warn!(generation, "No close after transport fault, forcing cleanup");
        handle.link.close();
        self.close_current("fault without close");
    }

    fn render(&mut self, payload: Vec<u8>) {
        let job = self
            .renderer
            .as_mut()
            .and_then(|renderer| renderer.submit(payload));
        if let Some(job) = job {
            self.spawn_decode(job);
        }
    }

    /// Decode on the blocking pool. Always posts [`Event::Decoded`] so the
    /// renderer can start its next job.
    fn spawn_decode(&self, job: DecodeJob) {
        let Some(renderer) = self.renderer.as_ref() else {
            return;
        };
        let (width, height) = renderer.target_size();
        let queue = self.queue.clone();
        let DecodeJob { version, payload } = job;
        tokio::spawn(async move {
            let result = tokio::task::spawn_blocking(move || decode_frame(&payload, width, height))
                .await
                .unwrap_or_else(|e| Err(FrameError::Worker(e.to_string())));
            let _ = queue.send(Event::Decoded { version, result });
        });
    }

    /// Drop the current handle (cancelling its timers) and publish `Closed`.
    fn close_current(&mut self, reason: &str) {
        if let Some(handle) = self.handle.take() {
            tracing::info!(generation = handle.generation, "Connection closed: {}", reason);
        }
        self.publish(ConnectionState::Closed);
    }

    fn publish(&mut self, state: ConnectionState) {
        self.state_tx.send_replace(state);
        self.status.publish(state);
    }

    fn current(&self, generation: u64) -> Option<&ConnectionHandle> {
        self.handle.as_ref().filter(|h| h.generation == generation)
    }

    fn current_mut(&mut self, generation: u64) -> Option<&mut ConnectionHandle> {
        self.handle.as_mut().filter(|h| h.generation == generation)
    }

    fn snapshot(&self) -> SessionSnapshot {
        let stats = self
            .renderer
            .as_ref()
            .map(Renderer::stats)
            .unwrap_or_default();
        SessionSnapshot {
            state: *self.state_tx.borrow(),
            generation: self.handle.as_ref().map(|h| h.generation),
            target_discovered: self.renderer.is_some(),
            frames_drawn: stats.frames_drawn,
            decode_failures: stats.decode_failures,
            stale_frames: stats.stale_frames,
            decodes_started: stats.decodes_started,
            displayed_frame: self.renderer.as_ref().and_then(Renderer::displayed_version),
            pings_sent: self.pings_sent,
            status: self.status.last(),
        }
    }
}

/// Post [`Event::KeepAlive`] every `period`, first one period from now,
/// until the returned guard is dropped.
fn spawn_keepalive(
    period: Duration,
    queue: mpsc::UnboundedSender<Event>,
    generation: u64,
) -> DropGuard {
    let token = CancellationToken::new();
    let cancelled = token.clone();
    tokio::spawn(async move {
        let mut ticker = keepalive_ticker(period);
        ticker.tick().await; // the first tick completes immediately
        loop {
            tokio::select! {
                () = cancelled.cancelled() => break,
                _ = ticker.tick() => {
                    if queue.send(Event::KeepAlive { generation }).is_err() {
                        break;
                    }
                }
            }
        }
    });
    token.drop_guard()
}

/// After a stall, the next ping goes out one full period later instead of
/// catching up with a volley.
fn keepalive_ticker(period: Duration) -> Interval {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}

/// Post [`Event::FaultGraceExpired`] after `grace` unless the guard is
/// dropped first.
fn spawn_fault_timer(
    grace: Duration,
    queue: mpsc::UnboundedSender<Event>,
    generation: u64,
) -> DropGuard {
    let token = CancellationToken::new();
    let cancelled = token.clone();
    tokio::spawn(async move {
        tokio::select! {
            () = cancelled.cancelled() => {}
            () = tokio::time::sleep(grace) => {
                let _ = queue.send(Event::FaultGraceExpired { generation });
            }
        }
    });
    token.drop_guard()
}
