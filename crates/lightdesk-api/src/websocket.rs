//! Lighting WebSocket connection with auto-reconnect.
//!
//! A [`Connection`] owns exactly one socket at a time. A background task
//! connects, reads frames, decodes them into [`ServerMessage`]s and fans
//! them out to subscribers; when the socket closes it waits with
//! exponential backoff and connects again. While a socket is open a
//! keep-alive `ping` frame is written on a fixed interval; a zero
//! interval turns keep-alive off.
//!
//! # Example
//!
//! ```rust,ignore
//! use lightdesk_api::websocket::{Connection, ConnectionConfig, ConnectionEvent, TungsteniteConnector};
//!
//! let config = ConnectionConfig::from_base_url("http://desk.local:8080/".parse()?)?;
//! let connection = Connection::new(config);
//! let _sub = connection.subscribe(|event| {
//!     if let ConnectionEvent::Message(msg) = event {
//!         println!("{}", msg.kind());
//!     }
//! });
//! connection.start(TungsteniteConnector);
//! // ...
//! connection.close().await;
//! ```

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use arc_swap::ArcSwapOption;
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use tokio::sync::{Notify, mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::error::Error;
use crate::protocol::{self, ClientMessage, ServerMessage};
use crate::subscription::{Subscribers, Subscription};

const WEBSOCKET_PATH: &str = "lighting/";

/// Shortest wait between reconnect attempts, whatever the configuration.
const MIN_RECONNECT_DELAY: Duration = Duration::from_millis(1);

// ── ReconnectConfig ──────────────────────────────────────────────────

/// Exponential backoff configuration for WebSocket reconnection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconnectConfig {
    /// Delay before the first reconnection attempt. Default: 1s.
    pub initial_delay: Duration,

    /// Upper bound on backoff delay. Default: 30s.
    pub max_delay: Duration,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
        }
    }
}

/// Retry delay state: starts at `initial_delay`, doubles after every
/// consecutive failure, capped at `max_delay`, reset on a successful open.
/// Delays never drop below one millisecond.
#[derive(Debug, Clone)]
pub struct Backoff {
    current: Duration,
    config: ReconnectConfig,
}

impl Backoff {
    pub fn new(config: ReconnectConfig) -> Self {
        Self {
            current: config.initial_delay.max(MIN_RECONNECT_DELAY),
            config,
        }
    }

    /// Delay to wait before the next attempt; advances the sequence.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = self
            .current
            .saturating_mul(2)
            .min(self.config.max_delay)
            .max(MIN_RECONNECT_DELAY);
        delay
    }

    /// Back to `initial_delay`.
    pub fn reset(&mut self) {
        self.current = self.config.initial_delay.max(MIN_RECONNECT_DELAY);
    }
}

// ── ConnectionConfig ─────────────────────────────────────────────────

/// Where and how to connect.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Base URL of the lighting backend's REST surface (ends with `/`).
    pub base_url: Url,
    /// WebSocket endpoint, normally `ws://<host>/lighting/`.
    pub ws_url: Url,
    pub reconnect: ReconnectConfig,
    /// Keep-alive period. Default: 10s. Zero disables pings.
    pub ping_interval: Duration,
}

impl ConnectionConfig {
    /// Derive the WebSocket URL from the REST base URL: `http` becomes
    /// `ws`, `https` becomes `wss`, and the path is `lighting/` under the
    /// base path.
    pub fn from_base_url(base_url: Url) -> Result<Self, Error> {
        let ws_url = websocket_url(&base_url)?;
        Ok(Self {
            base_url,
            ws_url,
            reconnect: ReconnectConfig::default(),
            ping_interval: Duration::from_secs(10),
        })
    }
}

/// Build `ws(s)://<host>[:port]/<base path>/lighting/` from a REST base URL.
pub fn websocket_url(base_url: &Url) -> Result<Url, Error> {
    let scheme = if base_url.scheme() == "https" { "wss" } else { "ws" };
    let host = base_url.host_str().unwrap_or("localhost");
    let mut path = base_url.path().to_owned();
    if !path.ends_with('/') {
        path.push('/');
    }
    let raw = match base_url.port() {
        Some(p) => format!("{scheme}://{host}:{p}{path}{WEBSOCKET_PATH}"),
        None => format!("{scheme}://{host}{path}{WEBSOCKET_PATH}"),
    };
    Ok(Url::parse(&raw)?)
}

// ── Connection state & events ────────────────────────────────────────

/// Mirrors the WebSocket `readyState` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum ReadyState {
    Connecting,
    Open,
    Closing,
    Closed,
}

/// Why a socket went away.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseInfo {
    /// Close code from the peer's close frame, if one was received.
    pub code: Option<u16>,
    pub reason: String,
}

/// Socket lifecycle event delivered to connection subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    Open,
    Close(CloseInfo),
    /// Always followed by [`ConnectionEvent::Close`].
    Error(String),
    Message(ServerMessage),
}

/// Result of [`Connection::send`].
///
/// Delivery is best-effort and at-most-once: `Sent` means the frame was
/// handed to the open socket, not that the backend acted on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub enum SendOutcome {
    Sent,
    /// The socket was not open. Nothing is queued for later.
    Dropped,
}

impl SendOutcome {
    pub fn is_sent(self) -> bool {
        self == Self::Sent
    }
}

// ── Connector ────────────────────────────────────────────────────────

/// Establishes one WebSocket. Implemented by [`TungsteniteConnector`] in
/// production and by [`crate::testing::MockConnector`] in tests.
pub trait Connector: Send + Sync + 'static {
    type Socket: Stream<Item = Result<Message, tungstenite::Error>>
        + Sink<Message, Error = tungstenite::Error>
        + Send
        + Unpin
        + 'static;

    fn connect(&self, url: &Url) -> impl Future<Output = Result<Self::Socket, Error>> + Send;
}

/// Connects with `tokio-tungstenite` over TCP (and TLS for `wss`).
#[derive(Debug, Clone, Copy, Default)]
pub struct TungsteniteConnector;

impl Connector for TungsteniteConnector {
    type Socket =
        tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

    async fn connect(&self, url: &Url) -> Result<Self::Socket, Error> {
        let (stream, _response) = tokio_tungstenite::connect_async(url.as_str())
            .await
            .map_err(|e| Error::WebSocketConnect(e.to_string()))?;
        Ok(stream)
    }
}

// ── Connection ───────────────────────────────────────────────────────

/// Handle to the lighting WebSocket.
///
/// Cheaply cloneable. Created in the `Connecting` state; call
/// [`start`](Self::start) to spawn the background task and
/// [`close`](Self::close) to tear it down.
#[derive(Clone)]
pub struct Connection {
    shared: Arc<Shared>,
}

struct Shared {
    config: ConnectionConfig,
    state: watch::Sender<ReadyState>,
    /// Writer for the current socket. Replaced, never mutated, on reconnect.
    writer: ArcSwapOption<mpsc::UnboundedSender<String>>,
    subscribers: Subscribers<ConnectionEvent>,
    reconnect: Notify,
    generation: AtomicU64,
    cancel: CancellationToken,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl Connection {
    pub fn new(config: ConnectionConfig) -> Self {
        let (state, _) = watch::channel(ReadyState::Connecting);
        Self {
            shared: Arc::new(Shared {
                config,
                state,
                writer: ArcSwapOption::empty(),
                subscribers: Subscribers::new(),
                reconnect: Notify::new(),
                generation: AtomicU64::new(0),
                cancel: CancellationToken::new(),
                task: Mutex::new(None),
            }),
        }
    }

    /// Spawn the connect/read/reconnect loop. Calling it twice is a no-op.
    pub fn start<C: Connector>(&self, connector: C) {
        let mut task = self.shared.task.lock().unwrap_or_else(PoisonError::into_inner);
        if task.is_some() || self.shared.cancel.is_cancelled() {
            tracing::debug!("connection already started");
            return;
        }
        let shared = Arc::clone(&self.shared);
        *task = Some(tokio::spawn(connection_loop(connector, shared)));
    }

    pub fn base_url(&self) -> &Url {
        &self.shared.config.base_url
    }

    pub fn ws_url(&self) -> &Url {
        &self.shared.config.ws_url
    }

    pub fn ready_state(&self) -> ReadyState {
        *self.shared.state.borrow()
    }

    /// Observe ready-state transitions.
    pub fn state_changes(&self) -> watch::Receiver<ReadyState> {
        self.shared.state.subscribe()
    }

    /// Number of sockets that have opened so far. Changes exactly when the
    /// underlying socket is replaced.
    pub fn socket_generation(&self) -> u64 {
        self.shared.generation.load(Ordering::Acquire)
    }

    /// Serialize `message` and hand it to the open socket.
    ///
    /// Returns [`SendOutcome::Dropped`] without queueing when the socket
    /// is not open.
    pub fn send(&self, message: &ClientMessage) -> SendOutcome {
        if self.ready_state() != ReadyState::Open {
            tracing::trace!(kind = message.kind(), "socket not open, dropping send");
            return SendOutcome::Dropped;
        }
        let Some(writer) = self.shared.writer.load_full() else {
            return SendOutcome::Dropped;
        };
        let text = match serde_json::to_string(message) {
            Ok(t) => t,
            Err(e) => {
                tracing::warn!(error = %e, kind = message.kind(), "failed to encode command");
                return SendOutcome::Dropped;
            }
        };
        match writer.send(text) {
            Ok(()) => SendOutcome::Sent,
            Err(_) => SendOutcome::Dropped,
        }
    }

    /// Receive every lifecycle event and decoded message.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&ConnectionEvent) + Send + Sync + 'static,
    {
        self.shared.subscribers.subscribe(callback)
    }

    /// Connect now instead of waiting out the backoff.
    ///
    /// No-op (returns `false`) while the socket is open, connecting or
    /// closing. Otherwise the pending retry is abandoned, the delay is
    /// reset and a new socket is opened immediately.
    pub fn reconnect(&self) -> bool {
        let triggered = self.shared.state.send_if_modified(|state| {
            if *state == ReadyState::Closed && !self.shared.cancel.is_cancelled() {
                *state = ReadyState::Connecting;
                true
            } else {
                false
            }
        });
        if triggered {
            tracing::debug!("manual reconnect requested");
            self.shared.reconnect.notify_one();
        }
        triggered
    }

    /// Shut the socket down and stop reconnecting. Frames already accepted
    /// by [`send`](Self::send) are flushed before the close frame.
    pub async fn close(&self) {
        self.shared.state.send_if_modified(|state| {
            if *state == ReadyState::Closed {
                false
            } else {
                *state = ReadyState::Closing;
                true
            }
        });
        self.shared.cancel.cancel();

        let task = self
            .shared
            .task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                tracing::warn!(error = %e, "connection task ended abnormally");
            }
        }
        self.shared.state.send_replace(ReadyState::Closed);
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("ws_url", &self.shared.config.ws_url.as_str())
            .field("state", &self.ready_state())
            .field("generation", &self.socket_generation())
            .finish_non_exhaustive()
    }
}

impl Shared {
    fn set_state(&self, next: ReadyState) {
        self.state.send_replace(next);
    }

    fn emit(&self, event: &ConnectionEvent) {
        self.subscribers.emit(event);
    }
}

// ── Background reconnection loop ─────────────────────────────────────

/// Main loop: connect → read → on close, backoff → reconnect.
async fn connection_loop<C: Connector>(connector: C, shared: Arc<Shared>) {
    let url = shared.config.ws_url.clone();
    let mut backoff = Backoff::new(shared.config.reconnect.clone());
    let mut attempt: u32 = 0;

    'outer: loop {
        shared.set_state(ReadyState::Connecting);
        tracing::info!(url = %url, attempt, "connecting to lighting WebSocket");

        let result = tokio::select! {
            biased;
            () = shared.cancel.cancelled() => break,
            result = connector.connect(&url) => result,
        };

        match result {
            Ok(socket) => {
                backoff.reset();
                attempt = 0;
                run_socket(socket, &shared).await;
            }
            Err(e) => {
                tracing::warn!(error = %e, attempt, "WebSocket connect failed");
                shared.set_state(ReadyState::Closed);
                shared.emit(&ConnectionEvent::Error(e.to_string()));
                shared.emit(&ConnectionEvent::Close(CloseInfo {
                    code: None,
                    reason: e.to_string(),
                }));
            }
        }

        if shared.cancel.is_cancelled() {
            break;
        }

        let delay = backoff.next_delay();
        attempt = attempt.saturating_add(1);
        tracing::debug!(
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            attempt,
            "waiting before reconnect"
        );

        let sleep = tokio::time::sleep(delay);
        tokio::pin!(sleep);
        loop {
            tokio::select! {
                biased;
                () = shared.cancel.cancelled() => break 'outer,
                () = shared.reconnect.notified() => {
                    // reconnect() flips the state before notifying; a
                    // permit left over from an earlier wait has not.
                    if *shared.state.borrow() == ReadyState::Connecting {
                        backoff.reset();
                        break;
                    }
                    tracing::trace!("ignoring stale reconnect request");
                }
                () = &mut sleep => break,
            }
        }
    }

    shared.writer.store(None);
    shared.set_state(ReadyState::Closed);
    tracing::debug!("connection loop exiting");
}

// ── Single socket lifecycle ──────────────────────────────────────────

/// Drive one open socket until it closes, then report why.
async fn run_socket<S>(socket: S, shared: &Shared)
where
    S: Stream<Item = Result<Message, tungstenite::Error>> + Sink<Message, Error = tungstenite::Error> + Unpin,
{
    let (mut write, mut read) = socket.split();
    let (writer_tx, mut writer_rx) = mpsc::unbounded_channel::<String>();

    shared.writer.store(Some(Arc::new(writer_tx)));
    shared.generation.fetch_add(1, Ordering::AcqRel);
    shared.set_state(ReadyState::Open);
    tracing::info!("lighting WebSocket connected");
    shared.emit(&ConnectionEvent::Open);

    let period = shared.config.ping_interval;
    let mut ping = (!period.is_zero()).then(|| {
        let mut ping = tokio::time::interval_at(Instant::now() + period, period);
        ping.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ping
    });

    let (close, error) = loop {
        tokio::select! {
            biased;
            () = shared.cancel.cancelled() => {
                while let Ok(text) = writer_rx.try_recv() {
                    if write.send(Message::Text(text.into())).await.is_err() {
                        break;
                    }
                }
                let _ = write.send(Message::Close(None)).await;
                break (CloseInfo { code: None, reason: "closed by client".into() }, None);
            }
            frame = read.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    if let Some(message) = protocol::decode(&text) {
                        shared.emit(&ConnectionEvent::Message(message));
                    }
                }
                Some(Ok(Message::Close(frame))) => {
                    let info = frame.map_or_else(
                        || CloseInfo { code: None, reason: String::new() },
                        |cf| CloseInfo { code: Some(u16::from(cf.code)), reason: cf.reason.to_string() },
                    );
                    tracing::info!(code = ?info.code, reason = %info.reason, "WebSocket close frame received");
                    break (info, None);
                }
                Some(Ok(_)) => {
                    // Binary, Ping, Pong, Frame -- tungstenite answers pings itself
                }
                Some(Err(e)) => {
                    break (CloseInfo { code: None, reason: e.to_string() }, Some(e.to_string()));
                }
                None => {
                    tracing::info!("WebSocket stream ended");
                    break (CloseInfo { code: None, reason: "stream ended".into() }, None);
                }
            },
            Some(text) = writer_rx.recv() => {
                if let Err(e) = write.send(Message::Text(text.into())).await {
                    break (CloseInfo { code: None, reason: e.to_string() }, Some(e.to_string()));
                }
            }
            () = next_ping(ping.as_mut()) => {
                if let Ok(text) = serde_json::to_string(&ClientMessage::Ping) {
                    if let Err(e) = write.send(Message::Text(text.into())).await {
                        break (CloseInfo { code: None, reason: e.to_string() }, Some(e.to_string()));
                    }
                    tracing::trace!("keep-alive ping sent");
                }
            }
        }
    };

    shared.writer.store(None);
    shared.set_state(ReadyState::Closed);
    if let Some(error) = error {
        tracing::warn!(error = %error, "WebSocket error");
        shared.emit(&ConnectionEvent::Error(error));
    }
    shared.emit(&ConnectionEvent::Close(close));
}

/// Next keep-alive tick, or never when keep-alive is off.
async fn next_ping(ping: Option<&mut Interval>) {
    match ping {
        Some(ping) => {
            ping.tick().await;
        }
        None => std::future::pending().await,
    }
}

// ── Tests ────────────────────────────────────────────────────────────
