//! In-memory [`Connector`] for exercising the connection loop without a
//! network.
//!
//! Each `connect()` call consumes the next scripted [`Attempt`]. An
//! accepted attempt hands the connection a [`MockSocket`] and queues the
//! matching [`MockPeer`] for the test, which can push server frames, read
//! what the client wrote, and close the socket. With an empty script every
//! attempt is refused.

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll};

use futures_util::{Sink, Stream};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_tungstenite::tungstenite::{self, Message};
use url::Url;

use crate::error::Error;
use crate::websocket::Connector;

/// Scripted outcome for one connect attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attempt {
    Accept,
    Refuse,
}

#[derive(Clone, Default)]
pub struct MockConnector {
    state: Arc<MockState>,
}

#[derive(Default)]
struct MockState {
    script: Mutex<VecDeque<Attempt>>,
    attempts: Mutex<Vec<Instant>>,
    peers: Mutex<VecDeque<MockPeer>>,
}

fn locked<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MockConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append outcomes for the next connect attempts.
    pub fn script(&self, attempts: impl IntoIterator<Item = Attempt>) -> &Self {
        locked(&self.state.script).extend(attempts);
        self
    }

    /// When each connect attempt happened (Tokio clock).
    pub fn attempt_times(&self) -> Vec<Instant> {
        locked(&self.state.attempts).clone()
    }

    pub fn attempt_count(&self) -> usize {
        locked(&self.state.attempts).len()
    }

    /// The server side of the oldest accepted socket not yet taken.
    pub fn take_peer(&self) -> Option<MockPeer> {
        locked(&self.state.peers).pop_front()
    }
}

impl Connector for MockConnector {
    type Socket = MockSocket;

    fn connect(&self, url: &Url) -> impl Future<Output = Result<MockSocket, Error>> + Send {
        let state = Arc::clone(&self.state);
        let url = url.clone();
        async move {
            locked(&state.attempts).push(Instant::now());
            let next = locked(&state.script).pop_front().unwrap_or(Attempt::Refuse);
            match next {
                Attempt::Refuse => Err(Error::WebSocketConnect(format!("connection refused: {url}"))),
                Attempt::Accept => {
                    let (socket, peer) = socket_pair();
                    locked(&state.peers).push_back(peer);
                    Ok(socket)
                }
            }
        }
    }
}

fn socket_pair() -> (MockSocket, MockPeer) {
    let (to_client, from_server) = mpsc::unbounded_channel();
    let (to_server, from_client) = mpsc::unbounded_channel();
    (
        MockSocket {
            inbound: from_server,
            outbound: to_server,
        },
        MockPeer {
            to_client: Some(to_client),
            from_client,
            written: Vec::new(),
        },
    )
}

// ── Client half ──────────────────────────────────────────────────────

/// Socket handed to the connection loop.
pub struct MockSocket {
    inbound: mpsc::UnboundedReceiver<Result<Message, tungstenite::Error>>,
    outbound: mpsc::UnboundedSender<Message>,
}

impl Stream for MockSocket {
    type Item = Result<Message, tungstenite::Error>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inbound.poll_recv(cx)
    }
}

impl Sink<Message> for MockSocket {
    type Error = tungstenite::Error;

    fn poll_ready(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn start_send(self: Pin<&mut Self>, item: Message) -> Result<(), Self::Error> {
        self.outbound
            .send(item)
            .map_err(|_| tungstenite::Error::ConnectionClosed)
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn poll_close(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }
}

// ── Server half ──────────────────────────────────────────────────────

/// The backend's end of a [`MockSocket`].
pub struct MockPeer {
    to_client: Option<mpsc::UnboundedSender<Result<Message, tungstenite::Error>>>,
    from_client: mpsc::UnboundedReceiver<Message>,
    written: Vec<Message>,
}

impl MockPeer {
    /// Push a raw text frame to the client.
    pub fn push_text(&self, text: &str) {
        if let Some(tx) = &self.to_client {
            let _ = tx.send(Ok(Message::Text(text.to_owned().into())));
        }
    }

    /// Push a JSON frame to the client.
    pub fn push_json(&self, value: &serde_json::Value) {
        self.push_text(&value.to_string());
    }

    /// Send a close frame with the given code.
    pub fn close(&self, code: u16, reason: &str) {
        if let Some(tx) = &self.to_client {
            let frame = tungstenite::protocol::CloseFrame {
                code: code.into(),
                reason: reason.to_owned().into(),
            };
            let _ = tx.send(Ok(Message::Close(Some(frame))));
        }
    }

    /// Fail the socket with a transport error.
    pub fn fail(&self) {
        if let Some(tx) = &self.to_client {
            let _ = tx.send(Err(tungstenite::Error::ConnectionClosed));
        }
    }

    /// End the stream without a close frame.
    pub fn hang_up(&mut self) {
        self.to_client = None;
    }

    /// Text frames the client has written so far, parsed as JSON.
    /// Non-JSON and non-text frames are skipped.
    pub fn sent(&mut self) -> Vec<serde_json::Value> {
        self.drain();
        self.written
            .iter()
            .filter_map(|message| match message {
                Message::Text(text) => serde_json::from_str(text).ok(),
                _ => None,
            })
            .collect()
    }

    /// Wire `type` tags of everything written so far.
    pub fn sent_types(&mut self) -> Vec<String> {
        self.sent()
            .iter()
            .filter_map(|v| v["type"].as_str().map(String::from))
            .collect()
    }

    /// `true` once the client has written a close frame.
    pub fn saw_close(&mut self) -> bool {
        self.drain();
        self.written.iter().any(|m| matches!(m, Message::Close(_)))
    }

    fn drain(&mut self) {
        while let Ok(message) = self.from_client.try_recv() {
            self.written.push(message);
        }
    }
}
