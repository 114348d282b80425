use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use crate::error::TransportError;

/// Normal closure code (RFC 6455)
pub const CLOSE_NORMAL: u16 = 1000;

/// Frame received from the server
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    /// Text payload (JSON envelope)
    Text(String),
    /// WebSocket-level pong
    Pong,
    /// Close handshake
    Close { code: Option<u16>, reason: String },
}

/// One open bidirectional connection
#[async_trait]
pub trait Link: Send {
    async fn send_text(&mut self, text: String) -> Result<(), TransportError>;
    /// Next frame; `None` when the stream ended without a close frame
    async fn next_frame(&mut self) -> Option<Result<Frame, TransportError>>;
    async fn close(&mut self) -> Result<(), TransportError>;
}

/// Opens links to an endpoint URL
#[async_trait]
pub trait Connector: Send + Sync + std::fmt::Debug {
    async fn connect(&self, url: &str) -> Result<Box<dyn Link>, TransportError>;
}

// ============================================================================
// WebSocket
// ============================================================================

pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// tokio-tungstenite connector (ws:// and wss://)
#[derive(Debug, Clone, Copy, Default)]
pub struct WsConnector;

#[async_trait]
impl Connector for WsConnector {
    async fn connect(&self, url: &str) -> Result<Box<dyn Link>, TransportError> {
        let (stream, response) = tokio_tungstenite::connect_async(url).await?;
        tracing::debug!(status = %response.status(), "WebSocket handshake completed");
        Ok(Box::new(WsLink { stream }))
    }
}

struct WsLink {
    stream: WsStream,
}

#[async_trait]
impl Link for WsLink {
    async fn send_text(&mut self, text: String) -> Result<(), TransportError> {
        self.stream.send(Message::Text(text.into())).await?;
        Ok(())
    }

    async fn next_frame(&mut self) -> Option<Result<Frame, TransportError>> {
        loop {
            let msg = match self.stream.next().await? {
                Ok(msg) => msg,
                Err(e) => return Some(Err(e.into())),
            };
            match msg {
                Message::Text(text) => return Some(Ok(Frame::Text(text.to_string()))),
                Message::Binary(bytes) => match String::from_utf8(bytes.to_vec()) {
                    Ok(text) => return Some(Ok(Frame::Text(text))),
                    Err(_) => tracing::debug!("Ignoring non-UTF-8 binary frame"),
                },
                Message::Pong(_) => return Some(Ok(Frame::Pong)),
                Message::Close(frame) => {
                    let (code, reason) = match frame {
                        Some(f) => (Some(u16::from(f.code)), f.reason.to_string()),
                        None => (None, String::new()),
                    };
                    return Some(Ok(Frame::Close { code, reason }));
                }
                // tungstenite answers pings itself
                Message::Ping(_) | Message::Frame(_) => {}
            }
        }
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.stream.close(None).await?;
        Ok(())
    }
}

// ============================================================================
// Memory (in-process server end, used by tests and the headless runner)
// ============================================================================

/// Server side of an in-memory link
#[derive(Debug)]
pub struct MemoryPeer {
    /// Endpoint URL the client dialed
    pub url: String,
    to_client: mpsc::UnboundedSender<Frame>,
    from_client: mpsc::UnboundedReceiver<String>,
}

impl MemoryPeer {
    /// Push a text frame to the client
    pub fn send(&self, text: impl Into<String>) -> bool {
        self.to_client.send(Frame::Text(text.into())).is_ok()
    }

    /// Push a WebSocket-level pong
    pub fn pong(&self) -> bool {
        self.to_client.send(Frame::Pong).is_ok()
    }

    /// Send a close frame
    pub fn close(&self, code: u16, reason: &str) -> bool {
        self.to_client
            .send(Frame::Close {
                code: Some(code),
                reason: reason.to_string(),
            })
            .is_ok()
    }

    /// Next text frame written by the client
    pub async fn recv(&mut self) -> Option<String> {
        self.from_client.recv().await
    }

    /// Non-blocking variant of [`MemoryPeer::recv`]
    pub fn try_recv(&mut self) -> Option<String> {
        self.from_client.try_recv().ok()
    }
}

#[derive(Debug)]
struct MemoryState {
    accepting: bool,
    /// How long the client side close handshake takes
    close_delay: Duration,
    attempts: Vec<String>,
    peers: VecDeque<MemoryPeer>,
}

/// In-memory connector.
///
/// Each accepted `connect` produces a [`MemoryPeer`] that the owner picks
/// up with [`MemoryConnector::take_peer`]. Refused attempts fail with a
/// connection error.
#[derive(Debug, Clone)]
pub struct MemoryConnector {
    state: Arc<std::sync::Mutex<MemoryState>>,
    notify: Arc<tokio::sync::Notify>,
}

impl Default for MemoryConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryConnector {
    pub fn new() -> Self {
        Self {
            state: Arc::new(std::sync::Mutex::new(MemoryState {
                accepting: true,
                close_delay: Duration::ZERO,
                attempts: Vec::new(),
                peers: VecDeque::new(),
            })),
            notify: Arc::new(tokio::sync::Notify::new()),
        }
    }

    fn state(&self) -> std::sync::MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Accept or refuse subsequent connection attempts
    pub fn set_accepting(&self, accepting: bool) {
        self.state().accepting = accepting;
    }

    /// Make client-initiated closes of new links take `delay`
    pub fn set_close_delay(&self, delay: Duration) {
        self.state().close_delay = delay;
    }

    /// Number of `connect` calls so far (accepted or refused)
    pub fn attempts(&self) -> usize {
        self.state().attempts.len()
    }

    /// URLs dialed so far
    pub fn urls(&self) -> Vec<String> {
        self.state().attempts.clone()
    }

    /// Wait for the next accepted connection
    pub async fn take_peer(&self) -> MemoryPeer {
        loop {
            let notified = self.notify.notified();
            let peer = self.state().peers.pop_front();
            if let Some(peer) = peer {
                return peer;
            }
            notified.await;
        }
    }
}

#[async_trait]
impl Connector for MemoryConnector {
    async fn connect(&self, url: &str) -> Result<Box<dyn Link>, TransportError> {
        let mut state = self.state();
        state.attempts.push(url.to_string());
        if !state.accepting {
            return Err(TransportError::Connection("connection refused".into()));
        }

        let (to_client, from_server) = mpsc::unbounded_channel();
        let (to_server, from_client) = mpsc::unbounded_channel();
        let close_delay = state.close_delay;
        state.peers.push_back(MemoryPeer {
            url: url.to_string(),
            to_client,
            from_client,
        });
        drop(state);
        self.notify.notify_waiters();

        Ok(Box::new(MemoryLink {
            rx: from_server,
            tx: to_server,
            close_delay,
        }))
    }
}

struct MemoryLink {
    rx: mpsc::UnboundedReceiver<Frame>,
    tx: mpsc::UnboundedSender<String>,
    close_delay: Duration,
}

#[async_trait]
impl Link for MemoryLink {
    async fn send_text(&mut self, text: String) -> Result<(), TransportError> {
        self.tx
            .send(text)
            .map_err(|_| TransportError::Connection("peer closed".into()))
    }

    async fn next_frame(&mut self) -> Option<Result<Frame, TransportError>> {
        self.rx.recv().await.map(Ok)
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        if !self.close_delay.is_zero() {
            tokio::time::sleep(self.close_delay).await;
        }
        self.rx.close();
        Ok(())
    }
}
