// live-client/src/message/client.rs
// Live push client - one persistent socket per role with reconnect and heartbeat

use chrono::{DateTime, Utc};
use shared::message::{ClientMessage, ServerMessage};
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use super::connection::{Connection, ConnectionState};
use super::transport::{CLOSE_NORMAL, Connector, Frame, Link};
use crate::bus::{AppEvent, EventBus};
use crate::config::{ClientConfig, Role};
use crate::error::TransportError;
use crate::session::SessionStore;

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

/// Why a connected session ended
#[derive(Debug)]
enum SessionEnd {
    /// Explicit teardown
    Cancelled,
    /// Close frame or end of stream
    Closed { code: Option<u16>, reason: String },
    /// Socket error
    Failed(String),
}

struct Inner {
    config: ClientConfig,
    session: Arc<dyn SessionStore>,
    bus: EventBus,
    connector: Arc<dyn Connector>,
    connection: Mutex<Connection>,
    /// Writer queue of the current session, tagged with its loop generation
    outbound: Mutex<Option<(u64, mpsc::UnboundedSender<String>)>>,
    inbound_tx: mpsc::UnboundedSender<String>,
    inbound_rx: Mutex<Option<mpsc::UnboundedReceiver<String>>>,
    subscriptions: Mutex<BTreeSet<String>>,
    /// Generation + cancel token of the running connection loop
    run: Mutex<Option<(u64, CancellationToken)>>,
    generation: AtomicU64,
}

impl std::fmt::Debug for Inner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveClient")
            .field("base_url", &self.config.base_url)
            .field("state", &lock(&self.connection).state())
            .finish_non_exhaustive()
    }
}

impl Inner {
    /// Set the state on behalf of loop `generation`; stale loops are ignored
    fn set_state(&self, generation: u64, state: ConnectionState) {
        let run = lock(&self.run);
        if matches!(run.as_ref(), Some((g, _)) if *g == generation) {
            lock(&self.connection).set_state(state);
        }
    }

    /// Make `tx` the writer queue and mark the connection open, unless
    /// loop `generation` has been replaced or torn down meanwhile
    fn install(&self, generation: u64, tx: mpsc::UnboundedSender<String>) -> bool {
        let run = lock(&self.run);
        if !matches!(run.as_ref(), Some((g, _)) if *g == generation) {
            return false;
        }
        *lock(&self.outbound) = Some((generation, tx));
        let mut conn = lock(&self.connection);
        conn.reset_retries();
        conn.set_state(ConnectionState::Connected);
        true
    }

    /// Drop the writer queue if it still belongs to `generation`
    fn uninstall(&self, generation: u64) {
        let mut outbound = lock(&self.outbound);
        if matches!(outbound.as_ref(), Some((g, _)) if *g == generation) {
            *outbound = None;
        }
    }

    /// Clear the run slot if it still belongs to `generation`
    fn finish_run(&self, generation: u64) {
        let mut run = lock(&self.run);
        if matches!(run.as_ref(), Some((g, _)) if *g == generation) {
            *run = None;
        }
    }
}

/// Live push client
///
/// Owns the connection to `/ws/{role}`:
/// 1. Reads the bearer token from the session
/// 2. Connects, resets the retry counter, replays channel subscriptions
/// 3. Pings every `heartbeat_interval`, discards pongs
/// 4. Forwards every other frame, in order, to the inbound channel
/// 5. On unexpected close, reconnects with exponential backoff until
///    `max_reconnect_attempts` is used up
///
/// Lifecycle changes are published on the [`EventBus`]; nothing is thrown
/// to the caller.
#[derive(Debug, Clone)]
pub struct LiveClient {
    inner: Arc<Inner>,
}

impl LiveClient {
    pub fn new(
        config: ClientConfig,
        session: Arc<dyn SessionStore>,
        bus: EventBus,
        connector: Arc<dyn Connector>,
    ) -> Self {
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        let connection = Connection::new(&config.transport);
        Self {
            inner: Arc::new(Inner {
                config,
                session,
                bus,
                connector,
                connection: Mutex::new(connection),
                outbound: Mutex::new(None),
                inbound_tx,
                inbound_rx: Mutex::new(Some(inbound_rx)),
                subscriptions: Mutex::new(BTreeSet::new()),
                run: Mutex::new(None),
                generation: AtomicU64::new(0),
            }),
        }
    }

    /// Role used for the endpoint: config, then session, then `staff`
    pub fn role(&self) -> Role {
        if let Some(role) = self.inner.config.role {
            return role;
        }
        self.inner
            .session
            .role()
            .and_then(|r| r.parse().ok())
            .unwrap_or_default()
    }

    /// Start the connection loop.
    ///
    /// Without a token this publishes `WebsocketError` and returns `false`.
    /// Calling it while a loop is already running is a no-op.
    pub fn connect(&self) -> bool {
        let mut run = lock(&self.inner.run);
        if run.is_some() {
            tracing::debug!("Connection loop already running");
            return true;
        }

        let Some(token) = self.inner.session.token() else {
            tracing::warn!("No auth token in session, not connecting");
            self.inner
                .bus
                .publish(AppEvent::WebsocketError(TransportError::MissingToken.to_string()));
            return false;
        };

        let url = match self.inner.config.ws_endpoint(self.role(), &token) {
            Ok(url) => url,
            Err(e) => {
                tracing::error!(error = %e, "Cannot build WebSocket endpoint");
                self.inner.bus.publish(AppEvent::WebsocketError(e.to_string()));
                return false;
            }
        };

        let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let cancel = CancellationToken::new();
        *run = Some((generation, cancel.clone()));
        drop(run);

        let inner = Arc::clone(&self.inner);
        tokio::spawn(run_loop(inner, url, generation, cancel));
        true
    }

    /// Explicit retry after `ReconnectFailed`: resets the attempt counter
    pub fn retry(&self) -> bool {
        tracing::info!("Manual reconnect requested");
        lock(&self.inner.connection).reset_retries();
        self.connect()
    }

    /// Tear down: cancels heartbeat, reconnect timer and socket. No reconnect follows.
    ///
    /// `WebsocketDisconnected` is published here, before any later `connect`
    /// can publish `WebsocketConnected`.
    pub fn disconnect(&self) {
        let run = lock(&self.inner.run).take();
        *lock(&self.inner.outbound) = None;
        let was_connected = {
            let mut conn = lock(&self.inner.connection);
            let was_connected = conn.is_connected();
            conn.set_state(ConnectionState::Disconnected);
            was_connected
        };

        let Some((_, cancel)) = run else {
            return;
        };
        tracing::info!("Disconnecting live client");
        cancel.cancel();
        if was_connected {
            self.inner.bus.publish(AppEvent::WebsocketDisconnected {
                code: Some(CLOSE_NORMAL),
                reason: "client disconnect".to_string(),
            });
        }
    }

    /// Queue a message; `false` when not connected
    pub fn send(&self, message: &ClientMessage) -> bool {
        match message.to_text() {
            Ok(text) => self.send_text(text),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to encode outbound message");
                false
            }
        }
    }

    /// Queue a raw text frame; `false` when not connected
    pub fn send_text(&self, text: String) -> bool {
        if !self.is_connected() {
            return false;
        }
        match lock(&self.inner.outbound).as_ref() {
            Some((_, tx)) => tx.send(text).is_ok(),
            None => false,
        }
    }

    /// Join a channel now (if connected) and after every reconnect
    pub fn subscribe(&self, channel: &str) -> bool {
        lock(&self.inner.subscriptions).insert(channel.to_string());
        self.send(&ClientMessage::subscribe(channel))
    }

    pub fn unsubscribe(&self, channel: &str) -> bool {
        lock(&self.inner.subscriptions).remove(channel);
        self.send(&ClientMessage::unsubscribe(channel))
    }

    pub fn subscriptions(&self) -> Vec<String> {
        lock(&self.inner.subscriptions).iter().cloned().collect()
    }

    /// Inbound text frames in arrival order. Only the first call gets the receiver.
    pub fn take_inbound(&self) -> Option<mpsc::UnboundedReceiver<String>> {
        lock(&self.inner.inbound_rx).take()
    }

    pub fn state(&self) -> ConnectionState {
        lock(&self.inner.connection).state()
    }

    pub fn is_connected(&self) -> bool {
        lock(&self.inner.connection).is_connected()
    }

    pub fn is_running(&self) -> bool {
        lock(&self.inner.run).is_some()
    }

    pub fn retry_count(&self) -> u32 {
        lock(&self.inner.connection).retry_count()
    }

    pub fn last_message_at(&self) -> Option<DateTime<Utc>> {
        lock(&self.inner.connection).last_message_at()
    }

    pub fn bus(&self) -> &EventBus {
        &self.inner.bus
    }
}

async fn run_loop(inner: Arc<Inner>, url: String, generation: u64, cancel: CancellationToken) {
    tracing::info!(generation, "Live connection loop started");

    loop {
        inner.set_state(generation, ConnectionState::Connecting);

        let attempt = tokio::select! {
            _ = cancel.cancelled() => break,
            result = inner.connector.connect(&url) => result,
        };

        match attempt {
            Ok(link) => {
                let end = run_session(&inner, link, generation, &cancel).await;
                // `disconnect` already reported the teardown
                if cancel.is_cancelled() {
                    break;
                }
                let (code, reason) = match end {
                    SessionEnd::Cancelled => break,
                    SessionEnd::Closed { code, reason } => (code, reason),
                    SessionEnd::Failed(e) => (None, e),
                };
                tracing::warn!(?code, %reason, "WebSocket disconnected");
                inner
                    .bus
                    .publish(AppEvent::WebsocketDisconnected { code, reason });

                if code == Some(CLOSE_NORMAL) {
                    tracing::info!("Server closed the connection normally, not reconnecting");
                    break;
                }
            }
            Err(e) => {
                if cancel.is_cancelled() {
                    break;
                }
                tracing::warn!(error = %e, "WebSocket connection failed");
                inner.set_state(generation, ConnectionState::Disconnected);
                inner.bus.publish(AppEvent::WebsocketError(e.to_string()));
            }
        }

        if !inner.config.transport.auto_reconnect || cancel.is_cancelled() {
            break;
        }

        let (next, attempts) = {
            let mut conn = lock(&inner.connection);
            let next = conn.next_backoff();
            (next, conn.retry_count())
        };

        let Some(delay) = next else {
            tracing::error!(attempts, "Reconnect attempts exhausted");
            inner.set_state(generation, ConnectionState::Disconnected);
            inner.finish_run(generation);
            inner.bus.publish(AppEvent::ReconnectFailed { attempts });
            return;
        };

        tracing::info!(
            attempt = attempts,
            delay_ms = delay.as_millis() as u64,
            "Scheduling reconnect"
        );
        inner.bus.publish(AppEvent::Reconnecting {
            attempt: attempts,
            delay,
        });

        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(delay) => {}
        }
    }

    inner.set_state(generation, ConnectionState::Disconnected);
    inner.finish_run(generation);
    tracing::info!(generation, "Live connection loop stopped");
}

async fn run_session(
    inner: &Inner,
    mut link: Box<dyn Link>,
    generation: u64,
    cancel: &CancellationToken,
) -> SessionEnd {
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    if !inner.install(generation, tx) {
        if let Err(e) = link.close().await {
            tracing::debug!(error = %e, "Close handshake failed");
        }
        return SessionEnd::Cancelled;
    }
    tracing::info!("WebSocket connected");
    inner.bus.publish(AppEvent::WebsocketConnected);

    let channels: Vec<String> = lock(&inner.subscriptions).iter().cloned().collect();
    for channel in channels {
        let text = match ClientMessage::subscribe(channel).to_text() {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to encode subscription");
                continue;
            }
        };
        if let Err(e) = link.send_text(text).await {
            return finish_session(inner, generation, SessionEnd::Failed(e.to_string()));
        }
    }

    let period = inner.config.transport.heartbeat_interval;
    let heartbeat_enabled = !period.is_zero();
    let tick = period.max(std::time::Duration::from_millis(1));
    let mut heartbeat = tokio::time::interval_at(Instant::now() + tick, tick);
    heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let end = loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                if let Err(e) = link.close().await {
                    tracing::debug!(error = %e, "Close handshake failed");
                }
                break SessionEnd::Cancelled;
            }

            _ = heartbeat.tick(), if heartbeat_enabled => {
                match ClientMessage::ping().to_text() {
                    Ok(text) => {
                        if let Err(e) = link.send_text(text).await {
                            tracing::warn!(error = %e, "Heartbeat failed, disconnecting");
                            break SessionEnd::Failed(e.to_string());
                        }
                        tracing::trace!("Heartbeat ping sent");
                    }
                    Err(e) => tracing::warn!(error = %e, "Failed to encode ping"),
                }
            }

            Some(text) = rx.recv() => {
                if let Err(e) = link.send_text(text).await {
                    tracing::warn!(error = %e, "Send failed, disconnecting");
                    break SessionEnd::Failed(e.to_string());
                }
            }

            frame = link.next_frame() => {
                match frame {
                    Some(Ok(Frame::Text(text))) => {
                        lock(&inner.connection).touch();
                        if ServerMessage::parse(&text).is_ok_and(|m| m.is_pong()) {
                            tracing::trace!("Heartbeat pong received");
                            continue;
                        }
                        if inner.inbound_tx.send(text).is_err() {
                            tracing::debug!("No inbound consumer, dropping frame");
                        }
                    }
                    Some(Ok(Frame::Pong)) => {
                        lock(&inner.connection).touch();
                    }
                    Some(Ok(Frame::Close { code, reason })) => {
                        break SessionEnd::Closed { code, reason };
                    }
                    Some(Err(e)) => {
                        tracing::warn!(error = %e, "WebSocket error");
                        break SessionEnd::Failed(e.to_string());
                    }
                    None => {
                        break SessionEnd::Closed {
                            code: None,
                            reason: "stream ended".to_string(),
                        };
                    }
                }
            }
        }
    };

    finish_session(inner, generation, end)
}

fn finish_session(inner: &Inner, generation: u64, end: SessionEnd) -> SessionEnd {
    inner.uninstall(generation);
    inner.set_state(generation, ConnectionState::Disconnected);
    end
}
