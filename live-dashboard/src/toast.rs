//! Toast layer
//!
//! Stack of user-visible messages fed from the bus. Timed toasts remove
//! themselves after their duration; persistent ones wait for `dismiss`.

use chrono::{DateTime, Utc};
use live_client::{AppEvent, EventBus};
use shared::Severity;
use std::fmt::Write;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::render::escape;

pub const DEFAULT_TOAST_DURATION: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ToastId(Uuid);

impl std::fmt::Display for ToastId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&self.0, f)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Toast {
    pub id: ToastId,
    pub message: String,
    pub severity: Severity,
    pub created_at: DateTime<Utc>,
    /// `None` for persistent toasts
    pub expires_after: Option<Duration>,
    deadline: Option<Instant>,
}

impl Toast {
    fn expired(&self, now: Instant) -> bool {
        self.deadline.is_some_and(|d| now >= d)
    }
}

#[derive(Debug, Default)]
struct ToastState {
    toasts: Vec<Toast>,
    /// Persistent reconnect banner, if shown
    banner: Option<ToastId>,
}

#[derive(Debug, Clone)]
pub struct ToastLayer {
    state: Arc<Mutex<ToastState>>,
    duration: Duration,
    revision: Arc<watch::Sender<u64>>,
}

impl Default for ToastLayer {
    fn default() -> Self {
        Self::new(DEFAULT_TOAST_DURATION)
    }
}

impl ToastLayer {
    pub fn new(duration: Duration) -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            state: Arc::new(Mutex::new(ToastState::default())),
            duration,
            revision: Arc::new(revision),
        }
    }

    fn state(&self) -> MutexGuard<'_, ToastState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn bump(&self) {
        self.revision.send_modify(|r| *r += 1);
    }

    /// Ticks whenever the stack changes
    pub fn changes(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    /// Show a toast that dismisses itself after the configured duration
    pub fn show(&self, message: impl Into<String>, severity: Severity) -> ToastId {
        self.push(message.into(), severity, Some(self.duration))
    }

    /// Show a toast that stays until dismissed
    pub fn show_persistent(&self, message: impl Into<String>, severity: Severity) -> ToastId {
        self.push(message.into(), severity, None)
    }

    fn push(&self, message: String, severity: Severity, expires_after: Option<Duration>) -> ToastId {
        let id = ToastId(Uuid::new_v4());
        let deadline = expires_after.map(|d| Instant::now() + d);
        tracing::debug!(%id, %severity, %message, "Toast shown");

        self.state().toasts.push(Toast {
            id,
            message,
            severity,
            created_at: Utc::now(),
            expires_after,
            deadline,
        });
        self.bump();

        if let Some(deadline) = deadline {
            match tokio::runtime::Handle::try_current() {
                Ok(handle) => {
                    let layer = self.clone();
                    handle.spawn(async move {
                        tokio::time::sleep_until(deadline).await;
                        layer.dismiss(id);
                    });
                }
                // expired toasts are still filtered out by `active`
                Err(_) => tracing::trace!(%id, "No runtime, toast expiry is lazy"),
            }
        }
        id
    }

    /// Remove a toast; `false` if it was already gone
    pub fn dismiss(&self, id: ToastId) -> bool {
        let removed = {
            let mut state = self.state();
            let before = state.toasts.len();
            state.toasts.retain(|t| t.id != id);
            if state.banner == Some(id) {
                state.banner = None;
            }
            state.toasts.len() != before
        };
        if removed {
            self.bump();
        }
        removed
    }

    /// Visible toasts, oldest first
    pub fn active(&self) -> Vec<Toast> {
        let now = Instant::now();
        let mut state = self.state();
        state.toasts.retain(|t| !t.expired(now));
        state.toasts.clone()
    }

    pub fn render(&self) -> String {
        let mut out = String::from(r#"<div class="toast-stack">"#);
        for toast in self.active() {
            let _ = write!(
                out,
                r#"<div class="toast toast-{severity}" data-id="{id}"><span class="message">{message}</span><button class="toast-close" data-dismiss="{id}">&times;</button></div>"#,
                severity = toast.severity,
                id = toast.id,
                message = escape(&toast.message),
            );
        }
        out.push_str("</div>");
        out
    }

    fn on_event(&self, event: AppEvent) {
        match event {
            AppEvent::ShowToast { message, severity } => {
                self.show(message, severity);
            }
            AppEvent::ReconnectFailed { attempts } => {
                if self.state().banner.is_some() {
                    return;
                }
                let id = self.show_persistent(
                    format!("Connection lost after {attempts} attempts. Retry to reconnect."),
                    Severity::Error,
                );
                self.state().banner = Some(id);
            }
            AppEvent::WebsocketConnected => {
                let banner = self.state().banner;
                if let Some(id) = banner {
                    self.dismiss(id);
                }
            }
            _ => {}
        }
    }

    /// Consume bus events until cancelled
    pub fn listen(&self, bus: &EventBus, cancel: CancellationToken) -> JoinHandle<()> {
        let mut rx = bus.subscribe();
        let layer = self.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    result = rx.recv() => match result {
                        Ok(event) => layer.on_event(event),
                        Err(broadcast::error::RecvError::Lagged(n)) => {
                            tracing::warn!(skipped = n, "Toast listener lagged");
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    },
                }
            }
            tracing::debug!("Toast listener stopped");
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_toast_expires_after_exact_duration() {
        let layer = ToastLayer::default();
        let id = layer.show("Order placed", Severity::Success);
        assert_eq!(layer.active().len(), 1);

        tokio::time::sleep(Duration::from_millis(2999)).await;
        assert_eq!(layer.active()[0].id, id);

        tokio::time::sleep(Duration::from_millis(1)).await;
        assert!(layer.active().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_persistent_toast_stays() {
        let layer = ToastLayer::default();
        let id = layer.show_persistent("Offline", Severity::Error);
        tokio::time::sleep(Duration::from_secs(3600)).await;
        assert_eq!(layer.active().len(), 1);
        assert!(layer.dismiss(id));
        assert!(!layer.dismiss(id));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stack_order_and_render() {
        let layer = ToastLayer::default();
        layer.show("first", Severity::Info);
        layer.show("<b>second</b>", Severity::Warning);

        let messages: Vec<String> = layer.active().into_iter().map(|t| t.message).collect();
        assert_eq!(messages, vec!["first", "<b>second</b>"]);

        let html = layer.render();
        assert!(html.contains("toast-warning"));
        assert!(html.contains("&lt;b&gt;second&lt;/b&gt;"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_listen_turns_reconnect_failure_into_banner() {
        let bus = EventBus::default();
        let layer = ToastLayer::default();
        let cancel = CancellationToken::new();
        let mut changes = layer.changes();
        let handle = layer.listen(&bus, cancel.clone());

        bus.publish(AppEvent::ReconnectFailed { attempts: 5 });
        changes.changed().await.unwrap();
        tokio::time::sleep(Duration::from_secs(60)).await;
        let active = layer.active();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].severity, Severity::Error);
        assert_eq!(active[0].expires_after, None);

        bus.publish(AppEvent::WebsocketConnected);
        changes.changed().await.unwrap();
        assert!(layer.active().is_empty());

        cancel.cancel();
        handle.await.unwrap();
    }
}
