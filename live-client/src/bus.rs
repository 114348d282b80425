//! Typed process-wide event bus
//!
//! Broadcast channel that fans out [`AppEvent`]s to every subscriber
//! (page components, the toast layer, the dashboard coordinator).
//! Payload shapes are fixed per variant.

use shared::{CanonicalEvent, Entity, Notification, Severity};
use std::time::Duration;
use tokio::sync::broadcast;

/// Default channel capacity
const BUS_CAPACITY: usize = 1024;

/// Events carried by the bus
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// Socket opened
    WebsocketConnected,
    /// Socket closed (explicitly or not)
    WebsocketDisconnected { code: Option<u16>, reason: String },
    /// Transport error (missing token, refused connection, socket error)
    WebsocketError(String),
    /// Reconnect scheduled
    Reconnecting { attempt: u32, delay: Duration },
    /// All reconnect attempts used up; needs an explicit retry
    ReconnectFailed { attempts: u32 },
    TableUpdate(CanonicalEvent),
    OrderUpdate(CanonicalEvent),
    MenuUpdate(CanonicalEvent),
    PaymentUpdate(CanonicalEvent),
    StatsUpdate(CanonicalEvent),
    StaffNotification(Notification),
    ShowToast { message: String, severity: Severity },
}

impl AppEvent {
    /// Wrap a canonical event in its entity-specific variant
    pub fn from_canonical(event: CanonicalEvent) -> Self {
        match event.entity {
            Entity::Table => Self::TableUpdate(event),
            Entity::Order => Self::OrderUpdate(event),
            Entity::Menu => Self::MenuUpdate(event),
            Entity::Payment => Self::PaymentUpdate(event),
            Entity::Stats => Self::StatsUpdate(event),
        }
    }

    pub fn toast(message: impl Into<String>, severity: Severity) -> Self {
        Self::ShowToast {
            message: message.into(),
            severity,
        }
    }

    /// Event name as seen by page scripts
    pub fn name(&self) -> &'static str {
        match self {
            Self::WebsocketConnected => "websocketConnected",
            Self::WebsocketDisconnected { .. } => "websocketDisconnected",
            Self::WebsocketError(_) => "websocketError",
            Self::Reconnecting { .. } => "websocketReconnecting",
            Self::ReconnectFailed { .. } => "websocketReconnectFailed",
            Self::TableUpdate(_) => "tableUpdate",
            Self::OrderUpdate(_) => "orderUpdate",
            Self::MenuUpdate(_) => "menuUpdate",
            Self::PaymentUpdate(_) => "paymentUpdate",
            Self::StatsUpdate(_) => "statsUpdate",
            Self::StaffNotification(_) => "staffNotification",
            Self::ShowToast { .. } => "showToast",
        }
    }

    /// Canonical payload for entity updates
    pub fn canonical(&self) -> Option<&CanonicalEvent> {
        match self {
            Self::TableUpdate(e)
            | Self::OrderUpdate(e)
            | Self::MenuUpdate(e)
            | Self::PaymentUpdate(e)
            | Self::StatsUpdate(e) => Some(e),
            _ => None,
        }
    }
}

/// Broadcast bus shared through the application context
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<AppEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(BUS_CAPACITY)
    }
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publish to all current subscribers; returns how many received it
    pub fn publish(&self, event: AppEvent) -> usize {
        let name = event.name();
        match self.sender.send(event) {
            Ok(n) => {
                tracing::trace!(event = name, receivers = n, "Bus event published");
                n
            }
            Err(_) => {
                tracing::trace!(event = name, "No subscribers for bus event");
                0
            }
        }
    }

    /// Receive all future events
    pub fn subscribe(&self) -> broadcast::Receiver<AppEvent> {
        self.sender.subscribe()
    }
}
