//! Event router
//!
//! Normalizes raw push frames into [`Routed`] outcomes. The tag table is a
//! static exhaustive lookup; anything not in it is dropped.

use live_client::{AppEvent, EventBus};
use serde_json::{Map, Value};
use shared::{Action, CanonicalEvent, Entity, Notification, ServerMessage, Severity};
use thiserror::Error;

/// Suffix shared by every notification tag (`staff_notification`, ...)
const NOTIFICATION_SUFFIX: &str = "_notification";

#[derive(Debug, Error)]
pub enum RouteError {
    /// Frame is not a JSON object
    #[error("Invalid frame: {0}")]
    Parse(#[from] serde_json::Error),
}

/// What an inbound tag maps to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteTag {
    Entity(Entity, Action),
    Notification,
    Heartbeat,
}

impl RouteTag {
    pub fn lookup(tag: &str) -> Option<Self> {
        use Action::*;
        use Entity::*;

        let route = match tag {
            "table_created" => Self::Entity(Table, Create),
            "table_updated" | "table_status_changed" => Self::Entity(Table, Update),
            "table_deleted" => Self::Entity(Table, Delete),

            "order_created" => Self::Entity(Order, Create),
            "order_updated" => Self::Entity(Order, Update),
            "order_status_changed" => Self::Entity(Order, StatusChange),
            "order_deleted" | "order_served" => Self::Entity(Order, Delete),

            "menu_created" => Self::Entity(Menu, Create),
            "menu_updated" => Self::Entity(Menu, Update),
            "menu_deleted" => Self::Entity(Menu, Delete),

            "payment_created" => Self::Entity(Payment, Create),
            "payment_updated" => Self::Entity(Payment, Update),

            "stats_update" => Self::Entity(Stats, Update),

            shared::message::PONG_TAG => Self::Heartbeat,

            t if t == "notification" || t.ends_with(NOTIFICATION_SUFFIX) => Self::Notification,

            _ => return None,
        };
        Some(route)
    }
}

/// Routed outcome of one frame
#[derive(Debug, Clone, PartialEq)]
pub enum Routed {
    Entity(CanonicalEvent),
    Notification(Notification),
    Heartbeat,
}

/// Stateless frame router
#[derive(Debug, Clone, Default)]
pub struct EventRouter;

impl EventRouter {
    pub fn new() -> Self {
        Self
    }

    /// Route one text frame.
    ///
    /// `Ok(None)` for frames without a known tag.
    pub fn route(&self, text: &str) -> Result<Option<Routed>, RouteError> {
        let envelope = ServerMessage::parse(text)?;

        let Some((tag, route)) = envelope
            .tags()
            .find_map(|t| RouteTag::lookup(t).map(|r| (t, r)))
        else {
            tracing::debug!(
                kind = ?envelope.kind,
                event = ?envelope.event,
                "Dropping frame with unknown tag"
            );
            return Ok(None);
        };

        let routed = match route {
            RouteTag::Heartbeat => Routed::Heartbeat,
            RouteTag::Notification => Routed::Notification(notification(tag, &envelope)),
            RouteTag::Entity(entity, action) => {
                let mut payload = envelope.payload();
                if action == Action::Delete {
                    payload = identifiers_only(entity, &payload);
                }
                Routed::Entity(CanonicalEvent::new(entity, action, payload))
            }
        };
        Ok(Some(routed))
    }

    /// Route a frame and publish the result on the bus.
    ///
    /// Parse errors are logged and swallowed; the returned value is what
    /// was routed (if anything).
    pub fn dispatch(&self, text: &str, bus: &EventBus) -> Option<Routed> {
        let routed = match self.route(text) {
            Ok(Some(routed)) => routed,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to parse push frame");
                return None;
            }
        };

        match &routed {
            Routed::Entity(event) => {
                tracing::debug!(entity = %event.entity, action = %event.action, id = ?event.id(), "Routed event");
                bus.publish(AppEvent::from_canonical(event.clone()));
            }
            Routed::Notification(n) => {
                bus.publish(AppEvent::StaffNotification(n.clone()));
                bus.publish(AppEvent::toast(n.message.clone(), n.severity));
            }
            Routed::Heartbeat => tracing::trace!("Heartbeat frame"),
        }
        Some(routed)
    }
}

/// Delete payloads keep only `id` and `table_id`
fn identifiers_only(entity: Entity, payload: &Map<String, Value>) -> Map<String, Value> {
    let full = CanonicalEvent::new(entity, Action::Delete, payload.clone());
    let mut ids = Map::new();
    if let Some(id) = full.id() {
        ids.insert("id".into(), Value::from(id));
    }
    if let Some(table_id) = full.table_id() {
        ids.insert("table_id".into(), Value::from(table_id));
    }
    ids
}

fn notification(tag: &str, envelope: &ServerMessage) -> Notification {
    let payload = envelope.payload();
    let message = envelope
        .message
        .clone()
        .or_else(|| payload.get("message").and_then(Value::as_str).map(String::from))
        .unwrap_or_else(|| tag.replace('_', " "));
    let severity = ["severity", "level"]
        .iter()
        .find_map(|k| payload.get(*k).and_then(Value::as_str))
        .map(Severity::from_level)
        .unwrap_or_default();

    Notification {
        kind: tag.to_string(),
        message,
        severity,
        data: envelope.data.clone(),
    }
}
