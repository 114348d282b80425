//! Canonical events
//!
//! Every push message the server sends is normalized into one of these
//! shapes before it reaches the projector or the toast layer.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Entity kind an event refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Entity {
    Order,
    Table,
    Menu,
    Payment,
    Stats,
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Order => write!(f, "order"),
            Self::Table => write!(f, "table"),
            Self::Menu => write!(f, "menu"),
            Self::Payment => write!(f, "payment"),
            Self::Stats => write!(f, "stats"),
        }
    }
}

/// What happened to the entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Create,
    Update,
    Delete,
    StatusChange,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Create => write!(f, "create"),
            Self::Update => write!(f, "update"),
            Self::Delete => write!(f, "delete"),
            Self::StatusChange => write!(f, "status_change"),
        }
    }
}

/// Normalized `{entity, action, payload}` triple
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalEvent {
    pub entity: Entity,
    pub action: Action,
    pub payload: Map<String, Value>,
}

impl CanonicalEvent {
    pub fn new(entity: Entity, action: Action, payload: Map<String, Value>) -> Self {
        Self {
            entity,
            action,
            payload,
        }
    }

    /// Entity id carried by the payload.
    ///
    /// Accepts `id` or `<entity>_id`, as a number or a numeric string.
    pub fn id(&self) -> Option<i64> {
        id_field(&self.payload, "id").or_else(|| {
            let key = format!("{}_id", self.entity);
            id_field(&self.payload, &key)
        })
    }

    /// Denormalized parent table id, when present
    pub fn table_id(&self) -> Option<i64> {
        id_field(&self.payload, "table_id")
    }

    /// String field from the payload
    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.payload.get(key).and_then(Value::as_str)
    }

    pub fn is_delete(&self) -> bool {
        self.action == Action::Delete
    }
}

/// Read an integer id that may have been serialized as a string
pub fn id_field(map: &Map<String, Value>, key: &str) -> Option<i64> {
    match map.get(key)? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

// ==================== Notifications ====================

/// Toast severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Info,
    Success,
    Warning,
    Error,
}

impl Severity {
    /// Lenient parse of the level strings the server uses
    pub fn from_level(level: &str) -> Self {
        match level.trim().to_ascii_lowercase().as_str() {
            "success" | "ok" => Self::Success,
            "warning" | "warn" => Self::Warning,
            "error" | "danger" | "critical" => Self::Error,
            _ => Self::Info,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Success => write!(f, "success"),
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Server notification routed to the toast layer (`*_notification` tags)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    /// Originating tag, e.g. `staff_notification`
    pub kind: String,
    pub message: String,
    pub severity: Severity,
    pub data: Option<Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn test_id_accepts_number_and_string() {
        let e = CanonicalEvent::new(Entity::Table, Action::Update, payload(json!({"id": 3})));
        assert_eq!(e.id(), Some(3));

        let e = CanonicalEvent::new(Entity::Table, Action::Update, payload(json!({"id": "7"})));
        assert_eq!(e.id(), Some(7));
    }

    #[test]
    fn test_id_falls_back_to_entity_prefixed_key() {
        let e = CanonicalEvent::new(
            Entity::Order,
            Action::Delete,
            payload(json!({"order_id": 12, "table_id": 4})),
        );
        assert_eq!(e.id(), Some(12));
        assert_eq!(e.table_id(), Some(4));
    }

    #[test]
    fn test_severity_from_level() {
        assert_eq!(Severity::from_level("WARN"), Severity::Warning);
        assert_eq!(Severity::from_level("danger"), Severity::Error);
        assert_eq!(Severity::from_level("success"), Severity::Success);
        assert_eq!(Severity::from_level("whatever"), Severity::Info);
    }

    #[test]
    fn test_action_display() {
        assert_eq!(Action::StatusChange.to_string(), "status_change");
        assert_eq!(Entity::Payment.to_string(), "payment");
    }
}
