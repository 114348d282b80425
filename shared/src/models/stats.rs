//! Dashboard aggregate statistics

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Counter field names recognized as an authoritative stats snapshot
const COUNTER_KEYS: [&str; 3] = ["available_tables", "occupied_tables", "dirty_tables"];

/// Server-computed dashboard aggregates (`GET /api/dashboard/stats`, `stats_update`)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardStats {
    #[serde(default)]
    pub available_tables: u32,
    #[serde(default)]
    pub occupied_tables: u32,
    #[serde(default)]
    pub dirty_tables: u32,
    #[serde(default)]
    pub active_orders: u32,
    #[serde(default)]
    pub today_orders: u32,
    /// Revenue in currency unit
    #[serde(default)]
    pub today_revenue: f64,
}

impl DashboardStats {
    /// Extract a full stats snapshot from an event payload.
    ///
    /// Looks for a nested `stats` object first, then for the counter
    /// fields at the top level. Returns `None` when the payload carries
    /// no complete table counter set.
    pub fn from_payload(payload: &Map<String, Value>) -> Option<Self> {
        if let Some(Value::Object(nested)) = payload.get("stats") {
            return Self::from_payload(nested);
        }

        if !COUNTER_KEYS.iter().all(|k| payload.contains_key(*k)) {
            return None;
        }

        match serde_json::from_value(Value::Object(payload.clone())) {
            Ok(stats) => Some(stats),
            Err(e) => {
                tracing::warn!(error = %e, "Malformed stats snapshot in payload");
                None
            }
        }
    }

    pub fn total_tables(&self) -> u32 {
        self.available_tables + self.occupied_tables + self.dirty_tables
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_payload_top_level() {
        let payload = json!({
            "available_tables": 5,
            "occupied_tables": 3,
            "dirty_tables": 1,
            "today_revenue": 120.5
        });
        let stats = DashboardStats::from_payload(payload.as_object().unwrap()).unwrap();
        assert_eq!(stats.total_tables(), 9);
        assert_eq!(stats.today_revenue, 120.5);
    }

    #[test]
    fn test_from_payload_nested() {
        let payload = json!({
            "id": 3,
            "stats": {"available_tables": 1, "occupied_tables": 1, "dirty_tables": 0}
        });
        let stats = DashboardStats::from_payload(payload.as_object().unwrap()).unwrap();
        assert_eq!(stats.available_tables, 1);
    }

    #[test]
    fn test_partial_counters_are_not_a_snapshot() {
        let payload = json!({"available_tables": 5});
        assert!(DashboardStats::from_payload(payload.as_object().unwrap()).is_none());
    }
}
