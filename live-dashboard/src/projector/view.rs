//! Per-page view model
//!
//! Last-known snapshots keyed by id plus the aggregate counters shown on
//! the dashboard cards.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use shared::models::{DashboardStats, DiningTable, MenuItem, Order, OrderStatus, Payment, TableStatus};
use shared::{Action, CanonicalEvent, Entity};
use std::collections::{BTreeMap, BTreeSet};

/// Keys that may carry a table's new status
const STATUS_KEYS: [&str; 2] = ["status", "new_status"];

/// Table occupancy counters. Every table is counted exactly once.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TableCounters {
    pub available: u32,
    pub occupied: u32,
    pub dirty: u32,
}

impl TableCounters {
    pub fn from_tables<'a>(tables: impl IntoIterator<Item = &'a DiningTable>) -> Self {
        let mut counters = Self::default();
        for table in tables {
            *counters.slot_mut(table.status) += 1;
        }
        counters
    }

    pub fn from_stats(stats: &DashboardStats) -> Self {
        Self {
            available: stats.available_tables,
            occupied: stats.occupied_tables,
            dirty: stats.dirty_tables,
        }
    }

    pub fn get(&self, status: TableStatus) -> u32 {
        match status {
            TableStatus::Available => self.available,
            TableStatus::Occupied => self.occupied,
            TableStatus::Dirty => self.dirty,
        }
    }

    fn slot_mut(&mut self, status: TableStatus) -> &mut u32 {
        match status {
            TableStatus::Available => &mut self.available,
            TableStatus::Occupied => &mut self.occupied,
            TableStatus::Dirty => &mut self.dirty,
        }
    }

    /// Move one table between counters; `false` (and no change) if `from` is already zero
    pub fn shift(&mut self, from: TableStatus, to: TableStatus) -> bool {
        if from == to {
            return true;
        }
        let Some(decremented) = self.get(from).checked_sub(1) else {
            return false;
        };
        *self.slot_mut(from) = decremented;
        *self.slot_mut(to) += 1;
        true
    }

    fn remove(&mut self, status: TableStatus) -> bool {
        match self.get(status).checked_sub(1) {
            Some(n) => {
                *self.slot_mut(status) = n;
                true
            }
            None => false,
        }
    }

    pub fn total(&self) -> u32 {
        self.available + self.occupied + self.dirty
    }
}

/// Revenue and order totals
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct RevenueTotals {
    pub today_revenue: f64,
    pub today_orders: u32,
    pub active_orders: u32,
}

/// Result of absorbing one event into one view model
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Unchanged,
    Changed,
    /// Cannot be applied without guessing; reload this entity set
    Refetch(Entity),
}

/// Records stored in a view model
pub trait Record: Serialize + DeserializeOwned + Clone + PartialEq {
    /// Wire aliases accepted on decode, as `(alias, field)`
    const ALIASES: &'static [(&'static str, &'static str)] = &[];

    fn record_id(&self) -> i64;
}

impl Record for DiningTable {
    const ALIASES: &'static [(&'static str, &'static str)] =
        &[("table_number", "number"), ("location", "zone")];

    fn record_id(&self) -> i64 {
        self.id
    }
}

impl Record for Order {
    const ALIASES: &'static [(&'static str, &'static str)] = &[("total", "total_amount")];

    fn record_id(&self) -> i64 {
        self.id
    }
}

impl Record for MenuItem {
    const ALIASES: &'static [(&'static str, &'static str)] = &[("available", "is_available")];

    fn record_id(&self) -> i64 {
        self.id
    }
}

impl Record for Payment {
    const ALIASES: &'static [(&'static str, &'static str)] = &[("payment_method", "method")];

    fn record_id(&self) -> i64 {
        self.id
    }
}

fn decode<R: Record>(payload: &Map<String, Value>) -> Option<R> {
    serde_json::from_value(Value::Object(payload.clone())).ok()
}

/// Overlay `patch` onto `current`; `None` when the result no longer decodes
fn merge<R: Record>(current: &R, patch: &Map<String, Value>) -> Option<R> {
    let mut value = serde_json::to_value(current).ok()?;
    let fields = value.as_object_mut()?;
    // serialized fields use canonical names, so aliased patch keys must too
    for (key, v) in patch {
        let key = R::ALIASES
            .iter()
            .find(|(alias, _)| *alias == key.as_str())
            .map_or(key.as_str(), |(_, field)| *field);
        fields.insert(key.to_string(), v.clone());
    }
    serde_json::from_value(value).ok()
}

/// Generic create/update/delete against a record map
fn apply_record<R: Record>(
    records: &mut BTreeMap<i64, R>,
    event: &CanonicalEvent,
) -> Outcome {
    let refetch = Outcome::Refetch(event.entity);
    match event.action {
        Action::Delete => match event.id() {
            Some(id) if records.remove(&id).is_some() => Outcome::Changed,
            Some(_) => Outcome::Unchanged,
            None => refetch,
        },
        Action::Create => match decode::<R>(&event.payload) {
            Some(record) => {
                records.insert(record.record_id(), record);
                Outcome::Changed
            }
            None => refetch,
        },
        Action::Update | Action::StatusChange => {
            let Some(id) = event.id() else {
                return refetch;
            };
            let next = match records.get(&id) {
                Some(current) => merge(current, &event.payload),
                None if event.action == Action::Update => decode::<R>(&event.payload),
                None => None,
            };
            match next {
                Some(record) if records.get(&id) == Some(&record) => Outcome::Unchanged,
                Some(record) => {
                    records.insert(id, record);
                    Outcome::Changed
                }
                None => refetch,
            }
        }
    }
}

/// Snapshot set and counters for one page
#[derive(Debug, Clone, Default, Serialize)]
pub struct ViewModel {
    pub tables: BTreeMap<i64, DiningTable>,
    pub orders: BTreeMap<i64, Order>,
    pub menu: BTreeMap<i64, MenuItem>,
    pub payments: BTreeMap<i64, Payment>,
    pub counters: TableCounters,
    pub revenue: RevenueTotals,
    /// Entity sets populated by at least one full load
    pub loaded: BTreeSet<Entity>,
}

impl ViewModel {
    pub fn is_loaded(&self, entity: Entity) -> bool {
        self.loaded.contains(&entity)
    }

    /// Absorb one canonical event
    pub fn apply(&mut self, event: &CanonicalEvent) -> Outcome {
        let snapshot = DashboardStats::from_payload(&event.payload);
        if let Some(stats) = &snapshot {
            self.replace_stats(stats);
        }

        let outcome = match event.entity {
            Entity::Stats if snapshot.is_some() => Outcome::Changed,
            Entity::Stats => Outcome::Refetch(Entity::Stats),
            Entity::Table => self.apply_table(event, snapshot.is_some()),
            Entity::Order => {
                let outcome = self.apply_order(event);
                self.recount_active_orders();
                outcome
            }
            Entity::Menu => apply_record(&mut self.menu, event),
            Entity::Payment => apply_record(&mut self.payments, event),
        };

        match outcome {
            Outcome::Unchanged if snapshot.is_some() => Outcome::Changed,
            other => other,
        }
    }

    fn apply_order(&mut self, event: &CanonicalEvent) -> Outcome {
        if event.action == Action::StatusChange {
            let status = event.str_field("status").map(str::parse::<OrderStatus>);
            if !matches!(status, Some(Ok(_))) {
                return Outcome::Refetch(Entity::Order);
            }
        }
        apply_record(&mut self.orders, event)
    }

    /// Table events. Counters move only when the prior status is known;
    /// `counted` means a stats snapshot already set them.
    fn apply_table(&mut self, event: &CanonicalEvent, counted: bool) -> Outcome {
        let refetch = Outcome::Refetch(Entity::Table);
        let Some(id) = event.id() else {
            return refetch;
        };

        if event.action == Action::Delete {
            return match self.tables.remove(&id) {
                Some(old) if counted || self.counters.remove(old.status) => Outcome::Changed,
                Some(_) => refetch,
                None if counted => Outcome::Unchanged,
                None => refetch,
            };
        }

        let status = match STATUS_KEYS.iter().find_map(|k| event.payload.get(*k)) {
            None => None,
            Some(Value::String(s)) => match s.parse::<TableStatus>() {
                Ok(status) => Some(status),
                Err(_) => return refetch,
            },
            Some(_) => return refetch,
        };

        let Some(current) = self.tables.get(&id) else {
            // New table: created explicitly, or pushed with a snapshot that already counts it
            if event.action == Action::Create || counted {
                let Some(table) = decode::<DiningTable>(&event.payload) else {
                    return refetch;
                };
                if !counted {
                    *self.counters.slot_mut(table.status) += 1;
                }
                self.tables.insert(id, table);
                return Outcome::Changed;
            }
            tracing::debug!(table_id = id, "Unknown table in delta, requesting refetch");
            return refetch;
        };

        let old_status = current.status;
        let Some(mut next) = merge(current, &event.payload) else {
            return refetch;
        };
        if let Some(status) = status {
            next.status = status;
        }

        if !counted && !self.counters.shift(old_status, next.status) {
            tracing::debug!(table_id = id, from = %old_status, to = %next.status, "Counter would go negative, requesting refetch");
            return refetch;
        }

        if self.tables.get(&id) == Some(&next) {
            return Outcome::Unchanged;
        }
        self.tables.insert(id, next);
        Outcome::Changed
    }

    fn replace_stats(&mut self, stats: &DashboardStats) {
        self.counters = TableCounters::from_stats(stats);
        self.revenue = RevenueTotals {
            today_revenue: stats.today_revenue,
            today_orders: stats.today_orders,
            active_orders: stats.active_orders,
        };
    }

    fn recount_active_orders(&mut self) {
        if self.is_loaded(Entity::Order) {
            self.revenue.active_orders =
                self.orders.values().filter(|o| o.status.is_active()).count() as u32;
        }
    }

    // ========== Full loads ==========

    pub fn load_tables(&mut self, tables: &[DiningTable]) {
        self.tables = tables.iter().map(|t| (t.id, t.clone())).collect();
        self.counters = TableCounters::from_tables(self.tables.values());
        self.loaded.insert(Entity::Table);
    }

    pub fn load_orders(&mut self, orders: &[Order]) {
        self.orders = orders.iter().map(|o| (o.id, o.clone())).collect();
        self.loaded.insert(Entity::Order);
        self.recount_active_orders();
    }

    pub fn load_menu(&mut self, items: &[MenuItem]) {
        self.menu = items.iter().map(|m| (m.id, m.clone())).collect();
        self.loaded.insert(Entity::Menu);
    }

    pub fn load_payments(&mut self, payments: &[Payment]) {
        self.payments = payments.iter().map(|p| (p.id, p.clone())).collect();
        self.loaded.insert(Entity::Payment);
    }

    pub fn load_stats(&mut self, stats: &DashboardStats) {
        self.replace_stats(stats);
        self.loaded.insert(Entity::Stats);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn event(entity: Entity, action: Action, payload: Value) -> CanonicalEvent {
        CanonicalEvent::new(entity, action, payload.as_object().cloned().unwrap())
    }

    fn table(id: i64, status: TableStatus) -> DiningTable {
        DiningTable {
            id,
            number: Some(format!("T{id}")),
            capacity: Some(4),
            status,
            zone: None,
        }
    }

    fn seeded() -> ViewModel {
        let mut view = ViewModel::default();
        view.load_tables(&[
            table(1, TableStatus::Available),
            table(2, TableStatus::Available),
            table(3, TableStatus::Available),
            table(4, TableStatus::Occupied),
            table(5, TableStatus::Dirty),
        ]);
        view
    }

    #[test]
    fn test_load_recomputes_counters() {
        let view = seeded();
        assert_eq!(
            view.counters,
            TableCounters {
                available: 3,
                occupied: 1,
                dirty: 1
            }
        );
    }

    #[test]
    fn test_status_delta_moves_one_unit() {
        let mut view = seeded();
        let outcome = view.apply(&event(
            Entity::Table,
            Action::Update,
            json!({"id": 3, "status": "occupied"}),
        ));
        assert_eq!(outcome, Outcome::Changed);
        assert_eq!(view.counters.available, 2);
        assert_eq!(view.counters.occupied, 2);
        assert_eq!(view.counters.dirty, 1);
        assert_eq!(view.tables[&3].status, TableStatus::Occupied);
        assert_eq!(view.tables[&3].number.as_deref(), Some("T3"));
    }

    #[test]
    fn test_same_status_leaves_counters() {
        let mut view = seeded();
        let before = view.counters;
        let outcome = view.apply(&event(
            Entity::Table,
            Action::Update,
            json!({"id": 4, "status": "occupied"}),
        ));
        assert_eq!(outcome, Outcome::Unchanged);
        assert_eq!(view.counters, before);
    }

    #[test]
    fn test_unknown_prior_requests_refetch() {
        let mut view = seeded();
        let before = view.counters;
        let outcome = view.apply(&event(
            Entity::Table,
            Action::Update,
            json!({"id": 99, "status": "dirty"}),
        ));
        assert_eq!(outcome, Outcome::Refetch(Entity::Table));
        assert_eq!(view.counters, before);
        assert!(!view.tables.contains_key(&99));
    }

    #[test]
    fn test_unparsable_status_requests_refetch() {
        let mut view = seeded();
        let outcome = view.apply(&event(
            Entity::Table,
            Action::Update,
            json!({"id": 1, "status": "reserved"}),
        ));
        assert_eq!(outcome, Outcome::Refetch(Entity::Table));
        assert_eq!(view.tables[&1].status, TableStatus::Available);
    }

    #[test]
    fn test_negative_counter_requests_refetch() {
        let mut view = ViewModel::default();
        view.tables.insert(7, table(7, TableStatus::Dirty));
        // counters never loaded: dirty is 0
        let outcome = view.apply(&event(
            Entity::Table,
            Action::Update,
            json!({"id": 7, "status": "available"}),
        ));
        assert_eq!(outcome, Outcome::Refetch(Entity::Table));
        assert_eq!(view.counters, TableCounters::default());
    }

    #[test]
    fn test_stats_snapshot_replaces_counters() {
        let mut view = seeded();
        let outcome = view.apply(&event(
            Entity::Table,
            Action::Update,
            json!({
                "id": 42,
                "status": "occupied",
                "stats": {"available_tables": 10, "occupied_tables": 5, "dirty_tables": 0, "today_revenue": 120.5}
            }),
        ));
        assert_eq!(outcome, Outcome::Changed);
        assert_eq!(
            view.counters,
            TableCounters {
                available: 10,
                occupied: 5,
                dirty: 0
            }
        );
        assert_eq!(view.revenue.today_revenue, 120.5);
        assert_eq!(view.tables[&42].status, TableStatus::Occupied);
    }

    #[test]
    fn test_stats_update_without_counters_refetches() {
        let mut view = seeded();
        let outcome = view.apply(&event(Entity::Stats, Action::Update, json!({"today_revenue": 5.0})));
        assert_eq!(outcome, Outcome::Refetch(Entity::Stats));
    }

    #[test]
    fn test_table_create_and_delete() {
        let mut view = seeded();
        view.apply(&event(
            Entity::Table,
            Action::Create,
            json!({"id": 6, "status": "available", "table_number": "T6"}),
        ));
        assert_eq!(view.counters.available, 4);

        view.apply(&event(Entity::Table, Action::Delete, json!({"id": 5})));
        assert_eq!(view.counters.dirty, 0);
        assert_eq!(view.counters.total(), view.tables.len() as u32);
    }

    #[test]
    fn test_order_lifecycle() {
        let mut view = ViewModel::default();
        view.load_orders(&[]);

        view.apply(&event(
            Entity::Order,
            Action::Create,
            json!({"id": 1, "table_id": 3, "status": "pending", "total_amount": 30.0}),
        ));
        assert_eq!(view.revenue.active_orders, 1);

        let outcome = view.apply(&event(
            Entity::Order,
            Action::StatusChange,
            json!({"id": 1, "status": "served"}),
        ));
        assert_eq!(outcome, Outcome::Changed);
        assert_eq!(view.orders[&1].status, OrderStatus::Served);
        assert_eq!(view.revenue.active_orders, 0);

        view.apply(&event(Entity::Order, Action::Delete, json!({"id": 1, "table_id": 3})));
        assert!(view.orders.is_empty());
    }

    #[test]
    fn test_order_status_change_unknown_refetches() {
        let mut view = ViewModel::default();
        let outcome = view.apply(&event(
            Entity::Order,
            Action::StatusChange,
            json!({"id": 8, "status": "ready"}),
        ));
        assert_eq!(outcome, Outcome::Refetch(Entity::Order));
    }

    #[test]
    fn test_full_table_row_with_wire_names_moves_one_unit() {
        let mut view = seeded();
        let outcome = view.apply(&event(
            Entity::Table,
            Action::Update,
            json!({"id": 3, "table_number": "T3", "capacity": 4, "status": "occupied", "location": "Terrace"}),
        ));
        assert_eq!(outcome, Outcome::Changed);
        assert_eq!(
            view.counters,
            TableCounters {
                available: 2,
                occupied: 2,
                dirty: 1
            }
        );
        assert_eq!(view.tables[&3].number.as_deref(), Some("T3"));
        assert_eq!(view.tables[&3].zone.as_deref(), Some("Terrace"));
    }

    #[test]
    fn test_order_row_with_wire_names_merges() {
        let mut view = ViewModel::default();
        view.load_orders(&[]);
        view.apply(&event(
            Entity::Order,
            Action::Create,
            json!({"id": 1, "table_id": 3, "status": "pending", "total_amount": 10.0}),
        ));

        let outcome = view.apply(&event(
            Entity::Order,
            Action::Update,
            json!({"id": 1, "table_id": 3, "status": "preparing", "total": 25.0}),
        ));
        assert_eq!(outcome, Outcome::Changed);
        assert_eq!(view.orders[&1].total_amount, 25.0);
        assert_eq!(view.orders[&1].status, OrderStatus::Preparing);
    }

    #[test]
    fn test_menu_and_payment_aliases_merge() {
        let mut view = ViewModel::default();
        view.load_menu(&[MenuItem {
            id: 2,
            name: "Tea".into(),
            category: None,
            price: 3.0,
            is_available: true,
        }]);
        let outcome = view.apply(&event(Entity::Menu, Action::Update, json!({"id": 2, "available": false})));
        assert_eq!(outcome, Outcome::Changed);
        assert!(!view.menu[&2].is_available);

        view.apply(&event(Entity::Payment, Action::Create, json!({"id": 5, "amount": 12.0})));
        let outcome = view.apply(&event(
            Entity::Payment,
            Action::Update,
            json!({"id": 5, "payment_method": "card"}),
        ));
        assert_eq!(outcome, Outcome::Changed);
        assert_eq!(view.payments[&5].method.as_deref(), Some("card"));
    }

    #[test]
    fn test_partial_update_of_unknown_menu_item_refetches() {
        let mut view = ViewModel::default();
        let outcome = view.apply(&event(Entity::Menu, Action::Update, json!({"id": 2, "price": 3.0})));
        assert_eq!(outcome, Outcome::Refetch(Entity::Menu));

        let outcome = view.apply(&event(
            Entity::Menu,
            Action::Update,
            json!({"id": 2, "name": "Tea", "price": 3.0}),
        ));
        assert_eq!(outcome, Outcome::Changed);
        assert!(view.menu[&2].is_available);
    }
}
