//! Markup renderer
//!
//! Pure functions of a [`ViewModel`]; every call regenerates the whole
//! section. Missing data renders as zeros or a placeholder row.

use serde::Serialize;
use shared::Entity;
use shared::models::TableStatus;
use std::fmt::Write;

use crate::projector::{Page, ViewModel};

/// Independently rendered fragment of a page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Section {
    StatsCards,
    TableGrid,
    OrderList,
    MenuList,
    PaymentList,
}

impl Section {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StatsCards => "stats-cards",
            Self::TableGrid => "table-grid",
            Self::OrderList => "order-list",
            Self::MenuList => "menu-list",
            Self::PaymentList => "payment-list",
        }
    }
}

/// Sections shown on a page, top to bottom
pub fn sections(page: Page) -> &'static [Section] {
    match page {
        Page::Dashboard => &[
            Section::StatsCards,
            Section::TableGrid,
            Section::OrderList,
            Section::PaymentList,
        ],
        Page::Orders => &[Section::OrderList],
        Page::Tables => &[Section::StatsCards, Section::TableGrid],
        Page::Menu => &[Section::MenuList],
        Page::Payments => &[Section::PaymentList],
    }
}

/// Escape text for element content and attribute values
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

fn money(amount: f64) -> String {
    format!("{amount:.2}")
}

fn placeholder(out: &mut String, view: &ViewModel, entity: Entity, empty: &str) {
    let text = if view.is_loaded(entity) { empty } else { "Loading..." };
    let _ = write!(out, r#"<li class="placeholder">{text}</li>"#);
}

pub fn render_section(section: Section, view: &ViewModel) -> String {
    let mut out = String::new();
    let _ = write!(out, r#"<section id="{}">"#, section.as_str());
    match section {
        Section::StatsCards => stats_cards(&mut out, view),
        Section::TableGrid => table_grid(&mut out, view),
        Section::OrderList => order_list(&mut out, view),
        Section::MenuList => menu_list(&mut out, view),
        Section::PaymentList => payment_list(&mut out, view),
    }
    out.push_str("</section>");
    out
}

/// All sections of `page`, in display order
pub fn render_page(page: Page, view: &ViewModel) -> Vec<(Section, String)> {
    sections(page)
        .iter()
        .map(|s| (*s, render_section(*s, view)))
        .collect()
}

fn stats_cards(out: &mut String, view: &ViewModel) {
    let cards = [
        ("available-tables", "Available", view.counters.available.to_string()),
        ("occupied-tables", "Occupied", view.counters.occupied.to_string()),
        ("dirty-tables", "Needs cleaning", view.counters.dirty.to_string()),
        ("active-orders", "Active orders", view.revenue.active_orders.to_string()),
        ("today-orders", "Orders today", view.revenue.today_orders.to_string()),
        ("today-revenue", "Revenue today", money(view.revenue.today_revenue)),
    ];
    for (id, label, value) in cards {
        let _ = write!(
            out,
            r#"<div class="stat-card" id="{id}"><span class="label">{label}</span><span class="value">{value}</span></div>"#
        );
    }
}

fn table_grid(out: &mut String, view: &ViewModel) {
    out.push_str(r#"<ul class="tables">"#);
    if view.tables.is_empty() {
        placeholder(out, view, Entity::Table, "No tables");
    }
    for table in view.tables.values() {
        let status = table.status.as_str();
        let _ = write!(
            out,
            r#"<li class="table table-{status}" data-id="{}"><span class="number">{}</span>"#,
            table.id,
            escape(&table.label()),
        );
        if let Some(capacity) = table.capacity {
            let _ = write!(out, r#"<span class="capacity">{capacity}</span>"#);
        }
        if let Some(zone) = &table.zone {
            let _ = write!(out, r#"<span class="zone">{}</span>"#, escape(zone));
        }
        let _ = write!(out, r#"<span class="status">{status}</span></li>"#);
    }
    out.push_str("</ul>");

    let _ = write!(
        out,
        r#"<p class="legend">{} available, {} occupied, {} dirty</p>"#,
        view.counters.get(TableStatus::Available),
        view.counters.get(TableStatus::Occupied),
        view.counters.get(TableStatus::Dirty),
    );
}

fn order_list(out: &mut String, view: &ViewModel) {
    out.push_str(r#"<ul class="orders">"#);
    if view.orders.is_empty() {
        placeholder(out, view, Entity::Order, "No orders");
    }
    // newest first
    for order in view.orders.values().rev() {
        let customer = order.customer_name.as_deref().unwrap_or("Guest");
        let table = order
            .table_id
            .map(|t| format!("Table {t}"))
            .unwrap_or_else(|| "Takeaway".to_string());
        let _ = write!(
            out,
            r#"<li class="order order-{status}" data-id="{id}"><span class="id">#{id}</span><span class="table">{table}</span><span class="customer">{customer}</span><span class="items">{items}</span><span class="total">{total}</span><span class="status">{status}</span></li>"#,
            id = order.id,
            status = order.status.as_str(),
            table = escape(&table),
            customer = escape(customer),
            items = order.items.iter().map(|i| i.quantity.max(0) as u32).sum::<u32>(),
            total = money(order.total_amount),
        );
    }
    out.push_str("</ul>");
}

fn menu_list(out: &mut String, view: &ViewModel) {
    out.push_str(r#"<ul class="menu">"#);
    if view.menu.is_empty() {
        placeholder(out, view, Entity::Menu, "No menu items");
    }
    for item in view.menu.values() {
        let availability = if item.is_available { "available" } else { "unavailable" };
        let _ = write!(
            out,
            r#"<li class="menu-item {availability}" data-id="{}"><span class="name">{}</span><span class="category">{}</span><span class="price">{}</span></li>"#,
            item.id,
            escape(&item.name),
            escape(item.category.as_deref().unwrap_or("-")),
            money(item.price),
        );
    }
    out.push_str("</ul>");
}

fn payment_list(out: &mut String, view: &ViewModel) {
    out.push_str(r#"<ul class="payments">"#);
    if view.payments.is_empty() {
        placeholder(out, view, Entity::Payment, "No payments");
    }
    for payment in view.payments.values().rev() {
        let status = serde_json::to_value(payment.status)
            .ok()
            .and_then(|v| v.as_str().map(String::from))
            .unwrap_or_default();
        let order = payment
            .order_id
            .map(|id| format!("#{id}"))
            .unwrap_or_else(|| "-".to_string());
        let _ = write!(
            out,
            r#"<li class="payment payment-{status}" data-id="{}"><span class="order">{order}</span><span class="method">{}</span><span class="amount">{}</span><span class="status">{status}</span></li>"#,
            payment.id,
            escape(payment.method.as_deref().unwrap_or("-")),
            money(payment.amount),
        );
    }
    out.push_str("</ul>");
}
