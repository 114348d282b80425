//! State projector
//!
//! Owns one [`ViewModel`] per page. Every page interested in an entity
//! absorbs its events, visible or not; only the active page is marked for
//! re-render. Ambiguous deltas become refetch requests instead of guesses.

pub mod debounce;
pub mod view;

pub use debounce::{DEFAULT_DEBOUNCE, Debouncer};
pub use view::{Outcome, RevenueTotals, TableCounters, ViewModel};

use serde::{Deserialize, Serialize};
use shared::models::{DashboardStats, DiningTable, MenuItem, Order, Payment};
use shared::{CanonicalEvent, Entity};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Dashboard pages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Page {
    #[default]
    Dashboard,
    Orders,
    Tables,
    Menu,
    Payments,
}

impl Page {
    pub const ALL: [Page; 5] = [
        Self::Dashboard,
        Self::Orders,
        Self::Tables,
        Self::Menu,
        Self::Payments,
    ];

    /// Entity kinds this page keeps state for
    pub fn interests(&self) -> &'static [Entity] {
        match self {
            Self::Dashboard => &[Entity::Table, Entity::Order, Entity::Payment, Entity::Stats],
            Self::Orders => &[Entity::Order],
            Self::Tables => &[Entity::Table],
            Self::Menu => &[Entity::Menu],
            Self::Payments => &[Entity::Payment],
        }
    }

    pub fn is_interested(&self, entity: Entity) -> bool {
        self.interests().contains(&entity)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dashboard => "dashboard",
            Self::Orders => "orders",
            Self::Tables => "tables",
            Self::Menu => "menu",
            Self::Payments => "payments",
        }
    }
}

impl fmt::Display for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Page {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown page: {s}"))
    }
}

/// What applying one event requires from the caller
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Projection {
    /// Entity sets to reload, deduplicated, in request order
    pub refetch: Vec<Entity>,
    /// Active page changed and needs a render
    pub dirty: bool,
}

impl Projection {
    fn request(&mut self, entity: Entity) {
        if !self.refetch.contains(&entity) {
            self.refetch.push(entity);
        }
    }

    pub fn needs_refetch(&self) -> bool {
        !self.refetch.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct StateProjector {
    active: Page,
    views: BTreeMap<Page, ViewModel>,
}

impl Default for StateProjector {
    fn default() -> Self {
        Self::new(Page::default())
    }
}

impl StateProjector {
    pub fn new(active: Page) -> Self {
        Self {
            active,
            views: Page::ALL.into_iter().map(|p| (p, ViewModel::default())).collect(),
        }
    }

    pub fn active_page(&self) -> Page {
        self.active
    }

    /// Switch the active page; `true` if it changed
    pub fn set_active(&mut self, page: Page) -> bool {
        let changed = self.active != page;
        self.active = page;
        changed
    }

    pub fn view(&self, page: Page) -> Option<&ViewModel> {
        self.views.get(&page)
    }

    pub fn active_view(&self) -> Option<&ViewModel> {
        self.view(self.active)
    }

    /// Absorb an event into every interested page
    pub fn apply(&mut self, event: &CanonicalEvent) -> Projection {
        let mut projection = Projection::default();
        for (page, view) in self.views.iter_mut() {
            if !page.is_interested(event.entity) {
                continue;
            }
            match view.apply(event) {
                Outcome::Unchanged => {}
                Outcome::Changed => projection.dirty |= *page == self.active,
                Outcome::Refetch(entity) => projection.request(entity),
            }
        }
        if projection.needs_refetch() {
            tracing::debug!(entity = %event.entity, action = %event.action, refetch = ?projection.refetch, "Delta not applicable, refetch requested");
        }
        projection
    }

    /// Run `load` on every page interested in `entity`; `true` if the active page was among them
    fn load(&mut self, entity: Entity, mut load: impl FnMut(&mut ViewModel)) -> bool {
        for (page, view) in self.views.iter_mut() {
            if page.is_interested(entity) {
                load(view);
            }
        }
        self.active.is_interested(entity)
    }

    pub fn load_tables(&mut self, tables: &[DiningTable]) -> bool {
        self.load(Entity::Table, |v| v.load_tables(tables))
    }

    pub fn load_orders(&mut self, orders: &[Order]) -> bool {
        self.load(Entity::Order, |v| v.load_orders(orders))
    }

    pub fn load_menu(&mut self, items: &[MenuItem]) -> bool {
        self.load(Entity::Menu, |v| v.load_menu(items))
    }

    pub fn load_payments(&mut self, payments: &[Payment]) -> bool {
        self.load(Entity::Payment, |v| v.load_payments(payments))
    }

    pub fn load_stats(&mut self, stats: &DashboardStats) -> bool {
        self.load(Entity::Stats, |v| v.load_stats(stats))
    }
}
