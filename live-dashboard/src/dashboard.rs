//! Live dashboard coordinator
//!
//! Single consumer of the inbound frame channel:
//! 1. Routes each frame (and publishes it on the bus)
//! 2. Applies it to the projector, strictly in arrival order
//! 3. Resolves refetch requests through the [`DataSource`]
//! 4. Renders the active page at most once per debounce window
//!
//! Every (re)connect reloads all entity sets, since pushes sent while the
//! socket was down are lost. That includes the gap between `bootstrap` and
//! the first connect; the bus is subscribed at construction so that connect
//! is seen even if it happens before `run` starts.

use async_trait::async_trait;
use live_client::{AppEvent, ClientResult, EventBus, HttpClient};
use shared::Entity;
use shared::Severity;
use shared::models::{DashboardStats, DiningTable, MenuItem, Order, Payment};
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, watch};
use tokio_util::sync::CancellationToken;

use crate::error::DashboardResult;
use crate::projector::{Debouncer, Page, StateProjector};
use crate::render::{Section, render_page};
use crate::router::{EventRouter, Routed};

/// Where full entity sets are loaded from
#[async_trait]
pub trait DataSource: Send + Sync {
    async fn tables(&self) -> ClientResult<Vec<DiningTable>>;
    async fn orders(&self) -> ClientResult<Vec<Order>>;
    async fn menu(&self) -> ClientResult<Vec<MenuItem>>;
    async fn payments(&self) -> ClientResult<Vec<Payment>>;
    async fn stats(&self) -> ClientResult<DashboardStats>;
}

#[async_trait]
impl DataSource for HttpClient {
    async fn tables(&self) -> ClientResult<Vec<DiningTable>> {
        self.fetch_tables().await
    }

    async fn orders(&self) -> ClientResult<Vec<Order>> {
        self.fetch_orders().await
    }

    async fn menu(&self) -> ClientResult<Vec<MenuItem>> {
        self.fetch_menu().await
    }

    async fn payments(&self) -> ClientResult<Vec<Payment>> {
        self.fetch_payments().await
    }

    async fn stats(&self) -> ClientResult<DashboardStats> {
        self.fetch_stats().await
    }
}

/// One render of the active page
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedPage {
    pub page: Page,
    /// Increments on every render
    pub generation: u64,
    pub sections: Vec<(Section, String)>,
}

impl RenderedPage {
    pub fn section(&self, section: Section) -> Option<&str> {
        self.sections
            .iter()
            .find(|(s, _)| *s == section)
            .map(|(_, html)| html.as_str())
    }
}

pub struct LiveDashboard {
    router: EventRouter,
    projector: StateProjector,
    debouncer: Debouncer,
    source: Box<dyn DataSource>,
    bus: EventBus,
    bus_rx: broadcast::Receiver<AppEvent>,
    generation: u64,
    output: watch::Sender<Option<RenderedPage>>,
    nav_tx: mpsc::UnboundedSender<Page>,
    nav_rx: mpsc::UnboundedReceiver<Page>,
}

impl std::fmt::Debug for LiveDashboard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveDashboard")
            .field("page", &self.projector.active_page())
            .field("generation", &self.generation)
            .field("pending", &self.debouncer.is_pending())
            .finish_non_exhaustive()
    }
}

impl LiveDashboard {
    pub fn new(
        source: impl DataSource + 'static,
        bus: EventBus,
        page: Page,
        debounce: Duration,
    ) -> Self {
        let (output, _) = watch::channel(None);
        let (nav_tx, nav_rx) = mpsc::unbounded_channel();
        Self {
            router: EventRouter::new(),
            projector: StateProjector::new(page),
            debouncer: Debouncer::new(debounce),
            source: Box::new(source),
            bus_rx: bus.subscribe(),
            bus,
            generation: 0,
            output,
            nav_tx,
            nav_rx,
        }
    }

    /// Latest render of the active page
    pub fn subscribe(&self) -> watch::Receiver<Option<RenderedPage>> {
        self.output.subscribe()
    }

    /// Handle for switching pages while [`LiveDashboard::run`] is active
    pub fn navigator(&self) -> mpsc::UnboundedSender<Page> {
        self.nav_tx.clone()
    }

    pub fn projector(&self) -> &StateProjector {
        &self.projector
    }

    /// Number of renders so far
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn active_page(&self) -> Page {
        self.projector.active_page()
    }

    /// Initial load of every entity set any page shows, then render
    pub async fn bootstrap(&mut self) -> DashboardResult<()> {
        for entity in all_interests() {
            self.fetch(entity).await?;
        }
        self.render();
        Ok(())
    }

    /// Switch page and render it from already absorbed state
    pub fn navigate(&mut self, page: Page) {
        self.projector.set_active(page);
        self.debouncer.cancel();
        tracing::info!(%page, "Navigated");
        self.render();
    }

    /// Route and apply one frame. Returns `true` when a render is due.
    pub async fn handle_frame(&mut self, text: &str) -> bool {
        let Some(Routed::Entity(event)) = self.router.dispatch(text, &self.bus) else {
            return false;
        };

        let projection = self.projector.apply(&event);
        let mut dirty = projection.dirty;
        for entity in projection.refetch {
            dirty |= self.refetch(entity).await;
        }
        dirty
    }

    /// Reload one entity set; failures surface as a warning toast
    async fn refetch(&mut self, entity: Entity) -> bool {
        match self.fetch(entity).await {
            Ok(dirty) => dirty,
            Err(e) => {
                tracing::warn!(%entity, error = %e, "Refetch failed");
                self.bus.publish(AppEvent::toast(
                    format!("Could not refresh {entity} data"),
                    Severity::Warning,
                ));
                false
            }
        }
    }

    async fn fetch(&mut self, entity: Entity) -> DashboardResult<bool> {
        tracing::debug!(%entity, "Loading entity set");
        let dirty = match entity {
            Entity::Table => {
                let tables = self.source.tables().await?;
                self.projector.load_tables(&tables)
            }
            Entity::Order => {
                let orders = self.source.orders().await?;
                self.projector.load_orders(&orders)
            }
            Entity::Menu => {
                let items = self.source.menu().await?;
                self.projector.load_menu(&items)
            }
            Entity::Payment => {
                let payments = self.source.payments().await?;
                self.projector.load_payments(&payments)
            }
            Entity::Stats => {
                let stats = self.source.stats().await?;
                self.projector.load_stats(&stats)
            }
        };
        Ok(dirty)
    }

    async fn resync(&mut self) -> bool {
        let mut dirty = false;
        for entity in all_interests() {
            dirty |= self.refetch(entity).await;
        }
        dirty
    }

    fn render(&mut self) {
        let page = self.projector.active_page();
        let Some(view) = self.projector.active_view() else {
            return;
        };
        self.generation += 1;
        let rendered = RenderedPage {
            page,
            generation: self.generation,
            sections: render_page(page, view),
        };
        tracing::debug!(%page, generation = self.generation, "Page rendered");
        self.output.send_replace(Some(rendered));
    }

    /// Process frames until `shutdown` fires or the inbound channel closes
    pub async fn run(
        &mut self,
        mut inbound: mpsc::UnboundedReceiver<String>,
        shutdown: CancellationToken,
    ) {
        tracing::info!(page = %self.active_page(), "Live dashboard running");

        loop {
            tokio::select! {
                biased;

                _ = shutdown.cancelled() => {
                    self.debouncer.cancel();
                    break;
                }

                _ = self.debouncer.expired(), if self.debouncer.is_pending() => {
                    self.debouncer.fire();
                    self.render();
                }

                Some(page) = self.nav_rx.recv() => self.navigate(page),

                frame = inbound.recv() => {
                    let Some(text) = frame else {
                        tracing::info!("Inbound channel closed");
                        break;
                    };
                    if self.handle_frame(&text).await {
                        self.debouncer.arm();
                    }
                }

                result = self.bus_rx.recv() => match result {
                    Ok(AppEvent::WebsocketConnected) => {
                        tracing::info!("Connected, reloading all data");
                        if self.resync().await {
                            self.debouncer.arm();
                        }
                    }
                    Ok(_) => {}
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::debug!(skipped = n, "Dashboard bus receiver lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => {}
                },
            }
        }

        tracing::info!("Live dashboard stopped");
    }
}

/// Every entity kind shown on some page, in a stable order
fn all_interests() -> Vec<Entity> {
    let mut entities: Vec<Entity> = Page::ALL
        .iter()
        .flat_map(|p| p.interests().iter().copied())
        .collect();
    entities.sort();
    entities.dedup();
    entities
}
