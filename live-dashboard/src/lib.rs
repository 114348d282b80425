//! Live Dashboard - push-synchronized POS dashboard
//!
//! Frames from the live client flow through the [`router`], into the
//! [`projector`], and out through the [`render`] functions. Notifications
//! surface in the [`toast`] layer.

pub mod config;
pub mod context;
pub mod dashboard;
pub mod error;
pub mod logger;
pub mod projector;
pub mod render;
pub mod router;
pub mod toast;

pub use config::AppConfig;
pub use context::AppContext;
pub use dashboard::{DataSource, LiveDashboard, RenderedPage};
pub use error::{DashboardError, DashboardResult};
pub use projector::{Debouncer, Page, Projection, StateProjector, ViewModel};
pub use render::{Section, render_page, render_section};
pub use router::{EventRouter, RouteError, RouteTag, Routed};
pub use toast::{Toast, ToastId, ToastLayer};
