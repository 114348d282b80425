//! Data models
//!
//! Shapes returned by the backend REST API and carried in push payloads.
//! All IDs are `i64`. Optional fields use `#[serde(default)]` so partial
//! records from push events still decode.

pub mod dining_table;
pub mod menu_item;
pub mod order;
pub mod payment;
pub mod stats;

// Re-exports
pub use dining_table::*;
pub use menu_item::*;
pub use order::*;
pub use payment::*;
pub use stats::*;
