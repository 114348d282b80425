//! Shared types for the live POS dashboard
//!
//! Wire envelope, canonical events and domain models used by both
//! `live-client` and `live-dashboard`.

pub mod client;
pub mod event;
pub mod message;
pub mod models;

// Re-exports
pub use serde::{Deserialize, Serialize};

pub use event::{Action, CanonicalEvent, Entity, Notification, Severity};
pub use message::{ClientMessage, ServerMessage};
