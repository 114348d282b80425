//! Live Client - REST and push connection to the POS backend
//!
//! - [`HttpClient`]: login, page loads, refetches, status mutations
//! - [`LiveClient`]: one WebSocket per role with heartbeat and backoff reconnect
//! - [`EventBus`]: typed broadcast of connection and entity events

pub mod bus;
pub mod config;
pub mod error;
pub mod http;
pub mod message;
pub mod session;

pub use bus::{AppEvent, EventBus};
pub use config::{ClientConfig, Role};
pub use error::{ClientError, ClientResult, TransportError};
pub use http::HttpClient;
pub use message::{
    ClientMessage, Connection, ConnectionState, Connector, Frame, Link, LiveClient,
    MemoryConnector, MemoryPeer, ServerMessage, TransportConfig, WsConnector,
};
pub use session::{FileSession, MemorySession, SessionStore};

// Re-export shared types for convenience
pub use shared::client::{LoginResponse, UserInfo};
