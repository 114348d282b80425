// live-client/src/message/mod.rs
// Live push channel - transport settings and connection loop

pub mod client;
pub mod connection;
pub mod transport;

pub use client::LiveClient;
pub use connection::{Connection, ConnectionState};
pub use shared::message::{ClientMessage, ServerMessage};
pub use transport::{Connector, Frame, Link, MemoryConnector, MemoryPeer, WsConnector};

use std::time::Duration;

/// Transport settings for the live push connection
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Whether unexpected closes schedule a reconnect
    pub auto_reconnect: bool,
    /// Base reconnect interval (first retry waits exactly this long)
    pub reconnect_interval: Duration,
    /// Exponential backoff factor applied per attempt
    pub backoff_factor: f64,
    /// Upper bound for a single backoff delay
    pub max_reconnect_delay: Duration,
    /// Scheduled reconnects before giving up
    pub max_reconnect_attempts: u32,
    /// Ping interval while connected (zero disables the heartbeat)
    pub heartbeat_interval: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            auto_reconnect: true,
            reconnect_interval: Duration::from_millis(3000),
            backoff_factor: 1.5,
            max_reconnect_delay: Duration::from_secs(60),
            max_reconnect_attempts: 5,
            heartbeat_interval: Duration::from_secs(30),
        }
    }
}

impl TransportConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set auto reconnect
    pub fn with_auto_reconnect(mut self, enabled: bool) -> Self {
        self.auto_reconnect = enabled;
        self
    }

    /// Set the base reconnect interval
    pub fn with_reconnect_interval(mut self, interval: Duration) -> Self {
        self.reconnect_interval = interval;
        self
    }

    /// Set the backoff factor
    pub fn with_backoff_factor(mut self, factor: f64) -> Self {
        self.backoff_factor = factor.max(1.0);
        self
    }

    /// Set max reconnect attempts
    pub fn with_max_reconnect_attempts(mut self, attempts: u32) -> Self {
        self.max_reconnect_attempts = attempts;
        self
    }

    /// Set heartbeat interval (zero disables)
    pub fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }
}
