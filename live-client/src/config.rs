//! Client configuration

use std::fmt;
use std::str::FromStr;

use reqwest::Url;

use crate::error::TransportError;
use crate::message::TransportConfig;

/// Staff role; selects the WebSocket endpoint (`/ws/{role}`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    #[default]
    Staff,
    Kitchen,
    Cashier,
    Customer,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Staff => "staff",
            Self::Kitchen => "kitchen",
            Self::Cashier => "cashier",
            Self::Customer => "customer",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" | "manager" => Ok(Self::Admin),
            "staff" | "waiter" => Ok(Self::Staff),
            "kitchen" | "chef" => Ok(Self::Kitchen),
            "cashier" => Ok(Self::Cashier),
            "customer" => Ok(Self::Customer),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

/// Client configuration for connecting to the POS backend
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// REST base URL (e.g., "http://localhost:8000")
    pub base_url: String,

    /// WebSocket base URL; derived from `base_url` when unset
    pub ws_url: Option<String>,

    /// Role override; falls back to the session's `user_role`
    pub role: Option<Role>,

    /// Request timeout in seconds
    pub timeout: u64,

    /// Reconnect / heartbeat settings
    pub transport: TransportConfig,
}

impl ClientConfig {
    /// Create a new client configuration
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ws_url: None,
            role: None,
            timeout: 30,
            transport: TransportConfig::default(),
        }
    }

    /// Set the WebSocket base URL
    pub fn with_ws_url(mut self, url: impl Into<String>) -> Self {
        self.ws_url = Some(url.into());
        self
    }

    /// Pin the role instead of reading it from the session
    pub fn with_role(mut self, role: Role) -> Self {
        self.role = Some(role);
        self
    }

    /// Set the request timeout
    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout = seconds;
        self
    }

    /// Set transport settings
    pub fn with_transport(mut self, transport: TransportConfig) -> Self {
        self.transport = transport;
        self
    }

    /// WebSocket base URL (`http` -> `ws`, `https` -> `wss` when derived)
    pub fn ws_base(&self) -> String {
        if let Some(url) = &self.ws_url {
            return url.clone();
        }
        let base = self.base_url.trim_end_matches('/');
        if let Some(rest) = base.strip_prefix("https://") {
            format!("wss://{rest}")
        } else if let Some(rest) = base.strip_prefix("http://") {
            format!("ws://{rest}")
        } else {
            base.to_string()
        }
    }

    /// Full endpoint: `{ws_base}/ws/{role}?token={token}`
    pub fn ws_endpoint(&self, role: Role, token: &str) -> Result<String, TransportError> {
        let mut url = Url::parse(&self.ws_base())
            .map_err(|e| TransportError::Connection(format!("Invalid WebSocket URL: {e}")))?;
        url.path_segments_mut()
            .map_err(|_| TransportError::Connection("WebSocket URL cannot be a base".into()))?
            .pop_if_empty()
            .push("ws")
            .push(role.as_str());
        url.query_pairs_mut().append_pair("token", token);
        Ok(url.to_string())
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new("http://localhost:8000")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ws_base_derived_from_http() {
        assert_eq!(
            ClientConfig::new("https://pos.example.com/").ws_base(),
            "wss://pos.example.com"
        );
        assert_eq!(
            ClientConfig::new("http://127.0.0.1:8000").ws_base(),
            "ws://127.0.0.1:8000"
        );
    }

    #[test]
    fn test_ws_endpoint_includes_role_and_token() {
        let config = ClientConfig::new("http://localhost:8000");
        let url = config.ws_endpoint(Role::Admin, "abc.def").unwrap();
        assert_eq!(url, "ws://localhost:8000/ws/admin?token=abc.def");
    }

    #[test]
    fn test_explicit_ws_url_wins() {
        let config =
            ClientConfig::new("http://localhost:8000").with_ws_url("ws://push.local:9001/");
        let url = config.ws_endpoint(Role::Kitchen, "t").unwrap();
        assert_eq!(url, "ws://push.local:9001/ws/kitchen?token=t");
    }

    #[test]
    fn test_role_parse() {
        assert_eq!("Manager".parse::<Role>(), Ok(Role::Admin));
        assert!("robot".parse::<Role>().is_err());
    }
}
