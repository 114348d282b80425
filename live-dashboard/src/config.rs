//! Dashboard configuration
//!
//! JSON file with environment overrides. Env vars win over the file.

use live_client::{ClientConfig, Role, TransportConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{DashboardError, DashboardResult};
use crate::projector::Page;

fn default_api_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_debounce_ms() -> u64 {
    100
}

fn default_toast_ms() -> u64 {
    3000
}

fn default_reconnect_interval_ms() -> u64 {
    3000
}

fn default_max_reconnect_attempts() -> u32 {
    5
}

fn default_heartbeat_secs() -> u64 {
    30
}

fn default_request_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// REST base URL
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// WebSocket base URL (derived from `api_url` when unset)
    #[serde(default)]
    pub ws_url: Option<String>,
    /// Endpoint role override
    #[serde(default)]
    pub role: Option<Role>,
    /// Page shown at startup
    #[serde(default)]
    pub start_page: Page,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub log_json: bool,
    /// Directory for rolling log files (console only when unset)
    #[serde(default)]
    pub log_dir: Option<String>,
    /// Persisted session file (in-memory session when unset)
    #[serde(default)]
    pub session_file: Option<PathBuf>,
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    #[serde(default = "default_toast_ms")]
    pub toast_ms: u64,
    #[serde(default = "default_reconnect_interval_ms")]
    pub reconnect_interval_ms: u64,
    #[serde(default = "default_max_reconnect_attempts")]
    pub max_reconnect_attempts: u32,
    /// Zero disables the heartbeat
    #[serde(default = "default_heartbeat_secs")]
    pub heartbeat_secs: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            ws_url: None,
            role: None,
            start_page: Page::default(),
            log_level: default_log_level(),
            log_json: false,
            log_dir: None,
            session_file: None,
            debounce_ms: default_debounce_ms(),
            toast_ms: default_toast_ms(),
            reconnect_interval_ms: default_reconnect_interval_ms(),
            max_reconnect_attempts: default_max_reconnect_attempts(),
            heartbeat_secs: default_heartbeat_secs(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl AppConfig {
    /// Load from file; defaults when the file does not exist
    pub fn load(path: &Path) -> DashboardResult<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            serde_json::from_str(&content).map_err(|e| DashboardError::Config(e.to_string()))
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self, path: &Path) -> DashboardResult<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Apply `LIVE_*` variables from the process environment
    pub fn apply_env(&mut self) -> DashboardResult<()> {
        self.apply_vars(|name| std::env::var(name).ok())
    }

    /// Apply overrides from any variable source
    pub fn apply_vars(&mut self, lookup: impl Fn(&str) -> Option<String>) -> DashboardResult<()> {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(url) = var("LIVE_API_URL") {
            self.api_url = url;
        }
        if let Some(url) = var("LIVE_WS_URL") {
            self.ws_url = Some(url);
        }
        if let Some(role) = var("LIVE_ROLE") {
            self.role = Some(role.parse().map_err(DashboardError::Config)?);
        }
        if let Some(page) = var("LIVE_START_PAGE") {
            self.start_page = page.parse().map_err(DashboardError::Config)?;
        }
        if let Some(level) = var("LIVE_LOG_LEVEL") {
            self.log_level = level;
        }
        if let Some(json) = var("LIVE_LOG_JSON") {
            self.log_json = matches!(json.to_ascii_lowercase().as_str(), "1" | "true" | "yes");
        }
        if let Some(dir) = var("LIVE_LOG_DIR") {
            self.log_dir = Some(dir);
        }
        if let Some(file) = var("LIVE_SESSION_FILE") {
            self.session_file = Some(PathBuf::from(file));
        }
        Ok(())
    }

    pub fn transport(&self) -> TransportConfig {
        TransportConfig::new()
            .with_reconnect_interval(Duration::from_millis(self.reconnect_interval_ms))
            .with_max_reconnect_attempts(self.max_reconnect_attempts)
            .with_heartbeat_interval(Duration::from_secs(self.heartbeat_secs))
    }

    pub fn client_config(&self) -> ClientConfig {
        let mut config = ClientConfig::new(&self.api_url)
            .with_timeout(self.request_timeout_secs)
            .with_transport(self.transport());
        if let Some(ws) = &self.ws_url {
            config = config.with_ws_url(ws);
        }
        if let Some(role) = self.role {
            config = config.with_role(role);
        }
        config
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn toast_duration(&self) -> Duration {
        Duration::from_millis(self.toast_ms)
    }
}
