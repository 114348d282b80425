//! Application context
//!
//! One object carrying everything a page component needs; passed by
//! reference instead of reaching for process globals.

use live_client::{
    Connector, EventBus, FileSession, HttpClient, LiveClient, MemorySession, SessionStore,
    WsConnector,
};
use std::sync::Arc;

use crate::config::AppConfig;
use crate::error::DashboardResult;
use crate::toast::ToastLayer;

#[derive(Debug, Clone)]
pub struct AppContext {
    pub config: AppConfig,
    pub bus: EventBus,
    pub session: Arc<dyn SessionStore>,
    pub live: LiveClient,
    pub http: HttpClient,
    pub toasts: ToastLayer,
}

impl AppContext {
    /// Wire the context with an explicit session and socket connector
    pub fn new(
        config: AppConfig,
        session: Arc<dyn SessionStore>,
        connector: Arc<dyn Connector>,
    ) -> DashboardResult<Self> {
        let client_config = config.client_config();
        let bus = EventBus::default();
        let http = HttpClient::new(&client_config, Arc::clone(&session))?;
        let live = LiveClient::new(client_config, Arc::clone(&session), bus.clone(), connector);
        let toasts = ToastLayer::new(config.toast_duration());

        Ok(Self {
            config,
            bus,
            session,
            live,
            http,
            toasts,
        })
    }

    /// Production wiring: file or memory session, real WebSocket connector
    pub fn from_config(config: AppConfig) -> DashboardResult<Self> {
        let session: Arc<dyn SessionStore> = match &config.session_file {
            Some(path) => Arc::new(FileSession::open(path)?),
            None => Arc::new(MemorySession::new()),
        };
        Self::new(config, session, Arc::new(WsConnector))
    }

    /// Log in over REST; the token lands in the shared session
    pub async fn login(&self, username: &str, password: &str) -> DashboardResult<()> {
        self.http.login(username, password).await?;
        Ok(())
    }

    /// Stop the live connection and forget the session
    pub fn logout(&self) -> DashboardResult<()> {
        self.live.disconnect();
        self.http.logout()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use live_client::MemoryConnector;

    #[test]
    fn test_context_shares_session_token() {
        let session: Arc<dyn SessionStore> = Arc::new(MemorySession::with_token("abc"));
        let ctx = AppContext::new(
            AppConfig::default(),
            session,
            Arc::new(MemoryConnector::new()),
        )
        .unwrap();
        assert_eq!(ctx.http.token().as_deref(), Some("abc"));
        assert!(!ctx.live.is_connected());
    }

    #[test]
    fn test_logout_reaches_cloned_clients() {
        let session: Arc<dyn SessionStore> = Arc::new(MemorySession::with_token("abc"));
        let ctx = AppContext::new(
            AppConfig::default(),
            Arc::clone(&session),
            Arc::new(MemoryConnector::new()),
        )
        .unwrap();
        let page_http = ctx.http.clone();

        ctx.logout().unwrap();
        assert!(session.token().is_none());
        assert!(ctx.http.token().is_none());
        assert!(page_http.token().is_none());
    }
}
