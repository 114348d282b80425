//! live-dashboard - headless runner
//!
//! Connects to the POS backend, keeps the dashboard view models in sync
//! with server pushes and logs every render and toast.
//!
//! Config file path comes from the first argument or `LIVE_CONFIG`
//! (default `dashboard.json`). `LIVE_USERNAME` / `LIVE_PASSWORD` log in
//! when the session has no token yet.

use live_client::SessionStore;
use live_dashboard::{AppConfig, AppContext, LiveDashboard, logger};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    let _ = dotenvy::dotenv();

    let config_path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("LIVE_CONFIG").ok())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("dashboard.json"));

    let mut config = AppConfig::load(&config_path)?;
    config.apply_env()?;

    logger::init_logger_with_file(&config.log_level, config.log_json, config.log_dir.as_deref())?;
    tracing::info!(config = %config_path.display(), api = %config.api_url, "Starting live dashboard");

    let ctx = AppContext::from_config(config)?;

    if ctx.session.token().is_none()
        && let (Ok(username), Ok(password)) =
            (std::env::var("LIVE_USERNAME"), std::env::var("LIVE_PASSWORD"))
    {
        ctx.login(&username, &password).await?;
    }

    let shutdown = CancellationToken::new();
    let toast_task = ctx.toasts.listen(&ctx.bus, shutdown.clone());

    let mut dashboard = LiveDashboard::new(
        ctx.http.clone(),
        ctx.bus.clone(),
        ctx.config.start_page,
        ctx.config.debounce(),
    );
    if let Err(e) = dashboard.bootstrap().await {
        tracing::warn!(error = %e, "Initial load failed, waiting for live updates");
    }

    let Some(inbound) = ctx.live.take_inbound() else {
        anyhow::bail!("inbound channel already taken");
    };
    if !ctx.live.connect() {
        tracing::warn!("Live connection not started; set a session token or LIVE_USERNAME/LIVE_PASSWORD");
    }

    let mut renders = dashboard.subscribe();
    let render_log = tokio::spawn(async move {
        while renders.changed().await.is_ok() {
            if let Some(page) = renders.borrow_and_update().as_ref() {
                tracing::info!(page = %page.page, generation = page.generation, sections = page.sections.len(), "Rendered");
            }
        }
    });

    let toasts = ctx.toasts.clone();
    let mut toast_changes = toasts.changes();
    let toast_log = tokio::spawn(async move {
        while toast_changes.changed().await.is_ok() {
            for toast in toasts.active() {
                tracing::info!(severity = %toast.severity, message = %toast.message, "Toast");
            }
        }
    });

    let run_shutdown = shutdown.clone();
    let runner = tokio::spawn(async move {
        dashboard.run(inbound, run_shutdown).await;
    });

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutting down");

    shutdown.cancel();
    ctx.live.disconnect();
    let _ = runner.await;
    let _ = toast_task.await;
    render_log.abort();
    toast_log.abort();

    Ok(())
}
