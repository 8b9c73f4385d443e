use std::sync::Arc;

use mimalloc::MiMalloc;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use landwatch::api::CompletionsClient;
use landwatch::backend::SupabaseBackend;
use landwatch::config::Config;
use landwatch::router::{AppState, cookie_key, landwatch_router};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for shutdown signal");
    }
    info!("shutting down");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let cfg = &landwatch::config::CONFIG;

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cfg.basic.loglevel.clone()));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_level(true)
                .with_target(false),
        )
        .init();

    info!(
        listen_addr = %cfg.basic.listen_addr,
        environment = ?cfg.basic.environment,
        backend = %cfg.backend.url.as_ref().map(|u| u.as_str()).unwrap_or("<none>"),
        admin = cfg.admin_configured(),
        ai_model = %cfg.ai.model,
        ai_enabled = cfg.ai.api_key.is_some(),
        proxy = %cfg.proxy.as_ref().map(|u| u.as_str()).unwrap_or("<none>"),
        loglevel = %cfg.basic.loglevel,
    );
    if !cfg.backend_configured() {
        warn!("hosted backend URL or anon key missing; data endpoints will fail");
    }

    let backend = SupabaseBackend::new(cfg)?;
    let ai = CompletionsClient::new(cfg)?;
    let state = AppState::new(
        Arc::new(Config::clone(cfg)),
        Arc::new(backend),
        Arc::new(ai),
        cookie_key(cfg),
    );
    let app = landwatch_router(state);

    let listener = TcpListener::bind(&cfg.basic.listen_addr).await?;
    info!("HTTP server listening on {}", cfg.basic.listen_addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}
