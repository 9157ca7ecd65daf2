use anyhow::{Context, Result};
use frontdesk::{create_router, AppState, Config};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cfg = Config::load("config/frontdesk")?;
    let api_key = std::env::var("OPENAI_API_KEY").ok();
    if api_key.is_none() {
        tracing::warn!("OPENAI_API_KEY not set; negotiation endpoints will refuse requests");
    }

    info!("Frontdesk v0.1.0");
    info!("Loaded config: {}", cfg.service.name);
    info!("Realtime model: {}", cfg.realtime.model);

    let addr = format!("{}:{}", cfg.service.http.bind, cfg.service.http.port);
    let state = AppState::new(cfg, api_key);
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("HTTP server listening on {}", addr);

    axum::serve(listener, router)
        .await
        .context("HTTP server exited")?;

    Ok(())
}
