use std::{net::SocketAddr, sync::Arc};
use tracing_subscriber::{fmt, EnvFilter};

use viral_batch::{
    config::AppConfig,
    gemini::GeminiClient,
    orchestrator::BatchOrchestrator,
    routes::{router, AppState},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    // Init tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();

    let config = AppConfig::from_env()?;
    if config.demo_mode() {
        tracing::warn!("GEMINI_API_KEY not set - running in demo mode with canned content");
    } else {
        tracing::info!("Using API key: {}", config.redacted_key());
    }

    let gemini = Arc::new(GeminiClient::new(&config));
    let state = AppState::new(BatchOrchestrator::new(gemini.clone(), gemini));
    let app = router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!(%addr, "Starting server");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async { tokio::signal::ctrl_c().await.ok(); })
        .await?;
    Ok(())
}
