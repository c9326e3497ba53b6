use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;

use support_rag::core::config::Settings;
use support_rag::core::logging;
use support_rag::server;
use support_rag::state::error::InitializationError;
use support_rag::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = Settings::load().map_err(|e| InitializationError::Config(e.into()))?;
    logging::init(&settings.logging.dir, "server.log");
    tracing::info!("Effective settings: {}", settings.redacted());

    let bind_addr = settings.bind_addr();
    let state = AppState::initialize(settings).await?;

    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", bind_addr))?;
    let addr = listener.local_addr()?;
    tracing::info!("Listening on {}", addr);

    let app: Router = server::router::router(state);
    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
