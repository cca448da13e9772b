//! Docfactory HTTP API Server

use docfactory_server::{AppState, config::ServerConfig, create_router, error::Result};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("docfactory_server=debug,docfactory_registry=debug,tower_http=debug")
        }))
        .init();

    let config = ServerConfig::from_env()?;
    info!(
        "Starting Docfactory Server on {}:{}",
        config.host, config.port
    );

    let listener = tokio::net::TcpListener::bind((config.host.as_str(), config.port)).await?;
    let addr = listener.local_addr()?;

    let app = create_router(AppState::new(config));

    info!("Server listening on http://{}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}
