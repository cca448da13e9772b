//! Docfactory HTTP API
//!
//! REST endpoints over the template registry: template CRUD with soft
//! delete, duplication, version history, and bulk operations. Every route
//! under `/templates` is scoped to the tenant named by `X-Tenant-ID`.

use axum::{Json, Router, extract::DefaultBodyLimit, routing::get};
use docfactory_registry::{MemoryBackend, TemplateRepository, TemplateService};
use time::OffsetDateTime;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

pub mod config;
pub mod error;
pub mod extract;
pub mod models;
pub mod routes;

use config::ServerConfig;
use models::HealthResponse;

/// Main application state
#[derive(Clone)]
pub struct AppState {
    pub service: TemplateService<MemoryBackend>,
    pub config: ServerConfig,
}

impl AppState {
    /// State backed by a fresh in-memory registry
    pub fn new(config: ServerConfig) -> Self {
        Self::with_service(
            TemplateService::new(TemplateRepository::new(MemoryBackend::new())),
            config,
        )
    }

    pub fn with_service(service: TemplateService<MemoryBackend>, config: ServerConfig) -> Self {
        Self { service, config }
    }
}

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    let cors = state.config.cors_layer();
    let body_limit = state.config.max_body_bytes;

    Router::new()
        // Health check
        .route("/health", get(health_check))
        .nest("/templates", routes::router())
        // Middleware
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors)
                .layer(DefaultBodyLimit::max(body_limit)),
        )
        .with_state(state)
}

/// Health check endpoint
async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: "docfactory-server",
        version: env!("CARGO_PKG_VERSION"),
        timestamp: OffsetDateTime::now_utc(),
    })
}
