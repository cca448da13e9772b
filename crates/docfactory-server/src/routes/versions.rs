//! Version history routes

use crate::{
    AppState,
    error::{ApiError, Result},
    extract::RequestContext,
    models::CompareQuery,
};
use axum::{
    Json, Router,
    extract::{Path, Query, State, rejection::QueryRejection},
    routing::{get, post},
};
use docfactory_registry::{TemplateId, TemplateVersion, VersionComparison};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{template_id}/versions", get(list_versions))
        .route("/{template_id}/versions/compare", get(compare_versions))
        .route(
            "/{template_id}/versions/{version}/restore",
            post(restore_version),
        )
}

/// Parse a version number from a path or query value
fn version_number(raw: Option<&str>, message: &str) -> Result<u32> {
    raw.and_then(|raw| raw.trim().parse().ok())
        .ok_or_else(|| ApiError::bad_request(message))
}

async fn list_versions(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(template_id): Path<String>,
) -> Result<Json<Vec<TemplateVersion>>> {
    let versions = state
        .service
        .list_versions(&ctx.tenant_id, &TemplateId::from(template_id))
        .await?;

    Ok(Json(versions))
}

async fn compare_versions(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(template_id): Path<String>,
    query: std::result::Result<Query<CompareQuery>, QueryRejection>,
) -> Result<Json<VersionComparison>> {
    let Query(query) = query?;
    let left = version_number(query.left.as_deref(), "left is required integer")?;
    let right = version_number(query.right.as_deref(), "right is required integer")?;

    let comparison = state
        .service
        .compare_versions(&ctx.tenant_id, &TemplateId::from(template_id), left, right)
        .await?;

    Ok(Json(comparison))
}

/// Restore an old version's content as a new current version
async fn restore_version(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path((template_id, version)): Path<(String, String)>,
) -> Result<Json<TemplateVersion>> {
    let version = version_number(Some(version.as_str()), "version must be integer")?;

    let restored = state
        .service
        .restore_version(
            &ctx.tenant_id,
            &TemplateId::from(template_id),
            version,
            &ctx.user_id,
        )
        .await?;

    Ok(Json(restored))
}
