//! Template management routes

use crate::{
    AppState,
    error::Result,
    extract::{Payload, RequestContext},
    models::{DuplicatePayload, ListQuery, PaginatedResponse, TemplatePayload},
};
use axum::{
    Json, Router,
    extract::{Path, Query, State, rejection::QueryRejection},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use docfactory_registry::{Template, TemplateId};
use tracing::debug;

/// Create template routes
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_templates).post(create_template))
        .route(
            "/{template_id}",
            get(get_template).put(update_template).delete(delete_template),
        )
        .route("/{template_id}/restore", post(restore_template))
        .route("/{template_id}/duplicate", post(duplicate_template))
}

/// List the tenant's templates with search, filter and pagination
async fn list_templates(
    State(state): State<AppState>,
    ctx: RequestContext,
    query: std::result::Result<Query<ListQuery>, QueryRejection>,
) -> Result<Json<PaginatedResponse<Template>>> {
    let Query(query) = query?;
    debug!(tenant_id = %ctx.tenant_id, ?query, "Listing templates");

    let options = query.into_options(ctx.tenant_id, state.config.default_page_limit)?;
    let (items, total) = state.service.list_templates(&options).await?;

    Ok(Json(PaginatedResponse::new(
        items,
        total,
        options.limit,
        options.offset,
    )))
}

async fn create_template(
    State(state): State<AppState>,
    ctx: RequestContext,
    Payload(payload): Payload<TemplatePayload>,
) -> Result<impl IntoResponse> {
    let new = payload.into_new_template(ctx.tenant_id, ctx.user_id)?;
    let created = state.service.create_template(new).await?;

    Ok((StatusCode::CREATED, Json(created)))
}

async fn get_template(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(template_id): Path<String>,
) -> Result<Json<Template>> {
    let template = state
        .service
        .get_template(&ctx.tenant_id, &TemplateId::from(template_id))
        .await?;

    Ok(Json(template))
}

/// Update a template; empty payload fields are left unchanged
async fn update_template(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(template_id): Path<String>,
    Payload(payload): Payload<TemplatePayload>,
) -> Result<Json<Template>> {
    let patch = payload.to_patch()?;
    let updated = state
        .service
        .update_template(
            &ctx.tenant_id,
            &TemplateId::from(template_id),
            &patch,
            &ctx.user_id,
            &payload.change_summary,
        )
        .await?;

    Ok(Json(updated))
}

async fn delete_template(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(template_id): Path<String>,
) -> Result<StatusCode> {
    state
        .service
        .delete_template(&ctx.tenant_id, &TemplateId::from(template_id))
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Undo a soft delete
async fn restore_template(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(template_id): Path<String>,
) -> Result<Json<Template>> {
    let restored = state
        .service
        .restore_template(&ctx.tenant_id, &TemplateId::from(template_id))
        .await?;

    Ok(Json(restored))
}

async fn duplicate_template(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(template_id): Path<String>,
    Payload(payload): Payload<DuplicatePayload>,
) -> Result<impl IntoResponse> {
    let options = payload.into_options(&ctx.user_id);
    let duplicate = state
        .service
        .duplicate_template(&ctx.tenant_id, &TemplateId::from(template_id), &options)
        .await?;

    Ok((StatusCode::CREATED, Json(duplicate)))
}
