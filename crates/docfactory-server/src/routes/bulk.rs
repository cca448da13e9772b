//! Bulk operations over several templates.
//!
//! Each id is handled on its own; one failure never stops the rest, and the
//! response always carries 207 with a per-id outcome.

use crate::{
    AppState,
    error::Result,
    extract::{Payload, RequestContext},
    models::{BulkDuplicatePayload, BulkIdsPayload, BulkResult},
};
use axum::{Json, Router, extract::State, http::StatusCode, routing::post};
use docfactory_registry::{DuplicateOptions, TemplateId};
use tracing::{debug, info};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/bulk/delete", post(bulk_delete))
        .route("/bulk/duplicate", post(bulk_duplicate))
}

async fn bulk_delete(
    State(state): State<AppState>,
    ctx: RequestContext,
    Payload(payload): Payload<BulkIdsPayload>,
) -> Result<(StatusCode, Json<BulkResult>)> {
    let mut result = BulkResult::default();
    for id in payload.template_ids {
        match state
            .service
            .delete_template(&ctx.tenant_id, &TemplateId::from(id.as_str()))
            .await
        {
            Ok(()) => result.succeeded.push(id),
            Err(e) => {
                debug!(template_id = %id, error = %e, "Bulk delete skipped template");
                result.failed.insert(id, e.to_string());
            }
        }
    }

    info!(
        tenant_id = %ctx.tenant_id,
        succeeded = result.succeeded.len(),
        failed = result.failed.len(),
        "Bulk delete finished"
    );
    Ok((StatusCode::MULTI_STATUS, Json(result)))
}

/// Duplicate each template as the acting user; `succeeded` lists the new ids
async fn bulk_duplicate(
    State(state): State<AppState>,
    ctx: RequestContext,
    Payload(payload): Payload<BulkDuplicatePayload>,
) -> Result<(StatusCode, Json<BulkResult>)> {
    let mut options = DuplicateOptions::by(ctx.user_id.clone());
    options.copy_versions = payload.copy_versions;

    let mut result = BulkResult::default();
    for id in payload.template_ids {
        match state
            .service
            .duplicate_template(&ctx.tenant_id, &TemplateId::from(id.as_str()), &options)
            .await
        {
            Ok(duplicate) => result.succeeded.push(duplicate.template_id.to_string()),
            Err(e) => {
                debug!(template_id = %id, error = %e, "Bulk duplicate skipped template");
                result.failed.insert(id, e.to_string());
            }
        }
    }

    info!(
        tenant_id = %ctx.tenant_id,
        succeeded = result.succeeded.len(),
        failed = result.failed.len(),
        "Bulk duplicate finished"
    );
    Ok((StatusCode::MULTI_STATUS, Json(result)))
}
