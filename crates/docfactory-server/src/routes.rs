//! HTTP routes, mounted under `/templates`

use crate::AppState;
use axum::Router;

pub mod bulk;
pub mod templates;
pub mod versions;

/// All template, version and bulk routes
pub fn router() -> Router<AppState> {
    Router::new()
        .merge(templates::router())
        .merge(versions::router())
        .merge(bulk::router())
}
