//! Request extractors shared by all template routes

use crate::error::ApiError;
use axum::{
    Json,
    extract::{FromRequest, FromRequestParts, Request},
    http::{HeaderMap, request::Parts},
};
use docfactory_registry::{TenantId, UserId};
use serde::de::DeserializeOwned;

pub const TENANT_HEADER: &str = "x-tenant-id";
pub const USER_HEADER: &str = "x-user-id";

/// Acting user when the request names none
pub const DEFAULT_USER: &str = "system";

/// Tenant and acting user taken from the request headers
#[derive(Debug, Clone, PartialEq)]
pub struct RequestContext {
    pub tenant_id: TenantId,
    pub user_id: UserId,
}

impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let tenant_id = header_value(&parts.headers, TENANT_HEADER)
            .ok_or_else(|| ApiError::bad_request("X-Tenant-ID header is required"))?;
        let user_id =
            header_value(&parts.headers, USER_HEADER).unwrap_or_else(|| DEFAULT_USER.to_string());

        Ok(Self {
            tenant_id: tenant_id.into(),
            user_id: user_id.into(),
        })
    }
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

/// JSON body whose rejections render as [`ApiError`]
#[derive(Debug)]
pub struct Payload<T>(pub T);

impl<S, T> FromRequest<S> for Payload<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Send,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(Self(value))
    }
}
