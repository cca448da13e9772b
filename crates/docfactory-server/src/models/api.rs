//! Common API types and utilities
use docfactory_registry::{DocumentType, ListOptions, TenantId, ValidationError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use time::OffsetDateTime;

/// Query parameters of the template listing.
///
/// Everything arrives as raw text. `limit` and `offset` must be integers,
/// like every other numeric parameter; a `limit` of zero or less falls back
/// to the configured default and a negative `offset` counts as 0.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub search: Option<String>,
    pub document_type: Option<String>,
    pub include_deleted: Option<String>,
    pub limit: Option<String>,
    pub offset: Option<String>,
}

impl ListQuery {
    pub fn into_options(
        self,
        tenant_id: TenantId,
        default_limit: usize,
    ) -> Result<ListOptions, ValidationError> {
        let document_type = match self.document_type.as_deref().map(str::trim) {
            Some(raw) if !raw.is_empty() => Some(raw.parse::<DocumentType>()?),
            _ => None,
        };
        let limit = match integer(self.limit.as_deref(), "limit")? {
            Some(limit) if limit > 0 => limit as usize,
            _ => default_limit,
        };
        let offset = integer(self.offset.as_deref(), "offset")?
            .map_or(0, |offset| offset.max(0) as usize);

        Ok(ListOptions {
            tenant_id,
            search: self.search,
            document_type,
            include_deleted: self.include_deleted.as_deref() == Some("true"),
            limit,
            offset,
        })
    }
}

/// Parse an optional integer parameter; blank counts as absent
fn integer(raw: Option<&str>, field: &'static str) -> Result<Option<i64>, ValidationError> {
    match raw.map(str::trim) {
        Some(raw) if !raw.is_empty() => raw
            .parse()
            .map(Some)
            .map_err(|_| ValidationError::InvalidValue { field }),
        _ => Ok(None),
    }
}

/// One page of a listing plus the unpaginated total
#[derive(Debug, Serialize)]
pub struct PaginatedResponse<T> {
    pub items: Vec<T>,
    pub total: usize,
    pub limit: usize,
    pub offset: usize,
}

impl<T> PaginatedResponse<T> {
    pub fn new(items: Vec<T>, total: usize, limit: usize, offset: usize) -> Self {
        Self {
            items,
            total,
            limit,
            offset,
        }
    }
}

/// `left` and `right` version numbers, validated by the handler
#[derive(Debug, Default, Deserialize)]
pub struct CompareQuery {
    pub left: Option<String>,
    pub right: Option<String>,
}

/// Outcome of a bulk operation, keyed by the submitted template id
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct BulkResult {
    pub succeeded: Vec<String>,
    pub failed: BTreeMap<String, String>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}
