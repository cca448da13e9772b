//! Template-related API models

use docfactory_registry::{
    DuplicateOptions, NewTemplate, TemplatePatch, TenantId, UserId, ValidationError,
};
use serde::Deserialize;
use std::str::FromStr;

/// Body of create and update requests.
///
/// Missing fields read as empty strings. On update an empty string leaves
/// the field unchanged.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct TemplatePayload {
    pub name: String,
    pub description: String,
    pub document_type: String,
    pub page_size: String,
    pub orientation: String,
    pub json_schema_url: String,
    pub thumbnail_url: String,
    pub change_summary: String,
}

impl TemplatePayload {
    pub fn into_new_template(
        self,
        tenant_id: TenantId,
        created_by: UserId,
    ) -> Result<NewTemplate, ValidationError> {
        Ok(NewTemplate {
            tenant_id,
            name: self.name.trim().to_string(),
            description: self.description.trim().to_string(),
            document_type: self.document_type.trim().parse()?,
            page_size: self.page_size.trim().parse()?,
            orientation: self.orientation.trim().parse()?,
            json_schema_url: self.json_schema_url.trim().to_string(),
            thumbnail_url: non_empty(&self.thumbnail_url),
            created_by,
        })
    }

    pub fn to_patch(&self) -> Result<TemplatePatch, ValidationError> {
        Ok(TemplatePatch {
            name: non_empty(&self.name),
            description: non_empty(&self.description),
            document_type: parse_non_empty(&self.document_type)?,
            page_size: parse_non_empty(&self.page_size)?,
            orientation: parse_non_empty(&self.orientation)?,
            json_schema_url: non_empty(&self.json_schema_url),
            thumbnail_url: non_empty(&self.thumbnail_url),
        })
    }
}

/// Body of a duplicate request
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DuplicatePayload {
    pub copy_versions: bool,
    pub name_override: String,
    pub description_override: String,
    pub created_by: String,
    pub updated_by: String,
}

impl DuplicatePayload {
    /// Blank creator and updater fall back to the acting user
    pub fn into_options(self, acting_user: &UserId) -> DuplicateOptions {
        let or_acting = |value: &str| {
            non_empty(value)
                .map(UserId::from)
                .unwrap_or_else(|| acting_user.clone())
        };
        DuplicateOptions {
            created_by: or_acting(&self.created_by),
            updated_by: or_acting(&self.updated_by),
            copy_versions: self.copy_versions,
            name_override: non_empty(&self.name_override),
            description_override: non_empty(&self.description_override),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct BulkIdsPayload {
    pub template_ids: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct BulkDuplicatePayload {
    pub template_ids: Vec<String>,
    pub copy_versions: bool,
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

fn parse_non_empty<T>(value: &str) -> Result<Option<T>, ValidationError>
where
    T: FromStr<Err = ValidationError>,
{
    match value.trim() {
        "" => Ok(None),
        value => value.parse().map(Some),
    }
}
