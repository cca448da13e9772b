//! Core data structures for the template registry

use crate::validation::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use time::OffsetDateTime;

crate::string_id! {
    /// Isolation boundary; every entity belongs to exactly one tenant
    pub struct TenantId;
}

crate::string_id! {
    /// Globally unique identifier of a template
    pub struct TemplateId;
}

crate::string_id! {
    /// Identifier of a single history entry
    pub struct VersionId;
}

crate::string_id! {
    /// Acting user recorded as creator or updater
    pub struct UserId;
}

/// Kind of document a template produces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentType {
    Warranty,
    Instruction,
    Certificate,
    Label,
}

impl DocumentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentType::Warranty => "warranty",
            DocumentType::Instruction => "instruction",
            DocumentType::Certificate => "certificate",
            DocumentType::Label => "label",
        }
    }
}

impl FromStr for DocumentType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "warranty" => Ok(DocumentType::Warranty),
            "instruction" => Ok(DocumentType::Instruction),
            "certificate" => Ok(DocumentType::Certificate),
            "label" => Ok(DocumentType::Label),
            _ => Err(ValidationError::InvalidValue {
                field: "document_type",
            }),
        }
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Paper size of the rendered document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PageSize {
    A4,
    A5,
    Letter,
}

impl PageSize {
    pub fn as_str(&self) -> &'static str {
        match self {
            PageSize::A4 => "A4",
            PageSize::A5 => "A5",
            PageSize::Letter => "Letter",
        }
    }
}

impl FromStr for PageSize {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "A4" => Ok(PageSize::A4),
            "A5" => Ok(PageSize::A5),
            "Letter" => Ok(PageSize::Letter),
            _ => Err(ValidationError::InvalidValue { field: "page_size" }),
        }
    }
}

impl fmt::Display for PageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Page orientation of the rendered document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    Portrait,
    Landscape,
}

impl Orientation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Orientation::Portrait => "portrait",
            Orientation::Landscape => "landscape",
        }
    }
}

impl FromStr for Orientation {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "portrait" => Ok(Orientation::Portrait),
            "landscape" => Ok(Orientation::Landscape),
            _ => Err(ValidationError::InvalidValue {
                field: "orientation",
            }),
        }
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Soft-delete state of a template.
///
/// `Restore` and `SoftDelete` are the only transitions between the two states.
/// On the wire the state is the nullable `deleted_at` timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Lifecycle {
    #[default]
    Active,
    Deleted { deleted_at: OffsetDateTime },
}

impl Lifecycle {
    pub fn is_deleted(&self) -> bool {
        matches!(self, Lifecycle::Deleted { .. })
    }

    pub fn deleted_at(&self) -> Option<OffsetDateTime> {
        match self {
            Lifecycle::Active => None,
            Lifecycle::Deleted { deleted_at } => Some(*deleted_at),
        }
    }
}

impl From<Option<OffsetDateTime>> for Lifecycle {
    fn from(deleted_at: Option<OffsetDateTime>) -> Self {
        match deleted_at {
            Some(deleted_at) => Lifecycle::Deleted { deleted_at },
            None => Lifecycle::Active,
        }
    }
}

mod lifecycle_serde {
    use super::Lifecycle;
    use serde::{Deserializer, Serializer};

    pub fn serialize<S: Serializer>(lifecycle: &Lifecycle, serializer: S) -> Result<S::Ok, S::Error> {
        time::serde::rfc3339::option::serialize(&lifecycle.deleted_at(), serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Lifecycle, D::Error> {
        time::serde::rfc3339::option::deserialize(deserializer).map(Lifecycle::from)
    }
}

/// Current, editable state of a document template
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    pub template_id: TemplateId,

    /// Owning tenant; never changes after creation
    pub tenant_id: TenantId,

    pub name: String,

    pub description: String,

    pub document_type: DocumentType,

    pub page_size: PageSize,

    pub orientation: Orientation,

    /// Reference to the JSON schema describing the template's input data
    pub json_schema_url: String,

    pub thumbnail_url: Option<String>,

    /// Starts at 1 and grows by exactly one on every accepted mutation
    pub version: u32,

    pub created_by: UserId,

    pub updated_by: UserId,

    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,

    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,

    #[serde(rename = "deleted_at", with = "lifecycle_serde")]
    pub lifecycle: Lifecycle,

    pub documents_count: u64,

    #[serde(with = "time::serde::rfc3339::option")]
    pub last_used_at: Option<OffsetDateTime>,
}

impl Template {
    pub fn is_deleted(&self) -> bool {
        self.lifecycle.is_deleted()
    }

    /// Whether the template passes a listing filter (tenant excluded)
    pub fn matches(&self, options: &ListOptions) -> bool {
        if !options.include_deleted && self.is_deleted() {
            return false;
        }
        if let Some(document_type) = options.document_type {
            if self.document_type != document_type {
                return false;
            }
        }
        match options.search_term() {
            Some(term) => {
                self.name.to_lowercase().contains(&term)
                    || self.description.to_lowercase().contains(&term)
            }
            None => true,
        }
    }

    /// Apply an enumerated field delta; lifecycle and bookkeeping are untouched
    pub fn apply(&mut self, patch: &TemplatePatch) {
        if let Some(name) = &patch.name {
            self.name = name.trim().to_string();
        }
        if let Some(description) = &patch.description {
            self.description = description.trim().to_string();
        }
        if let Some(document_type) = patch.document_type {
            self.document_type = document_type;
        }
        if let Some(page_size) = patch.page_size {
            self.page_size = page_size;
        }
        if let Some(orientation) = patch.orientation {
            self.orientation = orientation;
        }
        if let Some(url) = &patch.json_schema_url {
            self.json_schema_url = url.trim().to_string();
        }
        if let Some(url) = &patch.thumbnail_url {
            let url = url.trim();
            self.thumbnail_url = (!url.is_empty()).then(|| url.to_string());
        }
    }
}

/// Immutable snapshot entry in a template's history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateVersion {
    pub version_id: VersionId,

    pub template_id: TemplateId,

    /// Value of the owning template's `version` when this entry was produced
    pub version_number: u32,

    pub change_summary: String,

    pub json_schema_url: String,

    pub created_by: UserId,

    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,

    /// At most one entry per template carries this flag
    pub is_current: bool,
}

impl TemplateVersion {
    /// Snapshot of a template's present state as a new current entry
    pub fn snapshot(
        version_id: VersionId,
        template: &Template,
        change_summary: impl Into<String>,
        created_by: UserId,
        created_at: OffsetDateTime,
    ) -> Self {
        Self {
            version_id,
            template_id: template.template_id.clone(),
            version_number: template.version,
            change_summary: change_summary.into(),
            json_schema_url: template.json_schema_url.clone(),
            created_by,
            created_at,
            is_current: true,
        }
    }
}

/// Side-by-side view of two history entries. Derived, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionComparison {
    pub template_id: TemplateId,
    pub left: TemplateVersion,
    pub right: TemplateVersion,
    pub summary: String,
}

impl VersionComparison {
    pub fn new(template_id: TemplateId, left: TemplateVersion, right: TemplateVersion) -> Self {
        let summary = format!(
            "left schema: {}, right schema: {}",
            left.json_schema_url, right.json_schema_url
        );
        Self {
            template_id,
            left,
            right,
            summary,
        }
    }
}

/// Fields a caller supplies when creating a template
#[derive(Debug, Clone, PartialEq)]
pub struct NewTemplate {
    pub tenant_id: TenantId,
    pub name: String,
    pub description: String,
    pub document_type: DocumentType,
    pub page_size: PageSize,
    pub orientation: Orientation,
    pub json_schema_url: String,
    pub thumbnail_url: Option<String>,
    pub created_by: UserId,
}

/// The fields an update may change. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TemplatePatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub document_type: Option<DocumentType>,
    pub page_size: Option<PageSize>,
    pub orientation: Option<Orientation>,
    pub json_schema_url: Option<String>,
    /// `Some("")` clears the thumbnail
    pub thumbnail_url: Option<String>,
}

impl TemplatePatch {
    pub fn is_empty(&self) -> bool {
        *self == TemplatePatch::default()
    }
}

/// Options controlling template duplication
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DuplicateOptions {
    pub created_by: UserId,
    pub updated_by: UserId,
    /// Re-materialize the source's whole history under the clone
    pub copy_versions: bool,
    /// Replaces the default `"<source name> Copy"` when non-empty
    pub name_override: Option<String>,
    pub description_override: Option<String>,
}

impl DuplicateOptions {
    /// Options with the same acting user as creator and updater
    pub fn by(user: impl Into<UserId>) -> Self {
        let user = user.into();
        Self {
            created_by: user.clone(),
            updated_by: user,
            ..Self::default()
        }
    }

    pub fn with_versions(mut self) -> Self {
        self.copy_versions = true;
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name_override = Some(name.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description_override = Some(description.into());
        self
    }
}

/// Search and pagination for template listings
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListOptions {
    pub tenant_id: TenantId,
    /// Case-insensitive substring of name or description
    pub search: Option<String>,
    pub document_type: Option<DocumentType>,
    pub include_deleted: bool,
    /// Zero means everything from `offset` on
    pub limit: usize,
    pub offset: usize,
}

impl ListOptions {
    pub fn for_tenant(tenant_id: impl Into<TenantId>) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            ..Self::default()
        }
    }

    /// Lowercased, trimmed search term, if any is left after trimming
    pub fn search_term(&self) -> Option<String> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|term| !term.is_empty())
            .map(str::to_lowercase)
    }

    /// Cut one page out of an already filtered and ordered result set
    pub fn paginate<T>(&self, items: Vec<T>) -> Vec<T> {
        if self.offset >= items.len() {
            return Vec::new();
        }
        let iter = items.into_iter().skip(self.offset);
        if self.limit == 0 {
            iter.collect()
        } else {
            iter.take(self.limit).collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn template() -> Template {
        let now = datetime!(2024-05-01 10:00 UTC);
        Template {
            template_id: "tpl-1".into(),
            tenant_id: "t1".into(),
            name: "Warranty EU".to_string(),
            description: "Standard EU warranty card".to_string(),
            document_type: DocumentType::Warranty,
            page_size: PageSize::A4,
            orientation: Orientation::Portrait,
            json_schema_url: "s3://schemas/v1.json".to_string(),
            thumbnail_url: None,
            version: 1,
            created_by: "alice".into(),
            updated_by: "alice".into(),
            created_at: now,
            updated_at: now,
            lifecycle: Lifecycle::Active,
            documents_count: 0,
            last_used_at: None,
        }
    }

    #[test]
    fn test_enum_parsing() {
        assert_eq!("label".parse::<DocumentType>().unwrap(), DocumentType::Label);
        assert_eq!("Letter".parse::<PageSize>().unwrap(), PageSize::Letter);
        assert_eq!("landscape".parse::<Orientation>().unwrap(), Orientation::Landscape);

        let err = "letter".parse::<PageSize>().unwrap_err();
        assert_eq!(err.to_string(), "page_size is invalid");
        assert!("Warranty".parse::<DocumentType>().is_err());
    }

    #[test]
    fn test_template_wire_format() {
        let mut tpl = template();
        let value = serde_json::to_value(&tpl).unwrap();
        assert_eq!(value["document_type"], "warranty");
        assert_eq!(value["page_size"], "A4");
        assert_eq!(value["orientation"], "portrait");
        assert!(value["deleted_at"].is_null());
        assert_eq!(value["created_at"], "2024-05-01T10:00:00Z");

        tpl.lifecycle = Lifecycle::Deleted {
            deleted_at: datetime!(2024-05-02 08:30 UTC),
        };
        let value = serde_json::to_value(&tpl).unwrap();
        assert_eq!(value["deleted_at"], "2024-05-02T08:30:00Z");

        let back: Template = serde_json::from_value(value).unwrap();
        assert_eq!(back, tpl);
    }

    #[test]
    fn test_apply_patch_trims_and_clears_thumbnail() {
        let mut tpl = template();
        tpl.thumbnail_url = Some("s3://thumbs/1.png".to_string());

        let patch = TemplatePatch {
            name: Some("  Warranty EU v2 ".to_string()),
            orientation: Some(Orientation::Landscape),
            thumbnail_url: Some(String::new()),
            ..TemplatePatch::default()
        };
        tpl.apply(&patch);

        assert_eq!(tpl.name, "Warranty EU v2");
        assert_eq!(tpl.orientation, Orientation::Landscape);
        assert_eq!(tpl.thumbnail_url, None);
        assert_eq!(tpl.description, "Standard EU warranty card");
        assert_eq!(tpl.version, 1);
    }

    #[test]
    fn test_matches_filters() {
        let mut tpl = template();
        let mut options = ListOptions::for_tenant("t1");
        assert!(tpl.matches(&options));

        options.search = Some("  eu WARRANTY ".to_string());
        assert!(tpl.matches(&options));

        options.search = Some("card".to_string());
        assert!(tpl.matches(&options));

        options.search = Some("invoice".to_string());
        assert!(!tpl.matches(&options));

        options.search = None;
        options.document_type = Some(DocumentType::Label);
        assert!(!tpl.matches(&options));

        options.document_type = None;
        tpl.lifecycle = Lifecycle::Deleted {
            deleted_at: datetime!(2024-05-02 08:30 UTC),
        };
        assert!(!tpl.matches(&options));
        options.include_deleted = true;
        assert!(tpl.matches(&options));
    }

    #[test]
    fn test_paginate() {
        let items: Vec<u32> = (1..=5).collect();
        let mut options = ListOptions::for_tenant("t1");

        assert_eq!(options.paginate(items.clone()), vec![1, 2, 3, 4, 5]);

        options.offset = 1;
        options.limit = 2;
        assert_eq!(options.paginate(items.clone()), vec![2, 3]);

        options.limit = 0;
        assert_eq!(options.paginate(items.clone()), vec![2, 3, 4, 5]);

        options.offset = 5;
        assert!(options.paginate(items.clone()).is_empty());

        options.offset = 42;
        options.limit = 10;
        assert!(options.paginate(items).is_empty());
    }

    #[test]
    fn test_comparison_summary() {
        let tpl = template();
        let left = TemplateVersion::snapshot(
            "v-1".into(),
            &tpl,
            "initial version",
            "alice".into(),
            tpl.created_at,
        );
        let mut right = left.clone();
        right.json_schema_url = "s3://schemas/v2.json".to_string();

        let comparison = VersionComparison::new(tpl.template_id.clone(), left, right);
        assert_eq!(
            comparison.summary,
            "left schema: s3://schemas/v1.json, right schema: s3://schemas/v2.json"
        );
    }
}
