//! # Docfactory Registry
//!
//! Multi-tenant storage and versioning for document templates:
//! - Templates hold the current, editable state of a document layout
//! - Every accepted change appends an immutable entry to the template's history
//! - Exactly one history entry is current, and it matches the template's version
//! - Soft delete and restore, duplication with or without history
//! - Forward-only restore of historical versions, and version comparison
//!
//! ## Core Concepts
//!
//! - **Tenants** isolate everything; another tenant's template looks missing
//! - **Versions** start at 1 and only ever grow, restores included
//! - **Storage** is reached through a [`StorageBackend`] whose transactions
//!   are atomic, so compound operations are never seen half done
//!
//! ## Example Usage
//!
//! ```rust
//! use docfactory_registry::*;
//!
//! # async fn example() -> Result<()> {
//! let service = TemplateService::new(TemplateRepository::new(MemoryBackend::new()));
//!
//! let template = service
//!     .create_template(NewTemplate {
//!         tenant_id: "t1".into(),
//!         name: "Warranty EU".to_string(),
//!         description: String::new(),
//!         document_type: DocumentType::Warranty,
//!         page_size: PageSize::A4,
//!         orientation: Orientation::Portrait,
//!         json_schema_url: "s3://schemas/v1.json".to_string(),
//!         thumbnail_url: None,
//!         created_by: "alice".into(),
//!     })
//!     .await?;
//! assert_eq!(template.version, 1);
//!
//! let patch = TemplatePatch {
//!     name: Some("Warranty EU v2".to_string()),
//!     ..TemplatePatch::default()
//! };
//! let updated = service
//!     .update_template(&template.tenant_id, &template.template_id, &patch, &"alice".into(), "rename")
//!     .await?;
//! assert_eq!(updated.version, 2);
//! # Ok(())
//! # }
//! ```

pub mod macros;

pub mod entities;
pub mod error;
pub mod id;
pub mod repository;
pub mod service;
pub mod storage;
pub mod validation;

pub use entities::{
    DocumentType, DuplicateOptions, Lifecycle, ListOptions, NewTemplate, Orientation, PageSize,
    Template, TemplateId, TemplatePatch, TemplateVersion, TenantId, UserId, VersionComparison,
    VersionId,
};
pub use error::{ErrorKind, RegistryError, Result};
pub use id::{IdGenerator, UuidGenerator};
pub use repository::TemplateRepository;
pub use service::TemplateService;
pub use storage::{MemoryBackend, StorageBackend, TemplateStore, VersionStore};
pub use validation::{Validate, ValidationError};
