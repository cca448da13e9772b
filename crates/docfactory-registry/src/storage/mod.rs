//! Storage abstraction for templates and their version history
//!
//! Persistence is split into two capability sets, [`TemplateStore`] and
//! [`VersionStore`], both implemented by a backend's state type. A
//! [`StorageBackend`] hands that state out only through scoped acquisition:
//! [`StorageBackend::read`] for shared access and
//! [`StorageBackend::within_transaction`] for exclusive access. Everything a
//! transaction closure does is observed by other callers as one unit, and is
//! discarded entirely when the closure returns an error. A durable backend
//! must keep that contract.

use crate::entities::{ListOptions, Template, TemplateId, TemplateVersion, TenantId};
use crate::error::Result;
use async_trait::async_trait;
use time::OffsetDateTime;

pub mod memory;

pub use memory::{MemoryBackend, MemoryState};

/// Tenant-scoped persistence of mutable template records.
///
/// Every lookup is scoped by tenant; a record owned by another tenant is
/// reported as `TemplateNotFound`, exactly like a missing one.
pub trait TemplateStore {
    /// Insert a new record; `TemplateAlreadyExists` on identifier collision
    fn insert_template(&mut self, template: Template) -> Result<Template>;

    fn get_template(&self, tenant_id: &TenantId, template_id: &TemplateId) -> Result<Template>;

    /// Full replace of an existing record owned by `template.tenant_id`
    fn replace_template(&mut self, template: Template) -> Result<Template>;

    fn soft_delete_template(
        &mut self,
        tenant_id: &TenantId,
        template_id: &TemplateId,
        deleted_at: OffsetDateTime,
    ) -> Result<Template>;

    /// Clear the deletion marker. Restoring an active record is a no-op.
    fn restore_template(&mut self, tenant_id: &TenantId, template_id: &TemplateId)
    -> Result<Template>;

    /// Filtered page ordered by `updated_at`, most recent first
    fn list_templates(&self, options: &ListOptions) -> Result<Vec<Template>>;

    /// Number of records matching the filter, ignoring pagination
    fn count_templates(&self, options: &ListOptions) -> Result<usize>;
}

/// Append-only history of version entries per template.
///
/// Callers perform the tenant check on the owning template first.
pub trait VersionStore {
    /// Validate and append `version` as the template's only current entry.
    ///
    /// The number must be new and not below the latest entry's, so history
    /// stays ordered by version number.
    fn append_version(&mut self, version: TemplateVersion) -> Result<TemplateVersion>;

    /// All entries in insertion order, oldest first
    fn list_versions(&self, template_id: &TemplateId) -> Result<Vec<TemplateVersion>>;

    fn find_version(&self, template_id: &TemplateId, version_number: u32)
    -> Result<TemplateVersion>;

    /// The entry flagged current, if the template has any history
    fn current_version(&self, template_id: &TemplateId) -> Result<Option<TemplateVersion>>;
}

/// A storage backend handing out scoped access to both stores
#[async_trait]
pub trait StorageBackend: Send + Sync + 'static {
    type State: TemplateStore + VersionStore + Send + Sync;

    /// Run `f` with shared access
    async fn read<T, F>(&self, f: F) -> Result<T>
    where
        T: Send,
        F: FnOnce(&Self::State) -> Result<T> + Send;

    /// Run `f` with exclusive access, all-or-nothing
    async fn within_transaction<T, F>(&self, f: F) -> Result<T>
    where
        T: Send,
        F: FnOnce(&mut Self::State) -> Result<T> + Send;
}
