//! Business rules on top of the repository
//!
//! The service assigns identifiers and timestamps for new templates and hands
//! every change to the repository as one compound operation. Read-modify-write
//! steps such as applying a patch happen inside the repository's exclusive
//! scope, never here.

use crate::entities::{
    DuplicateOptions, Lifecycle, ListOptions, NewTemplate, Template, TemplateId, TemplatePatch,
    TemplateVersion, TenantId, UserId, VersionComparison,
};
use crate::error::Result;
use crate::id::IdGenerator;
use crate::repository::TemplateRepository;
use crate::storage::StorageBackend;
use std::sync::Arc;
use time::OffsetDateTime;
use tracing::{debug, info};

pub const INITIAL_CHANGE_SUMMARY: &str = "initial version";

/// Orchestrates template and version operations for all tenants
pub struct TemplateService<B: StorageBackend> {
    repository: Arc<TemplateRepository<B>>,
    ids: Arc<dyn IdGenerator>,
}

impl<B: StorageBackend> Clone for TemplateService<B> {
    fn clone(&self) -> Self {
        Self {
            repository: Arc::clone(&self.repository),
            ids: Arc::clone(&self.ids),
        }
    }
}

impl<B: StorageBackend> TemplateService<B> {
    pub fn new(repository: TemplateRepository<B>) -> Self {
        let ids = repository.id_generator();
        Self {
            repository: Arc::new(repository),
            ids,
        }
    }

    /// Create a template at version 1 together with its initial history entry
    pub async fn create_template(&self, new: NewTemplate) -> Result<Template> {
        let now = OffsetDateTime::now_utc();
        let template = Template {
            template_id: TemplateId(self.ids.next_id()),
            tenant_id: new.tenant_id,
            name: new.name.trim().to_string(),
            description: new.description.trim().to_string(),
            document_type: new.document_type,
            page_size: new.page_size,
            orientation: new.orientation,
            json_schema_url: new.json_schema_url.trim().to_string(),
            thumbnail_url: new
                .thumbnail_url
                .map(|url| url.trim().to_string())
                .filter(|url| !url.is_empty()),
            version: 1,
            created_by: new.created_by.clone(),
            updated_by: new.created_by.clone(),
            created_at: now,
            updated_at: now,
            lifecycle: Lifecycle::Active,
            documents_count: 0,
            last_used_at: None,
        };
        let initial = TemplateVersion::snapshot(
            self.ids.next_id().into(),
            &template,
            INITIAL_CHANGE_SUMMARY,
            new.created_by,
            now,
        );

        let (created, _) = self
            .repository
            .create_template_with_version(template, initial)
            .await?;
        info!(
            tenant_id = %created.tenant_id,
            template_id = %created.template_id,
            "Created template"
        );
        Ok(created)
    }

    /// Apply `patch` to a live template, bump its version and record the change
    pub async fn update_template(
        &self,
        tenant_id: &TenantId,
        template_id: &TemplateId,
        patch: &TemplatePatch,
        updated_by: &UserId,
        change_summary: &str,
    ) -> Result<Template> {
        let (updated, _) = self
            .repository
            .update_template_with_version(tenant_id, template_id, patch, updated_by, change_summary)
            .await?;
        info!(
            tenant_id = %tenant_id,
            template_id = %template_id,
            version = updated.version,
            "Updated template"
        );
        Ok(updated)
    }

    pub async fn duplicate_template(
        &self,
        tenant_id: &TenantId,
        template_id: &TemplateId,
        options: &DuplicateOptions,
    ) -> Result<Template> {
        let duplicate = self
            .repository
            .duplicate_template(tenant_id, template_id, options)
            .await?;
        info!(
            tenant_id = %tenant_id,
            source_id = %template_id,
            template_id = %duplicate.template_id,
            copy_versions = options.copy_versions,
            "Duplicated template"
        );
        Ok(duplicate)
    }

    /// Undo a soft delete
    pub async fn restore_template(
        &self,
        tenant_id: &TenantId,
        template_id: &TemplateId,
    ) -> Result<Template> {
        let restored = self.repository.restore_template(tenant_id, template_id).await?;
        info!(tenant_id = %tenant_id, template_id = %template_id, "Restored template");
        Ok(restored)
    }

    /// Soft delete
    pub async fn delete_template(&self, tenant_id: &TenantId, template_id: &TemplateId) -> Result<()> {
        self.repository
            .soft_delete_template(tenant_id, template_id)
            .await?;
        info!(tenant_id = %tenant_id, template_id = %template_id, "Deleted template");
        Ok(())
    }

    /// One page of templates plus the total number of matches
    pub async fn list_templates(&self, options: &ListOptions) -> Result<(Vec<Template>, usize)> {
        debug!(tenant_id = %options.tenant_id, ?options, "Listing templates");
        self.repository.list_page(options).await
    }

    pub async fn get_template(
        &self,
        tenant_id: &TenantId,
        template_id: &TemplateId,
    ) -> Result<Template> {
        debug!(tenant_id = %tenant_id, template_id = %template_id, "Getting template");
        self.repository.get_template(tenant_id, template_id).await
    }

    pub async fn list_versions(
        &self,
        tenant_id: &TenantId,
        template_id: &TemplateId,
    ) -> Result<Vec<TemplateVersion>> {
        self.repository.list_versions(tenant_id, template_id).await
    }

    pub async fn restore_version(
        &self,
        tenant_id: &TenantId,
        template_id: &TemplateId,
        version_number: u32,
        restored_by: &UserId,
    ) -> Result<TemplateVersion> {
        let restored = self
            .repository
            .restore_version(tenant_id, template_id, version_number, restored_by)
            .await?;
        info!(
            tenant_id = %tenant_id,
            template_id = %template_id,
            from = version_number,
            version = restored.version_number,
            "Restored template version"
        );
        Ok(restored)
    }

    pub async fn compare_versions(
        &self,
        tenant_id: &TenantId,
        template_id: &TemplateId,
        left: u32,
        right: u32,
    ) -> Result<VersionComparison> {
        self.repository
            .compare_versions(tenant_id, template_id, left, right)
            .await
    }
}
