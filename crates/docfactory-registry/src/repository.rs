//! Compound-operation boundary over the template and version stores
//!
//! [`TemplateRepository`] is the only component that touches storage. Pure
//! reads go through [`StorageBackend::read`]; every mutation, including each
//! multi-step operation such as duplication, runs inside one
//! [`StorageBackend::within_transaction`] scope so readers never observe it
//! half applied.

use crate::entities::{
    DuplicateOptions, Lifecycle, ListOptions, Template, TemplateId, TemplatePatch,
    TemplateVersion, TenantId, UserId, VersionComparison,
};
use crate::error::{RegistryError, Result};
use crate::id::{IdGenerator, UuidGenerator};
use crate::storage::{StorageBackend, TemplateStore, VersionStore};
use crate::validation::{Validate, ValidationError};
use std::sync::Arc;
use time::OffsetDateTime;

/// Repository composing both stores behind one backend
pub struct TemplateRepository<B: StorageBackend> {
    backend: B,
    ids: Arc<dyn IdGenerator>,
}

impl<B: StorageBackend> TemplateRepository<B> {
    /// Create a repository generating random UUIDs
    pub fn new(backend: B) -> Self {
        Self::with_id_generator(backend, Arc::new(UuidGenerator))
    }

    pub fn with_id_generator(backend: B, ids: Arc<dyn IdGenerator>) -> Self {
        Self { backend, ids }
    }

    /// The identifier source shared with the service layer
    pub fn id_generator(&self) -> Arc<dyn IdGenerator> {
        Arc::clone(&self.ids)
    }

    // === Templates ===

    /// One page plus the unpaginated total, taken from the same snapshot
    pub async fn list_page(&self, options: &ListOptions) -> Result<(Vec<Template>, usize)> {
        self.backend
            .read(|state| Ok((state.list_templates(options)?, state.count_templates(options)?)))
            .await
    }

    pub async fn get_template(
        &self,
        tenant_id: &TenantId,
        template_id: &TemplateId,
    ) -> Result<Template> {
        self.backend
            .read(|state| state.get_template(tenant_id, template_id))
            .await
    }

    /// Insert a template without any history entry
    pub async fn create_template(&self, template: Template) -> Result<Template> {
        template.validate()?;
        self.backend
            .within_transaction(|state| state.insert_template(template))
            .await
    }

    /// Full replace of a template without any history entry.
    ///
    /// The record must carry the stored version; moving the counter is left
    /// to the operations that also append history.
    pub async fn update_template(&self, template: Template) -> Result<Template> {
        template.validate()?;
        self.backend
            .within_transaction(|state| {
                let stored = state.get_template(&template.tenant_id, &template.template_id)?;
                if stored.version != template.version {
                    return Err(RegistryError::StaleVersion {
                        template_id: stored.template_id.to_string(),
                        expected: template.version,
                        actual: stored.version,
                    });
                }
                state.replace_template(template)
            })
            .await
    }

    /// Insert a template together with its first history entry
    pub async fn create_template_with_version(
        &self,
        template: Template,
        initial: TemplateVersion,
    ) -> Result<(Template, TemplateVersion)> {
        template.validate()?;
        ensure_belongs(&template, &initial)?;
        self.backend
            .within_transaction(|state| {
                let template = state.insert_template(template)?;
                let version = state.append_version(initial)?;
                Ok((template, version))
            })
            .await
    }

    /// Apply `patch` to a live template, bump its version and append the
    /// matching history entry, all under one exclusive scope
    pub async fn update_template_with_version(
        &self,
        tenant_id: &TenantId,
        template_id: &TemplateId,
        patch: &TemplatePatch,
        updated_by: &UserId,
        change_summary: &str,
    ) -> Result<(Template, TemplateVersion)> {
        let ids = self.ids.as_ref();
        self.backend
            .within_transaction(|state| {
                let mut template = state.get_template(tenant_id, template_id)?;
                if template.is_deleted() {
                    return Err(RegistryError::TemplateDeleted(template_id.to_string()));
                }

                template.apply(patch);
                template.version += 1;
                template.updated_by = updated_by.clone();
                template.updated_at = OffsetDateTime::now_utc();
                template.validate()?;

                let version = TemplateVersion::snapshot(
                    ids.next_id().into(),
                    &template,
                    change_summary.trim(),
                    updated_by.clone(),
                    template.updated_at,
                );
                let template = state.replace_template(template)?;
                let version = state.append_version(version)?;
                Ok((template, version))
            })
            .await
    }

    pub async fn soft_delete_template(
        &self,
        tenant_id: &TenantId,
        template_id: &TemplateId,
    ) -> Result<()> {
        let now = OffsetDateTime::now_utc();
        self.backend
            .within_transaction(|state| {
                state.soft_delete_template(tenant_id, template_id, now)?;
                Ok(())
            })
            .await
    }

    pub async fn restore_template(
        &self,
        tenant_id: &TenantId,
        template_id: &TemplateId,
    ) -> Result<Template> {
        self.backend
            .within_transaction(|state| state.restore_template(tenant_id, template_id))
            .await
    }

    /// Clone a template under a fresh identifier.
    ///
    /// Without `copy_versions` the clone starts at version 1 with a single
    /// "duplicated from" entry. With it, the source history is re-created
    /// under the clone in source order: entries keep their numbers, except
    /// the one that was current, which takes the clone's final version.
    pub async fn duplicate_template(
        &self,
        tenant_id: &TenantId,
        source_id: &TemplateId,
        options: &DuplicateOptions,
    ) -> Result<Template> {
        let ids = self.ids.as_ref();
        self.backend
            .within_transaction(|state| {
                let source = state.get_template(tenant_id, source_id)?;
                let now = OffsetDateTime::now_utc();
                let mut clone = clone_of(&source, TemplateId(ids.next_id()), options, now);

                if !options.copy_versions {
                    clone.validate()?;
                    let clone = state.insert_template(clone)?;
                    state.append_version(TemplateVersion::snapshot(
                        ids.next_id().into(),
                        &clone,
                        format!("duplicated from {}", source.template_id),
                        options.updated_by.clone(),
                        now,
                    ))?;
                    return Ok(clone);
                }

                let history = state.list_versions(&source.template_id)?;
                clone.version = history
                    .iter()
                    .map(|v| v.version_number)
                    .fold(source.version, u32::max);
                clone.validate()?;
                let clone = state.insert_template(clone)?;

                for entry in history {
                    let renumbered = if entry.is_current {
                        clone.version
                    } else {
                        entry.version_number
                    };
                    state.append_version(TemplateVersion {
                        version_id: ids.next_id().into(),
                        template_id: clone.template_id.clone(),
                        version_number: renumbered,
                        ..entry
                    })?;
                }
                // A source without history still needs an entry at the clone's version
                if state.current_version(&clone.template_id)?.map(|v| v.version_number)
                    != Some(clone.version)
                {
                    state.append_version(TemplateVersion::snapshot(
                        ids.next_id().into(),
                        &clone,
                        format!("duplicated from {}", source.template_id),
                        options.updated_by.clone(),
                        now,
                    ))?;
                }
                Ok(clone)
            })
            .await
    }

    // === Versions ===

    pub async fn list_versions(
        &self,
        tenant_id: &TenantId,
        template_id: &TemplateId,
    ) -> Result<Vec<TemplateVersion>> {
        self.backend
            .read(|state| {
                state.get_template(tenant_id, template_id)?;
                state.list_versions(template_id)
            })
            .await
    }

    /// Append a history entry to a live template owned by `tenant_id` and
    /// advance the template to it.
    ///
    /// The entry must be numbered exactly one past the template's version,
    /// so the current entry and the template never disagree.
    pub async fn create_version(
        &self,
        tenant_id: &TenantId,
        version: TemplateVersion,
    ) -> Result<TemplateVersion> {
        self.backend
            .within_transaction(|state| {
                let mut template = state.get_template(tenant_id, &version.template_id)?;
                if template.is_deleted() {
                    return Err(RegistryError::TemplateDeleted(template.template_id.to_string()));
                }
                if version.version_number != template.version + 1 {
                    return Err(RegistryError::VersionOutOfOrder {
                        template_id: template.template_id.to_string(),
                        version: version.version_number,
                        latest: template.version,
                    });
                }

                template.version = version.version_number;
                template.json_schema_url = version.json_schema_url.clone();
                template.updated_by = version.created_by.clone();
                template.updated_at = version.created_at;
                template.validate()?;
                state.replace_template(template)?;
                state.append_version(version)
            })
            .await
    }

    /// Layer a new current entry carrying an old entry's content on top of
    /// the history. The version counter only ever moves forward.
    pub async fn restore_version(
        &self,
        tenant_id: &TenantId,
        template_id: &TemplateId,
        version_number: u32,
        restored_by: &UserId,
    ) -> Result<TemplateVersion> {
        let ids = self.ids.as_ref();
        self.backend
            .within_transaction(|state| {
                let mut template = state.get_template(tenant_id, template_id)?;
                if template.is_deleted() {
                    return Err(RegistryError::TemplateDeleted(template_id.to_string()));
                }
                let restored = state.find_version(template_id, version_number)?;

                template.json_schema_url = restored.json_schema_url.clone();
                template.version += 1;
                template.updated_at = OffsetDateTime::now_utc();
                template.updated_by = restored_by.clone();
                template.validate()?;
                let template = state.replace_template(template)?;

                state.append_version(TemplateVersion {
                    version_id: ids.next_id().into(),
                    template_id: template.template_id.clone(),
                    version_number: template.version,
                    change_summary: format!("restored from version {}", restored.version_number),
                    json_schema_url: restored.json_schema_url,
                    created_by: restored_by.clone(),
                    created_at: template.updated_at,
                    is_current: true,
                })
            })
            .await
    }

    pub async fn compare_versions(
        &self,
        tenant_id: &TenantId,
        template_id: &TemplateId,
        left: u32,
        right: u32,
    ) -> Result<VersionComparison> {
        self.backend
            .read(|state| {
                let template = state.get_template(tenant_id, template_id)?;
                let left = state.find_version(template_id, left)?;
                let right = state.find_version(template_id, right)?;
                Ok(VersionComparison::new(template.template_id, left, right))
            })
            .await
    }
}

fn ensure_belongs(template: &Template, version: &TemplateVersion) -> Result<()> {
    if version.template_id != template.template_id {
        return Err(ValidationError::InvalidValue {
            field: "template_id",
        }
        .into());
    }
    Ok(())
}

/// Fresh-lifecycle copy of `source`, starting at version 1
fn clone_of(
    source: &Template,
    template_id: TemplateId,
    options: &DuplicateOptions,
    now: OffsetDateTime,
) -> Template {
    let name = match options.name_override.as_deref().map(str::trim) {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => format!("{} Copy", source.name),
    };
    let description = match options.description_override.as_deref().map(str::trim) {
        Some(description) if !description.is_empty() => description.to_string(),
        _ => source.description.clone(),
    };
    Template {
        template_id,
        name,
        description,
        version: 1,
        created_by: options.created_by.clone(),
        updated_by: options.updated_by.clone(),
        created_at: now,
        updated_at: now,
        lifecycle: Lifecycle::Active,
        documents_count: 0,
        last_used_at: None,
        ..source.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{DocumentType, Orientation, PageSize};
    use crate::storage::MemoryBackend;

    fn source() -> Template {
        let now = OffsetDateTime::now_utc();
        Template {
            template_id: "src".into(),
            tenant_id: "t1".into(),
            name: "Warranty EU".to_string(),
            description: "Card".to_string(),
            document_type: DocumentType::Warranty,
            page_size: PageSize::A5,
            orientation: Orientation::Landscape,
            json_schema_url: "s3://schemas/v3.json".to_string(),
            thumbnail_url: Some("s3://thumbs/src.png".to_string()),
            version: 3,
            created_by: "alice".into(),
            updated_by: "bob".into(),
            created_at: now,
            updated_at: now,
            lifecycle: Lifecycle::Deleted { deleted_at: now },
            documents_count: 12,
            last_used_at: Some(now),
        }
    }

    #[test]
    fn test_clone_resets_lifecycle() {
        let src = source();
        let now = OffsetDateTime::now_utc();
        let clone = clone_of(&src, "dup".into(), &DuplicateOptions::by("carol"), now);

        assert_eq!(clone.template_id.as_ref(), "dup");
        assert_eq!(clone.name, "Warranty EU Copy");
        assert_eq!(clone.description, "Card");
        assert_eq!(clone.version, 1);
        assert_eq!(clone.created_by.as_ref(), "carol");
        assert_eq!(clone.lifecycle, Lifecycle::Active);
        assert_eq!(clone.documents_count, 0);
        assert_eq!(clone.last_used_at, None);
        assert_eq!(clone.page_size, PageSize::A5);
        assert_eq!(clone.thumbnail_url, src.thumbnail_url);
        assert_eq!(clone.tenant_id, src.tenant_id);
    }

    #[test]
    fn test_clone_overrides() {
        let src = source();
        let options = DuplicateOptions::by("carol")
            .with_name(" Garantie FR ")
            .with_description("Carte");
        let clone = clone_of(&src, "dup".into(), &options, OffsetDateTime::now_utc());
        assert_eq!(clone.name, "Garantie FR");
        assert_eq!(clone.description, "Carte");

        let blank = DuplicateOptions::by("carol").with_name("  ");
        let clone = clone_of(&src, "dup".into(), &blank, OffsetDateTime::now_utc());
        assert_eq!(clone.name, "Warranty EU Copy");
    }

    #[tokio::test]
    async fn test_create_with_version_is_atomic() {
        let repo = TemplateRepository::new(MemoryBackend::new());
        let mut template = source();
        template.version = 1;
        template.lifecycle = Lifecycle::Active;

        let mut bad = TemplateVersion::snapshot(
            "v1".into(),
            &template,
            "initial version",
            "alice".into(),
            template.created_at,
        );
        bad.created_by = "".into();

        let err = repo
            .create_template_with_version(template.clone(), bad)
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::Validation(_)));
        assert!(
            repo.get_template(&template.tenant_id, &template.template_id)
                .await
                .unwrap_err()
                .is_not_found()
        );
    }

    #[tokio::test]
    async fn test_mismatched_version_owner_rejected() {
        let repo = TemplateRepository::new(MemoryBackend::new());
        let mut template = source();
        template.version = 1;
        let mut version = TemplateVersion::snapshot(
            "v1".into(),
            &template,
            "initial version",
            "alice".into(),
            template.created_at,
        );
        version.template_id = "other".into();

        let err = repo
            .create_template_with_version(template, version)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Invalid input: template_id is invalid");
    }

    fn live(id: &str) -> Template {
        let mut template = source();
        template.template_id = id.into();
        template.version = 1;
        template.lifecycle = Lifecycle::Active;
        template
    }

    async fn seeded(repo: &TemplateRepository<MemoryBackend>, id: &str) -> Template {
        let template = live(id);
        let initial = TemplateVersion::snapshot(
            format!("{id}-v1").into(),
            &template,
            "initial version",
            "alice".into(),
            template.created_at,
        );
        repo.create_template_with_version(template, initial)
            .await
            .unwrap()
            .0
    }

    fn entry(template: &Template, number: u32, url: &str) -> TemplateVersion {
        TemplateVersion {
            version_id: format!("{}-v{number}", template.template_id).into(),
            template_id: template.template_id.clone(),
            version_number: number,
            change_summary: "imported".to_string(),
            json_schema_url: url.to_string(),
            created_by: "importer".into(),
            created_at: OffsetDateTime::now_utc(),
            is_current: false,
        }
    }

    #[tokio::test]
    async fn test_create_template_conflict() {
        let repo = TemplateRepository::new(MemoryBackend::new());
        repo.create_template(live("tpl-1")).await.unwrap();

        let mut other = live("tpl-1");
        other.tenant_id = "t2".into();
        let err = repo.create_template(other).await.unwrap_err();
        assert_eq!(err, RegistryError::TemplateAlreadyExists("tpl-1".to_string()));
        assert_eq!(err.kind(), crate::error::ErrorKind::Conflict);

        let stored = repo.get_template(&"t1".into(), &"tpl-1".into()).await.unwrap();
        assert!(repo.list_versions(&"t1".into(), &stored.template_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_template_keeps_version() {
        let repo = TemplateRepository::new(MemoryBackend::new());
        let mut template = seeded(&repo, "tpl-1").await;

        template.name = "Renamed".to_string();
        let updated = repo.update_template(template.clone()).await.unwrap();
        assert_eq!(updated.name, "Renamed");
        assert_eq!(updated.version, 1);

        let mut bumped = template.clone();
        bumped.version = 2;
        let err = repo.update_template(bumped).await.unwrap_err();
        assert!(matches!(
            err,
            RegistryError::StaleVersion { expected: 2, actual: 1, .. }
        ));

        let mut foreign = template;
        foreign.tenant_id = "t2".into();
        assert!(repo.update_template(foreign).await.unwrap_err().is_not_found());

        let history = repo.list_versions(&"t1".into(), &"tpl-1".into()).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].version_number, 1);
    }

    #[tokio::test]
    async fn test_create_version_advances_template() {
        let repo = TemplateRepository::new(MemoryBackend::new());
        let template = seeded(&repo, "tpl-1").await;
        let tenant = TenantId::from("t1");

        let appended = repo
            .create_version(&tenant, entry(&template, 2, "s3://schemas/imported.json"))
            .await
            .unwrap();
        assert!(appended.is_current);

        let stored = repo.get_template(&tenant, &template.template_id).await.unwrap();
        assert_eq!(stored.version, 2);
        assert_eq!(stored.json_schema_url, "s3://schemas/imported.json");
        assert_eq!(stored.updated_by.as_ref(), "importer");
    }

    #[tokio::test]
    async fn test_create_version_rejects_gaps_and_repeats() {
        let repo = TemplateRepository::new(MemoryBackend::new());
        let template = seeded(&repo, "tpl-1").await;
        let tenant = TenantId::from("t1");

        let err = repo
            .create_version(&tenant, entry(&template, 7, "s3://schemas/v7.json"))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            RegistryError::VersionOutOfOrder {
                template_id: "tpl-1".to_string(),
                version: 7,
                latest: 1,
            }
        );
        let err = repo
            .create_version(&tenant, entry(&template, 1, "s3://schemas/v1b.json"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Conflict);

        let err = repo
            .create_version(&"t2".into(), entry(&template, 2, "s3://schemas/v2.json"))
            .await
            .unwrap_err();
        assert!(err.is_not_found());

        // An ordinary update afterwards still lines up with the history
        let (updated, _) = repo
            .update_template_with_version(
                &tenant,
                &template.template_id,
                &TemplatePatch::default(),
                &"bob".into(),
                "touch",
            )
            .await
            .unwrap();
        let history = repo.list_versions(&tenant, &template.template_id).await.unwrap();
        let numbers: Vec<u32> = history.iter().map(|v| v.version_number).collect();
        assert_eq!(numbers, vec![1, 2]);
        let current = history.iter().find(|v| v.is_current).unwrap();
        assert_eq!(current.version_number, updated.version);
    }

    #[tokio::test]
    async fn test_create_version_on_deleted_template() {
        let repo = TemplateRepository::new(MemoryBackend::new());
        let template = seeded(&repo, "tpl-1").await;
        let tenant = TenantId::from("t1");
        repo.soft_delete_template(&tenant, &template.template_id)
            .await
            .unwrap();

        let err = repo
            .create_version(&tenant, entry(&template, 2, "s3://schemas/v2.json"))
            .await
            .unwrap_err();
        assert_eq!(err, RegistryError::TemplateDeleted("tpl-1".to_string()));
        let stored = repo.get_template(&tenant, &template.template_id).await.unwrap();
        assert_eq!(stored.version, 1);
    }
}
