//! In-memory storage backend
//!
//! A single `tokio::sync::RwLock` guards both the template map and the
//! per-template version lists. Reads share the lock; every transaction holds
//! it exclusively for its whole body, so concurrent writers are fully
//! serialized. There is no per-template locking, which caps write throughput
//! at one transaction at a time.

use super::{StorageBackend, TemplateStore, VersionStore};
use crate::entities::{Lifecycle, ListOptions, Template, TemplateId, TemplateVersion, TenantId};
use crate::error::{RegistryError, Result};
use crate::validation::Validate;
use async_trait::async_trait;
use std::collections::HashMap;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use tracing::warn;

/// Inverse of one applied change, replayed on rollback
#[derive(Debug, Clone)]
enum Undo {
    RemoveTemplate(TemplateId),
    PutTemplate(Template),
    PopVersion {
        template_id: TemplateId,
        previous_current: Option<usize>,
    },
}

/// Template map plus version histories, with an undo journal while a
/// transaction is open
#[derive(Debug, Default)]
pub struct MemoryState {
    templates: HashMap<TemplateId, Template>,
    versions: HashMap<TemplateId, Vec<TemplateVersion>>,
    journal: Option<Vec<Undo>>,
}

impl MemoryState {
    pub fn new() -> Self {
        Self::default()
    }

    fn begin(&mut self) {
        // A journal left open means a previous transaction panicked midway
        if self.journal.is_some() {
            self.rollback();
        }
        self.journal = Some(Vec::new());
    }

    fn commit(&mut self) {
        self.journal = None;
    }

    /// Undo every change recorded since `begin`, newest first
    fn rollback(&mut self) -> usize {
        let Some(journal) = self.journal.take() else {
            return 0;
        };
        let undone = journal.len();
        for undo in journal.into_iter().rev() {
            match undo {
                Undo::RemoveTemplate(template_id) => {
                    self.templates.remove(&template_id);
                }
                Undo::PutTemplate(template) => {
                    self.templates.insert(template.template_id.clone(), template);
                }
                Undo::PopVersion {
                    template_id,
                    previous_current,
                } => {
                    if let Some(history) = self.versions.get_mut(&template_id) {
                        history.pop();
                        for entry in history.iter_mut() {
                            entry.is_current = false;
                        }
                        if let Some(entry) = previous_current.and_then(|i| history.get_mut(i)) {
                            entry.is_current = true;
                        }
                        if history.is_empty() {
                            self.versions.remove(&template_id);
                        }
                    }
                }
            }
        }
        undone
    }

    fn record(&mut self, undo: Undo) {
        if let Some(journal) = self.journal.as_mut() {
            journal.push(undo);
        }
    }

    fn owned(&self, tenant_id: &TenantId, template_id: &TemplateId) -> Result<&Template> {
        self.templates
            .get(template_id)
            .filter(|t| &t.tenant_id == tenant_id)
            .ok_or_else(|| RegistryError::TemplateNotFound(template_id.to_string()))
    }

    fn matching<'a>(&'a self, options: &'a ListOptions) -> impl Iterator<Item = &'a Template> + 'a {
        self.templates
            .values()
            .filter(move |t| t.tenant_id == options.tenant_id && t.matches(options))
    }

    /// Swap in `updated` for the stored record, journaling the old one
    fn put(&mut self, updated: Template) -> Template {
        if let Some(previous) = self
            .templates
            .insert(updated.template_id.clone(), updated.clone())
        {
            self.record(Undo::PutTemplate(previous));
        }
        updated
    }
}

impl TemplateStore for MemoryState {
    fn insert_template(&mut self, template: Template) -> Result<Template> {
        if self.templates.contains_key(&template.template_id) {
            return Err(RegistryError::TemplateAlreadyExists(
                template.template_id.to_string(),
            ));
        }
        self.templates
            .insert(template.template_id.clone(), template.clone());
        self.record(Undo::RemoveTemplate(template.template_id.clone()));
        Ok(template)
    }

    fn get_template(&self, tenant_id: &TenantId, template_id: &TemplateId) -> Result<Template> {
        self.owned(tenant_id, template_id).cloned()
    }

    fn replace_template(&mut self, template: Template) -> Result<Template> {
        self.owned(&template.tenant_id, &template.template_id)?;
        Ok(self.put(template))
    }

    fn soft_delete_template(
        &mut self,
        tenant_id: &TenantId,
        template_id: &TemplateId,
        deleted_at: OffsetDateTime,
    ) -> Result<Template> {
        let mut template = self.owned(tenant_id, template_id)?.clone();
        template.lifecycle = Lifecycle::Deleted { deleted_at };
        Ok(self.put(template))
    }

    fn restore_template(
        &mut self,
        tenant_id: &TenantId,
        template_id: &TemplateId,
    ) -> Result<Template> {
        let template = self.owned(tenant_id, template_id)?;
        if !template.is_deleted() {
            return Ok(template.clone());
        }
        let mut template = template.clone();
        template.lifecycle = Lifecycle::Active;
        Ok(self.put(template))
    }

    fn list_templates(&self, options: &ListOptions) -> Result<Vec<Template>> {
        let mut result: Vec<Template> = self.matching(options).cloned().collect();
        result.sort_by(|a, b| {
            b.updated_at
                .cmp(&a.updated_at)
                .then_with(|| a.template_id.cmp(&b.template_id))
        });
        Ok(options.paginate(result))
    }

    fn count_templates(&self, options: &ListOptions) -> Result<usize> {
        Ok(self.matching(options).count())
    }
}

impl VersionStore for MemoryState {
    fn append_version(&mut self, mut version: TemplateVersion) -> Result<TemplateVersion> {
        version.validate()?;
        if !self.templates.contains_key(&version.template_id) {
            return Err(RegistryError::TemplateNotFound(
                version.template_id.to_string(),
            ));
        }

        let history = self
            .versions
            .entry(version.template_id.clone())
            .or_default();
        if let Some(latest) = history.last().map(|v| v.version_number) {
            if history
                .iter()
                .any(|v| v.version_number == version.version_number)
            {
                return Err(RegistryError::VersionAlreadyExists {
                    template_id: version.template_id.to_string(),
                    version: version.version_number,
                });
            }
            if version.version_number < latest {
                return Err(RegistryError::VersionOutOfOrder {
                    template_id: version.template_id.to_string(),
                    version: version.version_number,
                    latest,
                });
            }
        }

        let previous_current = history.iter().position(|v| v.is_current);
        for entry in history.iter_mut() {
            entry.is_current = false;
        }
        version.is_current = true;
        history.push(version.clone());

        self.record(Undo::PopVersion {
            template_id: version.template_id.clone(),
            previous_current,
        });
        Ok(version)
    }

    fn list_versions(&self, template_id: &TemplateId) -> Result<Vec<TemplateVersion>> {
        Ok(self.versions.get(template_id).cloned().unwrap_or_default())
    }

    fn find_version(
        &self,
        template_id: &TemplateId,
        version_number: u32,
    ) -> Result<TemplateVersion> {
        self.versions
            .get(template_id)
            .and_then(|history| history.iter().find(|v| v.version_number == version_number))
            .cloned()
            .ok_or_else(|| RegistryError::VersionNotFound {
                template_id: template_id.to_string(),
                version: version_number,
            })
    }

    fn current_version(&self, template_id: &TemplateId) -> Result<Option<TemplateVersion>> {
        Ok(self
            .versions
            .get(template_id)
            .and_then(|history| history.iter().find(|v| v.is_current))
            .cloned())
    }
}

/// In-memory storage backend for development and tests
#[derive(Debug, Default)]
pub struct MemoryBackend {
    state: RwLock<MemoryState>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StorageBackend for MemoryBackend {
    type State = MemoryState;

    async fn read<T, F>(&self, f: F) -> Result<T>
    where
        T: Send,
        F: FnOnce(&Self::State) -> Result<T> + Send,
    {
        let state = self.state.read().await;
        f(&*state)
    }

    async fn within_transaction<T, F>(&self, f: F) -> Result<T>
    where
        T: Send,
        F: FnOnce(&mut Self::State) -> Result<T> + Send,
    {
        let mut state = self.state.write().await;
        state.begin();
        match f(&mut *state) {
            Ok(value) => {
                state.commit();
                Ok(value)
            }
            Err(e) => {
                let undone = state.rollback();
                if undone > 0 {
                    warn!(undone, error = %e, "Transaction rolled back");
                }
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{DocumentType, Orientation, PageSize};
    use time::Duration;

    fn template(id: &str, tenant: &str, name: &str, updated_at: OffsetDateTime) -> Template {
        Template {
            template_id: id.into(),
            tenant_id: tenant.into(),
            name: name.to_string(),
            description: String::new(),
            document_type: DocumentType::Warranty,
            page_size: PageSize::A4,
            orientation: Orientation::Portrait,
            json_schema_url: "s3://schemas/v1.json".to_string(),
            thumbnail_url: None,
            version: 1,
            created_by: "alice".into(),
            updated_by: "alice".into(),
            created_at: updated_at,
            updated_at,
            lifecycle: Lifecycle::Active,
            documents_count: 0,
            last_used_at: None,
        }
    }

    fn version(template_id: &str, number: u32) -> TemplateVersion {
        TemplateVersion {
            version_id: format!("{template_id}-v{number}").into(),
            template_id: template_id.into(),
            version_number: number,
            change_summary: format!("change {number}"),
            json_schema_url: format!("s3://schemas/v{number}.json"),
            created_by: "alice".into(),
            created_at: OffsetDateTime::now_utc(),
            is_current: false,
        }
    }

    #[test]
    fn test_tenant_mismatch_is_not_found() {
        let mut state = MemoryState::new();
        let now = OffsetDateTime::now_utc();
        state
            .insert_template(template("tpl-1", "t1", "Warranty", now))
            .unwrap();

        let t2 = TenantId::from("t2");
        let id = TemplateId::from("tpl-1");
        assert_eq!(
            state.get_template(&t2, &id),
            Err(RegistryError::TemplateNotFound("tpl-1".to_string()))
        );
        assert!(state.soft_delete_template(&t2, &id, now).unwrap_err().is_not_found());
        assert!(state.restore_template(&t2, &id).unwrap_err().is_not_found());

        let mut foreign = template("tpl-1", "t2", "Hijack", now);
        foreign.version = 2;
        assert!(state.replace_template(foreign).unwrap_err().is_not_found());
        assert_eq!(
            state.get_template(&"t1".into(), &id).unwrap().name,
            "Warranty"
        );
    }

    #[test]
    fn test_insert_conflict() {
        let mut state = MemoryState::new();
        let now = OffsetDateTime::now_utc();
        state
            .insert_template(template("tpl-1", "t1", "Warranty", now))
            .unwrap();
        let err = state
            .insert_template(template("tpl-1", "t2", "Other", now))
            .unwrap_err();
        assert_eq!(err, RegistryError::TemplateAlreadyExists("tpl-1".to_string()));
    }

    #[test]
    fn test_append_keeps_single_current() {
        let mut state = MemoryState::new();
        state
            .insert_template(template("tpl-1", "t1", "Warranty", OffsetDateTime::now_utc()))
            .unwrap();
        let id = TemplateId::from("tpl-1");

        for n in 1..=3 {
            let appended = state.append_version(version("tpl-1", n)).unwrap();
            assert!(appended.is_current);
        }

        let history = state.list_versions(&id).unwrap();
        let numbers: Vec<u32> = history.iter().map(|v| v.version_number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
        assert_eq!(history.iter().filter(|v| v.is_current).count(), 1);
        assert_eq!(state.current_version(&id).unwrap().unwrap().version_number, 3);

        let err = state.append_version(version("tpl-1", 2)).unwrap_err();
        assert!(matches!(err, RegistryError::VersionAlreadyExists { version: 2, .. }));
        assert_eq!(state.find_version(&id, 2).unwrap().change_summary, "change 2");
        assert!(state.find_version(&id, 9).unwrap_err().is_not_found());
    }

    #[test]
    fn test_append_rejects_lower_numbers() {
        let mut state = MemoryState::new();
        state
            .insert_template(template("tpl-1", "t1", "Warranty", OffsetDateTime::now_utc()))
            .unwrap();
        let id = TemplateId::from("tpl-1");
        state.append_version(version("tpl-1", 1)).unwrap();
        state.append_version(version("tpl-1", 4)).unwrap();

        let err = state.append_version(version("tpl-1", 2)).unwrap_err();
        assert_eq!(
            err,
            RegistryError::VersionOutOfOrder {
                template_id: "tpl-1".to_string(),
                version: 2,
                latest: 4,
            }
        );
        assert_eq!(err.kind(), crate::error::ErrorKind::Conflict);

        let numbers: Vec<u32> = state
            .list_versions(&id)
            .unwrap()
            .iter()
            .map(|v| v.version_number)
            .collect();
        assert_eq!(numbers, vec![1, 4]);
        assert_eq!(state.current_version(&id).unwrap().unwrap().version_number, 4);
    }

    #[test]
    fn test_append_requires_existing_template() {
        let mut state = MemoryState::new();
        let err = state.append_version(version("ghost", 1)).unwrap_err();
        assert!(err.is_not_found());

        let mut invalid = version("ghost", 1);
        invalid.version_number = 0;
        assert!(matches!(
            state.append_version(invalid),
            Err(RegistryError::Validation(_))
        ));
    }

    #[test]
    fn test_list_ordering_and_count() {
        let mut state = MemoryState::new();
        let base = OffsetDateTime::now_utc();
        state
            .insert_template(template("a", "t1", "Oldest label", base))
            .unwrap();
        state
            .insert_template(template("b", "t1", "Newest label", base + Duration::minutes(2)))
            .unwrap();
        state
            .insert_template(template("c", "t1", "Middle", base + Duration::minutes(1)))
            .unwrap();
        state
            .insert_template(template("d", "t2", "Other tenant label", base))
            .unwrap();

        let mut options = ListOptions::for_tenant("t1");
        let ids: Vec<String> = state
            .list_templates(&options)
            .unwrap()
            .into_iter()
            .map(|t| t.template_id.0)
            .collect();
        assert_eq!(ids, vec!["b", "c", "a"]);
        assert_eq!(state.count_templates(&options).unwrap(), 3);

        options.search = Some("LABEL".to_string());
        options.limit = 1;
        let page = state.list_templates(&options).unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].template_id.as_ref(), "b");
        assert_eq!(state.count_templates(&options).unwrap(), 2);
    }

    #[test]
    fn test_restore_active_is_noop() {
        let mut state = MemoryState::new();
        let now = OffsetDateTime::now_utc();
        let original = state
            .insert_template(template("tpl-1", "t1", "Warranty", now))
            .unwrap();
        let restored = state
            .restore_template(&"t1".into(), &"tpl-1".into())
            .unwrap();
        assert_eq!(restored, original);
    }

    #[tokio::test]
    async fn test_failed_transaction_rolls_back() {
        let backend = MemoryBackend::new();
        let now = OffsetDateTime::now_utc();
        backend
            .within_transaction(|state| {
                state.insert_template(template("tpl-1", "t1", "Warranty", now))?;
                state.append_version(version("tpl-1", 1))
            })
            .await
            .unwrap();

        let result: Result<()> = backend
            .within_transaction(|state| {
                let mut tpl = state.get_template(&"t1".into(), &"tpl-1".into())?;
                tpl.version = 2;
                tpl.name = "Changed".to_string();
                state.replace_template(tpl)?;
                state.append_version(version("tpl-1", 2))?;
                state.insert_template(template("tpl-2", "t1", "Clone", now))?;
                state.soft_delete_template(&"t1".into(), &"tpl-1".into(), now)?;
                Err(RegistryError::Storage("boom".to_string()))
            })
            .await;
        assert!(result.is_err());

        backend
            .read(|state| {
                let tpl = state.get_template(&"t1".into(), &"tpl-1".into())?;
                assert_eq!(tpl.version, 1);
                assert_eq!(tpl.name, "Warranty");
                assert!(!tpl.is_deleted());
                assert!(state.get_template(&"t1".into(), &"tpl-2".into()).is_err());

                let history = state.list_versions(&"tpl-1".into())?;
                assert_eq!(history.len(), 1);
                assert!(history[0].is_current);
                Ok(())
            })
            .await
            .unwrap();
    }
}
