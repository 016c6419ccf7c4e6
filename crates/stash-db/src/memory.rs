//! In-memory repository implementations for testing
//!
//! These allow exercising the attachment service without a database.

use crate::repository::{OwnerRepository, ReferenceRepository};
use async_trait::async_trait;
use chrono::Utc;
use stash_core::{AppError, OwnerRecord, OwnerRef, RecordScope, ReferenceEntity};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct ReferenceRows {
    next_id: i64,
    rows: BTreeMap<i64, ReferenceEntity>,
}

/// In-memory reference repository.
///
/// Clones share rows, counters and fault switches.
#[derive(Clone, Default)]
pub struct InMemoryReferenceRepository {
    state: Arc<Mutex<ReferenceRows>>,
    lookups: Arc<AtomicUsize>,
    fail_updates: Arc<AtomicBool>,
    fail_deletes: Arc<AtomicBool>,
}

impl InMemoryReferenceRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// All stored rows, ordered by id.
    pub fn rows(&self) -> Vec<ReferenceEntity> {
        self.state.lock().unwrap().rows.values().cloned().collect()
    }

    pub fn row_count(&self) -> usize {
        self.state.lock().unwrap().rows.len()
    }

    /// Number of owner lookups served (`find_by_*`).
    pub fn lookup_count(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    /// Make every `update` fail.
    pub fn fail_updates(&self, fail: bool) {
        self.fail_updates.store(fail, Ordering::SeqCst);
    }

    /// Make every `delete` fail.
    pub fn fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }

    /// Overwrite a stored row as another writer would, bumping its version.
    pub fn touch(&self, id: i64) {
        if let Some(row) = self.state.lock().unwrap().rows.get_mut(&id) {
            row.version += 1;
            row.updated_at = Utc::now();
        }
    }

    fn find_first<F>(&self, predicate: F) -> Option<ReferenceEntity>
    where
        F: Fn(&ReferenceEntity) -> bool,
    {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.state
            .lock()
            .unwrap()
            .rows
            .values()
            .find(|row| predicate(row))
            .cloned()
    }
}

#[async_trait]
impl ReferenceRepository for InMemoryReferenceRepository {
    async fn get_by_id(
        &self,
        _scope: &RecordScope,
        id: i64,
    ) -> Result<Option<ReferenceEntity>, AppError> {
        Ok(self.state.lock().unwrap().rows.get(&id).cloned())
    }

    async fn find_by_attachment(
        &self,
        _scope: &RecordScope,
        backend_id: i64,
        attachment_id: i64,
        file_name: &str,
    ) -> Result<Option<ReferenceEntity>, AppError> {
        Ok(self.find_first(|row| {
            row.backend_id == backend_id
                && row.owner == OwnerRef::Attachment(attachment_id)
                && row.file_name == file_name
        }))
    }

    async fn find_by_image(
        &self,
        _scope: &RecordScope,
        backend_id: i64,
        image_id: i64,
    ) -> Result<Option<ReferenceEntity>, AppError> {
        Ok(self.find_first(|row| row.backend_id == backend_id && row.owner == OwnerRef::Image(image_id)))
    }

    async fn find_by_archive(
        &self,
        _scope: &RecordScope,
        backend_id: i64,
        archive_id: i64,
    ) -> Result<Option<ReferenceEntity>, AppError> {
        Ok(self.find_first(|row| {
            row.backend_id == backend_id && row.owner == OwnerRef::Archive(archive_id)
        }))
    }

    async fn list_by_attachment(
        &self,
        _scope: &RecordScope,
        backend_id: i64,
        attachment_id: i64,
    ) -> Result<Vec<ReferenceEntity>, AppError> {
        let mut rows: Vec<ReferenceEntity> = self
            .state
            .lock()
            .unwrap()
            .rows
            .values()
            .filter(|row| {
                row.backend_id == backend_id && row.owner == OwnerRef::Attachment(attachment_id)
            })
            .cloned()
            .collect();
        rows.sort_by_key(|row| (row.created_at, row.id));
        Ok(rows)
    }

    async fn insert(&self, entity: &ReferenceEntity) -> Result<ReferenceEntity, AppError> {
        if entity.is_persisted() {
            return Err(AppError::InvalidInput(format!(
                "Reference {} is already persisted",
                entity.id
            )));
        }
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let now = Utc::now();
        let stored = ReferenceEntity {
            id: state.next_id,
            version: 0,
            created_at: now,
            updated_at: now,
            ..entity.clone()
        };
        state.rows.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn update(
        &self,
        entity: &ReferenceEntity,
        expected_version: Option<i64>,
    ) -> Result<ReferenceEntity, AppError> {
        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(AppError::Internal(format!(
                "Injected update failure for reference {}",
                entity.id
            )));
        }
        let mut state = self.state.lock().unwrap();
        let current = state
            .rows
            .get_mut(&entity.id)
            .ok_or_else(|| AppError::NotFound(format!("Reference {} not found", entity.id)))?;
        if let Some(expected) = expected_version {
            if current.version != expected {
                return Err(AppError::Conflict(format!(
                    "Reference {} is at version {}, expected {}",
                    entity.id, current.version, expected
                )));
            }
        }
        let stored = ReferenceEntity {
            version: current.version + 1,
            created_at: current.created_at,
            updated_at: Utc::now(),
            ..entity.clone()
        };
        *current = stored.clone();
        Ok(stored)
    }

    async fn delete(&self, entity: &ReferenceEntity) -> Result<bool, AppError> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(AppError::Internal(format!(
                "Injected delete failure for reference {}",
                entity.id
            )));
        }
        Ok(self.state.lock().unwrap().rows.remove(&entity.id).is_some())
    }
}

/// In-memory owner lookup.
#[derive(Clone, Default)]
pub struct InMemoryOwnerRepository {
    attachments: Arc<Mutex<HashMap<i64, OwnerRecord>>>,
    archives: Arc<Mutex<HashMap<i64, OwnerRecord>>>,
}

impl InMemoryOwnerRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_attachment(&self, attachment_id: i64, table_name: &str, record_id: i64) {
        self.attachments
            .lock()
            .unwrap()
            .insert(attachment_id, OwnerRecord::new(table_name, record_id));
    }

    pub fn add_archive(&self, archive_id: i64, table_name: &str, record_id: i64) {
        self.archives
            .lock()
            .unwrap()
            .insert(archive_id, OwnerRecord::new(table_name, record_id));
    }
}

#[async_trait]
impl OwnerRepository for InMemoryOwnerRepository {
    async fn attachment_owner(
        &self,
        _scope: &RecordScope,
        attachment_id: i64,
    ) -> Result<Option<OwnerRecord>, AppError> {
        Ok(self.attachments.lock().unwrap().get(&attachment_id).cloned())
    }

    async fn archive_owner(
        &self,
        _scope: &RecordScope,
        archive_id: i64,
    ) -> Result<Option<OwnerRecord>, AppError> {
        Ok(self.archives.lock().unwrap().get(&archive_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scope() -> RecordScope {
        RecordScope::new(1)
    }

    #[tokio::test]
    async fn test_insert_assigns_ids_and_list_keeps_creation_order() {
        let repo = InMemoryReferenceRepository::new();
        for name in ["b.txt", "a.txt", "c.txt"] {
            let entity = ReferenceEntity::new(&scope(), 3, OwnerRef::Attachment(42), name);
            repo.insert(&entity).await.unwrap();
        }

        let names: Vec<String> = repo
            .list_by_attachment(&scope(), 3, 42)
            .await
            .unwrap()
            .into_iter()
            .map(|row| row.file_name)
            .collect();
        assert_eq!(names, vec!["b.txt", "a.txt", "c.txt"]);
        assert!(repo.list_by_attachment(&scope(), 4, 42).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_with_stale_version_conflicts() {
        let repo = InMemoryReferenceRepository::new();
        let entity = ReferenceEntity::new(&scope(), 3, OwnerRef::Image(7), "logo.png");
        let stored = repo.insert(&entity).await.unwrap();

        let updated = repo.update(&stored, Some(stored.version)).await.unwrap();
        assert_eq!(updated.version, 1);

        let result = repo.update(&stored, Some(stored.version)).await;
        assert!(matches!(result, Err(AppError::Conflict(_))));

        let forced = repo.update(&stored, None).await.unwrap();
        assert_eq!(forced.version, 2);
    }

    #[tokio::test]
    async fn test_insert_rejects_persisted_entity() {
        let repo = InMemoryReferenceRepository::new();
        let entity = ReferenceEntity::new(&scope(), 3, OwnerRef::Archive(9), "doc.pdf");
        let stored = repo.insert(&entity).await.unwrap();
        assert!(matches!(
            repo.insert(&stored).await,
            Err(AppError::InvalidInput(_))
        ));
    }
}
