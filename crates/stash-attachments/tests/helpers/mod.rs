//! Test helpers: an attachment service wired to in-memory collaborators.
//!
//! Run from workspace root: `cargo test -p stash-attachments`.

#![allow(dead_code)]

pub mod fixtures;

use async_trait::async_trait;
use self::fixtures::*;
use stash_attachments::{AttachmentService, RequestContext};
use stash_core::{
    AppError, BackendRegistration, ConflictPolicy, RecordScope, ReferenceEntity, ReferenceEvent,
    ReferenceEventSink, StorageBackend,
};
use stash_db::memory::{InMemoryOwnerRepository, InMemoryReferenceRepository};
use stash_db::{CachedReferenceRepository, ReferenceRepository};
use stash_storage::test_helpers::InMemoryStorage;
use stash_storage::StaticDirectory;
use std::sync::{Arc, Mutex};

/// Event sink that keeps every published event.
#[derive(Clone, Default)]
pub struct RecordingSink {
    events: Arc<Mutex<Vec<ReferenceEvent>>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<ReferenceEvent> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl ReferenceEventSink for RecordingSink {
    async fn publish(&self, event: &ReferenceEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

/// Reference repository that lets another writer update every image reference right
/// after it has been looked up.
pub struct RacingReferences {
    inner: InMemoryReferenceRepository,
}

impl RacingReferences {
    pub fn new(inner: InMemoryReferenceRepository) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl ReferenceRepository for RacingReferences {
    async fn get_by_id(
        &self,
        scope: &RecordScope,
        id: i64,
    ) -> Result<Option<ReferenceEntity>, AppError> {
        self.inner.get_by_id(scope, id).await
    }

    async fn find_by_attachment(
        &self,
        scope: &RecordScope,
        backend_id: i64,
        attachment_id: i64,
        file_name: &str,
    ) -> Result<Option<ReferenceEntity>, AppError> {
        self.inner
            .find_by_attachment(scope, backend_id, attachment_id, file_name)
            .await
    }

    async fn find_by_image(
        &self,
        scope: &RecordScope,
        backend_id: i64,
        image_id: i64,
    ) -> Result<Option<ReferenceEntity>, AppError> {
        let found = self.inner.find_by_image(scope, backend_id, image_id).await?;
        if let Some(entity) = &found {
            self.inner.touch(entity.id);
        }
        Ok(found)
    }

    async fn find_by_archive(
        &self,
        scope: &RecordScope,
        backend_id: i64,
        archive_id: i64,
    ) -> Result<Option<ReferenceEntity>, AppError> {
        self.inner.find_by_archive(scope, backend_id, archive_id).await
    }

    async fn list_by_attachment(
        &self,
        scope: &RecordScope,
        backend_id: i64,
        attachment_id: i64,
    ) -> Result<Vec<ReferenceEntity>, AppError> {
        self.inner
            .list_by_attachment(scope, backend_id, attachment_id)
            .await
    }

    async fn insert(&self, entity: &ReferenceEntity) -> Result<ReferenceEntity, AppError> {
        self.inner.insert(entity).await
    }

    async fn update(
        &self,
        entity: &ReferenceEntity,
        expected_version: Option<i64>,
    ) -> Result<ReferenceEntity, AppError> {
        self.inner.update(entity, expected_version).await
    }

    async fn delete(&self, entity: &ReferenceEntity) -> Result<bool, AppError> {
        self.inner.delete(entity).await
    }
}

/// Test application: the service plus handles on every collaborator.
pub struct TestApp {
    pub service: AttachmentService,
    pub storage: InMemoryStorage,
    pub second_storage: InMemoryStorage,
    pub references: InMemoryReferenceRepository,
    pub owners: InMemoryOwnerRepository,
    pub events: RecordingSink,
}

impl TestApp {
    pub fn new() -> Self {
        Self::build(ConflictPolicy::LastWriteWins, false)
    }

    pub fn with_policy(policy: ConflictPolicy) -> Self {
        Self::build(policy, false)
    }

    /// Service whose image lookups race with another writer.
    pub fn racing(policy: ConflictPolicy) -> Self {
        Self::build(policy, true)
    }

    fn build(policy: ConflictPolicy, racing: bool) -> Self {
        let storage = InMemoryStorage::new();
        let second_storage = InMemoryStorage::new();
        let references = InMemoryReferenceRepository::new();
        let owners = InMemoryOwnerRepository::new();
        owners.add_attachment(INVOICE_ATTACHMENT_ID, INVOICE_TABLE, INVOICE_RECORD_ID);
        owners.add_archive(ORDER_ARCHIVE_ID, ORDER_TABLE, ORDER_RECORD_ID);
        let events = RecordingSink::default();

        let repository: Arc<dyn ReferenceRepository> = if racing {
            Arc::new(RacingReferences::new(references.clone()))
        } else {
            Arc::new(references.clone())
        };
        let service = AttachmentService::new(
            Arc::new(directory(&storage, &second_storage)),
            repository,
            Arc::new(owners.clone()),
        )
        .with_event_sink(Arc::new(events.clone()))
        .with_conflict_policy(policy);

        Self {
            service,
            storage,
            second_storage,
            references,
            owners,
            events,
        }
    }

    /// Service reading references through a lookup cache subscribed to its events.
    pub fn cached(capacity: usize) -> (Self, Arc<CachedReferenceRepository>) {
        let mut app = Self::new();
        let cache = Arc::new(CachedReferenceRepository::new(
            Arc::new(app.references.clone()),
            capacity,
        ));
        app.service = AttachmentService::new(
            Arc::new(directory(&app.storage, &app.second_storage)),
            cache.clone(),
            Arc::new(app.owners.clone()),
        )
        .with_event_sink(cache.clone());
        (app, cache)
    }

    pub fn context(&self) -> RequestContext {
        RequestContext::new(TENANT_ID).unwrap()
    }
}

/// Tenant 1 defaults to `BACKEND_ID`; `SECOND_BACKEND_ID` is registered too, and
/// `MAILER_BACKEND_ID` cannot store resources.
pub fn directory(storage: &InMemoryStorage, second_storage: &InMemoryStorage) -> StaticDirectory {
    let mut directory = StaticDirectory::new();
    directory
        .register_storage(
            BackendRegistration::new(BACKEND_ID, TENANT_ID, "primary", StorageBackend::Memory),
            Arc::new(storage.clone()),
        )
        .unwrap();
    directory
        .register_storage(
            BackendRegistration::new(
                SECOND_BACKEND_ID,
                TENANT_ID,
                "secondary",
                StorageBackend::Memory,
            ),
            Arc::new(second_storage.clone()),
        )
        .unwrap();
    directory.register_other(BackendRegistration::new(
        MAILER_BACKEND_ID,
        TENANT_ID,
        "mailer",
        StorageBackend::WebDav,
    ));
    directory.set_tenant_default(TENANT_ID, BACKEND_ID);
    directory
}
