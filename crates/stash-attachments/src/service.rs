//! Attachment service: fetch, list, save and delete of stored resources.
//!
//! Every operation resolves the backend first, since the backend id takes part in
//! reference lookups. On save the reference entity is persisted before bytes are
//! written; on delete the bytes are removed before the entity.

use bytes::Bytes;
use stash_core::{
    Config, ConflictPolicy, NoOpEventSink, OwnerRef, ReferenceEntity, ReferenceEvent,
    ReferenceEventSink,
};
use stash_db::{CachedReferenceRepository, OwnerRepository, ReferenceRepository};
use stash_storage::{read_all, BackendDirectory, ResourceKey, ResourceLocation};
use std::sync::Arc;

use crate::context::{RequestContext, Selector};
use crate::error::{AttachmentError, AttachmentResult};
use crate::resolver::ReferenceResolver;
use crate::selector::{BackendHandle, BackendSelector};

pub struct AttachmentService {
    selector: BackendSelector,
    resolver: ReferenceResolver,
    references: Arc<dyn ReferenceRepository>,
    owners: Arc<dyn OwnerRepository>,
    events: Arc<dyn ReferenceEventSink>,
    conflict_policy: ConflictPolicy,
}

impl AttachmentService {
    /// Create a service without lookup caching, using last-write-wins updates.
    pub fn new(
        directory: Arc<dyn BackendDirectory>,
        references: Arc<dyn ReferenceRepository>,
        owners: Arc<dyn OwnerRepository>,
    ) -> Self {
        Self {
            selector: BackendSelector::new(directory),
            resolver: ReferenceResolver::new(Arc::clone(&references)),
            references,
            owners,
            events: Arc::new(NoOpEventSink),
            conflict_policy: ConflictPolicy::default(),
        }
    }

    /// Create a service as configured: reference lookups go through a
    /// `CachedReferenceRepository` that is also subscribed to the service's events.
    pub fn from_config(
        config: &Config,
        directory: Arc<dyn BackendDirectory>,
        references: Arc<dyn ReferenceRepository>,
        owners: Arc<dyn OwnerRepository>,
    ) -> Self {
        let cached = Arc::new(CachedReferenceRepository::new(
            references,
            config.reference_cache_capacity,
        ));
        Self::new(directory, cached.clone(), owners)
            .with_event_sink(cached)
            .with_conflict_policy(config.conflict_policy)
    }

    pub fn with_event_sink(mut self, events: Arc<dyn ReferenceEventSink>) -> Self {
        self.events = events;
        self
    }

    pub fn with_conflict_policy(mut self, conflict_policy: ConflictPolicy) -> Self {
        self.conflict_policy = conflict_policy;
        self
    }

    pub fn conflict_policy(&self) -> ConflictPolicy {
        self.conflict_policy
    }

    pub fn selector(&self) -> &BackendSelector {
        &self.selector
    }

    /// See [`BackendSelector::is_configured_for_tenant`].
    pub async fn is_configured_for_tenant(&self, tenant_id: i64) -> bool {
        self.selector.is_configured_for_tenant(tenant_id).await
    }

    /// Read the bytes of the selected resource.
    ///
    /// The stored file name, note and description are copied into `ctx`.
    #[tracing::instrument(skip(self, ctx), fields(tenant_id = ctx.tenant_id(), selector = ?ctx.selector()))]
    pub async fn fetch(&self, ctx: &mut RequestContext) -> AttachmentResult<Bytes> {
        let handle = self.selector.resolve(ctx).await?;
        let entity = self
            .resolver
            .resolve(ctx, &handle)
            .await?
            .ok_or_else(|| reference_not_found(ctx, &handle))?;
        ctx.adopt_entity(&entity);

        let key = self.resource_key(&entity).await?;
        let stream = handle
            .storage()
            .get_resource(key.as_str())
            .await?
            .ok_or_else(|| AttachmentError::ResourceNotFound {
                key: key.to_string(),
            })?;
        let data = read_all(stream).await?;

        tracing::debug!(
            reference_id = entity.id,
            key = %key,
            size_bytes = data.len(),
            "Fetched resource"
        );
        Ok(data)
    }

    /// Names of the resources in the selected attachment container, in creation order.
    #[tracing::instrument(skip(self, ctx), fields(tenant_id = ctx.tenant_id(), selector = ?ctx.selector()))]
    pub async fn list_file_names(&self, ctx: &mut RequestContext) -> AttachmentResult<Vec<String>> {
        let attachment_id = match ctx.selector() {
            Some(Selector::Attachment(attachment_id)) => attachment_id,
            other => {
                return Err(AttachmentError::InvariantViolation(format!(
                    "Listing file names requires an attachment selector, got {:?}",
                    other
                )))
            }
        };
        let handle = self.selector.resolve(ctx).await?;
        let entities = self
            .resolver
            .list_by_attachment(ctx, &handle, attachment_id)
            .await?;
        Ok(entities
            .into_iter()
            .map(|entity| entity.file_name)
            .collect())
    }

    /// Create or update the selected reference and store the context's payload.
    ///
    /// Without a payload only the reference metadata is written. If anything fails
    /// after the entity was persisted, the entity is deleted again before the error is
    /// returned, unless the failure is a version conflict with another writer.
    #[tracing::instrument(skip(self, ctx), fields(tenant_id = ctx.tenant_id(), selector = ?ctx.selector()))]
    pub async fn save(&self, ctx: &mut RequestContext) -> AttachmentResult<ReferenceEntity> {
        let selector = ctx.selector().ok_or_else(|| {
            AttachmentError::InvariantViolation("No reference selected".to_string())
        })?;
        let handle = self.selector.resolve(ctx).await?;

        let mut entity = match self.resolver.resolve(ctx, &handle).await? {
            Some(entity) => entity,
            None => {
                let owner = selector
                    .owner()
                    .ok_or_else(|| reference_not_found(ctx, &handle))?;
                let file_name = ctx.file_name().ok_or_else(|| {
                    AttachmentError::InvariantViolation(
                        "A file name is required to store a new resource".to_string(),
                    )
                })?;
                ReferenceEntity::new(&ctx.scope(), handle.backend_id(), owner, file_name)
            }
        };

        entity.backend_id = handle.backend_id();
        if let Some(owner) = selector.owner() {
            entity.owner = owner;
        }
        if let Some(file_name) = ctx.file_name() {
            entity.file_name = file_name.to_string();
        }
        if let Some(note) = ctx.note().filter(|note| !note.is_empty()) {
            entity.note = Some(note.to_string());
        }
        if let Some(description) = ctx.description().filter(|d| !d.is_empty()) {
            entity.description = Some(description.to_string());
        }

        let entity = self.persist(&entity).await?;

        let Some(data) = ctx.data().cloned() else {
            tracing::info!(reference_id = entity.id, "Saved reference without payload");
            return Ok(entity);
        };

        match self.store_payload(&handle, entity.clone(), data).await {
            Ok(stored) => Ok(stored),
            Err(e) => {
                self.roll_back(&entity, &e).await;
                Err(e)
            }
        }
    }

    /// Delete the selected resource and its reference. A missing reference is a no-op.
    ///
    /// If the backend delete fails the reference is kept, so the delete can be retried.
    #[tracing::instrument(skip(self, ctx), fields(tenant_id = ctx.tenant_id(), selector = ?ctx.selector()))]
    pub async fn delete(&self, ctx: &mut RequestContext) -> AttachmentResult<()> {
        let handle = self.selector.resolve(ctx).await?;
        let Some(entity) = self.resolver.resolve(ctx, &handle).await? else {
            tracing::debug!("No reference to delete");
            return Ok(());
        };

        let key = self.resource_key(&entity).await?;
        handle.storage().delete_resource(key.as_str()).await?;

        self.references.delete(&entity).await?;
        self.events
            .publish(&ReferenceEvent::ReferenceRemoved {
                backend_id: entity.backend_id,
                reference_id: entity.id,
                owner: entity.owner,
            })
            .await;

        tracing::info!(reference_id = entity.id, key = %key, "Deleted resource");
        Ok(())
    }

    async fn store_payload(
        &self,
        handle: &BackendHandle,
        mut entity: ReferenceEntity,
        data: Bytes,
    ) -> AttachmentResult<ReferenceEntity> {
        entity.file_size = Some(data.len() as i64);
        let entity = self.persist(&entity).await?;

        let key = self.resource_key(&entity).await?;
        let size_bytes = data.len();
        handle.storage().put_resource(key.as_str(), data).await?;

        tracing::info!(
            reference_id = entity.id,
            key = %key,
            size_bytes,
            "Stored resource"
        );
        Ok(entity)
    }

    /// Insert or update `entity` and announce the change.
    async fn persist(&self, entity: &ReferenceEntity) -> AttachmentResult<ReferenceEntity> {
        let stored = if entity.is_persisted() {
            let expected_version = match self.conflict_policy {
                ConflictPolicy::LastWriteWins => None,
                ConflictPolicy::RejectOnConflict => Some(entity.version),
            };
            self.references.update(entity, expected_version).await?
        } else {
            self.references.insert(entity).await?
        };
        self.events
            .publish(&ReferenceEvent::OwnerChanged {
                backend_id: stored.backend_id,
                owner: stored.owner,
            })
            .await;
        Ok(stored)
    }

    async fn roll_back(&self, entity: &ReferenceEntity, cause: &AttachmentError) {
        // A conflicting writer owns the row now.
        if matches!(cause, AttachmentError::Conflict(_)) {
            return;
        }
        match self.references.delete(entity).await {
            Ok(_) => {
                tracing::warn!(
                    reference_id = entity.id,
                    error = %cause,
                    "Save failed, removed reference"
                );
                self.events
                    .publish(&ReferenceEvent::ReferenceRemoved {
                        backend_id: entity.backend_id,
                        reference_id: entity.id,
                        owner: entity.owner,
                    })
                    .await;
            }
            Err(e) => {
                tracing::error!(
                    reference_id = entity.id,
                    error = %e,
                    cause = %cause,
                    "Save failed and the reference could not be removed"
                );
            }
        }
    }

    /// Backend key of `entity`'s resource.
    async fn resource_key(&self, entity: &ReferenceEntity) -> AttachmentResult<ResourceKey> {
        let scope = entity.scope();
        let location = match entity.owner {
            OwnerRef::Attachment(attachment_id) => {
                let owner = self
                    .owners
                    .attachment_owner(&scope, attachment_id)
                    .await?
                    .ok_or_else(|| {
                        AttachmentError::OwnerNotFound(format!("attachment {}", attachment_id))
                    })?;
                ResourceLocation::Attachment {
                    table_name: owner.table_name,
                    record_id: owner.record_id,
                }
            }
            OwnerRef::Image(_) => ResourceLocation::Image,
            OwnerRef::Archive(archive_id) => {
                let owner = self
                    .owners
                    .archive_owner(&scope, archive_id)
                    .await?
                    .ok_or_else(|| {
                        AttachmentError::OwnerNotFound(format!("archive {}", archive_id))
                    })?;
                ResourceLocation::Archive {
                    table_name: owner.table_name,
                    record_id: owner.record_id,
                }
            }
        };
        Ok(ResourceKey::for_location(
            entity.tenant_id,
            &location,
            &entity.file_name,
        ))
    }
}

fn reference_not_found(ctx: &RequestContext, handle: &BackendHandle) -> AttachmentError {
    match ctx.selector() {
        Some(Selector::Reference(id)) => {
            AttachmentError::ReferenceNotFound(format!("reference id {}", id))
        }
        Some(selector) => AttachmentError::ReferenceNotFound(format!(
            "{:?} on backend {}",
            selector,
            handle.backend_id()
        )),
        None => AttachmentError::ReferenceNotFound("no reference selected".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stash_core::{BackendRegistration, StorageBackend};
    use stash_db::memory::{InMemoryOwnerRepository, InMemoryReferenceRepository};
    use stash_storage::test_helpers::InMemoryStorage;
    use stash_storage::StaticDirectory;

    fn service_from(config: &Config) -> (AttachmentService, InMemoryReferenceRepository) {
        let mut directory = StaticDirectory::new();
        directory
            .register_storage(
                BackendRegistration::new(3, 1, "scratch", StorageBackend::Memory),
                Arc::new(InMemoryStorage::new()),
            )
            .unwrap();
        directory.set_tenant_default(1, 3);
        let references = InMemoryReferenceRepository::new();
        let service = AttachmentService::from_config(
            config,
            Arc::new(directory),
            Arc::new(references.clone()),
            Arc::new(InMemoryOwnerRepository::new()),
        );
        (service, references)
    }

    #[test]
    fn test_from_config_applies_conflict_policy() {
        let config = Config {
            conflict_policy: ConflictPolicy::RejectOnConflict,
            ..Config::default()
        };
        let (service, _) = service_from(&config);
        assert_eq!(service.conflict_policy(), ConflictPolicy::RejectOnConflict);
    }

    #[tokio::test]
    async fn test_from_config_caches_lookups() {
        let (service, references) = service_from(&Config::default());
        let mut ctx = RequestContext::new(1)
            .unwrap()
            .with_image_id(7)
            .with_file_name("logo.png")
            .with_data(vec![1u8, 2, 3]);
        service.save(&mut ctx).await.unwrap();

        service.fetch(&mut ctx).await.unwrap();
        let lookups = references.lookup_count();
        service.fetch(&mut ctx).await.unwrap();
        assert_eq!(references.lookup_count(), lookups);
    }

    #[tokio::test]
    async fn test_is_configured_for_tenant_delegates_to_selector() {
        let (service, _) = service_from(&Config::default());
        assert!(service.is_configured_for_tenant(1).await);
        assert!(!service.is_configured_for_tenant(5).await);
    }
}
