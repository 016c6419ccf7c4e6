//! Reference lookup cache
//!
//! Wraps a `ReferenceRepository` and caches owner lookups (`find_by_*`) in an LRU.
//! Entries are keyed by (backend id, owner, file name) and dropped when a
//! `ReferenceEvent` for the same (backend id, owner) is published.
//! Lookups made inside a named transaction bypass the cache.

use crate::repository::ReferenceRepository;
use async_trait::async_trait;
use lru::LruCache;
use stash_core::{AppError, OwnerRef, RecordScope, ReferenceEntity, ReferenceEvent, ReferenceEventSink};
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct LookupKey {
    tenant_id: i64,
    backend_id: i64,
    owner: OwnerRef,
    file_name: Option<String>,
}

/// Caching decorator over a reference repository.
pub struct CachedReferenceRepository {
    inner: Arc<dyn ReferenceRepository>,
    cache: Option<Mutex<LruCache<LookupKey, ReferenceEntity>>>,
}

impl CachedReferenceRepository {
    /// Create a cache holding up to `capacity` lookups. A capacity of 0 disables caching.
    pub fn new(inner: Arc<dyn ReferenceRepository>, capacity: usize) -> Self {
        let cache = NonZeroUsize::new(capacity).map(|capacity| Mutex::new(LruCache::new(capacity)));
        Self { inner, cache }
    }

    pub fn len(&self) -> usize {
        self.cache
            .as_ref()
            .map(|cache| lock(cache).len())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every cached lookup for (backend id, owner).
    pub fn invalidate_owner(&self, backend_id: i64, owner: OwnerRef) {
        let Some(cache) = &self.cache else {
            return;
        };
        let mut cache = lock(cache);
        let stale: Vec<LookupKey> = cache
            .iter()
            .filter(|(key, _)| key.backend_id == backend_id && key.owner == owner)
            .map(|(key, _)| key.clone())
            .collect();
        for key in &stale {
            cache.pop(key);
        }
        if !stale.is_empty() {
            tracing::debug!(
                backend_id,
                owner = %owner,
                evicted = stale.len(),
                "Invalidated cached reference lookups"
            );
        }
    }

    fn cached(&self, scope: &RecordScope, key: &LookupKey) -> Option<ReferenceEntity> {
        if scope.transaction.is_some() {
            return None;
        }
        self.cache
            .as_ref()
            .and_then(|cache| lock(cache).get(key).cloned())
    }

    fn remember(&self, scope: &RecordScope, key: LookupKey, entity: &Option<ReferenceEntity>) {
        if scope.transaction.is_some() {
            return;
        }
        if let (Some(cache), Some(entity)) = (&self.cache, entity) {
            lock(cache).put(key, entity.clone());
        }
    }

    fn lookup_key(
        scope: &RecordScope,
        backend_id: i64,
        owner: OwnerRef,
        file_name: Option<&str>,
    ) -> LookupKey {
        LookupKey {
            tenant_id: scope.tenant_id,
            backend_id,
            owner,
            file_name: file_name.map(str::to_string),
        }
    }
}

type LookupCache = LruCache<LookupKey, ReferenceEntity>;

/// Lookups are only a cache, so a poisoned lock keeps serving its entries.
fn lock(cache: &Mutex<LookupCache>) -> MutexGuard<'_, LookupCache> {
    cache.lock().unwrap_or_else(PoisonError::into_inner)
}

#[async_trait]
impl ReferenceRepository for CachedReferenceRepository {
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
        let key = Self::lookup_key(
            scope,
            backend_id,
            OwnerRef::Attachment(attachment_id),
            Some(file_name),
        );
        if let Some(hit) = self.cached(scope, &key) {
            return Ok(Some(hit));
        }
        let found = self
            .inner
            .find_by_attachment(scope, backend_id, attachment_id, file_name)
            .await?;
        self.remember(scope, key, &found);
        Ok(found)
    }

    async fn find_by_image(
        &self,
        scope: &RecordScope,
        backend_id: i64,
        image_id: i64,
    ) -> Result<Option<ReferenceEntity>, AppError> {
        let key = Self::lookup_key(scope, backend_id, OwnerRef::Image(image_id), None);
        if let Some(hit) = self.cached(scope, &key) {
            return Ok(Some(hit));
        }
        let found = self.inner.find_by_image(scope, backend_id, image_id).await?;
        self.remember(scope, key, &found);
        Ok(found)
    }

    async fn find_by_archive(
        &self,
        scope: &RecordScope,
        backend_id: i64,
        archive_id: i64,
    ) -> Result<Option<ReferenceEntity>, AppError> {
        let key = Self::lookup_key(scope, backend_id, OwnerRef::Archive(archive_id), None);
        if let Some(hit) = self.cached(scope, &key) {
            return Ok(Some(hit));
        }
        let found = self
            .inner
            .find_by_archive(scope, backend_id, archive_id)
            .await?;
        self.remember(scope, key, &found);
        Ok(found)
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

#[async_trait]
impl ReferenceEventSink for CachedReferenceRepository {
    async fn publish(&self, event: &ReferenceEvent) {
        self.invalidate_owner(event.backend_id(), event.owner());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryReferenceRepository;

    fn scope() -> RecordScope {
        RecordScope::new(1)
    }

    async fn seeded() -> (InMemoryReferenceRepository, CachedReferenceRepository, ReferenceEntity) {
        let inner = InMemoryReferenceRepository::new();
        let entity = ReferenceEntity::new(&scope(), 3, OwnerRef::Image(7), "logo.png");
        let stored = inner.insert(&entity).await.unwrap();
        let cached = CachedReferenceRepository::new(Arc::new(inner.clone()), 16);
        (inner, cached, stored)
    }

    #[tokio::test]
    async fn test_repeated_lookup_hits_cache() {
        let (inner, cached, stored) = seeded().await;

        let first = cached.find_by_image(&scope(), 3, 7).await.unwrap();
        let second = cached.find_by_image(&scope(), 3, 7).await.unwrap();

        assert_eq!(first.unwrap().id, stored.id);
        assert_eq!(second.unwrap().id, stored.id);
        assert_eq!(inner.lookup_count(), 1);
        assert_eq!(cached.len(), 1);
    }

    #[tokio::test]
    async fn test_event_invalidates_owner_entries() {
        let (inner, cached, stored) = seeded().await;
        cached.find_by_image(&scope(), 3, 7).await.unwrap();

        inner.delete(&stored).await.unwrap();
        cached
            .publish(&ReferenceEvent::ReferenceRemoved {
                backend_id: 3,
                reference_id: stored.id,
                owner: OwnerRef::Image(7),
            })
            .await;

        assert!(cached.is_empty());
        assert!(cached.find_by_image(&scope(), 3, 7).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_event_for_other_backend_keeps_entries() {
        let (_inner, cached, _stored) = seeded().await;
        cached.find_by_image(&scope(), 3, 7).await.unwrap();

        cached
            .publish(&ReferenceEvent::OwnerChanged {
                backend_id: 4,
                owner: OwnerRef::Image(7),
            })
            .await;

        assert_eq!(cached.len(), 1);
    }

    #[tokio::test]
    async fn test_transaction_scope_bypasses_cache() {
        let (inner, cached, _stored) = seeded().await;
        let scope = RecordScope::new(1).with_transaction("trx-9");

        cached.find_by_image(&scope, 3, 7).await.unwrap();
        cached.find_by_image(&scope, 3, 7).await.unwrap();

        assert_eq!(inner.lookup_count(), 2);
        assert!(cached.is_empty());
    }

    #[tokio::test]
    async fn test_zero_capacity_disables_cache() {
        let inner = InMemoryReferenceRepository::new();
        let cached = CachedReferenceRepository::new(Arc::new(inner.clone()), 0);
        cached.find_by_archive(&scope(), 3, 1).await.unwrap();
        cached.find_by_archive(&scope(), 3, 1).await.unwrap();
        assert_eq!(inner.lookup_count(), 2);
    }
}
