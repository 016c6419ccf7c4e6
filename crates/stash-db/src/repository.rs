//! Repository trait abstractions
//!
//! These traits define what the attachment service needs from the record store,
//! so hosts can plug in their own persistence and tests can run without a database.

use async_trait::async_trait;
use stash_core::{AppError, OwnerRecord, RecordScope, ReferenceEntity};

/// Persistence of reference entities.
#[async_trait]
pub trait ReferenceRepository: Send + Sync {
    /// Get a reference by surrogate id.
    async fn get_by_id(
        &self,
        scope: &RecordScope,
        id: i64,
    ) -> Result<Option<ReferenceEntity>, AppError>;

    /// Find the reference named `file_name` in an attachment container.
    async fn find_by_attachment(
        &self,
        scope: &RecordScope,
        backend_id: i64,
        attachment_id: i64,
        file_name: &str,
    ) -> Result<Option<ReferenceEntity>, AppError>;

    /// Find the reference of an image.
    async fn find_by_image(
        &self,
        scope: &RecordScope,
        backend_id: i64,
        image_id: i64,
    ) -> Result<Option<ReferenceEntity>, AppError>;

    /// Find the reference of an archive.
    async fn find_by_archive(
        &self,
        scope: &RecordScope,
        backend_id: i64,
        archive_id: i64,
    ) -> Result<Option<ReferenceEntity>, AppError>;

    /// All references of an attachment container, in creation order.
    async fn list_by_attachment(
        &self,
        scope: &RecordScope,
        backend_id: i64,
        attachment_id: i64,
    ) -> Result<Vec<ReferenceEntity>, AppError>;

    /// Persist a new reference and return it with its assigned id.
    async fn insert(&self, entity: &ReferenceEntity) -> Result<ReferenceEntity, AppError>;

    /// Update a persisted reference and return the stored row.
    ///
    /// With `expected_version`, the update only applies if the stored version still
    /// matches and fails with `AppError::Conflict` otherwise.
    async fn update(
        &self,
        entity: &ReferenceEntity,
        expected_version: Option<i64>,
    ) -> Result<ReferenceEntity, AppError>;

    /// Hard-delete a reference. Returns whether a row was removed.
    async fn delete(&self, entity: &ReferenceEntity) -> Result<bool, AppError>;
}

/// Lookup of the host records that attachment containers and archives belong to.
#[async_trait]
pub trait OwnerRepository: Send + Sync {
    async fn attachment_owner(
        &self,
        scope: &RecordScope,
        attachment_id: i64,
    ) -> Result<Option<OwnerRecord>, AppError>;

    async fn archive_owner(
        &self,
        scope: &RecordScope,
        archive_id: i64,
    ) -> Result<Option<OwnerRecord>, AppError>;
}
