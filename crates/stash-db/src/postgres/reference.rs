//! Reference repository: CRUD for the attachment_references table.

use crate::repository::ReferenceRepository;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres};
use stash_core::{AppError, OwnerRef, RecordScope, ReferenceEntity};

const REFERENCE_COLUMNS: &str = "id, tenant_id, backend_id, attachment_id, image_id, archive_id, \
     file_name, note, description, file_size, version, created_at, updated_at";

/// Row type for attachment_references table (for FromRow).
#[derive(Debug, sqlx::FromRow)]
struct ReferenceRow {
    id: i64,
    tenant_id: i64,
    backend_id: i64,
    attachment_id: Option<i64>,
    image_id: Option<i64>,
    archive_id: Option<i64>,
    file_name: String,
    note: Option<String>,
    description: Option<String>,
    file_size: Option<i64>,
    version: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ReferenceRow {
    fn into_entity(self, scope: &RecordScope) -> Result<ReferenceEntity, AppError> {
        let owner = OwnerRef::from_columns(self.attachment_id, self.image_id, self.archive_id)
            .ok_or_else(|| {
                AppError::Internal(format!(
                    "Reference {} does not have exactly one owner",
                    self.id
                ))
            })?;
        Ok(ReferenceEntity {
            id: self.id,
            tenant_id: self.tenant_id,
            transaction: scope.transaction.clone(),
            backend_id: self.backend_id,
            owner,
            file_name: self.file_name,
            note: self.note,
            description: self.description,
            file_size: self.file_size,
            version: self.version,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// Repository for attachment_references table.
#[derive(Clone)]
pub struct PgReferenceRepository {
    pool: PgPool,
}

impl PgReferenceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_one_where(
        &self,
        scope: &RecordScope,
        predicate: &str,
        backend_id: i64,
        owner_id: i64,
        file_name: Option<&str>,
    ) -> Result<Option<ReferenceEntity>, AppError> {
        let sql = format!(
            "SELECT {REFERENCE_COLUMNS} FROM attachment_references \
             WHERE tenant_id = $1 AND backend_id = $2 AND {predicate} \
             ORDER BY id LIMIT 1"
        );
        let mut query = sqlx::query_as::<Postgres, ReferenceRow>(&sql)
            .bind(scope.tenant_id)
            .bind(backend_id)
            .bind(owner_id);
        if let Some(file_name) = file_name {
            query = query.bind(file_name);
        }
        let row = query.fetch_optional(&self.pool).await?;
        row.map(|r| r.into_entity(scope)).transpose()
    }
}

#[async_trait]
impl ReferenceRepository for PgReferenceRepository {
    #[tracing::instrument(skip(self, scope), fields(db.table = "attachment_references", db.record_id = id, trx = ?scope.transaction))]
    async fn get_by_id(
        &self,
        scope: &RecordScope,
        id: i64,
    ) -> Result<Option<ReferenceEntity>, AppError> {
        let sql = format!("SELECT {REFERENCE_COLUMNS} FROM attachment_references WHERE id = $1");
        let row = sqlx::query_as::<Postgres, ReferenceRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| r.into_entity(scope)).transpose()
    }

    #[tracing::instrument(skip(self, scope), fields(db.table = "attachment_references"))]
    async fn find_by_attachment(
        &self,
        scope: &RecordScope,
        backend_id: i64,
        attachment_id: i64,
        file_name: &str,
    ) -> Result<Option<ReferenceEntity>, AppError> {
        self.fetch_one_where(
            scope,
            "attachment_id = $3 AND file_name = $4",
            backend_id,
            attachment_id,
            Some(file_name),
        )
        .await
    }

    #[tracing::instrument(skip(self, scope), fields(db.table = "attachment_references"))]
    async fn find_by_image(
        &self,
        scope: &RecordScope,
        backend_id: i64,
        image_id: i64,
    ) -> Result<Option<ReferenceEntity>, AppError> {
        self.fetch_one_where(scope, "image_id = $3", backend_id, image_id, None)
            .await
    }

    #[tracing::instrument(skip(self, scope), fields(db.table = "attachment_references"))]
    async fn find_by_archive(
        &self,
        scope: &RecordScope,
        backend_id: i64,
        archive_id: i64,
    ) -> Result<Option<ReferenceEntity>, AppError> {
        self.fetch_one_where(scope, "archive_id = $3", backend_id, archive_id, None)
            .await
    }

    #[tracing::instrument(skip(self, scope), fields(db.table = "attachment_references"))]
    async fn list_by_attachment(
        &self,
        scope: &RecordScope,
        backend_id: i64,
        attachment_id: i64,
    ) -> Result<Vec<ReferenceEntity>, AppError> {
        let sql = format!(
            "SELECT {REFERENCE_COLUMNS} FROM attachment_references \
             WHERE tenant_id = $1 AND backend_id = $2 AND attachment_id = $3 \
             ORDER BY created_at, id"
        );
        let rows = sqlx::query_as::<Postgres, ReferenceRow>(&sql)
            .bind(scope.tenant_id)
            .bind(backend_id)
            .bind(attachment_id)
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(|r| r.into_entity(scope)).collect()
    }

    #[tracing::instrument(skip(self, entity), fields(db.table = "attachment_references", owner = %entity.owner))]
    async fn insert(&self, entity: &ReferenceEntity) -> Result<ReferenceEntity, AppError> {
        if entity.is_persisted() {
            return Err(AppError::InvalidInput(format!(
                "Reference {} is already persisted",
                entity.id
            )));
        }
        let (attachment_id, image_id, archive_id) = entity.owner.to_columns();
        let sql = format!(
            "INSERT INTO attachment_references \
             (tenant_id, backend_id, attachment_id, image_id, archive_id, file_name, note, description, file_size) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             RETURNING {REFERENCE_COLUMNS}"
        );
        let row = sqlx::query_as::<Postgres, ReferenceRow>(&sql)
            .bind(entity.tenant_id)
            .bind(entity.backend_id)
            .bind(attachment_id)
            .bind(image_id)
            .bind(archive_id)
            .bind(&entity.file_name)
            .bind(&entity.note)
            .bind(&entity.description)
            .bind(entity.file_size)
            .fetch_one(&self.pool)
            .await?;
        row.into_entity(&entity.scope())
    }

    #[tracing::instrument(skip(self, entity), fields(db.table = "attachment_references", db.record_id = entity.id))]
    async fn update(
        &self,
        entity: &ReferenceEntity,
        expected_version: Option<i64>,
    ) -> Result<ReferenceEntity, AppError> {
        let (attachment_id, image_id, archive_id) = entity.owner.to_columns();
        let sql = format!(
            "UPDATE attachment_references SET \
             backend_id = $2, attachment_id = $3, image_id = $4, archive_id = $5, \
             file_name = $6, note = $7, description = $8, file_size = $9, \
             version = version + 1, updated_at = NOW() \
             WHERE id = $1 AND ($10::BIGINT IS NULL OR version = $10) \
             RETURNING {REFERENCE_COLUMNS}"
        );
        let row = sqlx::query_as::<Postgres, ReferenceRow>(&sql)
            .bind(entity.id)
            .bind(entity.backend_id)
            .bind(attachment_id)
            .bind(image_id)
            .bind(archive_id)
            .bind(&entity.file_name)
            .bind(&entity.note)
            .bind(&entity.description)
            .bind(entity.file_size)
            .bind(expected_version)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => row.into_entity(&entity.scope()),
            None => {
                let exists: Option<i64> =
                    sqlx::query_scalar("SELECT version FROM attachment_references WHERE id = $1")
                        .bind(entity.id)
                        .fetch_optional(&self.pool)
                        .await?;
                match exists {
                    Some(version) => Err(AppError::Conflict(format!(
                        "Reference {} is at version {}, expected {}",
                        entity.id,
                        version,
                        expected_version.unwrap_or_default()
                    ))),
                    None => Err(AppError::NotFound(format!(
                        "Reference {} not found",
                        entity.id
                    ))),
                }
            }
        }
    }

    #[tracing::instrument(skip(self, entity), fields(db.table = "attachment_references", db.record_id = entity.id))]
    async fn delete(&self, entity: &ReferenceEntity) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM attachment_references WHERE id = $1")
            .bind(entity.id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
