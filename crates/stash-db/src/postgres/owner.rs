//! Owner lookups for the attachments and archives tables.

use crate::repository::OwnerRepository;
use async_trait::async_trait;
use sqlx::{PgPool, Postgres};
use stash_core::{AppError, OwnerRecord, RecordScope};

#[derive(Debug, sqlx::FromRow)]
struct OwnerRow {
    table_name: String,
    record_id: i64,
}

impl From<OwnerRow> for OwnerRecord {
    fn from(row: OwnerRow) -> Self {
        OwnerRecord::new(row.table_name, row.record_id)
    }
}

/// Repository resolving attachment containers and archives to their host records.
#[derive(Clone)]
pub struct PgOwnerRepository {
    pool: PgPool,
}

impl PgOwnerRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OwnerRepository for PgOwnerRepository {
    #[tracing::instrument(skip(self, scope), fields(db.table = "attachments", db.record_id = attachment_id))]
    async fn attachment_owner(
        &self,
        scope: &RecordScope,
        attachment_id: i64,
    ) -> Result<Option<OwnerRecord>, AppError> {
        let row = sqlx::query_as::<Postgres, OwnerRow>(
            "SELECT table_name, record_id FROM attachments WHERE id = $1 AND tenant_id = $2",
        )
        .bind(attachment_id)
        .bind(scope.tenant_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(OwnerRecord::from))
    }

    #[tracing::instrument(skip(self, scope), fields(db.table = "archives", db.record_id = archive_id))]
    async fn archive_owner(
        &self,
        scope: &RecordScope,
        archive_id: i64,
    ) -> Result<Option<OwnerRecord>, AppError> {
        let row = sqlx::query_as::<Postgres, OwnerRow>(
            "SELECT table_name, record_id FROM archives WHERE id = $1 AND tenant_id = $2",
        )
        .bind(archive_id)
        .bind(scope.tenant_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(OwnerRecord::from))
    }
}
