//! Directory backed by the client_info and backend_registrations tables.

use async_trait::async_trait;
use sqlx::{PgPool, Postgres};
use stash_core::{AppError, BackendRegistration, StorageBackend};
use stash_storage::{BackendDirectory, BackendRegistry, BackendSupport};

#[derive(Debug, sqlx::FromRow)]
struct RegistrationRow {
    id: i64,
    tenant_id: i64,
    name: String,
    kind: StorageBackend,
    is_active: bool,
}

impl From<RegistrationRow> for BackendRegistration {
    fn from(row: RegistrationRow) -> Self {
        BackendRegistration {
            id: row.id,
            tenant_id: row.tenant_id,
            name: row.name,
            kind: row.kind,
            is_active: row.is_active,
        }
    }
}

/// Directory reading tenant defaults and registrations from the database.
///
/// Implementations come from an in-process registry, since backend clients are
/// constructed by the host.
#[derive(Clone)]
pub struct PgDirectory {
    pool: PgPool,
    registry: BackendRegistry,
}

impl PgDirectory {
    pub fn new(pool: PgPool, registry: BackendRegistry) -> Self {
        Self { pool, registry }
    }
}

#[async_trait]
impl BackendDirectory for PgDirectory {
    #[tracing::instrument(skip(self), fields(db.table = "client_info"))]
    async fn default_backend_id(&self, tenant_id: i64) -> Result<Option<i64>, AppError> {
        let backend_id: Option<Option<i64>> =
            sqlx::query_scalar("SELECT file_handler_id FROM client_info WHERE tenant_id = $1")
                .bind(tenant_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(backend_id.flatten().filter(|id| *id > 0))
    }

    #[tracing::instrument(skip(self), fields(db.table = "backend_registrations"))]
    async fn registration(&self, backend_id: i64) -> Result<Option<BackendRegistration>, AppError> {
        let row = sqlx::query_as::<Postgres, RegistrationRow>(
            "SELECT id, tenant_id, name, kind, is_active FROM backend_registrations WHERE id = $1",
        )
        .bind(backend_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(BackendRegistration::from))
    }

    async fn load_support(
        &self,
        registration: &BackendRegistration,
    ) -> Result<Option<BackendSupport>, AppError> {
        Ok(self.registry.support(registration.id))
    }
}
