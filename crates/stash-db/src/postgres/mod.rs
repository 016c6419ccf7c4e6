//! PostgreSQL implementations of the record store seams.
//!
//! Named transactions carried in `RecordScope` are recorded on spans only; transaction
//! demarcation stays with the host that owns the pool.

mod directory;
mod owner;
mod reference;

pub use directory::PgDirectory;
pub use owner::PgOwnerRepository;
pub use reference::PgReferenceRepository;

use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use stash_core::Config;
use std::time::Duration;

const CONNECTION_TIMEOUT_SECS: u64 = 30;

/// Embedded schema migrations.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

/// Open a connection pool for the configured database and run pending migrations.
pub async fn connect(config: &Config) -> Result<PgPool> {
    let database_url = config
        .database_url
        .as_deref()
        .context("STASH_DATABASE_URL is not configured")?;

    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(Duration::from_secs(CONNECTION_TIMEOUT_SECS))
        .connect(database_url)
        .await
        .context("Failed to connect to the record store")?;

    MIGRATOR
        .run(&pool)
        .await
        .context("Failed to run record store migrations")?;

    tracing::info!(
        max_connections = config.db_max_connections,
        "Record store connection pool ready"
    );
    Ok(pool)
}
