use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

/// Kind of a backend registration.
///
/// Stored on each `BackendRegistration` row and checked against the implementation's
/// `backend_type` when the implementation is registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "storage_backend", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    S3,
    Local,
    Nfs,
    WebDav,
    Memory,
}

impl FromStr for StorageBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "s3" => Ok(StorageBackend::S3),
            "local" => Ok(StorageBackend::Local),
            "nfs" => Ok(StorageBackend::Nfs),
            "webdav" => Ok(StorageBackend::WebDav),
            "memory" => Ok(StorageBackend::Memory),
            _ => Err(anyhow::anyhow!("Invalid storage backend: {}", s)),
        }
    }
}

impl Display for StorageBackend {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            StorageBackend::S3 => write!(f, "s3"),
            StorageBackend::Local => write!(f, "local"),
            StorageBackend::Nfs => write!(f, "nfs"),
            StorageBackend::WebDav => write!(f, "webdav"),
            StorageBackend::Memory => write!(f, "memory"),
        }
    }
}
