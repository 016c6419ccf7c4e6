//! Backend registration: a configured storage backend instance.

use serde::{Deserialize, Serialize};

use crate::storage_types::StorageBackend;

/// A registered storage backend instance a tenant can store resources in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendRegistration {
    pub id: i64,
    pub tenant_id: i64,
    pub name: String,
    pub kind: StorageBackend,
    pub is_active: bool,
}

impl BackendRegistration {
    pub fn new(id: i64, tenant_id: i64, name: impl Into<String>, kind: StorageBackend) -> Self {
        Self {
            id,
            tenant_id,
            name: name.into(),
            kind,
            is_active: true,
        }
    }
}
