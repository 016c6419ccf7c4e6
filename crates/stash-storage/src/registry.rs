//! Backend registry and directory
//!
//! The directory answers two questions for the backend selector: which backend is a
//! tenant's default, and which implementation stands behind a registration. The
//! registry holds the implementations themselves, keyed by registration id.

use crate::traits::{ResourceStorage, StorageError, StorageResult};
use async_trait::async_trait;
use stash_core::{AppError, BackendRegistration};
use std::collections::HashMap;
use std::sync::Arc;

/// What a registered backend is able to do.
#[derive(Clone)]
pub enum BackendSupport {
    /// The backend stores resource bytes.
    ResourceStorage(Arc<dyn ResourceStorage>),
    /// An app registration without the byte-storage capability (e.g. a messaging or
    /// identity integration).
    Other { name: String },
}

impl BackendSupport {
    pub fn resource_storage(&self) -> Option<Arc<dyn ResourceStorage>> {
        match self {
            BackendSupport::ResourceStorage(storage) => Some(Arc::clone(storage)),
            BackendSupport::Other { .. } => None,
        }
    }
}

impl std::fmt::Debug for BackendSupport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendSupport::ResourceStorage(storage) => f
                .debug_tuple("ResourceStorage")
                .field(&storage.backend_type())
                .finish(),
            BackendSupport::Other { name } => f.debug_struct("Other").field("name", name).finish(),
        }
    }
}

/// Directory of backend registrations.
#[async_trait]
pub trait BackendDirectory: Send + Sync {
    /// Registration id of the tenant's default backend, if one is configured.
    async fn default_backend_id(&self, tenant_id: i64) -> Result<Option<i64>, AppError>;

    /// Load a registration by id.
    async fn registration(&self, backend_id: i64) -> Result<Option<BackendRegistration>, AppError>;

    /// Load the implementation behind a registration.
    async fn load_support(
        &self,
        registration: &BackendRegistration,
    ) -> Result<Option<BackendSupport>, AppError>;
}

/// In-process map from registration id to implementation.
#[derive(Default, Clone)]
pub struct BackendRegistry {
    supports: HashMap<i64, BackendSupport>,
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register resource storage for a registration.
    ///
    /// Rejects inactive registrations and implementations whose backend type differs
    /// from the registered kind.
    pub fn register_storage(
        &mut self,
        registration: &BackendRegistration,
        storage: Arc<dyn ResourceStorage>,
    ) -> StorageResult<()> {
        if !registration.is_active {
            return Err(StorageError::ConfigError(format!(
                "Backend registration {} is inactive",
                registration.id
            )));
        }
        if storage.backend_type() != registration.kind {
            return Err(StorageError::ConfigError(format!(
                "Backend registration {} is of kind {} but implementation is {}",
                registration.id,
                registration.kind,
                storage.backend_type()
            )));
        }

        tracing::debug!(
            backend_id = registration.id,
            kind = %registration.kind,
            "Registered resource storage"
        );
        self.supports
            .insert(registration.id, BackendSupport::ResourceStorage(storage));
        Ok(())
    }

    /// Register an app support that cannot store resources.
    pub fn register_other(&mut self, backend_id: i64, name: impl Into<String>) {
        self.supports
            .insert(backend_id, BackendSupport::Other { name: name.into() });
    }

    pub fn support(&self, backend_id: i64) -> Option<BackendSupport> {
        self.supports.get(&backend_id).cloned()
    }
}

/// Directory backed by in-process maps.
#[derive(Default, Clone)]
pub struct StaticDirectory {
    registrations: HashMap<i64, BackendRegistration>,
    tenant_defaults: HashMap<i64, i64>,
    registry: BackendRegistry,
}

impl StaticDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a registration together with its storage implementation.
    pub fn register_storage(
        &mut self,
        registration: BackendRegistration,
        storage: Arc<dyn ResourceStorage>,
    ) -> StorageResult<()> {
        self.registry.register_storage(&registration, storage)?;
        self.registrations.insert(registration.id, registration);
        Ok(())
    }

    /// Add a registration whose implementation lacks the byte-storage capability.
    pub fn register_other(&mut self, registration: BackendRegistration) {
        self.registry
            .register_other(registration.id, registration.name.clone());
        self.registrations.insert(registration.id, registration);
    }

    /// Add a registration with no implementation behind it.
    pub fn register_unbound(&mut self, registration: BackendRegistration) {
        self.registrations.insert(registration.id, registration);
    }

    pub fn set_tenant_default(&mut self, tenant_id: i64, backend_id: i64) {
        self.tenant_defaults.insert(tenant_id, backend_id);
    }

    pub fn clear_tenant_default(&mut self, tenant_id: i64) {
        self.tenant_defaults.remove(&tenant_id);
    }
}

#[async_trait]
impl BackendDirectory for StaticDirectory {
    async fn default_backend_id(&self, tenant_id: i64) -> Result<Option<i64>, AppError> {
        Ok(self
            .tenant_defaults
            .get(&tenant_id)
            .copied()
            .filter(|id| *id > 0))
    }

    async fn registration(&self, backend_id: i64) -> Result<Option<BackendRegistration>, AppError> {
        Ok(self.registrations.get(&backend_id).cloned())
    }

    async fn load_support(
        &self,
        registration: &BackendRegistration,
    ) -> Result<Option<BackendSupport>, AppError> {
        Ok(self.registry.support(registration.id))
    }
}
