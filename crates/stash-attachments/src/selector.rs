//! Backend selection
//!
//! Resolves the storage backend a context writes to: the explicit backend id when one
//! is set, otherwise the tenant's default from the directory. The handle is memoized in
//! the context until the tenant, backend id or selector changes.

use stash_core::BackendRegistration;
use stash_storage::{BackendDirectory, BackendSupport, ResourceStorage};
use std::sync::Arc;

use crate::context::RequestContext;
use crate::error::{AttachmentError, AttachmentResult};

/// A validated backend with the byte-storage capability.
#[derive(Clone)]
pub struct BackendHandle {
    registration: BackendRegistration,
    storage: Arc<dyn ResourceStorage>,
}

impl BackendHandle {
    pub fn new(registration: BackendRegistration, storage: Arc<dyn ResourceStorage>) -> Self {
        Self {
            registration,
            storage,
        }
    }

    pub fn backend_id(&self) -> i64 {
        self.registration.id
    }

    pub fn registration(&self) -> &BackendRegistration {
        &self.registration
    }

    pub fn storage(&self) -> &Arc<dyn ResourceStorage> {
        &self.storage
    }
}

impl std::fmt::Debug for BackendHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendHandle")
            .field("registration", &self.registration)
            .field("storage", &self.storage.backend_type())
            .finish()
    }
}

pub struct BackendSelector {
    directory: Arc<dyn BackendDirectory>,
}

impl BackendSelector {
    pub fn new(directory: Arc<dyn BackendDirectory>) -> Self {
        Self { directory }
    }

    /// Resolve the backend for `ctx`, reusing the handle memoized in it.
    ///
    /// When the tenant default is used, its id is written back into the context.
    #[tracing::instrument(skip(self, ctx), fields(tenant_id = ctx.tenant_id(), backend_id = ?ctx.backend_id()))]
    pub async fn resolve(&self, ctx: &mut RequestContext) -> AttachmentResult<BackendHandle> {
        if let Some(handle) = ctx.backend_handle() {
            return Ok(handle.clone());
        }

        let backend_id = match ctx.backend_id() {
            Some(backend_id) => backend_id,
            None => {
                let default_id = self
                    .directory
                    .default_backend_id(ctx.tenant_id())
                    .await?
                    .ok_or_else(|| {
                        AttachmentError::ConfigurationMissing(format!(
                            "Tenant {} has no default backend",
                            ctx.tenant_id()
                        ))
                    })?;
                ctx.set_backend_id(Some(default_id));
                default_id
            }
        };

        let registration = self
            .directory
            .registration(backend_id)
            .await?
            .filter(|registration| registration.is_active)
            .ok_or_else(|| {
                AttachmentError::ConfigurationMissing(format!(
                    "Backend {} is not registered or inactive",
                    backend_id
                ))
            })?;

        let support = self
            .directory
            .load_support(&registration)
            .await?
            .ok_or_else(|| {
                AttachmentError::ConfigurationMissing(format!(
                    "Backend {} ({}) has no implementation",
                    registration.id, registration.name
                ))
            })?;

        let storage = match support {
            BackendSupport::ResourceStorage(storage) => storage,
            BackendSupport::Other { name } => {
                tracing::warn!(
                    backend_id = registration.id,
                    support = %name,
                    "Backend does not support resource storage"
                );
                return Err(AttachmentError::UnsupportedBackend {
                    backend_id: registration.id,
                    name: registration.name,
                });
            }
        };

        tracing::debug!(
            backend_id = registration.id,
            kind = %registration.kind,
            "Resolved storage backend"
        );
        let handle = BackendHandle::new(registration, storage);
        ctx.remember_backend(handle.clone());
        Ok(handle)
    }

    /// Whether the tenant has a default backend. Best effort: lookup failures count as no.
    pub async fn is_configured_for_tenant(&self, tenant_id: i64) -> bool {
        match self.directory.default_backend_id(tenant_id).await {
            Ok(backend_id) => backend_id.is_some(),
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    tenant_id,
                    "Failed to look up default backend"
                );
                false
            }
        }
    }
}
