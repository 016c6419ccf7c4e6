//! Per-call request state for the attachment service.
//!
//! A `RequestContext` is configured by one caller, builder style, and then passed by
//! `&mut` to one service operation at a time. It memoizes the resolved backend handle;
//! any change to the tenant, the backend id or the selector drops that handle.

use bytes::Bytes;
use stash_core::{sanitize_file_name, OwnerRef, RecordScope, ReferenceEntity};

use crate::error::{AttachmentError, AttachmentResult};
use crate::selector::BackendHandle;

/// Which reference entity a context operates on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Selector {
    /// A reference entity by surrogate id.
    Reference(i64),
    /// A named resource of an attachment container.
    Attachment(i64),
    /// The resource of an image.
    Image(i64),
    /// The resource of an archive.
    Archive(i64),
}

impl Selector {
    /// The owner this selector designates, if any. `Reference` names an entity, not an owner.
    pub fn owner(&self) -> Option<OwnerRef> {
        match *self {
            Selector::Reference(_) => None,
            Selector::Attachment(id) => Some(OwnerRef::Attachment(id)),
            Selector::Image(id) => Some(OwnerRef::Image(id)),
            Selector::Archive(id) => Some(OwnerRef::Archive(id)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RequestContext {
    tenant_id: i64,
    transaction: Option<String>,
    backend_id: Option<i64>,
    selector: Option<Selector>,
    file_name: Option<String>,
    data: Option<Bytes>,
    note: Option<String>,
    description: Option<String>,
    handle: Option<BackendHandle>,
}

impl RequestContext {
    /// Create a context for `tenant_id`. Tenant 0 is the system tenant; negative ids are rejected.
    pub fn new(tenant_id: i64) -> AttachmentResult<Self> {
        validate_tenant(tenant_id)?;
        Ok(Self {
            tenant_id,
            transaction: None,
            backend_id: None,
            selector: None,
            file_name: None,
            data: None,
            note: None,
            description: None,
            handle: None,
        })
    }

    pub fn with_selector(mut self, selector: Selector) -> Self {
        self.set_selector(selector);
        self
    }

    pub fn with_reference_id(self, id: i64) -> Self {
        self.with_selector(Selector::Reference(id))
    }

    pub fn with_attachment_id(self, id: i64) -> Self {
        self.with_selector(Selector::Attachment(id))
    }

    pub fn with_image_id(self, id: i64) -> Self {
        self.with_selector(Selector::Image(id))
    }

    pub fn with_archive_id(self, id: i64) -> Self {
        self.with_selector(Selector::Archive(id))
    }

    pub fn with_backend_id(mut self, backend_id: i64) -> Self {
        self.set_backend_id(Some(backend_id));
        self
    }

    pub fn with_transaction(mut self, transaction: impl Into<String>) -> Self {
        self.set_transaction(Some(transaction.into()));
        self
    }

    pub fn with_file_name(mut self, file_name: &str) -> Self {
        self.set_file_name(file_name);
        self
    }

    pub fn with_data(mut self, data: impl Into<Bytes>) -> Self {
        self.set_data(Some(data.into()));
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.set_note(Some(note.into()));
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.set_description(Some(description.into()));
        self
    }

    /// Replace the selector. The previous selector and the memoized backend are dropped.
    pub fn set_selector(&mut self, selector: Selector) {
        if self.selector != Some(selector) {
            self.handle = None;
        }
        self.selector = Some(selector);
    }

    pub fn clear_selector(&mut self) {
        self.selector = None;
        self.handle = None;
    }

    pub fn set_backend_id(&mut self, backend_id: Option<i64>) {
        let backend_id = backend_id.filter(|id| *id > 0);
        if self.backend_id != backend_id {
            self.handle = None;
        }
        self.backend_id = backend_id;
    }

    /// Switch tenants. A backend id set for the previous tenant, including one
    /// filled in from its default, is cleared along with the memoized handle.
    pub fn set_tenant_id(&mut self, tenant_id: i64) -> AttachmentResult<()> {
        validate_tenant(tenant_id)?;
        if self.tenant_id != tenant_id {
            self.backend_id = None;
            self.handle = None;
        }
        self.tenant_id = tenant_id;
        Ok(())
    }

    pub fn set_transaction(&mut self, transaction: Option<String>) {
        self.transaction = transaction;
    }

    /// Set the resource name. It is sanitized here, once; an empty result unsets it.
    pub fn set_file_name(&mut self, file_name: &str) {
        let sanitized = sanitize_file_name(file_name);
        self.file_name = (!sanitized.is_empty()).then_some(sanitized);
    }

    pub fn set_data(&mut self, data: Option<Bytes>) {
        self.data = data;
    }

    pub fn set_note(&mut self, note: Option<String>) {
        self.note = note;
    }

    pub fn set_description(&mut self, description: Option<String>) {
        self.description = description;
    }

    /// Reset everything but the tenant.
    pub fn clear(&mut self) {
        self.transaction = None;
        self.backend_id = None;
        self.selector = None;
        self.file_name = None;
        self.data = None;
        self.note = None;
        self.description = None;
        self.handle = None;
    }

    pub fn tenant_id(&self) -> i64 {
        self.tenant_id
    }

    pub fn transaction(&self) -> Option<&str> {
        self.transaction.as_deref()
    }

    pub fn backend_id(&self) -> Option<i64> {
        self.backend_id
    }

    pub fn selector(&self) -> Option<Selector> {
        self.selector
    }

    pub fn file_name(&self) -> Option<&str> {
        self.file_name.as_deref()
    }

    pub fn data(&self) -> Option<&Bytes> {
        self.data.as_ref()
    }

    pub fn note(&self) -> Option<&str> {
        self.note.as_deref()
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Whether a backend handle is memoized.
    pub fn has_backend_handle(&self) -> bool {
        self.handle.is_some()
    }

    /// Record store scope for calls made on behalf of this context.
    pub fn scope(&self) -> RecordScope {
        RecordScope {
            tenant_id: self.tenant_id,
            transaction: self.transaction.clone(),
        }
    }

    pub(crate) fn backend_handle(&self) -> Option<&BackendHandle> {
        self.handle.as_ref()
    }

    /// Memoize a resolved handle and adopt its backend id.
    pub(crate) fn remember_backend(&mut self, handle: BackendHandle) {
        self.backend_id = Some(handle.backend_id());
        self.handle = Some(handle);
    }

    /// Copy the stored name and metadata of `entity` back into the context.
    pub(crate) fn adopt_entity(&mut self, entity: &ReferenceEntity) {
        self.file_name = Some(entity.file_name.clone());
        self.note = entity.note.clone();
        self.description = entity.description.clone();
    }
}

fn validate_tenant(tenant_id: i64) -> AttachmentResult<()> {
    if tenant_id < 0 {
        return Err(AttachmentError::InvariantViolation(format!(
            "Tenant id must not be negative, got {}",
            tenant_id
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use stash_core::{BackendRegistration, StorageBackend};
    use stash_storage::test_helpers::InMemoryStorage;
    use std::sync::Arc;

    fn handle(backend_id: i64) -> BackendHandle {
        BackendHandle::new(
            BackendRegistration::new(backend_id, 1, "scratch", StorageBackend::Memory),
            Arc::new(InMemoryStorage::new()),
        )
    }

    #[test]
    fn test_negative_tenant_is_rejected() {
        assert!(matches!(
            RequestContext::new(-1),
            Err(AttachmentError::InvariantViolation(_))
        ));
        assert!(RequestContext::new(0).is_ok());
    }

    #[test]
    fn test_setting_a_selector_replaces_the_previous_one() {
        let ctx = RequestContext::new(1)
            .unwrap()
            .with_attachment_id(42)
            .with_image_id(7);
        assert_eq!(ctx.selector(), Some(Selector::Image(7)));
        assert_eq!(ctx.selector().and_then(|s| s.owner()), Some(OwnerRef::Image(7)));
    }

    #[test]
    fn test_file_name_is_sanitized_on_set() {
        let ctx = RequestContext::new(1)
            .unwrap()
            .with_file_name("C:\\scans\\My Invoice.pdf");
        assert_eq!(ctx.file_name(), Some("My-Invoice.pdf"));

        let ctx = ctx.with_file_name("uploads/");
        assert_eq!(ctx.file_name(), None);
    }

    #[test]
    fn test_selector_change_drops_memoized_backend() {
        let mut ctx = RequestContext::new(1).unwrap().with_attachment_id(42);
        ctx.remember_backend(handle(3));
        assert!(ctx.has_backend_handle());
        assert_eq!(ctx.backend_id(), Some(3));

        ctx.set_selector(Selector::Attachment(42));
        assert!(ctx.has_backend_handle());

        ctx.set_selector(Selector::Archive(5));
        assert!(!ctx.has_backend_handle());
        assert_eq!(ctx.backend_id(), Some(3));
    }

    #[test]
    fn test_backend_and_tenant_change_drop_memoized_backend() {
        let mut ctx = RequestContext::new(1).unwrap();
        ctx.remember_backend(handle(3));
        ctx.set_backend_id(Some(3));
        assert!(ctx.has_backend_handle());
        ctx.set_backend_id(Some(4));
        assert!(!ctx.has_backend_handle());

        ctx.remember_backend(handle(4));
        ctx.set_tenant_id(2).unwrap();
        assert!(!ctx.has_backend_handle());
        assert_eq!(ctx.backend_id(), None);
        assert!(ctx.set_tenant_id(-5).is_err());
        assert_eq!(ctx.tenant_id(), 2);
    }

    #[test]
    fn test_same_tenant_keeps_backend() {
        let mut ctx = RequestContext::new(1).unwrap().with_backend_id(3);
        ctx.remember_backend(handle(3));
        ctx.set_tenant_id(1).unwrap();
        assert_eq!(ctx.backend_id(), Some(3));
        assert!(ctx.has_backend_handle());
    }

    #[test]
    fn test_clear_keeps_only_the_tenant() {
        let mut ctx = RequestContext::new(11)
            .unwrap()
            .with_backend_id(3)
            .with_transaction("trx-1")
            .with_image_id(7)
            .with_file_name("logo.png")
            .with_data(vec![1u8, 2, 3])
            .with_note("n")
            .with_description("d");
        ctx.clear();

        assert_eq!(ctx.tenant_id(), 11);
        assert_eq!(ctx.selector(), None);
        assert_eq!(ctx.backend_id(), None);
        assert_eq!(ctx.transaction(), None);
        assert_eq!(ctx.file_name(), None);
        assert!(ctx.data().is_none());
        assert_eq!(ctx.note(), None);
        assert_eq!(ctx.description(), None);
    }

    #[test]
    fn test_scope_carries_transaction() {
        let ctx = RequestContext::new(4).unwrap().with_transaction("trx-7");
        assert_eq!(ctx.scope(), RecordScope::new(4).with_transaction("trx-7"));
    }
}
