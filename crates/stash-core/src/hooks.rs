//! Hooks for reference state changes
//!
//! The attachment service publishes a `ReferenceEvent` after every mutation of a
//! reference entity. Layers that cache lookups (the record store's reference cache,
//! a host-side cache) subscribe by implementing `ReferenceEventSink`.

use async_trait::async_trait;

use crate::models::OwnerRef;

/// A change to reference state reachable through (backend id, owner) lookups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReferenceEvent {
    /// A reference owned by `owner` was created or updated on `backend_id`.
    OwnerChanged { backend_id: i64, owner: OwnerRef },
    /// The reference `reference_id` owned by `owner` was removed from `backend_id`.
    ReferenceRemoved {
        backend_id: i64,
        reference_id: i64,
        owner: OwnerRef,
    },
}

impl ReferenceEvent {
    pub fn backend_id(&self) -> i64 {
        match self {
            ReferenceEvent::OwnerChanged { backend_id, .. }
            | ReferenceEvent::ReferenceRemoved { backend_id, .. } => *backend_id,
        }
    }

    pub fn owner(&self) -> OwnerRef {
        match self {
            ReferenceEvent::OwnerChanged { owner, .. }
            | ReferenceEvent::ReferenceRemoved { owner, .. } => *owner,
        }
    }
}

/// Subscriber for reference events.
///
/// Publishing is best-effort: sinks must not fail the operation that emitted the event.
#[async_trait]
pub trait ReferenceEventSink: Send + Sync {
    async fn publish(&self, event: &ReferenceEvent);
}

/// No-op implementation for when nothing caches reference lookups
pub struct NoOpEventSink;

#[async_trait]
impl ReferenceEventSink for NoOpEventSink {
    async fn publish(&self, _event: &ReferenceEvent) {}
}
