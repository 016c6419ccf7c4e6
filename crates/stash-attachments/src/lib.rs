//! Stash Attachments Library
//!
//! In-process orchestration of stored resources. A caller configures a
//! `RequestContext` (tenant, exactly one selector, file name, payload, metadata) and
//! hands it to one `AttachmentService` operation:
//!
//! - `fetch` reads the bytes of the selected resource
//! - `list_file_names` enumerates an attachment container
//! - `save` creates or updates the reference entity and writes the payload
//! - `delete` removes the bytes and then the reference entity
//!
//! The backend is resolved by `BackendSelector` from an explicit backend id or the
//! tenant's default, and memoized in the context. Mutations are announced as
//! `ReferenceEvent`s so caching layers can drop stale lookups.

pub mod context;
pub mod error;
pub mod resolver;
pub mod selector;
pub mod service;
pub mod telemetry;

// Re-export commonly used types
pub use context::{RequestContext, Selector};
pub use error::{AttachmentError, AttachmentResult};
pub use resolver::ReferenceResolver;
pub use selector::{BackendHandle, BackendSelector};
pub use service::AttachmentService;
pub use telemetry::init_telemetry;
