//! Stash Storage Library
//!
//! This crate defines the byte-storage capability every backend must implement,
//! the directory that maps backend registrations to implementations, and the
//! deterministic key scheme used to address resources in a backend.
//!
//! # Resource key format
//!
//! Keys are tenant-scoped, `/`-joined, and never URL-encoded:
//!
//! - **Attachment**: `{tenant}/attachment/{table}/{record_id}/{name}`
//! - **Image**: `{tenant}/resource/image/{name}`
//! - **Archive**: `{tenant}/resource/archive/{table}/{record_id}/{name}`
//!
//! Key generation is centralized in the `keys` module so every caller writes and
//! later re-reads the same bytes.

pub mod keys;
pub mod registry;
#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;
pub mod traits;

// Re-export commonly used types
pub use keys::{ContainerType, ResourceKey, ResourceKeyBuilder, ResourceLocation};
pub use registry::{BackendDirectory, BackendRegistry, BackendSupport, StaticDirectory};
pub use stash_core::StorageBackend;
pub use traits::{read_all, ResourceStorage, ResourceStream, StorageError, StorageResult};
