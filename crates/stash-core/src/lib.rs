//! Stash Core Library
//!
//! This crate provides the domain models, error types, configuration, and validation
//! shared by all Stash components: the reference entity that links an owning record to
//! a stored resource, backend registrations, and the invalidation events published when
//! reference state changes.

pub mod config;
pub mod error;
pub mod hooks;
pub mod models;
pub mod storage_types;
pub mod validation;

// Re-export commonly used types
pub use config::{ConflictPolicy, Config};
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use hooks::{NoOpEventSink, ReferenceEvent, ReferenceEventSink};
pub use models::{
    BackendRegistration, OwnerKind, OwnerRecord, OwnerRef, RecordScope, ReferenceEntity,
};
pub use storage_types::StorageBackend;
pub use validation::sanitize_file_name;
