//! Record store access for Stash
//!
//! This crate defines the repository seams the attachment service persists through,
//! a caching decorator that subscribes to reference events, and the PostgreSQL
//! implementations of the reference, owner and directory tables.

pub mod cache;
#[cfg(any(test, feature = "test-helpers"))]
pub mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;
pub mod repository;

pub use cache::CachedReferenceRepository;
#[cfg(feature = "postgres")]
pub use postgres::{connect, PgDirectory, PgOwnerRepository, PgReferenceRepository, MIGRATOR};
pub use repository::{OwnerRepository, ReferenceRepository};
