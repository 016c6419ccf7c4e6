//! Domain models

pub mod owner;
pub mod reference;
pub mod registration;

pub use owner::OwnerRecord;
pub use reference::{OwnerKind, OwnerRef, RecordScope, ReferenceEntity};
pub use registration::BackendRegistration;
