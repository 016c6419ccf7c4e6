//! Error taxonomy of the attachment service.

use stash_core::{AppError, ErrorMetadata, LogLevel};
use stash_storage::StorageError;

#[derive(Debug, thiserror::Error)]
pub enum AttachmentError {
    #[error("No storage backend configured: {0}")]
    ConfigurationMissing(String),

    #[error("Backend {backend_id} ({name}) does not support resource storage")]
    UnsupportedBackend { backend_id: i64, name: String },

    #[error("Reference not found: {0}")]
    ReferenceNotFound(String),

    #[error("Resource not found at key {key}")]
    ResourceNotFound { key: String },

    #[error("Owner not found: {0}")]
    OwnerNotFound(String),

    #[error("Backend I/O error: {0}")]
    BackendIo(#[from] StorageError),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Record store error: {0}")]
    Store(#[source] AppError),

    #[error("Invariant violation: {0}")]
    InvariantViolation(String),
}

pub type AttachmentResult<T> = Result<T, AttachmentError>;

impl From<AppError> for AttachmentError {
    fn from(err: AppError) -> Self {
        match err {
            AppError::Conflict(message) => AttachmentError::Conflict(message),
            other => AttachmentError::Store(other),
        }
    }
}

impl ErrorMetadata for AttachmentError {
    fn error_code(&self) -> &'static str {
        match self {
            AttachmentError::ConfigurationMissing(_) => "CONFIGURATION_MISSING",
            AttachmentError::UnsupportedBackend { .. } => "UNSUPPORTED_BACKEND",
            AttachmentError::ReferenceNotFound(_) => "REFERENCE_NOT_FOUND",
            AttachmentError::ResourceNotFound { .. } => "RESOURCE_NOT_FOUND",
            AttachmentError::OwnerNotFound(_) => "OWNER_NOT_FOUND",
            AttachmentError::BackendIo(_) => "BACKEND_IO_ERROR",
            AttachmentError::Conflict(_) => "CONFLICT",
            AttachmentError::Store(err) => err.error_code(),
            AttachmentError::InvariantViolation(_) => "INVARIANT_VIOLATION",
        }
    }

    fn is_recoverable(&self) -> bool {
        match self {
            AttachmentError::BackendIo(_) | AttachmentError::Conflict(_) => true,
            AttachmentError::Store(err) => err.is_recoverable(),
            _ => false,
        }
    }

    fn log_level(&self) -> LogLevel {
        match self {
            AttachmentError::ReferenceNotFound(_) | AttachmentError::ResourceNotFound { .. } => {
                LogLevel::Debug
            }
            AttachmentError::Conflict(_) | AttachmentError::InvariantViolation(_) => LogLevel::Warn,
            AttachmentError::Store(err) => err.log_level(),
            _ => LogLevel::Error,
        }
    }
}
