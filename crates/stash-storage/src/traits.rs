//! Byte-storage capability
//!
//! This module defines the `ResourceStorage` trait that every storage backend must
//! implement to be usable for resources. The trait is the capability: a backend that
//! does not implement it cannot be registered as resource storage.

use crate::StorageBackend;
use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures::{Stream, StreamExt};
use std::pin::Pin;
use thiserror::Error;

/// Storage operation errors
///
/// Backends report failures per operation; `ConfigError` covers registrations that
/// cannot be accepted.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Stream of resource chunks returned by `get_resource`.
pub type ResourceStream = Pin<Box<dyn Stream<Item = Result<Bytes, StorageError>> + Send>>;

/// Byte-storage capability
///
/// Keys are produced by [`crate::keys::ResourceKeyBuilder`]; backends treat them as
/// opaque, `/`-separated names.
#[async_trait]
pub trait ResourceStorage: Send + Sync {
    /// Open the resource stored at `key`.
    ///
    /// Returns `Ok(None)` when nothing is stored at the key.
    async fn get_resource(&self, key: &str) -> StorageResult<Option<ResourceStream>>;

    /// Store `data` at `key`, replacing any previous content.
    async fn put_resource(&self, key: &str, data: Bytes) -> StorageResult<()>;

    /// Delete the resource stored at `key`. Deleting a missing key succeeds.
    async fn delete_resource(&self, key: &str) -> StorageResult<()>;

    /// Get the storage backend type
    fn backend_type(&self) -> StorageBackend;
}

/// Drain a resource stream into one contiguous buffer.
pub async fn read_all(mut stream: ResourceStream) -> StorageResult<Bytes> {
    let mut buffer = BytesMut::new();
    while let Some(chunk) = stream.next().await {
        buffer.extend_from_slice(&chunk?);
    }
    Ok(buffer.freeze())
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    #[tokio::test]
    async fn test_read_all_concatenates_chunks() {
        let chunks = vec![
            Ok(Bytes::from_static(b"hello ")),
            Ok(Bytes::from_static(b"world")),
        ];
        let stream: ResourceStream = Box::pin(stream::iter(chunks));
        let data = read_all(stream).await.unwrap();
        assert_eq!(&data[..], b"hello world");
    }

    #[tokio::test]
    async fn test_read_all_propagates_chunk_error() {
        let chunks = vec![
            Ok(Bytes::from_static(b"partial")),
            Err(StorageError::DownloadFailed("connection reset".to_string())),
        ];
        let stream: ResourceStream = Box::pin(stream::iter(chunks));
        let result = read_all(stream).await;
        assert!(matches!(result, Err(StorageError::DownloadFailed(_))));
    }
}
