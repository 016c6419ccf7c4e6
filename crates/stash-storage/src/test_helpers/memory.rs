//! In-memory storage implementation for testing

use crate::traits::{ResourceStorage, ResourceStream, StorageError, StorageResult};
use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct Faults {
    fail_puts: AtomicBool,
    fail_deletes: AtomicBool,
    fail_reads: AtomicBool,
    hide_resources: AtomicBool,
}

/// Storage that keeps resources in memory.
///
/// Clones share the same files and fault switches, so a test can keep a handle
/// while the code under test owns another.
#[derive(Clone)]
pub struct InMemoryStorage {
    files: Arc<Mutex<HashMap<String, Bytes>>>,
    faults: Arc<Faults>,
    puts: Arc<AtomicUsize>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self {
            files: Arc::new(Mutex::new(HashMap::new())),
            faults: Arc::new(Faults::default()),
            puts: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Set a file in the storage
    pub fn set_file(&self, key: &str, data: impl Into<Bytes>) {
        self.files.lock().unwrap().insert(key.to_string(), data.into());
    }

    /// Check if a file exists in the storage
    pub fn has_file(&self, key: &str) -> bool {
        self.files.lock().unwrap().contains_key(key)
    }

    /// Get file data (for test assertions)
    pub fn get_file(&self, key: &str) -> Option<Bytes> {
        self.files.lock().unwrap().get(key).cloned()
    }

    pub fn file_count(&self) -> usize {
        self.files.lock().unwrap().len()
    }

    /// Number of successful `put_resource` calls.
    pub fn put_count(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    /// Make every `put_resource` fail.
    pub fn fail_puts(&self, fail: bool) {
        self.faults.fail_puts.store(fail, Ordering::SeqCst);
    }

    /// Make every `delete_resource` fail.
    pub fn fail_deletes(&self, fail: bool) {
        self.faults.fail_deletes.store(fail, Ordering::SeqCst);
    }

    /// Make resource streams fail after their first chunk.
    pub fn fail_reads(&self, fail: bool) {
        self.faults.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make `get_resource` report every key as absent.
    pub fn hide_resources(&self, hide: bool) {
        self.faults.hide_resources.store(hide, Ordering::SeqCst);
    }
}

impl Default for InMemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ResourceStorage for InMemoryStorage {
    async fn get_resource(&self, key: &str) -> StorageResult<Option<ResourceStream>> {
        if self.faults.hide_resources.load(Ordering::SeqCst) {
            return Ok(None);
        }
        let Some(data) = self.files.lock().unwrap().get(key).cloned() else {
            return Ok(None);
        };

        let stream: ResourceStream = if self.faults.fail_reads.load(Ordering::SeqCst) {
            let head = data.slice(..data.len() / 2);
            Box::pin(stream::iter(vec![
                Ok(head),
                Err(StorageError::DownloadFailed(format!(
                    "Stream interrupted for {}",
                    key
                ))),
            ]))
        } else {
            Box::pin(stream::once(async move { Ok(data) }))
        };
        Ok(Some(stream))
    }

    async fn put_resource(&self, key: &str, data: Bytes) -> StorageResult<()> {
        if self.faults.fail_puts.load(Ordering::SeqCst) {
            return Err(StorageError::UploadFailed(format!(
                "Injected upload failure for {}",
                key
            )));
        }
        self.files.lock().unwrap().insert(key.to_string(), data);
        self.puts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn delete_resource(&self, key: &str) -> StorageResult<()> {
        if self.faults.fail_deletes.load(Ordering::SeqCst) {
            return Err(StorageError::DeleteFailed(format!(
                "Injected delete failure for {}",
                key
            )));
        }
        self.files.lock().unwrap().remove(key);
        Ok(())
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Memory
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::read_all;

    #[tokio::test]
    async fn test_put_then_get() {
        let storage = InMemoryStorage::new();
        storage
            .put_resource("1/resource/image/logo.png", Bytes::from_static(b"png"))
            .await
            .unwrap();

        let stream = storage
            .get_resource("1/resource/image/logo.png")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(&read_all(stream).await.unwrap()[..], b"png");
        assert_eq!(storage.put_count(), 1);
    }

    #[tokio::test]
    async fn test_missing_key_yields_no_stream() {
        let storage = InMemoryStorage::new();
        assert!(storage.get_resource("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_nonexistent_succeeds() {
        let storage = InMemoryStorage::new();
        assert!(storage.delete_resource("nonexistent/file.txt").await.is_ok());
    }

    #[tokio::test]
    async fn test_injected_faults() {
        let storage = InMemoryStorage::new();
        storage.set_file("k", Bytes::from_static(b"abcd"));

        storage.fail_puts(true);
        assert!(matches!(
            storage.put_resource("k", Bytes::new()).await,
            Err(StorageError::UploadFailed(_))
        ));

        storage.fail_deletes(true);
        assert!(storage.delete_resource("k").await.is_err());
        assert!(storage.has_file("k"));

        storage.fail_reads(true);
        let stream = storage.get_resource("k").await.unwrap().unwrap();
        assert!(read_all(stream).await.is_err());
    }
}
