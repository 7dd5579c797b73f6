//! In-process blob store.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;

use super::{BlobStore, BlobVersion, StoredBlob, conflict};
use crate::error::JobError;

/// Blob store backed by a `HashMap`; versions are a process-wide counter.
#[derive(Debug, Default)]
pub struct InMemoryBlobStore {
    blobs: RwLock<HashMap<String, StoredBlob>>,
    counter: AtomicU64,
}

impl InMemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_version(&self) -> BlobVersion {
        BlobVersion((self.counter.fetch_add(1, Ordering::SeqCst) + 1).to_string())
    }

    /// Number of stored blobs.
    pub async fn len(&self) -> usize {
        self.blobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.blobs.read().await.is_empty()
    }

    pub async fn contains(&self, key: &str) -> bool {
        self.blobs.read().await.contains_key(key)
    }
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    async fn get(&self, key: &str) -> Result<Option<StoredBlob>, JobError> {
        Ok(self.blobs.read().await.get(key).cloned())
    }

    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<BlobVersion, JobError> {
        let version = self.next_version();
        self.blobs.write().await.insert(
            key.to_string(),
            StoredBlob {
                bytes,
                version: version.clone(),
            },
        );
        Ok(version)
    }

    async fn put_if_version(
        &self,
        key: &str,
        bytes: Vec<u8>,
        expected: Option<&BlobVersion>,
    ) -> Result<BlobVersion, JobError> {
        let mut blobs = self.blobs.write().await;
        let current = blobs.get(key).map(|b| &b.version);
        if current != expected {
            return Err(conflict(key, expected));
        }
        let version = self.next_version();
        blobs.insert(
            key.to_string(),
            StoredBlob {
                bytes,
                version: version.clone(),
            },
        );
        Ok(version)
    }

    async fn delete(&self, key: &str) -> Result<(), JobError> {
        self.blobs.write().await.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn conditional_put_detects_concurrent_write() {
        let store = InMemoryBlobStore::new();
        let v1 = store.put_if_version("k", b"a".to_vec(), None).await.unwrap();

        // create-only fails once the key exists
        assert!(matches!(
            store.put_if_version("k", b"b".to_vec(), None).await,
            Err(JobError::ConflictError(_))
        ));

        let v2 = store
            .put_if_version("k", b"b".to_vec(), Some(&v1))
            .await
            .unwrap();
        assert_ne!(v1, v2);

        // stale version loses
        assert!(matches!(
            store.put_if_version("k", b"c".to_vec(), Some(&v1)).await,
            Err(JobError::ConflictError(_))
        ));
        let blob = store.get("k").await.unwrap().unwrap();
        assert_eq!(blob.bytes, b"b");
        assert_eq!(blob.version, v2);
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let store = InMemoryBlobStore::new();
        store.put("k", b"a".to_vec()).await.unwrap();
        store.delete("k").await.unwrap();
        store.delete("k").await.unwrap();
        assert!(store.get("k").await.unwrap().is_none());
        assert!(store.is_empty().await);
    }
}
