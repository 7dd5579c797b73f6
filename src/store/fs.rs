//! Filesystem-backed blob store.
//!
//! Each key maps to one file under the root directory (the key is
//! percent-encoded into the file name). Versions are a hash of the contents;
//! conditional writes are serialised by a process-local lock.

use async_trait::async_trait;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

use super::{BlobStore, BlobVersion, StoredBlob, conflict};
use crate::error::JobError;

#[derive(Debug)]
pub struct FsBlobStore {
    root: PathBuf,
    write_lock: Mutex<()>,
}

impl FsBlobStore {
    /// Open a store rooted at `root`, creating the directory if needed.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self, JobError> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await?;
        Ok(Self {
            root,
            write_lock: Mutex::new(()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, JobError> {
        if key.is_empty() {
            return Err(JobError::StorageError("blob key must not be empty".to_string()));
        }
        Ok(self.root.join(urlencoding::encode(key).as_ref()))
    }

    fn version_of(bytes: &[u8]) -> BlobVersion {
        let mut hasher = DefaultHasher::new();
        bytes.hash(&mut hasher);
        BlobVersion(format!("{:016x}", hasher.finish()))
    }

    async fn read(&self, path: &Path) -> Result<Option<Vec<u8>>, JobError> {
        match tokio::fs::read(path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn write(&self, path: &Path, bytes: &[u8]) -> Result<(), JobError> {
        let tmp = path.with_extension(format!("tmp-{}", uuid::Uuid::new_v4().simple()));
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn get(&self, key: &str) -> Result<Option<StoredBlob>, JobError> {
        let path = self.path_for(key)?;
        Ok(self.read(&path).await?.map(|bytes| StoredBlob {
            version: Self::version_of(&bytes),
            bytes,
        }))
    }

    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<BlobVersion, JobError> {
        let path = self.path_for(key)?;
        let _guard = self.write_lock.lock().await;
        self.write(&path, &bytes).await?;
        Ok(Self::version_of(&bytes))
    }

    async fn put_if_version(
        &self,
        key: &str,
        bytes: Vec<u8>,
        expected: Option<&BlobVersion>,
    ) -> Result<BlobVersion, JobError> {
        let path = self.path_for(key)?;
        let _guard = self.write_lock.lock().await;
        let current = self
            .read(&path)
            .await?
            .map(|existing| Self::version_of(&existing));
        if current.as_ref() != expected {
            return Err(conflict(key, expected));
        }
        self.write(&path, &bytes).await?;
        Ok(Self::version_of(&bytes))
    }

    async fn delete(&self, key: &str) -> Result<(), JobError> {
        let path = self.path_for(key)?;
        let _guard = self.write_lock.lock().await;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
