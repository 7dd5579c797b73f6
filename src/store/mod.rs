//! Blob storage and the side-channel record store.
//!
//! The orchestration layer has no database. Multi-phase launch progress lives
//! in a small JSON record written to the same blob store that holds uploaded
//! inputs, keyed by the job's own primary ID.

pub mod fs;
pub mod memory;
pub mod record;
pub mod upload;

pub use fs::FsBlobStore;
pub use memory::InMemoryBlobStore;
pub use record::{RecordStore, SideChannelRecord, StartState, VersionedRecord};
pub use upload::{UploadedInput, upload_file, upload_input};

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

use crate::error::JobError;

/// Opaque version token of a stored blob, used for conditional writes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BlobVersion(pub String);

impl fmt::Display for BlobVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Blob contents together with their current version.
#[derive(Debug, Clone)]
pub struct StoredBlob {
    pub bytes: Vec<u8>,
    pub version: BlobVersion,
}

/// External object/blob store.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Read a blob; `Ok(None)` when the key does not exist.
    async fn get(&self, key: &str) -> Result<Option<StoredBlob>, JobError>;

    /// Unconditionally write a blob.
    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<BlobVersion, JobError>;

    /// Write only if the stored version equals `expected`.
    ///
    /// `expected = None` means "create only": the write fails if the key exists.
    /// A lost precondition is reported as `JobError::ConflictError`.
    async fn put_if_version(
        &self,
        key: &str,
        bytes: Vec<u8>,
        expected: Option<&BlobVersion>,
    ) -> Result<BlobVersion, JobError>;

    /// Remove a blob. Missing keys are not an error.
    async fn delete(&self, key: &str) -> Result<(), JobError>;
}

#[async_trait]
impl<T: BlobStore + ?Sized> BlobStore for Arc<T> {
    async fn get(&self, key: &str) -> Result<Option<StoredBlob>, JobError> {
        (**self).get(key).await
    }

    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<BlobVersion, JobError> {
        (**self).put(key, bytes).await
    }

    async fn put_if_version(
        &self,
        key: &str,
        bytes: Vec<u8>,
        expected: Option<&BlobVersion>,
    ) -> Result<BlobVersion, JobError> {
        (**self).put_if_version(key, bytes, expected).await
    }

    async fn delete(&self, key: &str) -> Result<(), JobError> {
        (**self).delete(key).await
    }
}

pub(crate) fn conflict(key: &str, expected: Option<&BlobVersion>) -> JobError {
    match expected {
        Some(v) => JobError::ConflictError(format!("blob {key} is no longer at version {v}")),
        None => JobError::ConflictError(format!("blob {key} already exists")),
    }
}
