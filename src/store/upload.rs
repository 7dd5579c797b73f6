//! Input upload helpers used by launches that hand vendors a blob reference.

use std::path::Path;

use super::BlobStore;
use crate::error::JobError;

/// Metadata of an uploaded job input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedInput {
    pub key: String,
    pub content_type: String,
    pub size: usize,
}

/// Upload raw input bytes under `key`.
pub async fn upload_input<S: BlobStore + ?Sized>(
    store: &S,
    key: &str,
    bytes: Vec<u8>,
    content_type: Option<&str>,
) -> Result<UploadedInput, JobError> {
    let content_type = content_type
        .map(str::to_string)
        .unwrap_or_else(|| mime_guess::from_path(key).first_or_octet_stream().to_string());
    let size = bytes.len();
    store.put(key, bytes).await?;
    tracing::debug!(target: "siumai_jobs::store", key = %key, size, content_type = %content_type, "input uploaded");
    Ok(UploadedInput {
        key: key.to_string(),
        content_type,
        size,
    })
}

/// Read a local file and upload it under `key`, guessing its content type.
pub async fn upload_file<S: BlobStore + ?Sized>(
    store: &S,
    key: &str,
    path: impl AsRef<Path>,
) -> Result<UploadedInput, JobError> {
    let path = path.as_ref();
    let bytes = tokio::fs::read(path).await.map_err(|e| {
        JobError::InvalidParameter(format!("cannot read input {}: {e}", path.display()))
    })?;
    let content_type = mime_guess::from_path(path).first_or_octet_stream().to_string();
    upload_input(store, key, bytes, Some(&content_type)).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryBlobStore;

    #[tokio::test]
    async fn guesses_content_type_from_key() {
        let store = InMemoryBlobStore::new();
        let uploaded = upload_input(&store, "report.pdf", vec![0u8; 4], None)
            .await
            .unwrap();
        assert_eq!(uploaded.content_type, "application/pdf");
        assert_eq!(uploaded.size, 4);
        assert!(store.contains("report.pdf").await);
    }

    #[tokio::test]
    async fn missing_file_is_invalid_parameter() {
        let store = InMemoryBlobStore::new();
        let err = upload_file(&store, "k", "/definitely/not/here.pdf")
            .await
            .unwrap_err();
        assert!(matches!(err, JobError::InvalidParameter(_)));
    }
}
