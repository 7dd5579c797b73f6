//! Shared types for the two-call job protocol.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;

use crate::error::JobError;

/// One response of a vendor status call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusPage {
    /// Vendor status token, e.g. `"IN_PROGRESS"`.
    pub status: String,
    /// The raw response body (or the relevant part of it).
    pub payload: Value,
    /// Cursor for the next result page, when the vendor pages results.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_token: Option<String>,
    /// Vendor-supplied failure reason, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl StatusPage {
    pub fn new(status: impl Into<String>, payload: Value) -> Self {
        Self {
            status: status.into(),
            payload,
            next_token: None,
            error_message: None,
        }
    }

    pub fn with_next_token(mut self, token: impl Into<String>) -> Self {
        self.next_token = Some(token.into());
        self
    }

    pub fn with_error_message(mut self, message: impl Into<String>) -> Self {
        self.error_message = Some(message.into());
        self
    }
}

/// Lifecycle of a vendor-side auxiliary resource (e.g. a custom vocabulary).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuxiliaryState {
    Provisioning,
    Ready,
    Failed,
}

/// Result of `get_job_result`.
///
/// A vendor-confirmed failure is an `Err(JobError::ProviderError)`; a job the
/// vendor no longer knows is the distinct `Deprecated` variant so it cannot be
/// mistaken for an ordinary failure.
#[derive(Debug, Clone, PartialEq)]
pub enum JobOutcome<T> {
    /// Not finished yet; poll again later.
    Pending,
    /// Finished; `raw` holds every result page in order.
    Succeeded { result: T, raw: Vec<Value> },
    /// The handle is stale. Do not retry with it.
    Deprecated { job_id: String, message: String },
}

impl<T> JobOutcome<T> {
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }

    /// `Ok(None)` while pending, `Ok(Some(result))` on success, and
    /// `Err(JobError::DeprecatedJob)` for a stale handle.
    pub fn into_result(self) -> Result<Option<T>, JobError> {
        match self {
            Self::Pending => Ok(None),
            Self::Succeeded { result, .. } => Ok(Some(result)),
            Self::Deprecated { job_id, message } => Err(JobError::deprecated(job_id, message)),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> JobOutcome<U> {
        match self {
            Self::Pending => JobOutcome::Pending,
            Self::Succeeded { result, raw } => JobOutcome::Succeeded {
                result: f(result),
                raw,
            },
            Self::Deprecated { job_id, message } => JobOutcome::Deprecated { job_id, message },
        }
    }
}

/// Where a job's input comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobInput {
    /// Already present in the blob store under this key.
    Stored(String),
    /// Bytes to upload under `key` before the job starts.
    Bytes { key: String, bytes: Vec<u8> },
    /// Local file to upload under `key` before the job starts.
    File { key: String, path: PathBuf },
}

impl JobInput {
    pub fn stored(key: impl Into<String>) -> Self {
        Self::Stored(key.into())
    }

    pub fn bytes(key: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self::Bytes {
            key: key.into(),
            bytes,
        }
    }

    pub fn file(key: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self::File {
            key: key.into(),
            path: path.into(),
        }
    }

    /// Blob key the vendor reads the input from.
    pub fn key(&self) -> &str {
        match self {
            Self::Stored(key) | Self::Bytes { key, .. } | Self::File { key, .. } => key,
        }
    }

    pub fn needs_upload(&self) -> bool {
        !matches!(self, Self::Stored(_))
    }
}
