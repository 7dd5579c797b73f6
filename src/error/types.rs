//! Core error types.

use serde_json::Value;
use thiserror::Error;

/// Fixed message used when a vendor success payload cannot be decoded at all.
pub const MALFORMED_RESPONSE_MESSAGE: &str = "internal server error";

/// Errors surfaced by the orchestration layer.
#[derive(Error, Debug, Clone)]
pub enum JobError {
    /// The vendor rejected a call or reported a terminal failure status.
    #[error("Provider error{}: {message}", code.map(|c| format!(" ({c})")).unwrap_or_default())]
    ProviderError {
        code: Option<u16>,
        message: String,
        details: Option<Value>,
    },

    /// The vendor no longer knows the job identifier; the handle is stale.
    #[error("Deprecated job {job_id}: {message}")]
    DeprecatedJob { job_id: String, message: String },

    /// The result normalizer could not map a successful payload.
    #[error("Normalization error: {0}")]
    NormalizationError(String),

    /// The job handle could not be encoded or decoded.
    #[error("Invalid job handle: {0}")]
    InvalidHandle(String),

    /// A launch configuration failed validation.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// The blob store failed.
    #[error("Storage error: {0}")]
    StorageError(String),

    /// A conditional write lost against a concurrent writer.
    #[error("Conflict: {0}")]
    ConflictError(String),

    /// A side-channel record that the handle refers to is missing.
    #[error("Record not found: {0}")]
    RecordNotFound(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    /// Transport-level failure talking to a vendor.
    #[error("HTTP error: {0}")]
    HttpError(String),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// Polling was cancelled through a `CancelHandle`.
    #[error("Cancelled: {0}")]
    Cancelled(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Coarse error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Provider,
    Deprecated,
    Normalization,
    Client,
    Storage,
    Network,
    Parsing,
    Configuration,
    Cancelled,
    Internal,
}

impl JobError {
    /// Create a provider error with an optional vendor HTTP status.
    pub fn provider(code: Option<u16>, message: impl Into<String>) -> Self {
        Self::ProviderError {
            code,
            message: message.into(),
            details: None,
        }
    }

    /// Provider error reported when a vendor payload is undecodable.
    pub fn malformed_response() -> Self {
        Self::ProviderError {
            code: Some(500),
            message: MALFORMED_RESPONSE_MESSAGE.to_string(),
            details: None,
        }
    }

    pub fn deprecated(job_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::DeprecatedJob {
            job_id: job_id.into(),
            message: message.into(),
        }
    }

    /// Vendor HTTP status code, when one is known.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::ProviderError { code, .. } => *code,
            _ => None,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::ProviderError { .. } => ErrorCategory::Provider,
            Self::DeprecatedJob { .. } => ErrorCategory::Deprecated,
            Self::NormalizationError(_) => ErrorCategory::Normalization,
            Self::InvalidHandle(_) | Self::InvalidParameter(_) | Self::RecordNotFound(_) => {
                ErrorCategory::Client
            }
            Self::StorageError(_) | Self::ConflictError(_) => ErrorCategory::Storage,
            Self::HttpError(_) => ErrorCategory::Network,
            Self::ParseError(_) => ErrorCategory::Parsing,
            Self::ConfigurationError(_) => ErrorCategory::Configuration,
            Self::Cancelled(_) => ErrorCategory::Cancelled,
            Self::InternalError(_) => ErrorCategory::Internal,
        }
    }

    /// Whether relaunching or re-polling might succeed.
    ///
    /// A deprecated job is never retryable with the same handle.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::ProviderError { code: Some(c), .. } => *c == 429 || (500..600).contains(c),
            Self::HttpError(_) | Self::ConflictError(_) => true,
            _ => false,
        }
    }
}

/// Kind of raw vendor failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VendorErrorKind {
    /// The vendor answered with an error status or error body.
    Http,
    /// The request never completed (connect, timeout, TLS).
    Transport,
    /// The vendor answered but the body could not be decoded.
    Malformed,
}

/// A vendor call failure before classification.
///
/// Only the poll executor and the orchestrators turn these into `JobError`.
#[derive(Error, Debug, Clone)]
#[error("{message}")]
pub struct VendorError {
    pub kind: VendorErrorKind,
    pub status: Option<u16>,
    pub message: String,
    pub body: Option<Value>,
}

impl VendorError {
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self {
            kind: VendorErrorKind::Http,
            status: Some(status),
            message: message.into(),
            body: None,
        }
    }

    /// An error without a status code, e.g. an SDK exception carrying only text.
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            kind: VendorErrorKind::Http,
            status: None,
            message: message.into(),
            body: None,
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            kind: VendorErrorKind::Transport,
            status: None,
            message: message.into(),
            body: None,
        }
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self {
            kind: VendorErrorKind::Malformed,
            status: None,
            message: message.into(),
            body: None,
        }
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Convert into a provider error without any not-found analysis.
    ///
    /// Used for launch-side calls, where a missing job cannot occur.
    pub fn into_provider_error(self) -> JobError {
        match self.kind {
            VendorErrorKind::Malformed => JobError::malformed_response(),
            VendorErrorKind::Transport => JobError::HttpError(self.message),
            VendorErrorKind::Http => JobError::ProviderError {
                code: self.status,
                message: self.message,
                details: self.body,
            },
        }
    }
}
