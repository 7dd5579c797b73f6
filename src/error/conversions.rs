//! Conversions from common error types.

use super::types::{JobError, VendorError};

impl From<reqwest::Error> for JobError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => JobError::provider(Some(status.as_u16()), err.to_string()),
            None => JobError::HttpError(err.to_string()),
        }
    }
}

impl From<reqwest::Error> for VendorError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            return VendorError::malformed(err.to_string());
        }
        match err.status() {
            Some(status) => VendorError::http(status.as_u16(), err.to_string()),
            None => VendorError::transport(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for JobError {
    fn from(err: serde_json::Error) -> Self {
        JobError::ParseError(err.to_string())
    }
}

impl From<validator::ValidationErrors> for JobError {
    fn from(err: validator::ValidationErrors) -> Self {
        JobError::InvalidParameter(err.to_string())
    }
}

impl From<std::io::Error> for JobError {
    fn from(err: std::io::Error) -> Self {
        JobError::StorageError(err.to_string())
    }
}
