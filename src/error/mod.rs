//! Error Handling Module
//!
//! This module provides error handling for the job orchestration layer:
//! - Core error types (`JobError`, `ErrorCategory`)
//! - Raw, pre-classification vendor failures (`VendorError`)
//! - Type conversions from common error types
//!
//! # Example
//!
//! ```rust,ignore
//! use siumai_jobs::error::{JobError, ErrorCategory};
//!
//! let error = JobError::provider(Some(503), "Service unavailable");
//! assert_eq!(error.category(), ErrorCategory::Provider);
//! assert!(error.is_retryable());
//! ```

mod conversions;
pub mod types;

pub use types::*;
